pub mod live;

// Re-export commonly used types for convenience
pub use live::{
    BaseLive, BoxedLive, GeminiLive, LiveConfig, LiveError, LiveResult,
};
