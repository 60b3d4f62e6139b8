pub mod audio;
pub mod controller;
pub mod error;
pub mod transport;

// Re-export commonly used items for convenience
pub use controller::{Controller, PipelineState, VoicePipeline};
pub use error::{ClientError, ClientResult};
