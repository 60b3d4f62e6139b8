//! Audio capture, playback, and resampling.
//!
//! The hardware handles (cpal `Stream`, rodio `OutputStream`) are not
//! `Send`; each lives on its own thread behind a command-channel handle.

pub mod capture;
pub mod playback;
pub mod resampler;

pub use capture::{Capture, FrameSlot, forward_frames};
pub use playback::{Playback, PlaybackEvent};
pub use resampler::{TARGET_SAMPLE_RATE, resample_to_pcm16};
