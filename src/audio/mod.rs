pub mod backend;
pub mod file;

pub use backend::{AudioCapture, AudioFrame, CaptureConfig, FrameSink};
pub use file::{AudioFile, FileCapture};
