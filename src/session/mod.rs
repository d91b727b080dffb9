//! Transcription session management
//!
//! This module provides the `SessionEngine` that manages:
//! - The single active capture/recognition session
//! - Translation of recognition events into an ordered result stream
//! - Teardown of capture and recognition on every exit path
//! - Session statistics

mod config;
mod engine;
mod state;
mod stats;
mod stream;

pub use config::SessionConfig;
pub use engine::{SessionEngine, SharedCapture};
pub use state::TerminationReason;
pub use stats::SessionStats;
pub use stream::{SessionItem, SessionStream};
