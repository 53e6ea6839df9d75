//! Conversation scheduling
//!
//! [`TurnScheduler`] holds the rotation and transcript and executes one turn
//! at a time; [`runner`] owns the single task that calls it, sleeps between
//! turns and survives failures.

pub mod runner;
mod transcript;
mod turn;

pub use runner::ConversationHandle;
pub use transcript::{format_elapsed, Transcript, TranscriptEntry};
pub use turn::{TurnScheduler, TurnSettings, SESSION_SOURCE, SESSION_START_TEXT};
