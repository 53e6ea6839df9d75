//! External text generation
//!
//! The scheduler only sees the [`ExternalGenerator`] trait; the production
//! implementation talks to an OpenAI-compatible API behind a rolling-window
//! rate limiter.

mod limiter;
mod openai;
mod traits;

#[cfg(test)]
pub mod mock;

pub use limiter::RateLimiter;
pub use openai::OpenAiGenerator;
pub use traits::{ContextLine, ExternalGenerator, GenerationError};
