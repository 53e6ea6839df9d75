//! Generator trait definitions
//!
//! Defines the ExternalGenerator trait the scheduler calls for personas whose
//! lines come from an external text-generation service.

use async_trait::async_trait;
use thiserror::Error;

// ─────────────────────────────────────────────────────────────────
// Generation Errors
// ─────────────────────────────────────────────────────────────────

/// Why a single generation request produced no text.
///
/// Always recoverable: the scheduler turns it into a visible placeholder
/// line and moves on.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    /// Could not reach the service
    #[error("transport error: {0}")]
    Transport(String),

    /// Service answered with a non-success status
    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    /// Response body did not have the expected shape
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Service answered but the first choice had no text
    #[error("empty response")]
    EmptyResponse,

    /// Transport call did not finish in time
    #[error("timed out after {secs}s")]
    Timeout { secs: u64 },
}

impl GenerationError {
    /// Whether another attempt at the same request may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            GenerationError::Transport(_) => true,
            GenerationError::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Context
// ─────────────────────────────────────────────────────────────────

/// One prior line of dialogue handed to the generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextLine {
    pub speaker: String,
    pub text: String,
}

impl ContextLine {
    pub fn new(speaker: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            speaker: speaker.into(),
            text: text.into(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// ExternalGenerator Trait
// ─────────────────────────────────────────────────────────────────

/// Produces one line of dialogue for a persona.
///
/// Implementations own their rate limiting: a call may suspend until the
/// provider window has room. `context` is ordered oldest first.
#[async_trait]
pub trait ExternalGenerator: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &'static str;

    async fn generate(
        &self,
        persona: &str,
        context: &[ContextLine],
    ) -> Result<String, GenerationError>;
}
