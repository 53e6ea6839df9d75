//! Canned content for the conversation.
//!
//! The scheduler never hard-codes a line of dialogue: system messages,
//! budget-exhausted fallbacks, canned persona lines and generator profiles
//! all come through [`ContentProvider`], so deployments can swap the catalog
//! and tests can inject their own.

mod catalog;

pub use catalog::{ContentCatalog, GeneratorProfile};

/// Source of canned lines and generator profiles.
///
/// Lookups are pure; an empty slice means "nothing registered".
pub trait ContentProvider: Send + Sync {
    /// Ordinary lines for system-log personas.
    fn system_messages(&self) -> &[String];

    /// Rare, unsettling lines for system-log personas.
    fn anomaly_messages(&self) -> &[String];

    /// Lines for a canned-only persona.
    fn canned_messages(&self, persona: &str) -> &[String];

    /// Lines used once the daily budget is spent. Personas without their own
    /// catalog borrow the default persona's.
    fn fallback_messages(&self, persona: &str) -> &[String];

    /// Model and system prompt for a generated persona.
    fn profile(&self, persona: &str) -> &GeneratorProfile;
}
