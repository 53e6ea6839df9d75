//! Personas: the speaker identities that take turns in the conversation.
//!
//! Each persona has a display name, a color for viewers, and a behavior mode
//! deciding whether its lines come from the system catalog, a canned catalog,
//! or the external generator.

pub mod registry;
pub mod types;

pub use registry::PersonaRegistry;
pub use types::{BehaviorMode, Persona};
