//! Core types for conversation personas.

use std::fmt;

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────
// Behavior Mode
// ─────────────────────────────────────────────────────────────────

/// How a persona produces its line on each turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BehaviorMode {
    /// Draws from the system message catalog.
    SystemLog,
    /// Draws from its own canned catalog; never touches the network.
    CannedOnly,
    /// Asks the external generator, gated by the daily budget.
    ExternalGenerated,
}

impl BehaviorMode {
    /// Slug used in config files and logs.
    pub fn slug(&self) -> &'static str {
        match self {
            BehaviorMode::SystemLog => "system-log",
            BehaviorMode::CannedOnly => "canned-only",
            BehaviorMode::ExternalGenerated => "external-generated",
        }
    }
}

impl fmt::Display for BehaviorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

// ─────────────────────────────────────────────────────────────────
// Persona
// ─────────────────────────────────────────────────────────────────

/// One speaker identity in the rotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Persona {
    /// Display name, also used as the transcript `source`.
    pub name: String,

    /// Display affinity for viewers (a CSS color name).
    #[serde(default = "default_color")]
    pub color: String,

    pub mode: BehaviorMode,
}

fn default_color() -> String {
    "white".to_string()
}

impl Persona {
    pub fn new(name: impl Into<String>, color: impl Into<String>, mode: BehaviorMode) -> Self {
        Self {
            name: name.into(),
            color: color.into(),
            mode,
        }
    }

    pub fn system_log(name: impl Into<String>) -> Self {
        Self::new(name, "gray", BehaviorMode::SystemLog)
    }

    pub fn canned(name: impl Into<String>) -> Self {
        Self::new(name, "red", BehaviorMode::CannedOnly)
    }

    pub fn external(name: impl Into<String>) -> Self {
        Self::new(name, "green", BehaviorMode::ExternalGenerated)
    }
}

impl fmt::Display for Persona {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
