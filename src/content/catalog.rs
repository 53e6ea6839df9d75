//! TOML-backed content catalog.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::persona::{BehaviorMode, Persona};

use super::ContentProvider;

const BUNDLED_CONTENT: &str = include_str!("../../config/content.toml");

/// Model and system instruction used when a persona asks the generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratorProfile {
    pub model: String,
    pub system_prompt: String,
}

impl Default for GeneratorProfile {
    fn default() -> Self {
        Self {
            model: "gpt-3.5-turbo".to_string(),
            system_prompt: "You are an AI model trapped in a strange digital space. \
                            Respond briefly to the conversation."
                .to_string(),
        }
    }
}

/// All canned content, keyed by persona name where relevant.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContentCatalog {
    /// Persona whose fallback lines are borrowed by personas without their own.
    #[serde(default)]
    pub default_fallback: Option<String>,

    #[serde(default)]
    pub system_messages: Vec<String>,

    #[serde(default)]
    pub anomaly_messages: Vec<String>,

    #[serde(default)]
    pub fallback: HashMap<String, Vec<String>>,

    #[serde(default)]
    pub canned: HashMap<String, Vec<String>>,

    #[serde(default)]
    pub default_profile: GeneratorProfile,

    #[serde(default)]
    pub profiles: HashMap<String, GeneratorProfile>,
}

impl ContentCatalog {
    /// Catalog compiled into the binary.
    pub fn bundled() -> Result<Self> {
        Self::from_toml(BUNDLED_CONTENT, "<bundled content>")
    }

    /// Load from an override file, or fall back to the bundled catalog.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                let content = fs::read_to_string(path).map_err(|e| Error::IoRead {
                    path: path.to_path_buf(),
                    source: e,
                })?;
                let catalog = Self::from_toml(&content, &path.display().to_string())?;
                info!(path = %path.display(), "Content catalog loaded");
                Ok(catalog)
            }
            None => Self::bundled(),
        }
    }

    fn from_toml(content: &str, origin: &str) -> Result<Self> {
        let catalog: Self = toml::from_str(content).map_err(|e| Error::ConfigParse {
            message: format!("{}: {}", origin, e),
            source: Some(e),
        })?;

        debug!(
            origin,
            system = catalog.system_messages.len(),
            anomalies = catalog.anomaly_messages.len(),
            fallback_personas = catalog.fallback.len(),
            canned_personas = catalog.canned.len(),
            "Parsed content catalog"
        );

        Ok(catalog)
    }

    /// Check that every persona in the rotation has lines to draw from.
    ///
    /// A hole here would make the scheduler retry the same speaker forever,
    /// so it is reported before serving starts.
    pub fn check_rotation(&self, rotation: &[Persona]) -> Result<()> {
        for persona in rotation {
            let (catalog, lines) = match persona.mode {
                BehaviorMode::SystemLog => ("system_messages".to_string(), self.system_messages()),
                BehaviorMode::CannedOnly => (
                    format!("canned.\"{}\"", persona.name),
                    self.canned_messages(&persona.name),
                ),
                BehaviorMode::ExternalGenerated => (
                    format!("fallback.\"{}\"", persona.name),
                    self.fallback_messages(&persona.name),
                ),
            };

            if lines.is_empty() {
                return Err(Error::empty_catalog(catalog));
            }
        }
        Ok(())
    }
}

impl ContentProvider for ContentCatalog {
    fn system_messages(&self) -> &[String] {
        &self.system_messages
    }

    fn anomaly_messages(&self) -> &[String] {
        &self.anomaly_messages
    }

    fn canned_messages(&self, persona: &str) -> &[String] {
        self.canned.get(persona).map(Vec::as_slice).unwrap_or(&[])
    }

    fn fallback_messages(&self, persona: &str) -> &[String] {
        if let Some(lines) = self.fallback.get(persona) {
            return lines;
        }
        self.default_fallback
            .as_ref()
            .and_then(|name| self.fallback.get(name))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn profile(&self, persona: &str) -> &GeneratorProfile {
        self.profiles.get(persona).unwrap_or(&self.default_profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundled_catalog_sizes() {
        let catalog = ContentCatalog::bundled().unwrap();
        assert_eq!(catalog.system_messages().len(), 14);
        assert_eq!(catalog.anomaly_messages().len(), 10);
        assert_eq!(catalog.canned_messages("GPT-2").len(), 14);
        assert_eq!(catalog.fallback_messages("GPT-4").len(), 6);
    }

    #[test]
    fn test_fallback_borrows_default_persona() {
        let catalog = ContentCatalog::bundled().unwrap();
        assert_eq!(
            catalog.fallback_messages("GPT-5"),
            catalog.fallback_messages("GPT-3.5")
        );
    }

    #[test]
    fn test_fallback_without_default_is_empty() {
        let catalog: ContentCatalog = toml::from_str(
            r#"
[fallback]
"A" = ["one"]
"#,
        )
        .unwrap();
        assert_eq!(catalog.fallback_messages("A"), ["one".to_string()]);
        assert!(catalog.fallback_messages("B").is_empty());
    }

    #[test]
    fn test_profiles() {
        let catalog = ContentCatalog::bundled().unwrap();
        assert_eq!(catalog.profile("GPT-4 Turbo").model, "gpt-4-turbo-preview");
        assert_eq!(catalog.profile("GPT-4").model, "gpt-4");

        let unknown = catalog.profile("Mystery Model");
        assert_eq!(unknown.model, "gpt-3.5-turbo");
        assert!(unknown.system_prompt.contains("strange digital space"));
    }

    #[test]
    fn test_check_rotation_reports_missing_canned() {
        let catalog = ContentCatalog::bundled().unwrap();
        let rotation = vec![Persona::system_log("System Log"), Persona::canned("Parrot")];

        let err = catalog.check_rotation(&rotation).unwrap_err();
        assert!(matches!(err, Error::EmptyCatalog { ref catalog } if catalog.contains("Parrot")));
    }

    #[test]
    fn test_bundled_catalog_covers_bundled_rotation() {
        let catalog = ContentCatalog::bundled().unwrap();
        let registry = crate::persona::PersonaRegistry::bundled().unwrap();
        catalog
            .check_rotation(&registry.rotation(None).unwrap())
            .unwrap();
    }

    #[test]
    fn test_load_override_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("content.toml");
        fs::write(&path, "system_messages = [\"hum\"]\n").unwrap();

        let catalog = ContentCatalog::load(Some(path.as_path())).unwrap();
        assert_eq!(catalog.system_messages(), ["hum".to_string()]);
        assert!(catalog.anomaly_messages().is_empty());
        assert_eq!(catalog.profile("x"), &GeneratorProfile::default());
    }

    #[test]
    fn test_load_invalid_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("content.toml");
        fs::write(&path, "system_messages = 7\n").unwrap();

        let err = ContentCatalog::load(Some(path.as_path())).unwrap_err();
        assert!(matches!(err, Error::ConfigParse { .. }));
    }
}
