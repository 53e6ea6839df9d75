//! Persona registry: bundled persona definitions and rotation resolution.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{Error, Result};

use super::types::Persona;

const BUNDLED_PERSONAS: &str = include_str!("../../config/personas.toml");

/// On-disk shape of a personas file.
#[derive(Debug, Deserialize)]
struct PersonasFile {
    #[serde(default)]
    rotation: Vec<String>,

    #[serde(default, rename = "persona")]
    personas: Vec<Persona>,
}

/// Known personas plus the default speaking order.
#[derive(Debug, Clone)]
pub struct PersonaRegistry {
    personas: Vec<Persona>,
    default_rotation: Vec<String>,
}

impl PersonaRegistry {
    /// Registry built from the personas file compiled into the binary.
    pub fn bundled() -> Result<Self> {
        Self::from_toml(BUNDLED_PERSONAS, "<bundled personas>")
    }

    /// Load from an override file, or fall back to the bundled definitions.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                let content = fs::read_to_string(path).map_err(|e| Error::IoRead {
                    path: path.to_path_buf(),
                    source: e,
                })?;
                let registry = Self::from_toml(&content, &path.display().to_string())?;
                info!(path = %path.display(), personas = registry.personas.len(), "Personas loaded");
                Ok(registry)
            }
            None => Self::bundled(),
        }
    }

    fn from_toml(content: &str, origin: &str) -> Result<Self> {
        let file: PersonasFile = toml::from_str(content).map_err(|e| Error::ConfigParse {
            message: format!("{}: {}", origin, e),
            source: Some(e),
        })?;

        if file.personas.is_empty() {
            return Err(Error::config_validation(format!(
                "{} defines no personas",
                origin
            )));
        }

        for (i, persona) in file.personas.iter().enumerate() {
            if file.personas[..i].iter().any(|p| p.name == persona.name) {
                return Err(Error::config_validation(format!(
                    "{} defines persona '{}' twice",
                    origin, persona.name
                )));
            }
        }

        debug!(origin, personas = file.personas.len(), "Parsed persona definitions");

        Ok(Self {
            personas: file.personas,
            default_rotation: file.rotation,
        })
    }

    pub fn get(&self, name: &str) -> Option<&Persona> {
        self.personas.iter().find(|p| p.name == name)
    }

    pub fn personas(&self) -> &[Persona] {
        &self.personas
    }

    pub fn default_rotation(&self) -> &[String] {
        &self.default_rotation
    }

    /// Resolve a list of names (or the default order) into the speaker rotation.
    pub fn rotation(&self, names: Option<&[String]>) -> Result<Vec<Persona>> {
        let names = match names {
            Some(names) if !names.is_empty() => names,
            _ => &self.default_rotation,
        };

        if names.is_empty() {
            return Err(Error::config_field_invalid(
                "conversation.rotation",
                "Rotation must name at least one persona",
            ));
        }

        names
            .iter()
            .map(|name| {
                self.get(name).cloned().ok_or_else(|| Error::UnknownPersona {
                    name: name.clone(),
                })
            })
            .collect()
    }
}
