//! Persona catalog
//!
//! A persona is the behavioural configuration the model is steered with: a
//! system instruction plus an optional scripted opening message. The catalog
//! is declarative TOML, loaded once at startup and never mutated.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Catalog compiled into the binary
const BUILTIN_CATALOG: &str = include_str!("persona/default_catalog.toml");

/// A selectable persona
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Persona {
    pub id: String,
    #[serde(default)]
    pub label: String,
    /// Empty means "nothing selected yet": the session stays input-disabled.
    #[serde(default)]
    pub system_instruction: String,
    #[serde(default)]
    pub opening_message: Option<String>,
}

impl Persona {
    /// Whether selecting this persona opens the conversation for input
    pub fn enables_input(&self) -> bool {
        !self.system_instruction.trim().is_empty()
    }
}

/// What the UI needs to render a persona choice
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PersonaSummary {
    pub id: String,
    pub label: String,
}

/// Catalog-level presentation and switching options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogInfo {
    pub title: String,
    pub subtitle: String,
    /// False for single-condition deployments: only the default persona may
    /// be (re)selected.
    pub allow_switching: bool,
    pub default_persona: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    title: String,
    #[serde(default)]
    subtitle: String,
    #[serde(default = "default_allow_switching")]
    allow_switching: bool,
    #[serde(default)]
    default_persona: Option<String>,
    #[serde(default)]
    personas: Vec<Persona>,
}

fn default_allow_switching() -> bool {
    true
}

/// Errors raised while loading a catalog
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read persona catalog {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid persona catalog: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("persona catalog declares no personas")]
    Empty,
    #[error("persona catalog contains a persona with an empty id")]
    EmptyId,
    #[error("persona id {0:?} is declared more than once")]
    DuplicateId(String),
    #[error("default persona {0:?} is not declared in the catalog")]
    UnknownDefault(String),
    #[error("single-persona catalogs (allow_switching = false) must name a default_persona")]
    MissingDefault,
}

/// Lookup of a persona id that the catalog does not declare
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown persona: {0}")]
pub struct PersonaNotFound(pub String);

/// Registry of selectable personas, in declaration order
#[derive(Debug, Clone)]
pub struct PersonaRegistry {
    personas: Vec<Persona>,
    info: CatalogInfo,
}

impl PersonaRegistry {
    /// The catalog shipped with the binary
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_toml_str(BUILTIN_CATALOG)
    }

    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let raw = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = toml::from_str(raw)?;

        if file.personas.is_empty() {
            return Err(CatalogError::Empty);
        }

        let mut seen = HashSet::new();
        let mut personas = Vec::with_capacity(file.personas.len());
        for mut persona in file.personas {
            persona.id = persona.id.trim().to_string();
            if persona.id.is_empty() {
                return Err(CatalogError::EmptyId);
            }
            if !seen.insert(persona.id.clone()) {
                return Err(CatalogError::DuplicateId(persona.id));
            }
            if persona.label.trim().is_empty() {
                persona.label.clone_from(&persona.id);
            }
            personas.push(persona);
        }

        match &file.default_persona {
            Some(id) if !seen.contains(id) => {
                return Err(CatalogError::UnknownDefault(id.clone()));
            }
            None if !file.allow_switching => return Err(CatalogError::MissingDefault),
            _ => {}
        }

        Ok(Self {
            personas,
            info: CatalogInfo {
                title: file.title,
                subtitle: file.subtitle,
                allow_switching: file.allow_switching,
                default_persona: file.default_persona,
            },
        })
    }

    /// Persona summaries in declaration order
    pub fn list(&self) -> Vec<PersonaSummary> {
        self.personas
            .iter()
            .map(|p| PersonaSummary {
                id: p.id.clone(),
                label: p.label.clone(),
            })
            .collect()
    }

    pub fn get(&self, id: &str) -> Result<&Persona, PersonaNotFound> {
        self.personas
            .iter()
            .find(|p| p.id == id)
            .ok_or_else(|| PersonaNotFound(id.to_string()))
    }

    pub fn info(&self) -> &CatalogInfo {
        &self.info
    }

    pub fn default_persona(&self) -> Option<&Persona> {
        self.info
            .default_persona
            .as_deref()
            .and_then(|id| self.get(id).ok())
    }
}
