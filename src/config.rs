//! Application configuration
//!
//! Everything is read once at startup. A missing API key is fatal.

use crate::llm::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use crate::persona::{CatalogError, PersonaRegistry};
use crate::session::{LatencyPolicy, SessionContext, DEFAULT_GREETING, DEFAULT_TERMINATION_MARKER};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no API key configured; set API_KEY or GEMINI_API_KEY, or name a secrets file in PERSONA_CHAT_SECRETS")]
    MissingApiKey,
    #[error("failed to read secrets file {path}: {source}")]
    SecretsIo {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse secrets file {path}: {source}")]
    SecretsParse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid value for {var}: {reason}")]
    InvalidValue { var: &'static str, reason: String },
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

impl ConfigError {
    pub const CATEGORY: &'static str = "configuration";
}

#[derive(Clone)]
pub struct AppConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
    pub latency: LatencyPolicy,
    pub termination_marker: String,
    pub greeting: String,
    pub catalog_path: Option<PathBuf>,
    pub port: u16,
}

// Keeps the key out of logs
impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("latency", &self.latency)
            .field("termination_marker", &self.termination_marker)
            .field("greeting", &self.greeting)
            .field("catalog_path", &self.catalog_path)
            .field("port", &self.port)
            .finish()
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let from_secrets = match get("PERSONA_CHAT_SECRETS") {
            Some(path) => read_secret_key(Path::new(&path))?,
            None => None,
        };
        let api_key = from_secrets
            .or_else(|| get("API_KEY"))
            .or_else(|| get("GEMINI_API_KEY"))
            .ok_or(ConfigError::MissingApiKey)?;

        let timeout = match get("PERSONA_CHAT_TIMEOUT_SECS") {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(0) => {
                    return Err(ConfigError::InvalidValue {
                        var: "PERSONA_CHAT_TIMEOUT_SECS",
                        reason: "must be greater than zero".to_string(),
                    })
                }
                Ok(secs) => Duration::from_secs(secs),
                Err(e) => {
                    return Err(ConfigError::InvalidValue {
                        var: "PERSONA_CHAT_TIMEOUT_SECS",
                        reason: e.to_string(),
                    })
                }
            },
            None => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        };

        let latency = match get("PERSONA_CHAT_LATENCY_MS") {
            Some(raw) => LatencyPolicy::parse(&raw).map_err(|reason| ConfigError::InvalidValue {
                var: "PERSONA_CHAT_LATENCY_MS",
                reason,
            })?,
            None => LatencyPolicy::Disabled,
        };

        let port = match get("PERSONA_CHAT_PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|e| ConfigError::InvalidValue {
                    var: "PERSONA_CHAT_PORT",
                    reason: e.to_string(),
                })?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            api_key: api_key.trim().to_string(),
            model: get("PERSONA_CHAT_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: get("PERSONA_CHAT_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            timeout,
            latency,
            termination_marker: get("PERSONA_CHAT_TERMINATION_MARKER")
                .unwrap_or_else(|| DEFAULT_TERMINATION_MARKER.to_string()),
            greeting: get("PERSONA_CHAT_GREETING").unwrap_or_else(|| DEFAULT_GREETING.to_string()),
            catalog_path: get("PERSONA_CHAT_CATALOG").map(PathBuf::from),
            port,
        })
    }

    pub fn session_context(&self) -> SessionContext {
        SessionContext {
            termination_marker: self.termination_marker.clone(),
            default_greeting: self.greeting.clone(),
        }
    }

    /// The configured catalog file, or the built-in study catalog
    pub fn load_registry(&self) -> Result<PersonaRegistry, ConfigError> {
        let registry = match &self.catalog_path {
            Some(path) => PersonaRegistry::load(path)?,
            None => PersonaRegistry::builtin()?,
        };
        Ok(registry)
    }
}

/// `API_KEY` from a TOML secrets file. A file without the key falls through
/// to the environment.
fn read_secret_key(path: &Path) -> Result<Option<String>, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::SecretsIo {
        path: path.to_path_buf(),
        source,
    })?;
    let table: toml::Table = raw.parse().map_err(|source| ConfigError::SecretsParse {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(table
        .get("API_KEY")
        .and_then(toml::Value::as_str)
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string))
}
