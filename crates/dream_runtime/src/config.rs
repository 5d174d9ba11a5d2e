//! Process configuration
//!
//! # Configuration Sources (in priority order)
//!
//! 1. Environment variables (`LLM_MODEL`, `PORT`, ...)
//! 2. Config file: `$DREAMSCAPE_CONFIG`, else `dreamscape.toml`
//! 3. Built-in defaults
//!
//! # Example Config File
//!
//! ```toml
//! log_level = "info"
//!
//! [llm]
//! model = "gpt-4o"
//! max_tokens = 4096
//! temperature = 0.7
//!
//! [world]
//! max_objects = 200
//! generation_timeout_secs = 30.0
//!
//! [server]
//! host = "0.0.0.0"
//! port = 8000
//! action_pacing_ms = 100
//!
//! [pricing]
//! input_per_mtok = 2.50
//! output_per_mtok = 10.00
//!
//! [mesh]
//! command = ["python3", "-m", "mesh_worker"]
//! ```

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use dream_agent::{LlmConfig, Pricing, MAX_CONTINUATIONS};
use dream_services::SessionSettings;
use serde::Deserialize;
use thiserror::Error;

/// File read when `DREAMSCAPE_CONFIG` is unset
pub const DEFAULT_CONFIG_FILE: &str = "dreamscape.toml";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: String, value: String },
}

/// World limits
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Advisory object cap
    pub max_objects: usize,
    /// Mesh generation timeout in seconds; fractions allowed
    pub generation_timeout_secs: f64,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            max_objects: 200,
            generation_timeout_secs: 30.0,
        }
    }
}

/// Listener settings
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Delay between streamed actions
    pub action_pacing_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            action_pacing_ms: 100,
        }
    }
}

/// Mesh generator command; generation is disabled when unset
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct MeshConfig {
    pub command: Option<Vec<String>>,
}

/// Complete process configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DreamConfig {
    pub llm: LlmConfig,
    pub world: WorldConfig,
    pub server: ServerConfig,
    pub pricing: Pricing,
    pub mesh: MeshConfig,
    pub log_level: String,
}

impl Default for DreamConfig {
    fn default() -> Self {
        Self {
            llm: LlmConfig::default(),
            world: WorldConfig::default(),
            server: ServerConfig::default(),
            pricing: Pricing::default(),
            mesh: MeshConfig::default(),
            log_level: "info".to_string(),
        }
    }
}

impl DreamConfig {
    /// Load configuration from all sources
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match std::env::var("DREAMSCAPE_CONFIG") {
            Ok(path) if !path.is_empty() => Self::from_file(Path::new(&path))?,
            _ if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            _ => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse TOML; missing keys keep their defaults
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Override fields from environment-style variables
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("LLM_MODEL") {
            self.llm.model = v;
        }
        if let Some(v) = get("LLM_MAX_TOKENS") {
            self.llm.max_tokens = parse("LLM_MAX_TOKENS", &v)?;
        }
        if let Some(v) = get("LLM_TEMPERATURE") {
            self.llm.temperature = parse("LLM_TEMPERATURE", &v)?;
        }
        if let Some(v) = get("LLM_TOP_P") {
            self.llm.top_p = Some(parse("LLM_TOP_P", &v)?);
        }
        if let Some(v) = get("OPENAI_API_KEY") {
            self.llm.api_key = Some(v);
        }
        if let Some(v) = get("OPENAI_API_BASE") {
            self.llm.api_base = v;
        }
        if let Some(v) = get("MAX_OBJECTS") {
            self.world.max_objects = parse("MAX_OBJECTS", &v)?;
        }
        if let Some(v) = get("GENERATION_TIMEOUT") {
            self.world.generation_timeout_secs = parse_seconds("GENERATION_TIMEOUT", &v)?;
        }
        if let Some(v) = get("MESH_GENERATOR_CMD") {
            self.mesh.command = Some(v.split_whitespace().map(str::to_string).collect());
        }
        if let Some(v) = get("HOST") {
            self.server.host = v;
        }
        if let Some(v) = get("PORT") {
            self.server.port = parse("PORT", &v)?;
        }
        if let Some(v) = get("ACTION_PACING_MS") {
            self.server.action_pacing_ms = parse("ACTION_PACING_MS", &v)?;
        }
        if let Some(v) = get("COST_INPUT_PER_MTOK") {
            self.pricing.input_per_mtok = parse("COST_INPUT_PER_MTOK", &v)?;
        }
        if let Some(v) = get("COST_OUTPUT_PER_MTOK") {
            self.pricing.output_per_mtok = parse("COST_OUTPUT_PER_MTOK", &v)?;
        }
        if let Some(v) = get("LOG_LEVEL") {
            self.log_level = v;
        }
        Ok(())
    }

    /// Settings handed to every new session
    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            max_objects: Some(self.world.max_objects),
            action_pacing: Duration::from_millis(self.server.action_pacing_ms),
            pricing: self.pricing,
            max_continuations: MAX_CONTINUATIONS,
        }
    }

    /// Mesh generation timeout; invalid file values fall back to the default
    pub fn generation_timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.world.generation_timeout_secs).unwrap_or_else(|_| {
            log::warn!(
                "Invalid generation_timeout_secs {}, using {}s",
                self.world.generation_timeout_secs,
                WorldConfig::default().generation_timeout_secs
            );
            Duration::from_secs_f64(WorldConfig::default().generation_timeout_secs)
        })
    }
}

fn parse<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

/// Non-negative, finite seconds
fn parse_seconds(key: &str, value: &str) -> Result<f64, ConfigError> {
    let secs: f64 = parse(key, value)?;
    if secs.is_finite() && secs >= 0.0 {
        Ok(secs)
    } else {
        Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        })
    }
}
