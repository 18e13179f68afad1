//! Unified configuration for linkback jobs.
//!
//! Configuration is loaded with precedence: CLI args > Env vars > Config file > Defaults
//!
//! # Example config file (linkback.toml)
//! ```toml
//! [split]
//! split_count = 6
//! length_threshold = 1000
//!
//! [join]
//! shard_count = 8
//! ```

mod defaults;

pub use defaults::*;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// Main configuration for linkback jobs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkbackConfig {
    /// Posting-list splitter configuration
    pub split: SplitConfig,
    /// Link-back join configuration
    pub join: JoinConfig,
}

impl LinkbackConfig {
    /// Load configuration with precedence: CLI args > Env > File > Defaults
    ///
    /// # Arguments
    /// * `config_path` - Optional path to TOML config file
    /// * `overrides` - CLI overrides to apply on top
    ///
    /// Validation fails fast: an invalid split or join section is a startup
    /// error, never a per-record one.
    pub fn load(
        config_path: Option<&str>,
        overrides: ConfigOverrides,
    ) -> Result<Self, ConfigError> {
        let mut figment = Figment::new().merge(Serialized::defaults(LinkbackConfig::default()));

        // Layer 1: Config file (if provided)
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Layer 2: Environment variables with LINKBACK_ prefix
        figment = figment.merge(Env::prefixed("LINKBACK_").split("_"));

        // Layer 3: CLI overrides
        figment = figment.merge(Serialized::defaults(overrides));

        let config: LinkbackConfig = figment.extract().map_err(ConfigError::from)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from environment and optional config file only (no CLI overrides)
    pub fn from_env(config_path: Option<&str>) -> Result<Self, ConfigError> {
        Self::load(config_path, ConfigOverrides::default())
    }

    /// Validate every section
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.split.validate()?;
        self.join.validate()
    }
}

/// Splitter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    /// Number of segments an oversized list is divided into (>= 2)
    pub split_count: usize,
    /// Posting-list length above which splitting activates (>= 1)
    pub length_threshold: usize,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            split_count: DEFAULT_SPLIT_COUNT,
            length_threshold: DEFAULT_LENGTH_THRESHOLD,
        }
    }
}

impl SplitConfig {
    /// Create a validated split configuration
    pub fn new(split_count: usize, length_threshold: usize) -> Result<Self, ConfigError> {
        let config = Self {
            split_count,
            length_threshold,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject degenerate settings. `split_count < 2` would leave cross-join
    /// pairs uncovered; `length_threshold < 1` would split everything.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.split_count < 2 {
            return Err(ConfigError {
                message: format!(
                    "split_count must be at least 2, got {}",
                    self.split_count
                ),
            });
        }
        if self.length_threshold < 1 {
            return Err(ConfigError {
                message: "length_threshold must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Join configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JoinConfig {
    /// Number of reduce shards
    pub shard_count: usize,
}

impl Default for JoinConfig {
    fn default() -> Self {
        Self {
            shard_count: default_shard_count(),
        }
    }
}

impl JoinConfig {
    /// Reject a zero shard count
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.shard_count == 0 {
            return Err(ConfigError {
                message: "shard_count must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// CLI overrides, applied on top of file and environment layers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigOverrides {
    pub split: SplitOverrides,
    pub join: JoinOverrides,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub split_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length_threshold: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct JoinOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shard_count: Option<usize>,
}

/// Configuration error.
#[derive(Debug)]
pub struct ConfigError {
    pub message: String,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "configuration error: {}", self.message)
    }
}

impl std::error::Error for ConfigError {}

impl From<figment::Error> for ConfigError {
    fn from(e: figment::Error) -> Self {
        Self {
            message: e.to_string(),
        }
    }
}
