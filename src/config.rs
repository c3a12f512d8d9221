//! Configuration System
//!
//! Provides hierarchical configuration loading from:
//! - rela.toml (default configuration)
//! - rela.local.toml (git-ignored local overrides)
//! - Environment variables (RELA_* prefix)
//!
//! ## Example
//!
//! ```toml
//! # rela.toml
//! [data]
//! data_dir = "./data"
//!
//! [logging]
//! level = "debug"
//! ```
//!
//! Environment variable overrides:
//! ```bash
//! RELA_DATA__DATA_DIR=/custom/path
//! RELA_LOGGING__LEVEL=trace
//! ```

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration struct
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub repl: ReplConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Data-loading configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Base directory that relative `.load` paths resolve against
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

/// REPL configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplConfig {
    /// Readline history file
    #[serde(default = "default_history_file")]
    pub history_file: PathBuf,

    /// Prompt string
    #[serde(default = "default_prompt")]
    pub prompt: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (text, json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_data_dir() -> PathBuf {
    PathBuf::from(".")
}
fn default_history_file() -> PathBuf {
    PathBuf::from(".rela_history")
}
fn default_prompt() -> String {
    "rela> ".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "text".to_string()
}

impl Config {
    /// Load configuration from default locations
    ///
    /// Merges in order:
    /// 1. rela.toml (base configuration)
    /// 2. rela.local.toml (local overrides, git-ignored)
    /// 3. Environment variables (RELA_* prefix)
    pub fn load() -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Toml::file("rela.toml"))
            .merge(Toml::file("rela.local.toml"))
            .merge(Env::prefixed("RELA_").split("__"))
            .extract()
    }

    /// Load configuration from a specific file path
    pub fn from_file(path: &std::path::Path) -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("RELA_").split("__"))
            .extract()
    }
}

impl Default for DataConfig {
    fn default() -> Self {
        DataConfig {
            data_dir: default_data_dir(),
        }
    }
}

impl Default for ReplConfig {
    fn default() -> Self {
        ReplConfig {
            history_file: default_history_file(),
            prompt: default_prompt(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}
