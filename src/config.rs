//! Configuration for the ledger service
//!
//! Values come from, in increasing priority: built-in defaults, an optional
//! TOML file and `LEDGER_*` environment variables.

use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;
use thiserror::Error;

use crate::blockchain::pow::{self, DEFAULT_DIFFICULTY, MAX_DIFFICULTY};

/// Environment variable naming the TOML config file
pub const CONFIG_PATH_ENV: &str = "LEDGER_CONFIG";

/// Errors that can occur while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value {value:?} for {key}")]
    InvalidValue { key: String, value: String },

    #[error("Difficulty {0} is outside 1..={max}", max = MAX_DIFFICULTY)]
    InvalidDifficulty(u32),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Leading zeros required in every block hash
    pub difficulty: u32,

    /// Address the HTTP server binds to
    pub host: String,

    pub port: u16,

    /// Artificial latency of the vote name source
    pub vote_lookup_delay_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            difficulty: DEFAULT_DIFFICULTY,
            host: "127.0.0.1".to_string(),
            port: 8080,
            vote_lookup_delay_ms: 3000,
        }
    }
}

impl Config {
    /// Loads defaults, then `path` if given, then the process environment
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_toml(&fs::read_to_string(path)?)?,
            None => Config::default(),
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Applies `LEDGER_*` overrides using `lookup` to read variables
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("LEDGER_DIFFICULTY") {
            self.difficulty = parse("LEDGER_DIFFICULTY", value)?;
        }
        if let Some(value) = lookup("LEDGER_HOST") {
            self.host = value;
        }
        if let Some(value) = lookup("LEDGER_PORT") {
            self.port = parse("LEDGER_PORT", value)?;
        }
        if let Some(value) = lookup("LEDGER_VOTE_LOOKUP_DELAY_MS") {
            self.vote_lookup_delay_ms = parse("LEDGER_VOTE_LOOKUP_DELAY_MS", value)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !pow::is_valid_difficulty(self.difficulty) {
            return Err(ConfigError::InvalidDifficulty(self.difficulty));
        }
        Ok(())
    }
}

fn parse<T: FromStr>(key: &str, value: String) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value,
    })
}
