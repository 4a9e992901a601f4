//! Optional TOML configuration
//!
//! ```toml
//! [collector]
//! output = "output.md"
//!
//! [replay]
//! interval_ms = 1000
//! chunk_size = 4096
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use lz4scope_replay::DEFAULT_CHUNK_SIZE;

#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub collector: CollectorConfig,
    pub replay: ReplayConfig,
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct CollectorConfig {
    /// Report file written by `collect`
    pub output: PathBuf,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            output: PathBuf::from("output.md"),
        }
    }
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ReplayConfig {
    /// Delay between two sends
    pub interval_ms: u64,

    /// Bytes read from disk per chunk
    pub chunk_size: usize,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            interval_ms: 1000,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl Config {
    /// Load from `path`, or return defaults when no path is given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::parse(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}
