use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use anyhow::{Result, anyhow};

use crate::analysis::DEFAULT_ENDPOINT;

pub const DEFAULT_EXAMPLE_QUERIES: [&str; 3] = [
    "Analyze Wakad",
    "Compare Aundh and Baner",
    "Show price trends for Kharadi",
];

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Config {
    pub endpoint: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub send_trimmed_query: Option<bool>,
    pub example_queries: Option<Vec<String>>,
}

/// Values given on the command line (or through their env vars); these win
/// over the config file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub endpoint: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub send_trimmed_query: bool,
}

/// Fully resolved runtime settings
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub endpoint: String,
    pub request_timeout: Option<Duration>,
    pub send_trimmed_query: bool,
    pub example_queries: Vec<String>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(config_path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(config_path, config_content)?;
        Ok(())
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("estate-chat").join("config.json"))
    }

    /// Merge with overrides and built-in defaults.
    pub fn resolve(&self, overrides: &Overrides) -> Settings {
        let endpoint = overrides
            .endpoint
            .clone()
            .or_else(|| self.endpoint.clone())
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());

        let request_timeout = overrides
            .request_timeout_secs
            .or(self.request_timeout_secs)
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);

        let example_queries = self
            .example_queries
            .clone()
            .filter(|q| !q.is_empty())
            .unwrap_or_else(|| DEFAULT_EXAMPLE_QUERIES.iter().map(|q| q.to_string()).collect());

        Settings {
            endpoint,
            request_timeout,
            send_trimmed_query: overrides.send_trimmed_query
                || self.send_trimmed_query.unwrap_or(false),
            example_queries,
        }
    }
}
