//! Configuration loading from TOML.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! Every section except `[data]` is optional and falls back to defaults.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;

use crate::dashboard::routes::DEFAULT_SESSION_CAPACITY;
use crate::types::{HandicapLine, Side};

/// Default config file path.
pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub data: DataConfig,
    #[serde(default)]
    pub backtest: BacktestConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
    #[serde(default)]
    pub report: ReportConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DataConfig {
    pub csv_path: String,
    /// Field delimiter; sniffed from the header when omitted.
    #[serde(default)]
    pub delimiter: Option<char>,
}

/// Default selection used when the CLI does not name one.
#[derive(Debug, Deserialize, Clone)]
pub struct BacktestConfig {
    #[serde(default)]
    pub competition: Option<String>,
    #[serde(default = "default_side")]
    pub side: Side,
    #[serde(default)]
    pub line: Option<HandicapLine>,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            competition: None,
            side: default_side(),
            line: None,
        }
    }
}

fn default_side() -> Side {
    Side::Home
}

#[derive(Debug, Deserialize, Clone)]
pub struct DashboardConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    /// Selection memories kept before the least recently used is evicted.
    #[serde(default = "default_session_capacity")]
    pub session_capacity: usize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            session_capacity: default_session_capacity(),
        }
    }
}

fn default_port() -> u16 {
    8080
}

fn default_session_capacity() -> usize {
    DEFAULT_SESSION_CAPACITY
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ReportConfig {
    /// Where `run` exports the JSON report, if anywhere.
    #[serde(default)]
    pub output_path: Option<String>,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        Self::parse(&contents).with_context(|| format!("Failed to parse config file: {path}"))
    }

    /// Parse configuration from TOML text.
    pub fn parse(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        Ok(config)
    }
}
