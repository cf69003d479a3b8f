//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.brandpulse.toml` files.

use crate::cli::{Args, OutputFormat};
use crate::poller::PollerConfig;
use crate::report::ReportOptions;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Name of the configuration file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = ".brandpulse.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Analytics API settings.
    #[serde(default)]
    pub api: ApiConfig,

    /// Polling settings.
    #[serde(default)]
    pub poller: PollerSettings,

    /// Report cache settings.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// Analytics API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the analytics API.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8000/api".to_string()
}

fn default_timeout() -> u64 {
    30
}

/// Polling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollerSettings {
    /// Seconds between polls.
    #[serde(default = "default_interval")]
    pub interval_seconds: u64,

    /// Consecutive fetch failures before a warning is shown (0 = never).
    #[serde(default = "default_failure_warning_threshold")]
    pub failure_warning_threshold: u32,
}

impl Default for PollerSettings {
    fn default() -> Self {
        Self {
            interval_seconds: default_interval(),
            failure_warning_threshold: default_failure_warning_threshold(),
        }
    }
}

fn default_interval() -> u64 {
    30
}

fn default_failure_warning_threshold() -> u32 {
    10
}

/// Report cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Keep the last completed report between runs.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Cache file location; defaults to the platform data directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: None,
        }
    }
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Output format.
    #[serde(default)]
    pub format: OutputFormat,

    /// Output file; defaults by format.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,

    /// Include competitor and content impact tables.
    #[serde(default = "default_true")]
    pub include_tables: bool,

    /// Include the recommendations section.
    #[serde(default = "default_true")]
    pub include_recommendations: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            output: None,
            include_tables: true,
            include_recommendations: true,
        }
    }
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE_NAME);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// Only values the user actually passed override the file.
    pub fn merge_with_args(&mut self, args: &Args) {
        if let Some(ref url) = args.api_url {
            self.api.base_url = url.clone();
        }
        if let Some(timeout) = args.timeout {
            self.api.timeout_seconds = timeout;
        }
        if let Some(interval) = args.interval {
            self.poller.interval_seconds = interval;
        }

        if args.no_cache {
            self.cache.enabled = false;
        }
        if let Some(ref path) = args.cache_file {
            self.cache.path = Some(path.clone());
        }

        if let Some(format) = args.format {
            self.report.format = format;
        }
        if let Some(ref output) = args.output {
            self.report.output = Some(output.clone());
        }
    }

    /// Poller tunables derived from the settings.
    pub fn poller_config(&self) -> PollerConfig {
        PollerConfig {
            interval: Duration::from_secs(self.poller.interval_seconds.max(1)),
            failure_warning_threshold: self.poller.failure_warning_threshold,
        }
    }

    /// Report section switches.
    pub fn report_options(&self) -> ReportOptions {
        ReportOptions {
            include_tables: self.report.include_tables,
            include_recommendations: self.report.include_recommendations,
        }
    }

    /// Where the report is written.
    pub fn output_path(&self) -> PathBuf {
        self.report.output.clone().unwrap_or_else(|| match self.report.format {
            OutputFormat::Markdown => PathBuf::from("brandpulse_report.md"),
            OutputFormat::Json => PathBuf::from("brandpulse_report.json"),
        })
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
