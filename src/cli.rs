//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use std::path::PathBuf;

/// BrandPulse - watch an AI-visibility brand analysis until it completes
///
/// Polls the analytics API for a product, shows the last completed report
/// while a new run is in progress, and writes the report once it is ready.
///
/// Examples:
///   brandpulse --product 42
///   brandpulse --product 42 --format json --output report.json
///   brandpulse --product 42 --once
///   brandpulse --product 42 --max-wait 900
///   brandpulse --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Product whose analysis should be watched
    #[arg(short, long, value_name = "ID", required_unless_present = "init_config")]
    pub product: Option<String>,

    /// Session token for the analytics API
    #[arg(long, env = "BRANDPULSE_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Analytics API base URL
    ///
    /// Overrides the `[api] base_url` setting in the config file.
    #[arg(long, value_name = "URL", env = "BRANDPULSE_API_URL")]
    pub api_url: Option<String>,

    /// Seconds between polls
    #[arg(long, value_name = "SECS")]
    pub interval: Option<u64>,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Output file path for the report
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format (markdown, json)
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Fetch once and render whatever is available instead of waiting
    #[arg(long)]
    pub once: bool,

    /// Give up waiting after this many seconds
    ///
    /// The last completed report is still written if one is known.
    #[arg(long, value_name = "SECS")]
    pub max_wait: Option<u64>,

    /// Do not read or write the local report cache
    #[arg(long)]
    pub no_cache: bool,

    /// Path of the local report cache
    #[arg(long, value_name = "FILE")]
    pub cache_file: Option<PathBuf>,

    /// Print the request that starts a new analysis for this product and exit
    #[arg(long)]
    pub new_analysis: bool,

    /// Path to configuration file
    ///
    /// If not specified, looks for .brandpulse.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .brandpulse.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    clap::ValueEnum,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// The product id, empty if not set (should be validated first).
    pub fn product_id(&self) -> &str {
        self.product.as_deref().map(str::trim).unwrap_or("")
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if self.product_id().is_empty() {
            return Err("Product id must not be empty".to_string());
        }

        // --new-analysis only builds a request; no API access needed
        if !self.new_analysis {
            match self.token.as_deref().map(str::trim) {
                Some(token) if !token.is_empty() => {}
                _ => {
                    return Err(
                        "A session token is required (--token or BRANDPULSE_TOKEN)".to_string()
                    )
                }
            }
        }

        if let Some(ref url) = self.api_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("API URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if self.interval == Some(0) {
            return Err("Interval must be at least 1 second".to_string());
        }

        if self.timeout == Some(0) {
            return Err("Timeout must be at least 1 second".to_string());
        }

        if self.max_wait == Some(0) {
            return Err("Max wait must be at least 1 second".to_string());
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if self.once && self.max_wait.is_some() {
            return Err("Cannot use both --once and --max-wait".to_string());
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_args() -> Args {
        Args {
            product: Some("42".to_string()),
            token: Some("token".to_string()),
            api_url: None,
            interval: None,
            timeout: None,
            output: None,
            format: None,
            once: false,
            max_wait: None,
            no_cache: false,
            cache_file: None,
            new_analysis: false,
            config: None,
            verbose: false,
            quiet: false,
            init_config: false,
        }
    }

    #[test]
    fn test_valid_args() {
        assert!(make_args().validate().is_ok());
    }

    #[test]
    fn test_validation_blank_product() {
        let mut args = make_args();
        args.product = Some("   ".to_string());
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_requires_token() {
        let mut args = make_args();
        args.token = None;
        assert!(args.validate().is_err());

        args.token = Some(String::new());
        assert!(args.validate().is_err());

        args.new_analysis = true;
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validation_invalid_url() {
        let mut args = make_args();
        args.api_url = Some("ftp://example.com".to_string());
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_zero_interval() {
        let mut args = make_args();
        args.interval = Some(0);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args();
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());

        let mut args = make_args();
        args.once = true;
        args.max_wait = Some(60);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_init_config_skips_validation() {
        let mut args = make_args();
        args.product = None;
        args.token = None;
        args.init_config = true;
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args();
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }

    #[test]
    fn test_parse_from_command_line() {
        let args = Args::try_parse_from([
            "brandpulse",
            "--product",
            "42",
            "--token",
            "t",
            "--format",
            "json",
            "--once",
        ])
        .unwrap();
        assert_eq!(args.product_id(), "42");
        assert_eq!(args.format, Some(OutputFormat::Json));
        assert!(args.once);
    }
}
