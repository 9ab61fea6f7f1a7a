//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use std::path::PathBuf;

/// GemHunter - AI triage for secondhand auction listings
///
/// Sends each listing's photos to a Gemini vision model, extracts a
/// buy/pass verdict from the appraisal, and writes a ranked digest.
///
/// Examples:
///   gemhunter --items items.json --images-dir ./images
///   gemhunter --items items.json --format html --output digest.html
///   gemhunter --items items.json --dry-run
///   gemhunter --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// JSON manifest of listings to triage
    ///
    /// Either an array of {item_id, title, price, item_url} objects or an
    /// object with an "items" array.
    #[arg(short, long, value_name = "FILE", required_unless_present = "init_config")]
    pub items: Option<PathBuf>,

    /// Folder holding one image sub-folder per item id
    #[arg(long, value_name = "DIR")]
    pub images_dir: Option<PathBuf>,

    /// Gemini API keys, in rotation order (comma-separated)
    #[arg(
        long,
        value_name = "KEYS",
        value_delimiter = ',',
        env = "GEMINI_API_KEYS",
        hide_env_values = true
    )]
    pub api_keys: Option<Vec<String>>,

    /// Models to rotate through (comma-separated)
    #[arg(long, value_name = "MODELS", value_delimiter = ',', env = "GEMHUNTER_MODELS")]
    pub models: Option<Vec<String>>,

    /// Estimated requests per key, shown in the usage report
    ///
    /// This is a reporting figure only; it is never enforced.
    #[arg(long, value_name = "COUNT")]
    pub per_key_quota: Option<u64>,

    /// Gemini API base URL
    #[arg(long, value_name = "URL", env = "GEMINI_API_URL")]
    pub api_url: Option<String>,

    /// Output file path for the digest
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output file path for the raw per-item results
    #[arg(long, value_name = "FILE")]
    pub results: Option<PathBuf>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .gemhunter.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Digest format (markdown, html, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Only triage the first COUNT items of the manifest
    #[arg(long, value_name = "COUNT")]
    pub max_items: Option<usize>,

    /// Maximum images submitted per item
    #[arg(long, value_name = "COUNT")]
    pub max_images: Option<usize>,

    /// Seconds to pause after each successful appraisal
    #[arg(long, value_name = "SECS")]
    pub delay: Option<f64>,

    /// Milliseconds to pause between image reads
    #[arg(long, value_name = "MS")]
    pub image_delay_ms: Option<u64>,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Skip the remaining items after the first rate limit
    #[arg(long)]
    pub stop_on_rate_limit: bool,

    /// Dry run: list items and image counts without calling the model
    #[arg(long)]
    pub dry_run: bool,

    /// Generate a default .gemhunter.toml configuration file
    #[arg(long)]
    pub init_config: bool,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,
}

/// Output format for the digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// HTML format, suitable for email
    Html,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if let Some(ref items) = self.items {
            if !items.is_file() {
                return Err(format!("Items manifest not found: {}", items.display()));
            }
        }

        if let Some(ref url) = self.api_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("API URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if let Some(delay) = self.delay {
            if !delay.is_finite() || delay < 0.0 {
                return Err("Delay must be a non-negative number of seconds".to_string());
            }
        }

        if self.max_images == Some(0) {
            return Err("Max images must be at least 1".to_string());
        }

        if self.max_items == Some(0) {
            return Err("Max items must be at least 1".to_string());
        }

        if self.timeout == Some(0) {
            return Err("Timeout must be at least 1 second".to_string());
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(ref dir) = self.images_dir {
            if dir.exists() && !dir.is_dir() {
                return Err(format!(
                    "Images path is not a directory: {}",
                    dir.display()
                ));
            }
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
