//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.gemhunter.toml` files.

use crate::appraisal::{GeminiConfig, DEFAULT_MAX_IMAGES};
use crate::pipeline::TriageSettings;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = ".gemhunter.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Credential rotation settings.
    #[serde(default)]
    pub rotation: RotationConfig,

    /// Appraisal request settings.
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Image folder settings.
    #[serde(default)]
    pub images: ImagesConfig,

    /// Digest settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Default digest output path.
    #[serde(default = "default_output")]
    pub output: String,

    /// Where the raw per-item outcomes are written.
    #[serde(default = "default_results")]
    pub results: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            results: default_results(),
        }
    }
}

fn default_output() -> String {
    "gemhunter_digest.md".to_string()
}

fn default_results() -> String {
    "gemhunter_results.json".to_string()
}

/// API keys and models to rotate through.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RotationConfig {
    /// API keys, in rotation order. Usually supplied via `GEMINI_API_KEYS`.
    #[serde(default)]
    pub api_keys: Vec<String>,

    /// Models, in rotation order.
    #[serde(default = "default_models")]
    pub models: Vec<String>,

    /// Requests per key shown in the usage report. Not enforced.
    #[serde(default = "default_per_key_quota")]
    pub per_key_quota_estimate: u64,
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            api_keys: Vec::new(),
            models: default_models(),
            per_key_quota_estimate: default_per_key_quota(),
        }
    }
}

fn default_models() -> Vec<String> {
    vec!["gemini-2.0-flash-lite", "gemini-2.0-flash"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_per_key_quota() -> u64 {
    40
}

/// Appraisal request settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Gemini API base URL.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Images beyond this count are dropped.
    #[serde(default = "default_max_images")]
    pub max_images_per_item: usize,

    /// Pause after each successful appraisal.
    #[serde(default = "default_inter_request_delay")]
    pub inter_request_delay_seconds: f64,

    /// Temperature for generation.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens in response.
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Skip the remaining items after the first rate limit.
    #[serde(default)]
    pub stop_on_rate_limit: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            max_images_per_item: default_max_images(),
            inter_request_delay_seconds: default_inter_request_delay(),
            temperature: default_temperature(),
            max_output_tokens: default_max_output_tokens(),
            timeout_seconds: default_timeout(),
            stop_on_rate_limit: false,
        }
    }
}

fn default_api_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_max_images() -> usize {
    DEFAULT_MAX_IMAGES
}

fn default_inter_request_delay() -> f64 {
    2.0
}

fn default_temperature() -> f32 {
    0.3
}

fn default_max_output_tokens() -> u32 {
    4000
}

fn default_timeout() -> u64 {
    300
}

/// Where item images live and how they are read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImagesConfig {
    /// Root folder holding one sub-folder per item id.
    #[serde(default = "default_images_root")]
    pub root: String,

    /// Image file extensions to include.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Maximum image size in bytes.
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,

    /// Pause between individual image reads.
    #[serde(default = "default_fetch_delay_ms")]
    pub fetch_delay_ms: u64,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            root: default_images_root(),
            extensions: default_extensions(),
            max_file_size: default_max_file_size(),
            fetch_delay_ms: default_fetch_delay_ms(),
        }
    }
}

fn default_images_root() -> String {
    "gemhunter_images".to_string()
}

fn default_extensions() -> Vec<String> {
    vec!["jpg", "jpeg", "png", "webp"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_max_file_size() -> u64 {
    20 * 1024 * 1024
}

fn default_fetch_delay_ms() -> u64 {
    100
}

/// Digest rendering settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Characters of each analysis shown as key points.
    #[serde(default = "default_excerpt_chars")]
    pub excerpt_chars: usize,

    /// Include the analysis excerpt for each entry.
    #[serde(default = "default_true")]
    pub include_analysis: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            excerpt_chars: default_excerpt_chars(),
            include_analysis: true,
        }
    }
}

fn default_excerpt_chars() -> usize {
    500
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
    /// CLI arguments take precedence over config file settings, but only
    /// when they were actually given.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref keys) = args.api_keys {
            self.rotation.api_keys = keys.clone();
        }
        if let Some(ref models) = args.models {
            self.rotation.models = models.clone();
        }
        if let Some(quota) = args.per_key_quota {
            self.rotation.per_key_quota_estimate = quota;
        }

        // Blank entries come from trailing commas in GEMINI_API_KEYS
        self.rotation.api_keys = clean_list(&self.rotation.api_keys);
        self.rotation.models = clean_list(&self.rotation.models);

        if let Some(ref url) = args.api_url {
            self.dispatch.api_url = url.clone();
        }
        if let Some(max) = args.max_images {
            self.dispatch.max_images_per_item = max;
        }
        if let Some(delay) = args.delay {
            self.dispatch.inter_request_delay_seconds = delay;
        }
        if let Some(timeout) = args.timeout {
            self.dispatch.timeout_seconds = timeout;
        }
        if args.stop_on_rate_limit {
            self.dispatch.stop_on_rate_limit = true;
        }

        if let Some(ref dir) = args.images_dir {
            self.images.root = dir.display().to_string();
        }
        if let Some(ms) = args.image_delay_ms {
            self.images.fetch_delay_ms = ms;
        }

        if let Some(ref output) = args.output {
            self.general.output = output.display().to_string();
        }
        if let Some(ref results) = args.results {
            self.general.results = results.display().to_string();
        }
    }

    /// Settings bundle for the triage core.
    pub fn triage_settings(&self) -> TriageSettings {
        TriageSettings {
            api_keys: self.rotation.api_keys.clone(),
            models: self.rotation.models.clone(),
            per_key_quota_estimate: self.rotation.per_key_quota_estimate,
            max_images_per_item: self.dispatch.max_images_per_item,
            inter_request_delay: seconds(self.dispatch.inter_request_delay_seconds),
            stop_on_rate_limit: self.dispatch.stop_on_rate_limit,
        }
    }

    /// Settings for the Gemini client.
    pub fn gemini_config(&self) -> GeminiConfig {
        GeminiConfig {
            api_url: self.dispatch.api_url.clone(),
            temperature: self.dispatch.temperature,
            max_output_tokens: self.dispatch.max_output_tokens,
            timeout_seconds: self.dispatch.timeout_seconds,
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

/// Trim entries and drop empty ones.
fn clean_list(values: &[String]) -> Vec<String> {
    values
        .iter()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect()
}

/// Negative or non-finite delays become zero.
fn seconds(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(Duration::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.rotation.models, vec!["gemini-2.0-flash-lite", "gemini-2.0-flash"]);
        assert_eq!(config.rotation.per_key_quota_estimate, 40);
        assert_eq!(config.dispatch.max_images_per_item, 900);
        assert_eq!(config.dispatch.inter_request_delay_seconds, 2.0);
        assert!(config.rotation.api_keys.is_empty());
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
output = "digest.html"

[rotation]
api_keys = ["k1", "k2"]
models = ["gemini-2.0-flash"]
per_key_quota_estimate = 50

[dispatch]
inter_request_delay_seconds = 0.5
stop_on_rate_limit = true

[images]
root = "/tmp/lots"
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.general.output, "digest.html");
        assert_eq!(config.general.results, "gemhunter_results.json");
        assert_eq!(config.rotation.api_keys, vec!["k1", "k2"]);
        assert_eq!(config.rotation.per_key_quota_estimate, 50);
        assert!(config.dispatch.stop_on_rate_limit);
        assert_eq!(config.images.root, "/tmp/lots");
        assert_eq!(config.images.fetch_delay_ms, 100);

        let settings = config.triage_settings();
        assert_eq!(settings.inter_request_delay, Duration::from_millis(500));
        assert_eq!(settings.models, vec!["gemini-2.0-flash"]);
    }

    #[test]
    fn test_merge_with_args() {
        let args = crate::cli::Args::parse_from([
            "gemhunter",
            "--items",
            "items.json",
            "--api-keys",
            "a, b,,",
            "--delay",
            "0",
            "--stop-on-rate-limit",
        ]);

        let mut config = Config::default();
        config.rotation.models = vec!["from-file".to_string()];
        config.merge_with_args(&args);

        assert_eq!(config.rotation.api_keys, vec!["a", "b"]);
        assert_eq!(config.rotation.models, vec!["from-file"]);
        assert_eq!(config.dispatch.inter_request_delay_seconds, 0.0);
        assert!(config.dispatch.stop_on_rate_limit);
    }

    #[test]
    fn test_invalid_delay_becomes_zero() {
        assert_eq!(seconds(-1.0), Duration::ZERO);
        assert_eq!(seconds(f64::NAN), Duration::ZERO);
        assert_eq!(seconds(1.5), Duration::from_millis(1500));
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(!toml_str.is_empty());
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[rotation]"));
        assert!(toml_str.contains("[dispatch]"));
        assert!(toml_str.contains("[images]"));
    }

    #[test]
    fn test_load_from_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[rotation]\nper_key_quota_estimate = 7\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.rotation.per_key_quota_estimate, 7);
        assert_eq!(config.dispatch.max_output_tokens, 4000);
    }
}
