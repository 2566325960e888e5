//! Configuration types for feeling-images

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{fmt, path::PathBuf, time::Duration};

/// Environment variable holding the API key
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Read the API key from [`API_KEY_ENV`]
///
/// # Errors
/// Returns [`Error::Config`] if the variable is unset, not unicode, or blank
pub fn api_key_from_env() -> Result<String> {
    api_key_from(std::env::var(API_KEY_ENV).ok())
}

fn api_key_from(value: Option<String>) -> Result<String> {
    match value {
        Some(key) if !key.trim().is_empty() => Ok(key.trim().to_string()),
        _ => Err(Error::config(
            API_KEY_ENV,
            format!("{API_KEY_ENV} environment variable not set"),
        )),
    }
}

/// Image size tokens accepted by the generation API
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
pub enum ImageSize {
    /// Square, 1024x1024 (default)
    #[default]
    #[serde(rename = "1024x1024")]
    #[value(name = "1024x1024")]
    Square,
    /// Portrait, 1024x1792
    #[serde(rename = "1024x1792")]
    #[value(name = "1024x1792")]
    Portrait,
    /// Landscape, 1792x1024
    #[serde(rename = "1792x1024")]
    #[value(name = "1792x1024")]
    Landscape,
}

impl ImageSize {
    /// Token sent to the API
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageSize::Square => "1024x1024",
            ImageSize::Portrait => "1024x1792",
            ImageSize::Landscape => "1792x1024",
        }
    }
}

impl fmt::Display for ImageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Image generation settings (endpoint, model, prompt shaping)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Base URL of the OpenAI-compatible API (default: "https://api.openai.com")
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Image model identifier (default: "dall-e-3")
    #[serde(default = "default_model")]
    pub model: String,

    /// Requested image size
    #[serde(default)]
    pub size: ImageSize,

    /// Extra words appended to the prompt to influence style (default: "cinematic")
    #[serde(default = "default_style")]
    pub style: String,

    /// How many ancestor names to include in the prompt besides the leaf (-1 = all)
    #[serde(default = "default_root_node_levels")]
    pub root_node_levels: i32,

    /// Timeout for a single generation request (default: 120 seconds)
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub request_timeout: Duration,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            model: default_model(),
            size: ImageSize::default(),
            style: default_style(),
            root_node_levels: default_root_node_levels(),
            request_timeout: default_request_timeout(),
        }
    }
}

/// Rate-limit retry behavior for generation requests
///
/// The wait before retry `n` (1-based) is `n * backoff`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retries after a rate-limit response (default: 2)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Linear backoff unit (default: 30 seconds)
    #[serde(default = "default_rate_limit_backoff", with = "duration_serde")]
    pub backoff: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            backoff: default_rate_limit_backoff(),
        }
    }
}

/// Image download behavior
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Total download attempts, including the first one (default: 3)
    #[serde(default = "default_download_attempts")]
    pub attempts: u32,

    /// Linear backoff unit between attempts (default: 1.5 seconds)
    #[serde(default = "default_download_backoff", with = "duration_serde")]
    pub backoff: Duration,

    /// Timeout for a single download request (default: 30 seconds)
    #[serde(default = "default_download_timeout", with = "duration_serde")]
    pub timeout: Duration,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            attempts: default_download_attempts(),
            backoff: default_download_backoff(),
            timeout: default_download_timeout(),
        }
    }
}

/// Main configuration for a generation run
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Directory that receives the image tree (default: "./images")
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Generation request settings
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Rate-limit retry settings
    #[serde(default)]
    pub retry: RetryConfig,

    /// Download settings
    #[serde(default)]
    pub download: DownloadConfig,

    /// Parallel workers (0 = sequential)
    #[serde(default)]
    pub max_workers: usize,

    /// Re-generate even if the image file already exists
    #[serde(default)]
    pub force: bool,

    /// Log prompts without calling the API
    #[serde(default)]
    pub dry_run: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            generation: GenerationConfig::default(),
            retry: RetryConfig::default(),
            download: DownloadConfig::default(),
            max_workers: 0,
            force: false,
            dry_run: false,
        }
    }
}

impl Config {
    /// Number of leaves processed at once. Zero workers means one-at-a-time.
    pub fn concurrency(&self) -> usize {
        self.max_workers.max(1)
    }

    /// Check settings that would otherwise fail on every leaf
    pub fn validate(&self) -> Result<()> {
        if self.generation.model.trim().is_empty() {
            return Err(Error::config("model", "model identifier must not be empty"));
        }
        url::Url::parse(&self.generation.api_base).map_err(|e| {
            Error::config(
                "api_base",
                format!("invalid API base URL '{}': {e}", self.generation.api_base),
            )
        })?;
        if self.download.attempts == 0 {
            return Err(Error::config(
                "download.attempts",
                "at least one download attempt is required",
            ));
        }
        Ok(())
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("images")
}

fn default_api_base() -> String {
    "https://api.openai.com".to_string()
}

fn default_model() -> String {
    "dall-e-3".to_string()
}

fn default_style() -> String {
    "cinematic".to_string()
}

fn default_root_node_levels() -> i32 {
    1
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(120)
}

fn default_max_retries() -> u32 {
    2
}

fn default_rate_limit_backoff() -> Duration {
    Duration::from_secs(30)
}

fn default_download_attempts() -> u32 {
    3
}

fn default_download_backoff() -> Duration {
    Duration::from_millis(1500)
}

fn default_download_timeout() -> Duration {
    Duration::from_secs(30)
}

// Durations are written as (possibly fractional) seconds
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer, de::Error};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(duration.as_secs_f64())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(D::Error::custom)
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_key_must_be_present_and_non_blank() {
        assert_eq!(api_key_from(Some(" sk-test ".to_string())).unwrap(), "sk-test");
        for missing in [None, Some(String::new()), Some("   ".to_string())] {
            assert!(matches!(
                api_key_from(missing),
                Err(Error::Config { key: Some(ref k), .. }) if k == API_KEY_ENV
            ));
        }
    }

    #[test]
    #[serial_test::serial]
    fn api_key_is_read_from_environment() {
        let previous = std::env::var(API_KEY_ENV).ok();

        // SAFETY: serialized with every other test touching the environment
        unsafe { std::env::set_var(API_KEY_ENV, "sk-from-env") };
        assert_eq!(api_key_from_env().unwrap(), "sk-from-env");

        unsafe { std::env::remove_var(API_KEY_ENV) };
        assert!(api_key_from_env().is_err());

        if let Some(value) = previous {
            unsafe { std::env::set_var(API_KEY_ENV, value) };
        }
    }

    #[test]
    fn defaults_match_cli_defaults() {
        let config = Config::default();
        assert_eq!(config.output_dir, PathBuf::from("images"));
        assert_eq!(config.generation.model, "dall-e-3");
        assert_eq!(config.generation.size, ImageSize::Square);
        assert_eq!(config.generation.style, "cinematic");
        assert_eq!(config.generation.root_node_levels, 1);
        assert_eq!(config.retry.max_retries, 2);
        assert_eq!(config.retry.backoff, Duration::from_secs(30));
        assert_eq!(config.download.attempts, 3);
        assert_eq!(config.download.backoff, Duration::from_millis(1500));
        assert_eq!(config.max_workers, 0);
        assert!(!config.force);
        assert!(!config.dry_run);
    }

    #[test]
    fn empty_json_object_deserializes_to_defaults() {
        let config: Config = serde_json::from_str("{}").expect("deserialize failed");
        assert_eq!(config.generation.model, "dall-e-3");
        assert_eq!(config.download.timeout, Duration::from_secs(30));
        assert_eq!(config.generation.request_timeout, Duration::from_secs(120));
    }

    #[test]
    fn duration_serde_accepts_fractional_seconds() {
        let config: Config =
            serde_json::from_str(r#"{"retry": {"backoff": 0.25}, "download": {"backoff": 2}}"#)
                .expect("deserialize failed");
        assert_eq!(config.retry.backoff, Duration::from_millis(250));
        assert_eq!(config.download.backoff, Duration::from_secs(2));
    }

    #[test]
    fn duration_serde_rejects_negative_seconds() {
        let result: std::result::Result<Config, _> =
            serde_json::from_str(r#"{"retry": {"backoff": -1.0}}"#);
        assert!(result.is_err(), "negative backoff must not deserialize");
    }

    #[test]
    fn image_size_serializes_as_api_token() {
        let json = serde_json::to_string(&ImageSize::Portrait).unwrap();
        assert_eq!(json, "\"1024x1792\"");
        let parsed: ImageSize = serde_json::from_str("\"1792x1024\"").unwrap();
        assert_eq!(parsed, ImageSize::Landscape);
    }

    #[test]
    fn image_size_rejects_unknown_token() {
        assert!(serde_json::from_str::<ImageSize>("\"512x512\"").is_err());
    }

    #[test]
    fn zero_workers_means_single_lane() {
        let mut config = Config::default();
        assert_eq!(config.concurrency(), 1);
        config.max_workers = 4;
        assert_eq!(config.concurrency(), 4);
    }

    #[test]
    fn validate_rejects_bad_settings() {
        assert!(Config::default().validate().is_ok());

        let mut config = Config::default();
        config.generation.model = "  ".to_string();
        assert!(matches!(
            config.validate(),
            Err(Error::Config { key: Some(ref k), .. }) if k == "model"
        ));

        let mut config = Config::default();
        config.generation.api_base = "not a url".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.download.attempts = 0;
        assert!(config.validate().is_err());
    }
}
