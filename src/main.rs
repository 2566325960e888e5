//! CLI entry point.
//!
//! Generates a portrait image for every leaf feeling in a nested JSON tree:
//!
//! ```text
//! OPENAI_API_KEY=sk-... feeling-images Feelings.json --outdir images --max-workers 4
//! ```

use anyhow::Context;
use clap::{Parser, ValueEnum};
use feeling_images::config::{
    Config, DownloadConfig, GenerationConfig, ImageSize, RetryConfig, api_key_from_env,
};
use feeling_images::taxonomy;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Log verbosity accepted by `--log-level`
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum LogLevel {
    Debug,
    Info,
    #[value(alias = "warn")]
    Warning,
    Error,
}

impl LogLevel {
    fn directive(self) -> String {
        let level = match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warn",
            LogLevel::Error => "error",
        };
        format!("warn,feeling_images={level}")
    }
}

/// Generate a vertical portrait image for every leaf feeling in a nested JSON tree.
///
/// Images are written to <OUTDIR>/<name1>/.../<leaf>.png. Existing images are
/// skipped unless --force is given. The API key is read from OPENAI_API_KEY
/// (a .env file in the working directory is honoured).
#[derive(Debug, Parser)]
#[command(name = "feeling-images", version, about, long_about)]
struct Cli {
    /// Path to Feelings.json
    json_file: PathBuf,

    /// Directory to save images
    #[arg(long, default_value = "images")]
    outdir: PathBuf,

    /// Image size token accepted by the API
    #[arg(long, value_enum, default_value_t = ImageSize::Square)]
    size: ImageSize,

    /// Image model
    #[arg(long, default_value = "dall-e-3")]
    model: String,

    /// Extra words appended to the prompt to influence style
    #[arg(long, default_value = "cinematic")]
    style: String,

    /// How many parent category names to include in the prompt (-1 = all)
    #[arg(long, default_value_t = 1, allow_negative_numbers = true)]
    root_node_levels: i32,

    /// Parallel workers (0 = sequential)
    #[arg(long, default_value_t = 0)]
    max_workers: usize,

    /// Retries on rate-limit errors
    #[arg(long, default_value_t = 2)]
    retries: u32,

    /// Seconds to back off between rate-limit retries (linear)
    #[arg(long, default_value = "30", value_parser = parse_seconds)]
    backoff: Duration,

    /// Download attempts per image
    #[arg(long, default_value_t = 3, value_parser = clap::value_parser!(u32).range(1..))]
    download_attempts: u32,

    /// Seconds to back off between download attempts (linear)
    #[arg(long, default_value = "1.5", value_parser = parse_seconds)]
    download_backoff: Duration,

    /// Base URL of the OpenAI-compatible API
    #[arg(long, env = "OPENAI_BASE_URL", default_value = "https://api.openai.com")]
    api_base: String,

    /// Re-download even if the image file already exists
    #[arg(long)]
    force: bool,

    /// Print prompts without calling the API
    #[arg(long)]
    dry_run: bool,

    /// Log level (RUST_LOG takes precedence when set)
    #[arg(long, value_enum, default_value = "info", ignore_case = true)]
    log_level: LogLevel,
}

impl Cli {
    /// Load `.env` (the given file, or one found from the working directory) and
    /// then parse `args`, so env-backed options see values from the file
    fn load<I, T>(env_file: Option<&Path>, args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        match env_file {
            Some(path) => dotenvy::from_path(path).ok(),
            None => dotenvy::dotenv().ok().map(|_| ()),
        };
        Self::try_parse_from(args)
    }

    fn into_config(self) -> Config {
        Config {
            output_dir: expand_home(self.outdir),
            generation: GenerationConfig {
                api_base: self.api_base,
                model: self.model,
                size: self.size,
                style: self.style,
                root_node_levels: self.root_node_levels,
                ..Default::default()
            },
            retry: RetryConfig {
                max_retries: self.retries,
                backoff: self.backoff,
            },
            download: DownloadConfig {
                attempts: self.download_attempts,
                backoff: self.download_backoff,
                ..Default::default()
            },
            max_workers: self.max_workers,
            force: self.force,
            dry_run: self.dry_run,
        }
    }
}

fn parse_seconds(value: &str) -> Result<Duration, String> {
    let secs: f64 = value
        .parse()
        .map_err(|_| format!("'{value}' is not a number of seconds"))?;
    Duration::try_from_secs_f64(secs).map_err(|e| format!("invalid duration '{value}': {e}"))
}

fn expand_home(path: PathBuf) -> PathBuf {
    if let Ok(rest) = path.strip_prefix("~")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    path
}

fn init_logging(level: LogLevel) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.directive()));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::load(None, std::env::args_os()).unwrap_or_else(|e| e.exit());
    init_logging(cli.log_level);

    let json_file = cli.json_file.clone();
    let config = cli.into_config();

    let api_key = api_key_from_env()?;

    tokio::fs::create_dir_all(&config.output_dir)
        .await
        .with_context(|| format!("failed to create {}", config.output_dir.display()))?;

    let root = taxonomy::load(&json_file)
        .await
        .with_context(|| format!("failed to read JSON from {}", json_file.display()))?;

    feeling_images::run(config, &api_key, &root).await?;
    Ok(())
}
