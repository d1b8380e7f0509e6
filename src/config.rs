//! Configuration for hnpipe.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (HNPIPE_HOME, HNPIPE_DATABASE, HNPIPE_API_URL)
//! 2. Config file (.hnpipe/config.yaml)
//! 3. Defaults (./data, ./analytics.hackernews, the public Hacker News API)
//!
//! Config file discovery:
//! - Searches the current directory and parents for .hnpipe/config.yaml
//! - Paths in the config file are relative to the project root (the parent of .hnpipe/)
//!
//! Settings are resolved once at startup and passed explicitly to the
//! orchestrator; nothing reads configuration from ambient state afterwards.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

pub const ENV_HOME: &str = "HNPIPE_HOME";
pub const ENV_DATABASE: &str = "HNPIPE_DATABASE";
pub const ENV_API_URL: &str = "HNPIPE_API_URL";

pub const DEFAULT_HOME: &str = "data";
pub const DEFAULT_DATABASE: &str = "analytics.hackernews";
pub const DEFAULT_API_URL: &str = "https://hacker-news.firebaseio.com";
pub const DEFAULT_CRON: &str = "0 * * * *";

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub api: Option<ApiConfig>,
    #[serde(default)]
    pub schedule: Option<ScheduleConfig>,
    #[serde(default)]
    pub resources: Option<ResourcesConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsConfig {
    /// Asset storage and run log directory (relative to project root)
    pub home: Option<String>,
    /// Analytical database file (relative to project root)
    pub database: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    pub base_url: Option<String>,
    pub timeout_seconds: Option<u64>,
    pub fetch_concurrency: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleConfig {
    pub cron: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResourcesConfig {
    pub datagen: Option<DatagenConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatagenConfig {
    pub num_days: Option<u32>,
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone)]
pub struct Settings {
    /// Root of asset storage and run logs
    pub home: PathBuf,
    /// Analytical database file
    pub database: PathBuf,
    /// Hacker News API settings
    pub api: ApiSettings,
    /// Cron expression for the hourly schedule
    pub schedule_cron: String,
    /// Synthetic data generator resource
    pub datagen: DataGeneratorSettings,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiSettings {
    pub base_url: String,
    pub timeout_seconds: u64,
    /// Maximum in-flight item requests (1 = strictly sequential)
    pub fetch_concurrency: usize,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            timeout_seconds: 30,
            fetch_concurrency: 1,
        }
    }
}

/// Parameters of the synthetic data generator resource. Not read by any asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataGeneratorSettings {
    pub num_days: u32,
}

impl Default for DataGeneratorSettings {
    fn default() -> Self {
        Self { num_days: 365 }
    }
}

impl Settings {
    /// Default settings rooted at `base`
    pub fn rooted_at(base: &Path) -> Self {
        Self {
            home: base.join(DEFAULT_HOME),
            database: base.join(DEFAULT_DATABASE),
            api: ApiSettings::default(),
            schedule_cron: DEFAULT_CRON.to_string(),
            datagen: DataGeneratorSettings::default(),
            config_file: None,
        }
    }

    /// Directory holding one subdirectory per run
    pub fn runs_dir(&self) -> PathBuf {
        self.home.join("runs")
    }

    /// Directory holding the latest value of each asset
    pub fn storage_dir(&self) -> PathBuf {
        self.home.join("storage")
    }
}

/// Find config file by searching `start` and its parents
fn find_config_file(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();

    loop {
        let config_path = current.join(".hnpipe").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to `base`
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}

/// Load settings for the current working directory and process environment
pub fn load_settings() -> Result<Settings> {
    let cwd = std::env::current_dir().context("Failed to determine current directory")?;
    load_settings_from(&cwd, |key| std::env::var(key).ok())
}

/// Load settings starting the config file search at `start`, reading
/// overrides through `env`
pub fn load_settings_from<F>(start: &Path, env: F) -> Result<Settings>
where
    F: Fn(&str) -> Option<String>,
{
    let config_file = find_config_file(start);

    let mut settings = match config_file {
        Some(ref config_path) => {
            let config = load_config_file(config_path)?;

            // Base directory is the parent of .hnpipe/
            let base_dir = config_path
                .parent()
                .and_then(|p| p.parent())
                .unwrap_or(start);

            let mut settings = Settings::rooted_at(base_dir);

            if let Some(ref home) = config.paths.home {
                settings.home = resolve_path(base_dir, home);
            }
            if let Some(ref database) = config.paths.database {
                settings.database = resolve_path(base_dir, database);
            }

            if let Some(api) = config.api {
                if let Some(base_url) = api.base_url {
                    settings.api.base_url = base_url;
                }
                if let Some(timeout) = api.timeout_seconds {
                    settings.api.timeout_seconds = timeout;
                }
                if let Some(concurrency) = api.fetch_concurrency {
                    settings.api.fetch_concurrency = concurrency.max(1);
                }
            }

            if let Some(cron) = config.schedule.and_then(|s| s.cron) {
                settings.schedule_cron = cron;
            }

            if let Some(num_days) = config
                .resources
                .and_then(|r| r.datagen)
                .and_then(|d| d.num_days)
            {
                settings.datagen.num_days = num_days;
            }

            settings.config_file = Some(config_path.clone());
            settings
        }
        None => Settings::rooted_at(start),
    };

    if let Some(home) = env(ENV_HOME) {
        settings.home = resolve_path(start, &home);
    }
    if let Some(database) = env(ENV_DATABASE) {
        settings.database = resolve_path(start, &database);
    }
    if let Some(url) = env(ENV_API_URL) {
        settings.api.base_url = url;
    }

    Ok(settings)
}
