//! Layered configuration.
//!
//! Sources are merged in order, later ones winning:
//!
//! 1. built-in defaults
//! 2. `libris.toml`, `libris.yaml` and `libris.json` in the user's
//!    configuration directory
//! 3. a file given explicitly (format picked by extension, TOML otherwise)
//! 4. `LIBRIS_` environment variables, with `__` separating nested keys
//!    (`LIBRIS_RETRY__MAX_ATTEMPTS=5`)

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

const FILE_STEM: &str = "libris";
const ENV_PREFIX: &str = "LIBRIS_";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory scanned for `*.epub` files.
    pub import_dir: PathBuf,
    /// Where added books are moved to when `organize` is set.
    pub library_dir: PathBuf,
    /// Where unusable and redundant files are moved to.
    pub quarantine_dir: PathBuf,
    /// SQLite database file.
    pub database: PathBuf,
    /// Number of parser workers.
    pub workers: usize,
    /// Files claimed per enumeration pass; `0` claims everything found.
    pub batch_size: usize,
    pub index: IndexConfig,
    pub retry: RetryConfig,
    pub stats_interval_secs: u64,
    /// Pause between runs in watch mode.
    pub refresh_interval_secs: u64,
    /// Delete duplicates instead of quarantining them.
    pub allow_deletes: bool,
    /// Move added books into `library_dir`.
    pub organize: bool,
    /// Language codes to keep. Empty keeps every language.
    pub accepted_languages: Vec<String>,
    /// Largest accepted file in bytes; `0` for no limit.
    pub max_size: u64,
    /// Default `tracing` filter when `RUST_LOG` is unset.
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            import_dir: PathBuf::from("./import"),
            library_dir: PathBuf::from("./books"),
            quarantine_dir: PathBuf::from("./failed"),
            database: PathBuf::from("./db/libris.db"),
            workers: 6,
            batch_size: 1000,
            index: IndexConfig::default(),
            retry: RetryConfig::default(),
            stats_interval_secs: 60,
            refresh_interval_secs: 60,
            allow_deletes: false,
            organize: false,
            accepted_languages: Vec::new(),
            max_size: 0,
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Flush the search index once this many books are queued.
    pub batch_size: usize,
    /// Flush whatever is queued at least this often.
    pub flush_interval_secs: u64,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self { batch_size: 50, flush_interval_secs: 5 }
    }
}

impl IndexConfig {
    pub fn flush_interval(&self) -> Duration {
        Duration::from_secs(self.flush_interval_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { max_attempts: 3, base_delay_ms: 1000, max_delay_ms: 32_000 }
    }
}

impl RetryConfig {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

impl Config {
    /// Load and validate the configuration from every source.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        Self::from_figment(Self::figment(explicit)?)
    }

    /// All configuration sources, merged but not yet extracted.
    pub fn figment(explicit: Option<&Path>) -> Result<Figment> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(dirs) = ProjectDirs::from("", "", FILE_STEM) {
            let dir = dirs.config_dir();
            debug!(dir = %dir.display(), "reading configuration directory");
            figment = figment
                .merge(Toml::file(dir.join(format!("{FILE_STEM}.toml"))))
                .merge(Yaml::file(dir.join(format!("{FILE_STEM}.yaml"))))
                .merge(Json::file(dir.join(format!("{FILE_STEM}.json"))));
        }
        if let Some(path) = explicit {
            if !path.is_file() {
                exn::bail!(ErrorKind::NotFound(path.to_path_buf()));
            }
            figment = match path.extension().and_then(|ext| ext.to_str()) {
                Some("yaml" | "yml") => figment.merge(Yaml::file(path)),
                Some("json") => figment.merge(Json::file(path)),
                _ => figment.merge(Toml::file(path)),
            };
        }
        Ok(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: Config = figment.extract().or_raise(|| ErrorKind::Load)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            exn::bail!(ErrorKind::Invalid("workers must be at least 1"));
        }
        if self.index.batch_size == 0 {
            exn::bail!(ErrorKind::Invalid("index.batch_size must be at least 1"));
        }
        if self.index.flush_interval_secs == 0 {
            exn::bail!(ErrorKind::Invalid("index.flush_interval_secs must be at least 1"));
        }
        if self.retry.max_attempts == 0 {
            exn::bail!(ErrorKind::Invalid("retry.max_attempts must be at least 1"));
        }
        if self.retry.base_delay_ms > self.retry.max_delay_ms {
            exn::bail!(ErrorKind::Invalid("retry.base_delay_ms exceeds retry.max_delay_ms"));
        }
        if self.stats_interval_secs == 0 {
            exn::bail!(ErrorKind::Invalid("stats_interval_secs must be at least 1"));
        }
        Ok(())
    }

    pub fn stats_interval(&self) -> Duration {
        Duration::from_secs(self.stats_interval_secs)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }
}
