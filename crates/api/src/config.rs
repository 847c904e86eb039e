use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use favsync_catalog::downloader::{DEFAULT_FOLDER_FORMAT, DEFAULT_PROGRAM};
use favsync_catalog::qobuz::DEFAULT_API_URL;
use favsync_core::Credentials;
use favsync_worker::{BatchConfig, JobSettings};

/// Log file name inside the config directory.
pub const LOG_FILE_NAME: &str = "favsync.log";

const BYTES_PER_MB: u64 = 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{var} has invalid value {value:?}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub credentials: Credentials,
    pub app_id: String,
    /// App secrets handed to the downloader program.
    pub app_secrets: Vec<String>,
    pub api_url: String,
    pub music_directory: PathBuf,
    pub config_directory: PathBuf,
    pub quality: u32,
    pub folder_format: String,
    pub downloader_command: String,
    pub max_workers_tracks: usize,
    pub max_workers_albums: usize,
    pub max_workers_artists: usize,
    pub batch_size: usize,
    pub item_timeout_secs: u64,
    pub batch_cooldown_secs: u64,
    pub check_interval_minutes: u64,
    pub enable_web_ui: bool,
    pub host: String,
    pub port: u16,
    /// HTTP request timeout for the dashboard and the catalog client.
    pub request_timeout_secs: u64,
    pub log_level: String,
    /// Rotation threshold of the log file; `0` disables file logging.
    pub log_file_max_mb: u64,
    pub log_file_backup_count: usize,
}

impl AppConfig {
    /// Load configuration from the process environment.
    ///
    /// The app id and secrets are not discovered automatically; take them
    /// from the web player or an existing qobuz-dl `config.ini`. Secrets
    /// are comma-separated.
    ///
    /// | Env Var                  | Default                              |
    /// |--------------------------|--------------------------------------|
    /// | `QOBUZ_EMAIL`            | required                             |
    /// | `QOBUZ_PASSWORD`         | required                             |
    /// | `QOBUZ_APP_ID`           | required                             |
    /// | `QOBUZ_APP_SECRETS`      | none                                 |
    /// | `QOBUZ_API_URL`          | `https://www.qobuz.com/api.json/0.2` |
    /// | `MUSIC_DIRECTORY`        | `/downloads`                         |
    /// | `CONFIG_DIRECTORY`       | `/config`                            |
    /// | `QUALITY`                | `27`                                 |
    /// | `FOLDER_FORMAT`          | `{artist}/{artist} - {album}`        |
    /// | `DOWNLOADER_COMMAND`     | `qobuz-dl`                           |
    /// | `MAX_WORKERS_TRACKS`     | `1`                                  |
    /// | `MAX_WORKERS_ALBUMS`     | `1`                                  |
    /// | `MAX_WORKERS_ARTISTS`    | `1`                                  |
    /// | `BATCH_SIZE`             | `10`                                 |
    /// | `ITEM_TIMEOUT_SECS`      | `600`                                |
    /// | `BATCH_COOLDOWN_SECS`    | `3`                                  |
    /// | `CHECK_INTERVAL_MINUTES` | `30`                                 |
    /// | `ENABLE_WEB_UI`          | `true`                               |
    /// | `WEB_UI_HOST`            | `0.0.0.0`                            |
    /// | `WEB_UI_PORT`            | `5000`                               |
    /// | `REQUEST_TIMEOUT_SECS`   | `30`                                 |
    /// | `LOG_LEVEL`              | `info`                               |
    /// | `LOG_FILE_MAX_MB`        | `10`                                 |
    /// | `LOG_FILE_BACKUP_COUNT`  | `3`                                  |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through `lookup` instead of the process
    /// environment. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(lookup);

        let email = env.required("QOBUZ_EMAIL")?;
        let password = env.required("QOBUZ_PASSWORD")?;

        let check_interval_minutes = env.positive("CHECK_INTERVAL_MINUTES", 30)?;
        env.scaled("CHECK_INTERVAL_MINUTES", check_interval_minutes, 60)?;
        let log_file_max_mb = env.parse("LOG_FILE_MAX_MB", 10)?;
        env.scaled("LOG_FILE_MAX_MB", log_file_max_mb, BYTES_PER_MB)?;

        Ok(Self {
            credentials: Credentials::new(email, password),
            app_id: env.required("QOBUZ_APP_ID")?,
            app_secrets: env.list("QOBUZ_APP_SECRETS"),
            api_url: env.string("QOBUZ_API_URL", DEFAULT_API_URL),
            music_directory: env.string("MUSIC_DIRECTORY", "/downloads").into(),
            config_directory: env.string("CONFIG_DIRECTORY", "/config").into(),
            quality: env.parse("QUALITY", 27)?,
            folder_format: env.string("FOLDER_FORMAT", DEFAULT_FOLDER_FORMAT),
            downloader_command: env.string("DOWNLOADER_COMMAND", DEFAULT_PROGRAM),
            max_workers_tracks: env.positive("MAX_WORKERS_TRACKS", 1)?,
            max_workers_albums: env.positive("MAX_WORKERS_ALBUMS", 1)?,
            max_workers_artists: env.positive("MAX_WORKERS_ARTISTS", 1)?,
            batch_size: env.positive("BATCH_SIZE", 10)?,
            item_timeout_secs: env.positive("ITEM_TIMEOUT_SECS", 600)?,
            batch_cooldown_secs: env.parse("BATCH_COOLDOWN_SECS", 3)?,
            check_interval_minutes,
            enable_web_ui: env.flag("ENABLE_WEB_UI", true)?,
            host: env.string("WEB_UI_HOST", "0.0.0.0"),
            port: env.parse("WEB_UI_PORT", 5000)?,
            request_timeout_secs: env.positive("REQUEST_TIMEOUT_SECS", 30)?,
            log_level: env.string("LOG_LEVEL", "info").to_lowercase(),
            log_file_max_mb,
            log_file_backup_count: env.parse("LOG_FILE_BACKUP_COUNT", 3)?,
        })
    }

    /// Batch settings for the three categories.
    pub fn job_settings(&self) -> JobSettings {
        let batch = |max_workers| BatchConfig {
            max_workers,
            chunk_size: self.batch_size,
            unit_timeout: Duration::from_secs(self.item_timeout_secs),
            cooldown: Duration::from_secs(self.batch_cooldown_secs),
        };
        JobSettings {
            tracks: batch(self.max_workers_tracks),
            albums: batch(self.max_workers_albums),
            artists: batch(self.max_workers_artists),
        }
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_minutes.saturating_mul(60))
    }

    /// Rotation threshold of the log file in bytes.
    pub fn log_file_max_bytes(&self) -> u64 {
        self.log_file_max_mb.saturating_mul(BYTES_PER_MB)
    }

    /// Home directory of the downloader program.
    pub fn downloader_home(&self) -> PathBuf {
        self.config_directory.join("downloader")
    }

    /// Path of the log file, or `None` when file logging is disabled.
    pub fn log_file(&self) -> Option<PathBuf> {
        (self.log_file_max_mb > 0).then(|| self.config_directory.join(LOG_FILE_NAME))
    }
}

/// Typed accessors over a lookup function.
struct Env<F>(F);

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, var: &str) -> Option<String> {
        (self.0)(var)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn required(&self, var: &'static str) -> Result<String, ConfigError> {
        self.get(var).ok_or(ConfigError::Missing(var))
    }

    fn string(&self, var: &str, default: &str) -> String {
        self.get(var).unwrap_or_else(|| default.to_string())
    }

    fn parse<T>(&self, var: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get(var) {
            None => Ok(default),
            Some(value) => value.parse().map_err(|e: T::Err| ConfigError::Invalid {
                var,
                reason: e.to_string(),
                value,
            }),
        }
    }

    fn positive<T>(&self, var: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr + PartialOrd + Default + ToString,
        T::Err: std::fmt::Display,
    {
        let value = self.parse(var, default)?;
        if value <= T::default() {
            return Err(ConfigError::Invalid {
                var,
                value: value.to_string(),
                reason: "must be at least 1".into(),
            });
        }
        Ok(value)
    }

    /// Comma-separated values; blanks are dropped.
    fn list(&self, var: &str) -> Vec<String> {
        self.get(var)
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Reject `value` when `value * factor` does not fit in a `u64`.
    fn scaled(&self, var: &'static str, value: u64, factor: u64) -> Result<u64, ConfigError> {
        value.checked_mul(factor).ok_or_else(|| ConfigError::Invalid {
            var,
            value: value.to_string(),
            reason: "too large".into(),
        })
    }

    fn flag(&self, var: &'static str, default: bool) -> Result<bool, ConfigError> {
        let Some(value) = self.get(var) else {
            return Ok(default);
        };
        match value.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::Invalid {
                var,
                value,
                reason: "expected true or false".into(),
            }),
        }
    }
}
