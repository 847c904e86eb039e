//! Downloads by shelling out to an external downloader program.
//!
//! Each call runs `<program> dl <url> -d <dir> -q <quality> -ff <format>`
//! and waits for it to exit. The child is killed when the future is
//! dropped, so a unit abandoned on timeout does not leave a stray process.
//!
//! The program runs non-interactively, so it cannot go through its own
//! first-run login prompt. With an account configured, [`CommandDownloader::prepare`]
//! writes the program's `config.ini` into a dedicated home directory and
//! every child is started with `HOME` pointing there.

use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Instant;

use async_trait::async_trait;
use favsync_core::{CatalogError, Credentials, Downloader, FavoriteItem};
use tokio::process::Command;

use crate::qobuz::password_digest;

/// Default downloader program.
pub const DEFAULT_PROGRAM: &str = "qobuz-dl";

/// Default output folder layout.
pub const DEFAULT_FOLDER_FORMAT: &str = "{artist}/{artist} - {album}";

const PLAY_URL: &str = "https://play.qobuz.com";

const TRACK_FORMAT: &str = "{tracknumber}. {tracktitle}";

/// Account the downloader program logs in with.
#[derive(Debug, Clone)]
pub struct DownloaderAccount {
    pub credentials: Credentials,
    pub app_id: String,
    /// App secrets the program signs stream URL requests with.
    pub secrets: Vec<String>,
}

/// Path of the program's config file under `home`.
pub fn config_path(home: &Path) -> PathBuf {
    home.join(".config").join("qobuz-dl").join("config.ini")
}

#[derive(Debug, Clone)]
pub struct CommandDownloader {
    program: String,
    download_dir: PathBuf,
    quality: u32,
    folder_format: String,
    home: Option<PathBuf>,
    account: Option<DownloaderAccount>,
}

impl CommandDownloader {
    pub fn new(download_dir: impl Into<PathBuf>, quality: u32) -> Self {
        Self {
            program: DEFAULT_PROGRAM.to_string(),
            download_dir: download_dir.into(),
            quality,
            folder_format: DEFAULT_FOLDER_FORMAT.to_string(),
            home: None,
            account: None,
        }
    }

    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn with_folder_format(mut self, folder_format: impl Into<String>) -> Self {
        self.folder_format = folder_format.into();
        self
    }

    /// Log the program in as `account`, with `home` as its `HOME`.
    pub fn with_account(mut self, home: impl Into<PathBuf>, account: DownloaderAccount) -> Self {
        self.home = Some(home.into());
        self.account = Some(account);
        self
    }

    /// Write the program's config file for the configured account.
    ///
    /// Does nothing without an account. When the account has no app
    /// secrets an existing file is kept, since it may carry its own.
    pub async fn prepare(&self) -> io::Result<()> {
        let (Some(home), Some(account)) = (&self.home, &self.account) else {
            return Ok(());
        };
        let path = config_path(home);

        if account.secrets.is_empty() {
            if tokio::fs::try_exists(&path).await? {
                tracing::info!(path = %path.display(), "Keeping existing downloader config");
                return Ok(());
            }
            tracing::warn!("No app secrets configured, the downloader cannot resolve stream URLs");
        }

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = path.with_extension("ini.tmp");
        tokio::fs::write(&tmp, self.render_config(account)).await?;
        tokio::fs::rename(&tmp, &path).await?;

        tracing::info!(path = %path.display(), email = %account.credentials.email, "Wrote downloader config");
        Ok(())
    }

    /// Contents of the program's `config.ini` for `account`.
    pub fn render_config(&self, account: &DownloaderAccount) -> String {
        let entries = [
            ("email", account.credentials.email.clone()),
            ("password", password_digest(&account.credentials.password)),
            ("default_folder", self.download_dir.display().to_string()),
            ("default_quality", self.quality.to_string()),
            ("default_limit", "20".to_string()),
            ("no_m3u", "false".to_string()),
            ("albums_only", "false".to_string()),
            ("no_fallback", "false".to_string()),
            ("og_cover", "false".to_string()),
            ("embed_art", "false".to_string()),
            ("no_cover", "false".to_string()),
            ("no_database", "false".to_string()),
            ("app_id", account.app_id.clone()),
            ("secrets", account.secrets.join(",")),
            ("folder_format", self.folder_format.clone()),
            ("track_format", TRACK_FORMAT.to_string()),
            ("smart_discography", "false".to_string()),
        ];

        let mut ini = String::from("[DEFAULT]\n");
        for (key, value) in entries {
            // `%` starts an interpolation in the reader's ini dialect.
            ini.push_str(&format!("{key} = {}\n", value.replace('%', "%%")));
        }
        ini
    }

    /// Public web URL of an item.
    pub fn item_url(item: &FavoriteItem) -> String {
        format!("{PLAY_URL}/{}/{}", item.category.singular(), item.id)
    }

    /// Arguments passed to the program for `url`.
    pub fn build_args(&self, url: &str) -> Vec<String> {
        vec![
            "dl".to_string(),
            url.to_string(),
            "-d".to_string(),
            self.download_dir.display().to_string(),
            "-q".to_string(),
            self.quality.to_string(),
            "-ff".to_string(),
            self.folder_format.clone(),
        ]
    }

    /// The child process for `url`, not yet spawned.
    pub fn command(&self, url: &str) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(self.build_args(url))
            .stdin(Stdio::null())
            .kill_on_drop(true);
        if let Some(home) = &self.home {
            command.env("HOME", home);
        }
        command
    }
}

/// The program tells tracks from collections by the URL, which already
/// encodes the category, so `is_collection` is only logged.
#[async_trait]
impl Downloader for CommandDownloader {
    async fn download(&self, item: &FavoriteItem, is_collection: bool) -> Result<(), CatalogError> {
        let url = Self::item_url(item);
        let start = Instant::now();

        tracing::info!(
            item_id = %item.id,
            category = %item.category,
            is_collection,
            %url,
            "Starting download",
        );

        let output = self
            .command(&url)
            .output()
            .await
            .map_err(|e| {
                CatalogError::Download(format!("failed to execute {}: {e}", self.program))
            })?;

        let elapsed_ms = start.elapsed().as_millis() as u64;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::error!(
                item_id = %item.id,
                elapsed_ms,
                stderr = %stderr.trim(),
                "Download failed",
            );
            return Err(CatalogError::Download(format!(
                "{} exited with {}: {}",
                self.program,
                output.status.code().unwrap_or(-1),
                stderr.trim(),
            )));
        }

        tracing::info!(item_id = %item.id, elapsed_ms, "Download finished");
        Ok(())
    }
}
