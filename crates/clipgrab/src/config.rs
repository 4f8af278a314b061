//! Configuration management for clipgrab.
//!
//! This module provides configuration loading and validation using figment,
//! supporting a JSON (or TOML) config file, environment variables, and defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::{
    providers::{Env, Format, Json, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Default configuration file name, looked up in the working directory.
const CONFIG_FILE_NAME: &str = "config.json";

/// Default data directory name.
const DATA_DIR_NAME: &str = "clipgrab";

/// Default history database file name.
const HISTORY_FILE_NAME: &str = "history.db";

/// Subfolder of the user's downloads directory that receives videos.
const DOWNLOAD_SUBDIR: &str = "YouTube";

/// Subfolder of the download directory that receives log files.
const LOG_SUBDIR: &str = "logs";

/// Fallback poll interval when the configured one is unusable.
const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(1);

/// Which external program performs the downloads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DownloaderChoice {
    /// Use `yt-dlp` if installed, otherwise `youtube-dl`.
    #[default]
    #[serde(rename = "auto")]
    Auto,
    /// Always use `yt-dlp`.
    #[serde(rename = "yt-dlp")]
    YtDlp,
    /// Always use `youtube-dl`.
    #[serde(rename = "youtube-dl")]
    YoutubeDl,
}

impl std::fmt::Display for DownloaderChoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::YtDlp => write!(f, "yt-dlp"),
            Self::YoutubeDl => write!(f, "youtube-dl"),
        }
    }
}

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `CLIPGRAB_`)
/// 2. JSON config file, `config.json` in the working directory by default
/// 3. Default values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Folder that receives downloaded videos.
    /// Defaults to `<Downloads>/YouTube`.
    pub download_path: PathBuf,
    /// Format selector handed to the downloader (`-f`).
    pub video_format: String,
    /// Show desktop notifications for queue events.
    pub enable_notifications: bool,
    /// Seconds between clipboard checks.
    pub check_interval: f64,
    /// Output filename template, relative to `download_path`.
    pub filename_template: String,
    /// Container used when separate video and audio streams are merged.
    pub merge_output_format: String,
    /// Downloader program to run.
    pub downloader: DownloaderChoice,
    /// Retries for a failed download request.
    pub retries: u32,
    /// Retries for a failed fragment of a segmented stream.
    pub fragment_retries: u32,
    /// Re-encode finished downloads into this container. `None` keeps the
    /// downloaded container as-is.
    pub recode_video: Option<String>,
    /// Skip URLs that were downloaded successfully in earlier sessions.
    pub remember_downloads: bool,
    /// Path to the download history database.
    /// Defaults to `~/.local/share/clipgrab/history.db`
    pub history_path: Option<PathBuf>,
    /// Also write logs to a daily file under `<download_path>/logs`.
    pub log_to_file: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            download_path: default_download_path(),
            video_format: "bestvideo[ext=mp4]+bestaudio[ext=m4a]/best[ext=mp4]/best".to_string(),
            enable_notifications: true,
            check_interval: 1.0,
            filename_template: "%(title)s-%(id)s.%(ext)s".to_string(),
            merge_output_format: "mp4".to_string(),
            downloader: DownloaderChoice::Auto,
            retries: 10,
            fragment_retries: 10,
            recode_video: Some("mp4".to_string()),
            remember_downloads: true,
            history_path: None, // Will be resolved to default at runtime
            log_to_file: true,
        }
    }
}

/// Default download folder: the `YouTube` subfolder of the user's downloads.
fn default_download_path() -> PathBuf {
    dirs::download_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join("Downloads")))
        .unwrap_or_else(|| PathBuf::from("Downloads"))
        .join(DOWNLOAD_SUBDIR)
}

/// Replace a leading `~` component with the user's home directory.
fn expand_home(path: PathBuf) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path;
    };
    match dirs::home_dir() {
        Some(home) => home.join(rest),
        None => path,
    }
}

impl Config {
    /// Load configuration with an optional custom config path.
    ///
    /// A missing file is not an error; defaults (plus environment overrides)
    /// are used instead. Files ending in `.toml` are read as TOML, anything
    /// else as JSON. A leading `~` in `download_path` or `history_path` is
    /// expanded to the home directory.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let is_toml = config_file
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));

        let figment = Figment::new().merge(Serialized::defaults(Config::default()));
        let figment = if is_toml {
            figment.merge(Toml::file(&config_file))
        } else {
            figment.merge(Json::file(&config_file))
        };
        let figment = figment.merge(Env::prefixed("CLIPGRAB_"));

        let mut config: Config = figment.extract()?;
        config.download_path = expand_home(config.download_path);
        config.history_path = config.history_path.map(expand_home);
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        PathBuf::from(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if !self.check_interval.is_finite() || self.check_interval <= 0.0 {
            return Err(Error::ConfigValidation {
                message: format!(
                    "check_interval must be a positive number of seconds, got {}",
                    self.check_interval
                ),
            });
        }

        if Duration::try_from_secs_f64(self.check_interval).is_err() {
            return Err(Error::ConfigValidation {
                message: format!("check_interval is too large: {}", self.check_interval),
            });
        }

        for (name, value) in [
            ("video_format", &self.video_format),
            ("filename_template", &self.filename_template),
            ("merge_output_format", &self.merge_output_format),
        ] {
            if value.trim().is_empty() {
                return Err(Error::ConfigValidation {
                    message: format!("{name} must not be empty"),
                });
            }
        }

        if self.download_path.as_os_str().is_empty() {
            return Err(Error::ConfigValidation {
                message: "download_path must not be empty".to_string(),
            });
        }

        Ok(())
    }

    /// Write this configuration as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json + "\n")?;
        debug!("Wrote configuration to {}", path.display());
        Ok(())
    }

    /// Create a default configuration file at `path` if none exists yet.
    ///
    /// Returns `true` if a file was created.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn ensure_file(path: &Path) -> Result<bool> {
        if path.exists() {
            return Ok(false);
        }
        Config::default().write_to(path)?;
        info!("Created default config file: {}", path.display());
        Ok(true)
    }

    /// Create the download directory if it doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn ensure_download_dir(&self) -> Result<()> {
        std::fs::create_dir_all(&self.download_path).map_err(|source| Error::DirectoryCreate {
            path: self.download_path.clone(),
            source,
        })
    }

    /// Get the history database path, resolving defaults if not set.
    #[must_use]
    pub fn history_path(&self) -> PathBuf {
        self.history_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(HISTORY_FILE_NAME))
    }

    /// Get the directory that receives log files.
    #[must_use]
    pub fn log_dir(&self) -> PathBuf {
        self.download_path.join(LOG_SUBDIR)
    }

    /// Get the full output template handed to the downloader.
    #[must_use]
    pub fn output_template(&self) -> PathBuf {
        self.download_path.join(&self.filename_template)
    }

    /// Get the clipboard check interval as a Duration.
    #[must_use]
    pub fn check_interval(&self) -> Duration {
        Duration::try_from_secs_f64(self.check_interval)
            .ok()
            .filter(|d| !d.is_zero())
            .unwrap_or(DEFAULT_CHECK_INTERVAL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert!(config.enable_notifications);
        assert!(config.remember_downloads);
        assert!(config.log_to_file);
        assert_eq!(config.downloader, DownloaderChoice::Auto);
        assert_eq!(config.merge_output_format, "mp4");
        assert_eq!(config.recode_video.as_deref(), Some("mp4"));
        assert_eq!(config.retries, 10);
        assert_eq!(config.fragment_retries, 10);
        assert_eq!(config.filename_template, "%(title)s-%(id)s.%(ext)s");
        assert!(config.video_format.starts_with("bestvideo[ext=mp4]"));
    }

    #[test]
    fn test_default_download_path() {
        let config = Config::default();
        assert!(config.download_path.ends_with("YouTube"));
    }

    #[test]
    fn test_validate_valid_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_zero_check_interval() {
        let mut config = Config::default();
        config.check_interval = 0.0;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("check_interval"));
    }

    #[test]
    fn test_validate_negative_and_nan_check_interval() {
        let mut config = Config::default();
        config.check_interval = -1.0;
        assert!(config.validate().is_err());

        config.check_interval = f64::NAN;
        assert!(config.validate().is_err());

        config.check_interval = f64::INFINITY;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_empty_strings() {
        let mut config = Config::default();
        config.video_format = "  ".to_string();
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("video_format"));

        let mut config = Config::default();
        config.filename_template = String::new();
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("filename_template"));

        let mut config = Config::default();
        config.download_path = PathBuf::new();
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("download_path"));
    }

    #[test]
    fn test_check_interval() {
        let mut config = Config::default();
        assert_eq!(config.check_interval(), Duration::from_secs(1));

        config.check_interval = 0.25;
        assert_eq!(config.check_interval(), Duration::from_millis(250));

        config.check_interval = -3.0;
        assert_eq!(config.check_interval(), DEFAULT_CHECK_INTERVAL);
    }

    #[test]
    fn test_history_path_default() {
        let config = Config::default();
        let path = config.history_path();

        assert!(path.to_string_lossy().contains("history.db"));
        assert!(path.to_string_lossy().contains("clipgrab"));
    }

    #[test]
    fn test_history_path_custom() {
        let mut config = Config::default();
        config.history_path = Some(PathBuf::from("/custom/path/history.sqlite"));

        assert_eq!(
            config.history_path(),
            PathBuf::from("/custom/path/history.sqlite")
        );
    }

    #[test]
    fn test_log_dir_and_output_template() {
        let mut config = Config::default();
        config.download_path = PathBuf::from("/videos");

        assert_eq!(config.log_dir(), PathBuf::from("/videos/logs"));
        assert_eq!(
            config.output_template(),
            PathBuf::from("/videos/%(title)s-%(id)s.%(ext)s")
        );
    }

    #[test]
    fn test_default_config_path() {
        assert_eq!(Config::default_config_path(), PathBuf::from("config.json"));
    }

    #[test]
    fn test_load_nonexistent_config() {
        // Loading from a nonexistent path should work (uses defaults)
        let result = Config::load_from(Some(PathBuf::from("/nonexistent/config.json")));
        assert!(result.is_ok());
    }

    #[test]
    fn test_load_partial_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{
                "download_path": "/tmp/yt",
                "enable_notifications": false,
                "check_interval": 2.5,
                "downloader": "youtube-dl"
            }"#,
        )
        .unwrap();

        let config = Config::load_from(Some(path)).unwrap();
        assert_eq!(config.download_path, PathBuf::from("/tmp/yt"));
        assert!(!config.enable_notifications);
        assert_eq!(config.check_interval(), Duration::from_millis(2500));
        assert_eq!(config.downloader, DownloaderChoice::YoutubeDl);
        // Untouched keys keep their defaults
        assert_eq!(config.merge_output_format, "mp4");
    }

    #[test]
    fn test_load_toml_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clipgrab.toml");
        std::fs::write(
            &path,
            "video_format = \"best\"\nretries = 3\nrecode_video = \"mkv\"\n",
        )
        .unwrap();

        let config = Config::load_from(Some(path)).unwrap();
        assert_eq!(config.video_format, "best");
        assert_eq!(config.retries, 3);
        assert_eq!(config.recode_video.as_deref(), Some("mkv"));
    }

    #[test]
    fn test_load_invalid_json_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert!(matches!(
            Config::load_from(Some(path)),
            Err(Error::ConfigLoad(_))
        ));
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        // Inside a jail so a concurrent CLIPGRAB_CHECK_INTERVAL cannot mask the bad value
        figment::Jail::expect_with(|jail| {
            jail.create_file("config.json", r#"{ "check_interval": 0 }"#)?;

            assert!(matches!(
                Config::load_from(Some(PathBuf::from("config.json"))),
                Err(Error::ConfigValidation { .. })
            ));
            Ok(())
        });
    }

    #[test]
    fn test_env_overrides_config_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "config.json",
                r#"{ "check_interval": 1.0, "video_format": "best" }"#,
            )?;
            jail.set_env("CLIPGRAB_CHECK_INTERVAL", "2.5");
            jail.set_env("CLIPGRAB_ENABLE_NOTIFICATIONS", "false");

            let config = Config::load_from(Some(PathBuf::from("config.json")))
                .map_err(|e| e.to_string())?;
            assert!((config.check_interval - 2.5).abs() < f64::EPSILON);
            assert!(!config.enable_notifications);
            // Keys without an override still come from the file
            assert_eq!(config.video_format, "best");
            Ok(())
        });
    }

    #[test]
    fn test_expand_home() {
        let Some(home) = dirs::home_dir() else {
            return;
        };
        assert_eq!(expand_home(PathBuf::from("~")), home);
        assert_eq!(
            expand_home(PathBuf::from("~/Downloads/YouTube")),
            home.join("Downloads").join("YouTube")
        );
        assert_eq!(
            expand_home(PathBuf::from("/srv/~/videos")),
            PathBuf::from("/srv/~/videos")
        );
        assert_eq!(expand_home(PathBuf::from("~other")), PathBuf::from("~other"));
    }

    #[test]
    fn test_load_expands_home_in_paths() {
        let Some(home) = dirs::home_dir() else {
            return;
        };
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{ "download_path": "~/Downloads/YouTube", "history_path": "~/clipgrab.db" }"#,
        )
        .unwrap();

        let config = Config::load_from(Some(path)).unwrap();
        assert!(!config.download_path.starts_with("~"));
        assert_eq!(config.download_path, home.join("Downloads").join("YouTube"));
        assert_eq!(config.log_dir(), home.join("Downloads").join("YouTube").join("logs"));
        assert_eq!(config.history_path(), home.join("clipgrab.db"));
    }

    #[test]
    fn test_ensure_file_creates_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        assert!(Config::ensure_file(&path).unwrap());
        assert!(path.exists());
        assert!(!Config::ensure_file(&path).unwrap());

        let written: Config =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written, Config::default());
    }

    #[test]
    fn test_ensure_download_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.download_path = dir.path().join("Downloads").join("YouTube");

        config.ensure_download_dir().unwrap();
        assert!(config.download_path.is_dir());
    }

    #[test]
    fn test_downloader_choice_serde() {
        assert_eq!(
            serde_json::to_string(&DownloaderChoice::YtDlp).unwrap(),
            "\"yt-dlp\""
        );
        let choice: DownloaderChoice = serde_json::from_str("\"auto\"").unwrap();
        assert_eq!(choice, DownloaderChoice::Auto);
        assert_eq!(DownloaderChoice::YoutubeDl.to_string(), "youtube-dl");
    }

    #[test]
    fn test_config_serialize() {
        let json = serde_json::to_string(&Config::default()).unwrap();
        assert!(json.contains("download_path"));
        assert!(json.contains("video_format"));
        assert!(json.contains("enable_notifications"));
        assert!(json.contains("filename_template"));
    }
}
