//! User notifications.
//!
//! Queue events are surfaced as desktop notifications through the platform
//! crate. Showing a notification never fails the caller: problems are logged
//! and otherwise ignored.

use std::time::Duration;

use tracing::{debug, warn};

#[cfg(target_os = "linux")]
use clipgrab_linux as platform;

#[cfg(target_os = "macos")]
use clipgrab_mac as platform;

#[cfg(target_os = "windows")]
use clipgrab_windows as platform;

/// Application name shown on notifications.
pub const APP_NAME: &str = "YouTube Auto-Downloader";

/// How long ordinary notifications stay visible.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// How long download results stay visible.
pub const RESULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Maximum characters of a title shown in a notification.
const TITLE_PREVIEW_CHARS: usize = 50;

/// Maximum characters of an error message shown in a notification.
const ERROR_PREVIEW_CHARS: usize = 100;

/// A notification to show the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Headline.
    pub title: String,
    /// Body text, may contain newlines.
    pub message: String,
    /// How long the notification should stay visible.
    pub timeout: Duration,
}

impl Notification {
    /// Create a notification with the default timeout.
    #[must_use]
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Set how long the notification stays visible.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The watcher started.
    #[must_use]
    pub fn monitor_started() -> Self {
        Self::new(
            "Auto-Downloader Started",
            "Monitoring clipboard for YouTube links",
        )
    }

    /// The watcher stopped.
    #[must_use]
    pub fn monitor_stopped() -> Self {
        Self::new("Auto-Downloader Stopped", "Clipboard monitoring stopped")
    }

    /// A link was queued.
    ///
    /// `position` counts the links waiting, including this one; `current` is
    /// the download in progress, if any.
    #[must_use]
    pub fn added_to_queue(position: usize, is_downloading: bool, current: Option<&str>) -> Self {
        if position == 1 && !is_downloading {
            Self::new(
                "Added to Queue",
                format!("Download will start shortly...\nQueue: {position} video(s)"),
            )
        } else {
            Self::new(
                "Added to Queue",
                format!(
                    "Position in queue: {position}\nCurrent: {}",
                    current.unwrap_or("Starting...")
                ),
            )
        }
    }

    /// A download is starting.
    #[must_use]
    pub fn download_started(remaining: usize) -> Self {
        Self::new(
            "Download Started",
            format!("Downloading...\nRemaining in queue: {remaining}"),
        )
    }

    /// A download finished.
    #[must_use]
    pub fn download_complete(title: &str, remaining: usize) -> Self {
        let title = truncate_chars(title, TITLE_PREVIEW_CHARS);
        let message = if remaining > 0 {
            format!("{title}\nNext in queue: {remaining} video(s)")
        } else {
            format!("{title}\nQueue is empty")
        };
        Self::new("Download Complete! ✓", message).with_timeout(RESULT_TIMEOUT)
    }

    /// A download failed.
    #[must_use]
    pub fn download_failed(error: &str) -> Self {
        Self::new(
            "Download Failed ✗",
            format!("Error: {}", truncate_chars(error, ERROR_PREVIEW_CHARS)),
        )
        .with_timeout(RESULT_TIMEOUT)
    }
}

/// Take at most `max` characters of `s`.
#[must_use]
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Something that can show notifications.
pub trait Notifier: Send + Sync + std::fmt::Debug {
    /// Show a notification. Failures are logged, never returned.
    fn notify(&self, notification: &Notification);
}

/// Shows notifications on the desktop via the platform crate.
///
/// Each notification is delivered from its own thread so slow helpers
/// (the Windows balloon blocks for its whole timeout) never stall the caller.
#[derive(Debug, Default, Clone, Copy)]
pub struct DesktopNotifier;

impl Notifier for DesktopNotifier {
    fn notify(&self, notification: &Notification) {
        let notification = notification.clone();
        let spawned = std::thread::Builder::new()
            .name("notify".to_string())
            .spawn(move || show(&notification));
        if let Err(e) = spawned {
            warn!(error = %e, "Could not show notification");
        }
    }
}

#[cfg(any(target_os = "linux", target_os = "macos", target_os = "windows"))]
fn show(notification: &Notification) {
    if let Err(e) = platform::notify(
        APP_NAME,
        &notification.title,
        &notification.message,
        notification.timeout,
    ) {
        warn!(error = %e, "Could not show notification");
    }
}

#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
fn show(notification: &Notification) {
    debug!(title = %notification.title, "Desktop notifications unsupported on this platform");
}

/// Drops every notification; used when notifications are disabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, notification: &Notification) {
        debug!(title = %notification.title, "Notification suppressed");
    }
}

/// Pick the notifier matching the `enable_notifications` setting.
#[must_use]
pub fn notifier_for(enabled: bool) -> std::sync::Arc<dyn Notifier> {
    if enabled {
        std::sync::Arc::new(DesktopNotifier)
    } else {
        std::sync::Arc::new(NullNotifier)
    }
}
