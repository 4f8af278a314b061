//! Linux-specific implementation for clipgrab
//!
//! This crate provides desktop notifications on Linux by shelling out to
//! `notify-send`, which talks to whatever notification daemon the session runs.

#![cfg(target_os = "linux")]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::process::Command;
use std::time::Duration;

use thiserror::Error;
use tracing::trace;

/// Errors that can occur while showing a notification.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// `notify-send` could not be launched.
    #[error("failed to launch notify-send: {0}")]
    Spawn(#[from] std::io::Error),

    /// `notify-send` ran but reported failure.
    #[error("notify-send failed: {0}")]
    Failed(String),
}

/// Initialize Linux-specific components
///
/// # Errors
///
/// Returns an error if initialization fails
pub fn init() -> Result<(), Box<dyn std::error::Error>> {
    tracing::debug!("Initializing Linux platform components");
    Ok(())
}

/// Get platform name
#[must_use]
pub fn platform_name() -> &'static str {
    "Linux"
}

/// Show a desktop notification.
///
/// Blocks until `notify-send` exits, which is immediate for any running
/// notification daemon.
///
/// # Errors
///
/// Returns an error if `notify-send` is missing or exits unsuccessfully.
pub fn notify(
    app_name: &str,
    title: &str,
    message: &str,
    timeout: Duration,
) -> Result<(), NotifyError> {
    let args = notify_send_args(app_name, title, message, timeout);
    trace!(?args, "Running notify-send");

    let output = Command::new("notify-send").args(&args).output()?;
    if output.status.success() {
        Ok(())
    } else {
        Err(NotifyError::Failed(
            String::from_utf8_lossy(&output.stderr).trim().to_string(),
        ))
    }
}

/// Build the `notify-send` argument list.
fn notify_send_args(app_name: &str, title: &str, message: &str, timeout: Duration) -> Vec<String> {
    vec![
        "--app-name".to_string(),
        app_name.to_string(),
        "--expire-time".to_string(),
        timeout.as_millis().to_string(),
        title.to_string(),
        message.to_string(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init() {
        assert!(init().is_ok());
    }

    #[test]
    fn test_platform_name() {
        assert_eq!(platform_name(), "Linux");
    }

    #[test]
    fn test_notify_send_args() {
        let args = notify_send_args(
            "YouTube Auto-Downloader",
            "Download Started",
            "Downloading...\nRemaining in queue: 0",
            Duration::from_secs(5),
        );

        assert_eq!(args[0], "--app-name");
        assert_eq!(args[1], "YouTube Auto-Downloader");
        assert_eq!(args[2], "--expire-time");
        assert_eq!(args[3], "5000");
        assert_eq!(args[4], "Download Started");
        assert!(args[5].contains("Remaining in queue"));
    }

    #[test]
    fn test_notify_error_display() {
        let err = NotifyError::Failed("no daemon".to_string());
        assert_eq!(err.to_string(), "notify-send failed: no daemon");

        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "not found");
        let err: NotifyError = io_err.into();
        assert!(err.to_string().contains("notify-send"));
    }
}
