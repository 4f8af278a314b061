//! macOS-specific implementation for clipgrab.
//!
//! This crate provides desktop notifications on macOS through Notification
//! Center, driven by `osascript` so no extra permissions or frameworks are
//! needed.

#![cfg(target_os = "macos")]
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::process::Command;
use std::time::Duration;

use thiserror::Error;
use tracing::trace;

/// Errors that can occur while showing a notification.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// `osascript` could not be launched.
    #[error("failed to launch osascript: {0}")]
    Spawn(#[from] std::io::Error),

    /// `osascript` ran but reported failure.
    #[error("osascript failed: {0}")]
    Failed(String),
}

/// Initialize macOS-specific components.
///
/// # Errors
///
/// Returns an error if initialization fails.
pub fn init() -> Result<(), Box<dyn std::error::Error>> {
    tracing::debug!("Initializing macOS platform components");
    Ok(())
}

/// Get the platform name.
#[must_use]
pub fn platform_name() -> &'static str {
    "macOS"
}

/// Show a desktop notification.
///
/// Notification Center decides how long banners stay visible, so `timeout`
/// is accepted for parity with the other platforms and otherwise ignored.
///
/// # Errors
///
/// Returns an error if `osascript` is missing or exits unsuccessfully.
pub fn notify(
    app_name: &str,
    title: &str,
    message: &str,
    timeout: Duration,
) -> Result<(), NotifyError> {
    let script = notification_script(app_name, title, message);
    trace!(timeout_ms = timeout.as_millis(), %script, "Running osascript");

    let output = Command::new("osascript").args(["-e", &script]).output()?;
    if output.status.success() {
        Ok(())
    } else {
        Err(NotifyError::Failed(
            String::from_utf8_lossy(&output.stderr).trim().to_string(),
        ))
    }
}

/// Build the `AppleScript` that posts the notification.
fn notification_script(app_name: &str, title: &str, message: &str) -> String {
    format!(
        r#"display notification "{}" with title "{}" subtitle "{}""#,
        escape_applescript(message),
        escape_applescript(app_name),
        escape_applescript(title),
    )
}

/// Escape a string for use inside an `AppleScript` string literal.
fn escape_applescript(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}
