//! Windows-specific implementation for clipgrab
//!
//! This crate provides desktop notifications on Windows by showing a tray
//! balloon tip from a hidden PowerShell process.

#![cfg(target_os = "windows")]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::os::windows::process::CommandExt;
use std::process::Command;
use std::time::Duration;

use thiserror::Error;
use tracing::trace;

/// Process creation flag that keeps PowerShell from flashing a console window.
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// Errors that can occur while showing a notification.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// PowerShell could not be launched.
    #[error("failed to launch powershell: {0}")]
    Spawn(#[from] std::io::Error),

    /// PowerShell ran but reported failure.
    #[error("powershell failed: {0}")]
    Failed(String),
}

/// Initialize Windows-specific components
///
/// # Errors
///
/// Returns an error if initialization fails
pub fn init() -> Result<(), Box<dyn std::error::Error>> {
    tracing::debug!("Initializing Windows platform components");
    Ok(())
}

/// Get platform name
#[must_use]
pub fn platform_name() -> &'static str {
    "Windows"
}

/// Show a desktop notification.
///
/// Blocks for `timeout` while the balloon is visible; callers run this off
/// the async runtime.
///
/// # Errors
///
/// Returns an error if PowerShell is missing or exits unsuccessfully.
pub fn notify(
    app_name: &str,
    title: &str,
    message: &str,
    timeout: Duration,
) -> Result<(), NotifyError> {
    let script = balloon_script(app_name, title, message, timeout);
    trace!(%script, "Running powershell");

    let output = Command::new("powershell")
        .args([
            "-NoProfile",
            "-NonInteractive",
            "-WindowStyle",
            "Hidden",
            "-Command",
            &script,
        ])
        .creation_flags(CREATE_NO_WINDOW)
        .output()?;

    if output.status.success() {
        Ok(())
    } else {
        Err(NotifyError::Failed(
            String::from_utf8_lossy(&output.stderr).trim().to_string(),
        ))
    }
}

/// Build the PowerShell script that shows the balloon tip.
fn balloon_script(app_name: &str, title: &str, message: &str, timeout: Duration) -> String {
    let millis = timeout.as_millis();
    format!(
        "Add-Type -AssemblyName System.Windows.Forms; \
         Add-Type -AssemblyName System.Drawing; \
         $n = New-Object System.Windows.Forms.NotifyIcon; \
         $n.Icon = [System.Drawing.SystemIcons]::Information; \
         $n.Text = '{}'; \
         $n.BalloonTipTitle = '{}'; \
         $n.BalloonTipText = '{}'; \
         $n.Visible = $true; \
         $n.ShowBalloonTip({millis}); \
         Start-Sleep -Milliseconds {millis}; \
         $n.Dispose()",
        escape_powershell(app_name),
        escape_powershell(title),
        escape_powershell(message),
    )
}

/// Escape a string for use inside a single-quoted PowerShell literal.
fn escape_powershell(s: &str) -> String {
    s.replace('\'', "''")
}
