//! Clipboard monitoring.
//!
//! This module provides clipboard change detection. It polls the system
//! clipboard and sends new text content through a channel whenever it differs
//! from what was seen on the previous poll.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use clipboard_rs::{Clipboard, ClipboardContext};
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, trace, warn};

use crate::error::{Error, Result};

/// A source of clipboard text.
pub trait ClipboardSource: Send {
    /// Read the current clipboard text.
    ///
    /// Returns `None` when the clipboard is empty or holds non-text data.
    ///
    /// # Errors
    ///
    /// Returns an error if the clipboard cannot be accessed at all.
    fn read_text(&mut self) -> Result<Option<String>>;
}

/// The operating system clipboard.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClipboard;

impl ClipboardSource for SystemClipboard {
    fn read_text(&mut self) -> Result<Option<String>> {
        let ctx = ClipboardContext::new().map_err(|e| Error::clipboard(e.to_string()))?;

        match ctx.get_text() {
            Ok(text) if !text.is_empty() => Ok(Some(text)),
            // No text content or non-text clipboard is not an error
            Ok(_) | Err(_) => Ok(None),
        }
    }
}

/// New clipboard content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipboardChange {
    /// The text content from the clipboard.
    pub content: String,

    /// BLAKE3 hash of the content.
    pub content_hash: String,

    /// Timestamp when the change was detected.
    pub timestamp: DateTime<Utc>,
}

impl ClipboardChange {
    /// Create a new clipboard change.
    #[must_use]
    pub fn new(content: String) -> Self {
        let content_hash = hash_content(&content);
        Self {
            content,
            content_hash,
            timestamp: Utc::now(),
        }
    }
}

/// Compute the BLAKE3 hash of clipboard content.
fn hash_content(content: &str) -> String {
    blake3::hash(content.as_bytes()).to_hex().to_string()
}

/// Watches a clipboard source for changes.
///
/// The monitor starts with no remembered content, so whatever is on the
/// clipboard at startup is reported as the first change.
#[derive(Debug)]
pub struct ClipboardMonitor<S = SystemClipboard> {
    source: S,
    poll_interval: Duration,
    running: Arc<AtomicBool>,
    last_hash: Option<String>,
}

impl ClipboardMonitor<SystemClipboard> {
    /// Create a monitor on the system clipboard.
    #[must_use]
    pub fn system(poll_interval: Duration) -> Self {
        Self::with_source(SystemClipboard, poll_interval)
    }
}

impl<S: ClipboardSource> ClipboardMonitor<S> {
    /// Create a monitor on a custom clipboard source.
    #[must_use]
    pub fn with_source(source: S, poll_interval: Duration) -> Self {
        Self {
            source,
            poll_interval,
            running: Arc::new(AtomicBool::new(false)),
            last_hash: None,
        }
    }

    /// Check if the monitor is currently running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Get the poll interval.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Check the clipboard for new content.
    ///
    /// Returns `Some(ClipboardChange)` if the text differs from the last
    /// check. An empty clipboard clears the remembered content, so copying the
    /// same text again afterwards counts as a change.
    ///
    /// # Errors
    ///
    /// Returns an error if clipboard access fails.
    pub fn check_for_changes(&mut self) -> Result<Option<ClipboardChange>> {
        let Some(text) = self.source.read_text()? else {
            if self.last_hash.take().is_some() {
                trace!("Clipboard cleared");
            }
            return Ok(None);
        };

        let hash = hash_content(&text);
        if self.last_hash.as_ref() == Some(&hash) {
            trace!("Clipboard content unchanged");
            return Ok(None);
        }

        debug!(hash = %&hash[..16], len = text.len(), "New clipboard content detected");
        self.last_hash = Some(hash.clone());

        Ok(Some(ClipboardChange {
            content: text,
            content_hash: hash,
            timestamp: Utc::now(),
        }))
    }

    /// Start monitoring the clipboard and send changes through the channel.
    ///
    /// This runs until `stop()` is called or the receiver is dropped. Read
    /// errors are logged and polling continues.
    pub async fn start(&mut self, tx: mpsc::Sender<ClipboardChange>) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Clipboard monitor already running");
            return;
        }

        debug!(
            interval_ms = self.poll_interval.as_millis(),
            "Starting clipboard monitor"
        );

        let mut ticker = interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        while self.running.load(Ordering::SeqCst) {
            ticker.tick().await;

            match self.check_for_changes() {
                Ok(Some(change)) => {
                    if tx.send(change).await.is_err() {
                        debug!("Clipboard channel closed, stopping monitor");
                        break;
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(error = %e, "Error in monitor loop");
                }
            }
        }

        self.running.store(false, Ordering::SeqCst);
        debug!("Clipboard monitor stopped");
    }

    /// Stop the clipboard monitor.
    pub fn stop(&self) {
        debug!("Stopping clipboard monitor");
        self.running.store(false, Ordering::SeqCst);
    }

    /// Get a handle that can be used to stop the monitor from another task.
    #[must_use]
    pub fn stop_handle(&self) -> ClipboardMonitorHandle {
        ClipboardMonitorHandle {
            running: Arc::clone(&self.running),
        }
    }
}

/// A handle to control a running clipboard monitor.
///
/// This can be cloned and sent to other tasks to stop the monitor remotely.
#[derive(Debug, Clone)]
pub struct ClipboardMonitorHandle {
    running: Arc<AtomicBool>,
}

impl ClipboardMonitorHandle {
    /// Stop the associated clipboard monitor.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Check if the monitor is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}
