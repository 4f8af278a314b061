//! The clipboard watcher.
//!
//! Ties the pieces together: clipboard changes come in from the monitor task,
//! links are picked out of them and handed to the download queue until a
//! shutdown signal arrives.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::clipboard::{ClipboardChange, ClipboardMonitor, ClipboardSource};
use crate::config::Config;
use crate::error::Result;
use crate::links::LinkMatcher;
use crate::notify::{Notification, Notifier};
use crate::queue::{DownloadQueue, EnqueueOutcome};

/// Capacity of the channel between the monitor task and the watcher.
const CHANGE_CHANNEL_CAPACITY: usize = 32;

/// Width of the banner's rules.
const BANNER_WIDTH: usize = 60;

/// Build the startup banner shown on the console.
#[must_use]
pub fn banner(config: &Config) -> String {
    let rule = "=".repeat(BANNER_WIDTH);
    let notifications = if config.enable_notifications {
        "Enabled"
    } else {
        "Disabled"
    };

    format!(
        "\n{rule}\n\
         YouTube Auto-Downloader with Queue System\n\
         {rule}\n\
         Download folder: {}\n\
         Video format: {}\n\
         Notifications: {notifications}\n\
         Queue mode: Sequential (one at a time)\n\
         \n\
         Copy any YouTube URL to add it to the download queue!\n\
         Videos will download one after another.\n\
         Press Ctrl+C to stop\n\
         \n\
         {rule}\n",
        config.download_path.display(),
        config.video_format,
    )
}

/// Watches the clipboard and feeds links to the download queue.
#[derive(Debug)]
pub struct Watcher {
    matcher: LinkMatcher,
    queue: Arc<DownloadQueue>,
    notifier: Arc<dyn Notifier>,
}

impl Watcher {
    /// Create a watcher feeding `queue`.
    #[must_use]
    pub fn new(queue: Arc<DownloadQueue>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            matcher: LinkMatcher::new(),
            queue,
            notifier,
        }
    }

    /// Get the queue links are handed to.
    #[must_use]
    pub fn queue(&self) -> &Arc<DownloadQueue> {
        &self.queue
    }

    /// Look for a link in a clipboard change and queue it.
    ///
    /// Returns `None` when the change holds no link.
    ///
    /// # Errors
    ///
    /// Returns an error if the queue has been shut down.
    pub fn handle_change(&self, change: &ClipboardChange) -> Result<Option<EnqueueOutcome>> {
        let Some(link) = self.matcher.find(&change.content) else {
            debug!(hash = %&change.content_hash[..16], "No YouTube link in clipboard");
            return Ok(None);
        };

        info!("YouTube URL detected: {}", link.url);
        self.queue.enqueue(link).map(Some)
    }

    /// Watch `monitor` until `shutdown` completes, then stop everything.
    ///
    /// Unfinished downloads are abandoned; returns how many there were.
    pub async fn run<S, F>(&self, mut monitor: ClipboardMonitor<S>, shutdown: F) -> usize
    where
        S: ClipboardSource + 'static,
        F: Future<Output = ()>,
    {
        info!("Starting clipboard monitor...");
        info!("Waiting for YouTube URLs in clipboard...");
        self.notifier.notify(&Notification::monitor_started());

        let (tx, mut rx) = mpsc::channel(CHANGE_CHANNEL_CAPACITY);
        let stop = monitor.stop_handle();
        let monitor_task = tokio::spawn(async move { monitor.start(tx).await });

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                () = &mut shutdown => break,
                change = rx.recv() => {
                    let Some(change) = change else {
                        warn!("Clipboard monitor exited unexpectedly");
                        break;
                    };
                    if let Err(e) = self.handle_change(&change) {
                        warn!(error = %e, "Could not queue link");
                    }
                }
            }
        }

        info!("Stopping clipboard monitor...");
        stop.stop();
        // Dropping the receiver ends the monitor even if it is mid-send
        drop(rx);
        if let Err(e) = monitor_task.await {
            warn!(error = %e, "Clipboard monitor task failed");
        }

        self.notifier.notify(&Notification::monitor_stopped());
        self.queue.shutdown().await
    }
}
