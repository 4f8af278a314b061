//! `clipgrab` - Download YouTube links straight from the clipboard
//!
//! This library watches the clipboard for YouTube links and hands each one to
//! an external downloader (`yt-dlp` or `youtube-dl`), one at a time, keeping a
//! history of what was fetched.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod cli;
pub mod clipboard;
pub mod config;
pub mod downloader;
pub mod error;
pub mod history;
pub mod links;
pub mod logging;
pub mod notify;
pub mod queue;
pub mod watcher;

pub use clipboard::{ClipboardChange, ClipboardMonitor, ClipboardSource, SystemClipboard};
pub use config::{Config, DownloaderChoice};
pub use downloader::{Backend, DownloadOptions, DownloadOutcome, Downloader, ProcessDownloader};
pub use error::{Error, Result};
pub use history::{DownloadRecord, DownloadStatus, History, HistoryStats};
pub use links::{LinkKind, LinkMatcher, YoutubeLink};
pub use logging::init_logging;
pub use notify::{notifier_for, Notification, Notifier};
pub use queue::{DownloadQueue, EnqueueOutcome, QueueSnapshot};
pub use watcher::Watcher;
