//! Sequential download queue.
//!
//! Links are deduplicated for the whole session, then handed one at a time,
//! in arrival order, to a single worker task that runs the downloader. Every
//! step is reported through the notifier and, when configured, the history.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::downloader::Downloader;
use crate::error::{Error, Result};
use crate::history::History;
use crate::links::YoutubeLink;
use crate::notify::{truncate_chars, Notification, Notifier};

/// Characters of the URL shown as the current download.
const CURRENT_PREVIEW_CHARS: usize = 50;

/// What happened to a link handed to the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// The link was queued; `position` counts the links waiting, this one included.
    Queued {
        /// Place in the waiting line, starting at 1.
        position: usize,
    },
    /// The link was already seen this session.
    Duplicate,
}

/// A point-in-time view of the queue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueueSnapshot {
    /// Whether a download is running.
    pub is_downloading: bool,
    /// Shortened URL of the running download.
    pub current: Option<String>,
    /// Links waiting behind the running download.
    pub pending: usize,
    /// Downloads finished successfully this session.
    pub completed: usize,
    /// Downloads that failed this session.
    pub failed: usize,
}

#[derive(Debug, Default)]
struct QueueState {
    seen: HashSet<String>,
    pending: usize,
    is_downloading: bool,
    current: Option<String>,
    completed: usize,
    failed: usize,
    closed: bool,
}

impl QueueState {
    fn is_idle(&self) -> bool {
        self.pending == 0 && !self.is_downloading
    }
}

#[derive(Debug)]
struct Job {
    link: YoutubeLink,
    history_id: Option<i64>,
}

/// Everything the worker and the enqueuing side share.
#[derive(Debug)]
struct Shared {
    state: Mutex<QueueState>,
    idle: watch::Sender<bool>,
    downloader: Arc<dyn Downloader>,
    notifier: Arc<dyn Notifier>,
    history: Option<Arc<Mutex<History>>>,
}

impl Shared {
    fn state(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run a history update, logging instead of failing.
    fn with_history<T>(&self, what: &str, f: impl FnOnce(&History) -> Result<T>) -> Option<T> {
        let history = self.history.as_ref()?;
        let history = history.lock().unwrap_or_else(PoisonError::into_inner);
        match f(&history) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(error = %e, "Could not {} in download history", what);
                None
            }
        }
    }
}

/// FIFO download queue with a single worker.
#[derive(Debug)]
pub struct DownloadQueue {
    shared: Arc<Shared>,
    tx: Mutex<Option<mpsc::UnboundedSender<Job>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl DownloadQueue {
    /// Create a queue and spawn its worker on the current tokio runtime.
    #[must_use]
    pub fn new(
        downloader: Arc<dyn Downloader>,
        notifier: Arc<dyn Notifier>,
        history: Option<Arc<Mutex<History>>>,
    ) -> Self {
        let (idle, _) = watch::channel(true);
        let shared = Arc::new(Shared {
            state: Mutex::new(QueueState::default()),
            idle,
            downloader,
            notifier,
            history,
        });

        let (tx, rx) = mpsc::unbounded_channel();
        let worker = tokio::spawn(run_worker(Arc::clone(&shared), rx));

        Self {
            shared,
            tx: Mutex::new(Some(tx)),
            worker: Mutex::new(Some(worker)),
        }
    }

    /// Treat these URLs as already seen, so they are never queued again.
    pub fn preload_seen<I, S>(&self, urls: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut state = self.shared.state();
        let before = state.seen.len();
        state.seen.extend(urls.into_iter().map(Into::into));
        debug!(count = state.seen.len() - before, "Preloaded seen URLs");
    }

    /// Add a link to the queue.
    ///
    /// # Errors
    ///
    /// Returns `Error::QueueClosed` after `shutdown` or `drain`.
    pub fn enqueue(&self, link: YoutubeLink) -> Result<EnqueueOutcome> {
        let (position, is_downloading, current) = {
            let mut state = self.shared.state();
            if state.closed {
                return Err(Error::QueueClosed);
            }
            if !state.seen.insert(link.url.clone()) {
                info!("URL already downloaded or in queue: {}", link.url);
                return Ok(EnqueueOutcome::Duplicate);
            }
            state.pending += 1;
            self.shared.idle.send_replace(false);
            (state.pending, state.is_downloading, state.current.clone())
        };

        let history_id = self
            .shared
            .with_history("record queued link", |h| h.record_queued(&link));

        if position == 1 && !is_downloading {
            info!("Added to queue: {}", link.url);
        } else {
            info!("Added to queue (position {}): {}", position, link.url);
        }
        let url = link.url.clone();
        let sent = self
            .tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|tx| tx.send(Job { link, history_id }).is_ok());
        if !sent {
            let mut state = self.shared.state();
            state.pending = state.pending.saturating_sub(1);
            state.seen.remove(&url);
            self.shared.idle.send_replace(state.is_idle());
            return Err(Error::QueueClosed);
        }

        self.shared.notifier.notify(&Notification::added_to_queue(
            position,
            is_downloading,
            current.as_deref(),
        ));

        Ok(EnqueueOutcome::Queued { position })
    }

    /// Get the current queue state.
    #[must_use]
    pub fn snapshot(&self) -> QueueSnapshot {
        let state = self.shared.state();
        QueueSnapshot {
            is_downloading: state.is_downloading,
            current: state.current.clone(),
            pending: state.pending,
            completed: state.completed,
            failed: state.failed,
        }
    }

    /// Wait until nothing is queued or downloading.
    pub async fn wait_idle(&self) {
        let mut idle = self.shared.idle.subscribe();
        // The sender lives in `shared`, so this only ends once idle
        let _ = idle.wait_for(|&is_idle| is_idle).await;
    }

    /// Stop accepting links and wait for everything queued to finish.
    pub async fn drain(&self) {
        self.close();
        self.wait_idle().await;
    }

    /// Stop accepting links and abandon whatever has not finished.
    ///
    /// The running download, if any, is killed. Returns how many links were
    /// abandoned.
    pub async fn shutdown(&self) -> usize {
        self.close();
        let worker = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(worker) = worker {
            worker.abort();
            match worker.await {
                Ok(()) => {}
                Err(e) if e.is_cancelled() => debug!("Download worker cancelled"),
                Err(e) => error!(error = %e, "Download worker ended abnormally"),
            }
        }

        let abandoned = {
            let mut state = self.shared.state();
            let abandoned = state.pending + usize::from(state.is_downloading);
            state.pending = 0;
            state.is_downloading = false;
            state.current = None;
            self.shared.idle.send_replace(true);
            abandoned
        };

        self.shared
            .with_history("mark abandoned downloads", History::mark_abandoned_pending);

        if abandoned > 0 {
            info!("Abandoned {} unfinished download(s)", abandoned);
        }
        abandoned
    }

    fn close(&self) {
        self.shared.state().closed = true;
        // Dropping the sender lets the worker finish once the channel is empty
        self.tx.lock().unwrap_or_else(PoisonError::into_inner).take();
    }
}

impl Drop for DownloadQueue {
    fn drop(&mut self) {
        if let Some(worker) = self
            .worker
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            worker.abort();
        }
    }
}

/// Take jobs off the channel and download them one after another.
async fn run_worker(shared: Arc<Shared>, mut rx: mpsc::UnboundedReceiver<Job>) {
    debug!("Download worker started");

    while let Some(job) = rx.recv().await {
        process(&shared, job).await;
    }

    debug!("Download worker finished");
}

async fn process(shared: &Shared, job: Job) {
    let url = job.link.url.as_str();

    let remaining = {
        let mut state = shared.state();
        state.pending = state.pending.saturating_sub(1);
        state.is_downloading = true;
        state.current = Some(format!(
            "{}...",
            truncate_chars(url, CURRENT_PREVIEW_CHARS)
        ));
        state.pending
    };

    info!("Starting download: {}", url);
    shared
        .notifier
        .notify(&Notification::download_started(remaining));
    if let Some(id) = job.history_id {
        shared.with_history("mark download started", |h| h.mark_downloading(id));
    }

    let result = shared.downloader.download(url).await;
    let remaining = {
        let mut state = shared.state();
        if result.is_ok() {
            state.completed += 1;
        } else {
            state.failed += 1;
        }
        state.pending
    };

    match result {
        Ok(outcome) => {
            let title = outcome.display_title();
            info!("Successfully downloaded: {}", title);
            shared
                .notifier
                .notify(&Notification::download_complete(&title, remaining));
            if let Some(id) = job.history_id {
                let stored = (!outcome.titles.is_empty()).then_some(title.as_str());
                shared.with_history("mark download complete", |h| {
                    h.mark_completed(id, stored)
                });
            }
        }
        Err(e) => {
            let message = match &e {
                Error::Download { message, .. } => message.clone(),
                other => other.to_string(),
            };
            error!("Download failed: {}", message);
            shared
                .notifier
                .notify(&Notification::download_failed(&message));
            if let Some(id) = job.history_id {
                shared.with_history("mark download failed", |h| h.mark_failed(id, &message));
            }
        }
    }

    let mut state = shared.state();
    state.is_downloading = false;
    state.current = None;
    shared.idle.send_replace(state.is_idle());
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::downloader::tests::FakeDownloader;
    use crate::history::DownloadStatus;
    use crate::links::LinkKind;
    use crate::notify::tests::RecordingNotifier;

    fn link(url: &str) -> YoutubeLink {
        YoutubeLink {
            url: url.to_string(),
            kind: LinkKind::Watch,
        }
    }

    fn queue(
        downloader: &FakeDownloader,
        notifier: &RecordingNotifier,
        history: Option<Arc<Mutex<History>>>,
    ) -> DownloadQueue {
        DownloadQueue::new(
            Arc::new(downloader.clone()),
            Arc::new(notifier.clone()),
            history,
        )
    }

    #[tokio::test]
    async fn test_enqueue_and_download() {
        let downloader = FakeDownloader::default();
        let notifier = RecordingNotifier::default();
        let queue = queue(&downloader, &notifier, None);

        let outcome = queue.enqueue(link("https://youtu.be/a")).unwrap();
        assert_eq!(outcome, EnqueueOutcome::Queued { position: 1 });

        queue.wait_idle().await;
        assert_eq!(downloader.calls(), vec!["https://youtu.be/a".to_string()]);
        assert_eq!(
            notifier.titles(),
            vec!["Added to Queue", "Download Started", "Download Complete! ✓"]
        );

        let complete = notifier.all().pop().unwrap();
        assert_eq!(complete.message, "Title of https://youtu.be/a\nQueue is empty");
    }

    #[tokio::test]
    async fn test_duplicate_rejected() {
        let downloader = FakeDownloader::default();
        let notifier = RecordingNotifier::default();
        let queue = queue(&downloader, &notifier, None);

        queue.enqueue(link("https://youtu.be/a")).unwrap();
        queue.wait_idle().await;

        // Still a duplicate after it finished
        let outcome = queue.enqueue(link("https://youtu.be/a")).unwrap();
        assert_eq!(outcome, EnqueueOutcome::Duplicate);
        queue.wait_idle().await;
        assert_eq!(downloader.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_url_is_not_retried() {
        let downloader = FakeDownloader::default();
        downloader.fail("https://youtu.be/bad", "Video unavailable");
        let notifier = RecordingNotifier::default();
        let queue = queue(&downloader, &notifier, None);

        queue.enqueue(link("https://youtu.be/bad")).unwrap();
        queue.wait_idle().await;

        assert_eq!(
            queue.enqueue(link("https://youtu.be/bad")).unwrap(),
            EnqueueOutcome::Duplicate
        );
    }

    #[tokio::test]
    async fn test_positions_and_fifo_order() {
        let downloader = FakeDownloader::with_delay(Duration::from_millis(50));
        let notifier = RecordingNotifier::default();
        let queue = queue(&downloader, &notifier, None);

        queue.enqueue(link("https://youtu.be/1")).unwrap();
        // Let the worker pick up the first link
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(
            queue.enqueue(link("https://youtu.be/2")).unwrap(),
            EnqueueOutcome::Queued { position: 1 }
        );
        assert_eq!(
            queue.enqueue(link("https://youtu.be/3")).unwrap(),
            EnqueueOutcome::Queued { position: 2 }
        );

        let snapshot = queue.snapshot();
        assert!(snapshot.is_downloading);
        assert_eq!(snapshot.current.as_deref(), Some("https://youtu.be/1..."));
        assert_eq!(snapshot.pending, 2);

        queue.wait_idle().await;
        assert_eq!(
            downloader.calls(),
            vec![
                "https://youtu.be/1".to_string(),
                "https://youtu.be/2".to_string(),
                "https://youtu.be/3".to_string(),
            ]
        );
        assert_eq!(
            queue.snapshot(),
            QueueSnapshot {
                completed: 3,
                ..QueueSnapshot::default()
            }
        );
    }

    #[tokio::test]
    async fn test_added_behind_current_download() {
        let downloader = FakeDownloader::with_delay(Duration::from_millis(50));
        let notifier = RecordingNotifier::default();
        let queue = queue(&downloader, &notifier, None);

        queue.enqueue(link("https://youtu.be/1")).unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        queue.enqueue(link("https://youtu.be/2")).unwrap();

        let added: Vec<_> = notifier
            .all()
            .into_iter()
            .filter(|n| n.title == "Added to Queue")
            .collect();
        assert_eq!(
            added[0].message,
            "Download will start shortly...\nQueue: 1 video(s)"
        );
        assert_eq!(
            added[1].message,
            "Position in queue: 1\nCurrent: https://youtu.be/1..."
        );
        queue.wait_idle().await;
    }

    #[tokio::test]
    async fn test_failure_does_not_stop_worker() {
        let downloader = FakeDownloader::default();
        downloader.fail("https://youtu.be/bad", "Video unavailable");
        let notifier = RecordingNotifier::default();
        let queue = queue(&downloader, &notifier, None);

        queue.enqueue(link("https://youtu.be/bad")).unwrap();
        queue.enqueue(link("https://youtu.be/good")).unwrap();
        queue.wait_idle().await;

        assert_eq!(downloader.calls().len(), 2);
        let snapshot = queue.snapshot();
        assert_eq!((snapshot.completed, snapshot.failed), (1, 1));
        let failed = notifier
            .all()
            .into_iter()
            .find(|n| n.title == "Download Failed ✗")
            .unwrap();
        assert_eq!(failed.message, "Error: Video unavailable");
        assert!(notifier
            .titles()
            .contains(&"Download Complete! ✓".to_string()));
    }

    #[tokio::test]
    async fn test_preload_seen() {
        let downloader = FakeDownloader::default();
        let notifier = RecordingNotifier::default();
        let queue = queue(&downloader, &notifier, None);

        queue.preload_seen(["https://youtu.be/old"]);
        assert_eq!(
            queue.enqueue(link("https://youtu.be/old")).unwrap(),
            EnqueueOutcome::Duplicate
        );
        assert!(notifier.titles().is_empty());
    }

    #[tokio::test]
    async fn test_history_records_outcomes() {
        let history = Arc::new(Mutex::new(History::open_in_memory().unwrap()));
        let downloader = FakeDownloader::default();
        downloader.fail("https://youtu.be/bad", "boom");
        let notifier = RecordingNotifier::default();
        let queue = queue(&downloader, &notifier, Some(Arc::clone(&history)));

        queue.enqueue(link("https://youtu.be/good")).unwrap();
        queue.enqueue(link("https://youtu.be/bad")).unwrap();
        queue.wait_idle().await;

        let history = history.lock().unwrap();
        let records = history.recent(10).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].status, DownloadStatus::Failed);
        assert_eq!(records[0].error.as_deref(), Some("boom"));
        assert_eq!(records[1].status, DownloadStatus::Completed);
        assert_eq!(
            records[1].title.as_deref(),
            Some("Title of https://youtu.be/good")
        );
    }

    #[tokio::test]
    async fn test_drain_finishes_queued_work() {
        let downloader = FakeDownloader::with_delay(Duration::from_millis(10));
        let notifier = RecordingNotifier::default();
        let queue = queue(&downloader, &notifier, None);

        queue.enqueue(link("https://youtu.be/1")).unwrap();
        queue.enqueue(link("https://youtu.be/2")).unwrap();
        queue.drain().await;

        assert_eq!(downloader.calls().len(), 2);
        assert!(matches!(
            queue.enqueue(link("https://youtu.be/3")),
            Err(Error::QueueClosed)
        ));
    }

    #[tokio::test]
    async fn test_shutdown_abandons_pending() {
        let history = Arc::new(Mutex::new(History::open_in_memory().unwrap()));
        let downloader = FakeDownloader::with_delay(Duration::from_secs(30));
        let notifier = RecordingNotifier::default();
        let queue = queue(&downloader, &notifier, Some(Arc::clone(&history)));

        queue.enqueue(link("https://youtu.be/1")).unwrap();
        queue.enqueue(link("https://youtu.be/2")).unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(queue.shutdown().await, 2);
        assert_eq!(downloader.calls().len(), 1);
        assert_eq!(queue.snapshot(), QueueSnapshot::default());
        assert!(matches!(
            queue.enqueue(link("https://youtu.be/3")),
            Err(Error::QueueClosed)
        ));

        let stats = history.lock().unwrap().stats().unwrap();
        assert_eq!(stats.abandoned, 2);
    }
}
