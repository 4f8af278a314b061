//! Download invocation.
//!
//! Downloads are performed by an external program, `yt-dlp` or its
//! predecessor `youtube-dl`. This module locates the program, turns the
//! configuration into command-line arguments and runs one download per call.

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{debug, trace};

use crate::config::{Config, DownloaderChoice};
use crate::error::{Error, Result};

/// Title reported when the downloader did not tell us one.
pub const UNKNOWN_TITLE: &str = "Unknown";

/// Marks the title lines yt-dlp prints among its other output.
const TITLE_PREFIX: &str = "clipgrab-title:";

/// An installed downloader program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// `yt-dlp`
    YtDlp,
    /// `youtube-dl`
    YoutubeDl,
}

impl Backend {
    /// The executable name.
    #[must_use]
    pub fn program(self) -> &'static str {
        match self {
            Self::YtDlp => "yt-dlp",
            Self::YoutubeDl => "youtube-dl",
        }
    }

    /// Backends to probe for a configured choice, in preference order.
    #[must_use]
    pub fn candidates(choice: DownloaderChoice) -> &'static [Backend] {
        match choice {
            DownloaderChoice::Auto => &[Self::YtDlp, Self::YoutubeDl],
            DownloaderChoice::YtDlp => &[Self::YtDlp],
            DownloaderChoice::YoutubeDl => &[Self::YoutubeDl],
        }
    }

    /// Get the installed version, or `None` if the program can't be run.
    pub async fn version(self) -> Option<String> {
        let output = Command::new(self.program())
            .arg("--version")
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await;

        match output {
            Ok(output) if output.status.success() => Some(
                String::from_utf8_lossy(&output.stdout)
                    .trim()
                    .to_string(),
            ),
            Ok(output) => {
                debug!(program = self.program(), status = %output.status, "Version probe failed");
                None
            }
            Err(e) => {
                trace!(program = self.program(), error = %e, "Program not runnable");
                None
            }
        }
    }

    /// Find the first installed backend for a configured choice.
    ///
    /// # Errors
    ///
    /// Returns `Error::DownloaderMissing` if none of the candidates run.
    pub async fn detect(choice: DownloaderChoice) -> Result<(Self, String)> {
        for &backend in Self::candidates(choice) {
            if let Some(version) = backend.version().await {
                debug!(program = backend.program(), %version, "Found downloader");
                return Ok((backend, version));
            }
        }
        Err(Error::DownloaderMissing)
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.program())
    }
}

/// Download settings derived from the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadOptions {
    /// Format selector (`-f`).
    pub format: String,
    /// Full output template (`-o`).
    pub output_template: PathBuf,
    /// Container for merged streams.
    pub merge_output_format: String,
    /// Request retries.
    pub retries: u32,
    /// Fragment retries.
    pub fragment_retries: u32,
    /// Container to re-encode into, if any.
    pub recode_video: Option<String>,
}

impl From<&Config> for DownloadOptions {
    fn from(config: &Config) -> Self {
        Self {
            format: config.video_format.clone(),
            output_template: config.output_template(),
            merge_output_format: config.merge_output_format.clone(),
            retries: config.retries,
            fragment_retries: config.fragment_retries,
            recode_video: config.recode_video.clone(),
        }
    }
}

/// The result of a successful download.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadOutcome {
    /// Titles of the downloaded videos; more than one for playlists.
    pub titles: Vec<String>,
}

impl DownloadOutcome {
    /// A short human-readable title for notifications and logs.
    #[must_use]
    pub fn display_title(&self) -> String {
        match self.titles.as_slice() {
            [] => UNKNOWN_TITLE.to_string(),
            [only] => only.clone(),
            [first, rest @ ..] => format!("{first} (+{} more)", rest.len()),
        }
    }
}

/// Something that can download a URL.
#[async_trait::async_trait]
pub trait Downloader: Send + Sync + std::fmt::Debug {
    /// Download `url` into the configured folder.
    ///
    /// # Errors
    ///
    /// Returns an error if the download fails.
    async fn download(&self, url: &str) -> Result<DownloadOutcome>;
}

/// Runs `yt-dlp` or `youtube-dl` as a child process.
#[derive(Debug, Clone)]
pub struct ProcessDownloader {
    backend: Backend,
    options: DownloadOptions,
}

impl ProcessDownloader {
    /// Create a downloader for a backend.
    #[must_use]
    pub fn new(backend: Backend, options: DownloadOptions) -> Self {
        Self { backend, options }
    }

    /// Build the command-line arguments for downloading `url`.
    #[must_use]
    pub fn args(&self, url: &str) -> Vec<OsString> {
        let opts = &self.options;
        let mut args: Vec<OsString> = vec![
            "-f".into(),
            opts.format.clone().into(),
            "-o".into(),
            opts.output_template.clone().into_os_string(),
            "--merge-output-format".into(),
            opts.merge_output_format.clone().into(),
            "--retries".into(),
            opts.retries.to_string().into(),
            "--fragment-retries".into(),
            opts.fragment_retries.to_string().into(),
            "--continue".into(),
            "--no-check-certificate".into(),
            "--no-mtime".into(),
            "--newline".into(),
        ];

        if let Some(container) = &opts.recode_video {
            args.push("--recode-video".into());
            args.push(container.clone().into());
        }

        if self.backend == Backend::YtDlp {
            // Print each title once the file is in place; keep downloading
            args.push("--print".into());
            args.push(format!("after_move:{TITLE_PREFIX}%(title)s").into());
            args.push("--no-simulate".into());
            // --print implies --quiet, which would hide progress
            args.push("--progress".into());
        }

        // End of options, so a URL can never be read as a flag
        args.push("--".into());
        args.push(url.into());
        args
    }
}

#[async_trait::async_trait]
impl Downloader for ProcessDownloader {
    async fn download(&self, url: &str) -> Result<DownloadOutcome> {
        let args = self.args(url);
        debug!(program = self.backend.program(), ?args, "Spawning downloader");

        let mut child = Command::new(self.backend.program())
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    Error::DownloaderMissing
                } else {
                    Error::download(url, format!("failed to run {}: {e}", self.backend))
                }
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::internal("downloader stdout not captured"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| Error::internal("downloader stderr not captured"))?;

        let (stdout, stderr, status) = tokio::try_join!(
            relay_output(stdout, "stdout"),
            relay_output(stderr, "stderr"),
            child.wait(),
        )
        .map_err(|e| Error::download(url, format!("lost contact with {}: {e}", self.backend)))?;

        if !status.success() {
            let message = stderr
                .last_line
                .unwrap_or_else(|| format!("{} exited with {status}", self.backend));
            return Err(Error::download(url, message));
        }

        let mut titles = stdout.titles;
        titles.extend(stderr.titles);
        Ok(DownloadOutcome { titles })
    }
}

/// What was kept from one of the downloader's output streams.
#[derive(Debug, Default)]
struct CapturedOutput {
    titles: Vec<String>,
    last_line: Option<String>,
}

/// Log a downloader stream line by line as it arrives.
///
/// Title lines are collected rather than logged; of the rest only the last
/// non-empty line is kept.
async fn relay_output<R>(reader: R, stream: &'static str) -> std::io::Result<CapturedOutput>
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut captured = CapturedOutput::default();
    let mut buf = Vec::new();

    while reader.read_until(b'\n', &mut buf).await? > 0 {
        let text = String::from_utf8_lossy(&buf).into_owned();
        buf.clear();

        let line = text.trim();
        if let Some(title) = line.strip_prefix(TITLE_PREFIX) {
            let title = title.trim();
            if !title.is_empty() {
                captured.titles.push(title.to_string());
            }
        } else if !line.is_empty() {
            debug!(stream, "{line}");
            captured.last_line = Some(line.to_string());
        }
    }
    Ok(captured)
}
