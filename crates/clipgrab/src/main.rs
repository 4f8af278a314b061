//! `clipgrab` - CLI for the clipboard YouTube downloader
//!
//! Without a command this runs the clipboard watcher. The other commands
//! download links directly and inspect configuration and history.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{bail, Context};
use clap::Parser;
use tracing::{error, info, warn};

use clipgrab::cli::{Cli, Command, ConfigCommand, HistoryCommand};
use clipgrab::{
    init_logging, notifier_for, watcher, Backend, ClipboardMonitor, Config, DownloadOptions,
    DownloadQueue, EnqueueOutcome, Error, History, LinkMatcher, Notifier, ProcessDownloader,
    Watcher,
};

// Platform-specific imports using conditional compilation
#[cfg(target_os = "linux")]
use clipgrab_linux as platform;

#[cfg(target_os = "macos")]
use clipgrab_mac as platform;

#[cfg(target_os = "windows")]
use clipgrab_windows as platform;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let verbosity = cli.verbosity();
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(Config::default_config_path);
    let command = cli.into_command();

    // Validation reports on its own file, so a broken config must not stop it
    if let Command::Config(ConfigCommand::Validate { file }) = &command {
        init_logging(verbosity, None);
        handle_validate(file.as_deref().unwrap_or(&config_path));
        return Ok(());
    }

    let config = Config::load_from(Some(config_path.clone()))
        .with_context(|| format!("loading configuration from {}", config_path.display()))?;

    // The log file lives under the download folder, so logging starts after config
    let downloads = matches!(command, Command::Watch | Command::Download(_));
    let log_dir = (config.log_to_file && downloads).then(|| config.log_dir());
    if let Some(path) = init_logging(verbosity, log_dir.as_deref()) {
        info!("Logging to {}", path.display());
    }

    platform::init().map_err(|e| anyhow::anyhow!("platform initialization failed: {e}"))?;

    match command {
        Command::Watch => handle_watch(&config, &config_path).await,
        Command::Download(cmd) => handle_download(&config, &cmd.urls).await,
        Command::Check(cmd) => {
            handle_check(&cmd.text);
            Ok(())
        }
        Command::History(cmd) => handle_history(&config, &cmd),
        Command::Status(cmd) => handle_status(&config, &config_path, cmd.json).await,
        Command::Config(cmd) => handle_config(&config, &config_path, cmd),
    }
}

/// Wait for Ctrl+C.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Could not listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
}

/// Open the history database, or carry on without one.
fn open_history(config: &Config) -> Option<Arc<Mutex<History>>> {
    let path = config.history_path();
    match History::open(&path) {
        Ok(history) => {
            if let Err(e) = history.mark_abandoned_pending() {
                warn!(error = %e, "Could not tidy download history");
            }
            Some(Arc::new(Mutex::new(history)))
        }
        Err(e) => {
            warn!(error = %e, "Download history disabled");
            None
        }
    }
}

/// Build the download queue shared by `watch` and `download`.
async fn build_queue(
    config: &Config,
    notifier: Arc<dyn Notifier>,
) -> anyhow::Result<Arc<DownloadQueue>> {
    config
        .ensure_download_dir()
        .context("creating the download folder")?;
    info!("Download directory: {}", config.download_path.display());

    let (backend, version) = Backend::detect(config.downloader).await?;
    info!("Using {} {}", backend, version);

    let history = open_history(config);
    let remembered = match (&history, config.remember_downloads) {
        (Some(history), true) => history
            .lock()
            .map_err(|_| Error::internal("history lock poisoned"))?
            .completed_urls()?,
        _ => Vec::new(),
    };

    let downloader = ProcessDownloader::new(backend, DownloadOptions::from(config));
    let queue = DownloadQueue::new(Arc::new(downloader), notifier, history);
    queue.preload_seen(remembered);
    Ok(Arc::new(queue))
}

async fn handle_watch(config: &Config, config_path: &Path) -> anyhow::Result<()> {
    if let Err(e) = Config::ensure_file(config_path) {
        warn!(error = %e, "Could not create config file");
    }

    let notifier = notifier_for(config.enable_notifications);
    let queue = build_queue(config, Arc::clone(&notifier)).await?;

    println!("{}", watcher::banner(config));
    info!("Download path: {}", config.download_path.display());
    info!("Video format: {}", config.video_format);

    let watcher = Watcher::new(queue, notifier);
    let monitor = ClipboardMonitor::system(config.check_interval());
    let abandoned = watcher.run(monitor, shutdown_signal()).await;

    if abandoned > 0 {
        println!("Stopped with {abandoned} download(s) unfinished.");
    }
    Ok(())
}

async fn handle_download(config: &Config, urls: &[String]) -> anyhow::Result<()> {
    let matcher = LinkMatcher::new();
    let links = urls
        .iter()
        .map(|url| matcher.find(url).ok_or_else(|| Error::NotALink(url.clone())))
        .collect::<clipgrab::Result<Vec<_>>>()?;

    let queue = build_queue(config, notifier_for(config.enable_notifications)).await?;
    for link in links {
        let url = link.url.clone();
        match queue.enqueue(link)? {
            EnqueueOutcome::Queued { position } => println!("Queued ({position}): {url}"),
            EnqueueOutcome::Duplicate => println!("Skipped (already downloaded): {url}"),
        }
    }

    tokio::select! {
        () = queue.drain() => {}
        () = shutdown_signal() => {
            let abandoned = queue.shutdown().await;
            bail!("interrupted with {abandoned} download(s) unfinished");
        }
    }

    let snapshot = queue.snapshot();
    println!(
        "Finished: {} downloaded, {} failed",
        snapshot.completed, snapshot.failed
    );
    if snapshot.failed > 0 {
        bail!("{} download(s) failed", snapshot.failed);
    }
    Ok(())
}

fn handle_check(text: &str) {
    match LinkMatcher::new().find(text) {
        Some(link) => {
            println!("Link:  {}", link.url);
            println!("Kind:  {}", link.kind);
        }
        None => println!("No YouTube link found."),
    }
}

fn handle_history(config: &Config, cmd: &HistoryCommand) -> anyhow::Result<()> {
    let path = config.history_path();
    if !path.exists() {
        if cmd.json {
            println!("[]");
        } else {
            println!("No downloads recorded yet.");
        }
        return Ok(());
    }

    let history = History::open(&path)?;
    let records = history.recent(cmd.limit)?;

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    if records.is_empty() {
        println!("No downloads recorded yet.");
        return Ok(());
    }

    for record in records {
        let when = record
            .queued_at
            .with_timezone(&chrono::Local)
            .format("%Y-%m-%d %H:%M");
        let label = record.title.as_deref().unwrap_or(&record.url);
        println!("{when}  {:<11}  {label}", record.status.to_string());
        if let Some(error) = &record.error {
            println!("{:31}{error}", "");
        }
    }
    Ok(())
}

async fn handle_status(config: &Config, config_path: &Path, json: bool) -> anyhow::Result<()> {
    let downloader = match Backend::detect(config.downloader).await {
        Ok(found) => Some(found),
        Err(e) if e.is_downloader_missing() => None,
        Err(e) => return Err(e.into()),
    };
    let history_path = config.history_path();
    let stats = if history_path.exists() {
        Some(History::open(&history_path)?.stats()?)
    } else {
        None
    };

    if json {
        let status = serde_json::json!({
            "platform": platform::platform_name(),
            "downloader": downloader.as_ref().map(|(backend, _)| backend.program()),
            "downloader_version": downloader.as_ref().map(|(_, version)| version),
            "config_path": config_path,
            "download_path": config.download_path,
            "history_path": history_path,
            "history": stats,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!("clipgrab status");
    println!("---------------");
    println!("Platform:      {}", platform::platform_name());
    match &downloader {
        Some((backend, version)) => println!("Downloader:    {backend} {version}"),
        None => println!("Downloader:    not found (install yt-dlp)"),
    }
    println!("Config:        {}", config_path.display());
    println!("Downloads:     {}", config.download_path.display());
    println!("History:       {}", history_path.display());
    if let Some(stats) = stats {
        println!();
        println!("Downloads recorded: {}", stats.total);
        println!("  Completed:        {}", stats.completed);
        println!("  Failed:           {}", stats.failed);
        println!("  Abandoned:        {}", stats.abandoned);
        if let Some(last) = stats.last_completed {
            println!(
                "  Last completed:   {}",
                last.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M")
            );
        }
        println!("  Database size:    {} bytes", stats.db_size_bytes);
    }
    Ok(())
}

fn handle_config(config: &Config, config_path: &Path, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Downloads]");
                println!("  Download path:       {}", config.download_path.display());
                println!("  Video format:        {}", config.video_format);
                println!("  Filename template:   {}", config.filename_template);
                println!("  Merge format:        {}", config.merge_output_format);
                println!(
                    "  Recode to:           {}",
                    config.recode_video.as_deref().unwrap_or("(off)")
                );
                println!("  Downloader:          {}", config.downloader);
                println!("  Retries:             {}", config.retries);
                println!("  Fragment retries:    {}", config.fragment_retries);
                println!();
                println!("[Watcher]");
                println!("  Check interval (s):  {}", config.check_interval);
                println!("  Notifications:       {}", config.enable_notifications);
                println!();
                println!("[History]");
                println!("  History path:        {}", config.history_path().display());
                println!("  Remember downloads:  {}", config.remember_downloads);
                println!("  Log to file:         {}", config.log_to_file);
            }
        }
        ConfigCommand::Path => {
            println!("{}", config_path.display());
        }
        ConfigCommand::Init { force } => {
            if config_path.exists() && !force {
                println!("Config file already exists: {}", config_path.display());
                println!("Use --force to overwrite it with defaults.");
            } else {
                Config::default().write_to(config_path)?;
                println!("Wrote default configuration to {}", config_path.display());
            }
        }
        ConfigCommand::Validate { file } => {
            handle_validate(file.as_deref().unwrap_or(config_path));
        }
    }
    Ok(())
}

fn handle_validate(path: &Path) {
    println!("Validating configuration: {}", path.display());
    if !path.exists() {
        println!("File not found; defaults would be used.");
    }
    match Config::load_from(Some(path.to_path_buf())) {
        Ok(_) => println!("Configuration is valid."),
        Err(e) => println!("Configuration error: {e}"),
    }
}
