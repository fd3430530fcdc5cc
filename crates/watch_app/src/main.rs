mod config;
mod console;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use log::LevelFilter;
use tokio_util::sync::CancellationToken;
use watch_engine::{ReqwestContentFetcher, ReqwestWebhookDispatcher, Scheduler};
use watch_logging::{watch_info, watch_warn, LogDestination, DEFAULT_LOG_FILE};

use crate::config::WatchConfig;

/// Polls web pages for changes and calls a webhook when a watched value changes.
#[derive(Debug, Parser)]
#[command(name = "page-watch", version, about)]
struct Cli {
    /// RON file with settings and initial jobs.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Poll interval in seconds; overrides the config file.
    #[arg(long)]
    poll_interval: Option<u64>,
    /// Log destination: terminal, file or both.
    #[arg(long, default_value = "terminal")]
    log: LogDestination,
    #[arg(long, default_value = DEFAULT_LOG_FILE)]
    log_file: PathBuf,
    /// Log at debug level.
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    watch_logging::initialize(cli.log, level, &cli.log_file);

    let mut config = match &cli.config {
        Some(path) => WatchConfig::load(path)?,
        None => WatchConfig::default(),
    };
    if let Some(secs) = cli.poll_interval {
        config.poll_interval_secs = secs;
    }
    config.validate()?;

    let fetcher = Arc::new(ReqwestContentFetcher::new(config.fetch_settings()));
    let scheduler = Scheduler::new(
        fetcher.clone(),
        Arc::new(ReqwestWebhookDispatcher::new(config.dispatch_settings())),
        config.scheduler_config(),
    );
    for (index, job) in config.jobs.into_iter().enumerate() {
        scheduler
            .submit(job.into())
            .with_context(|| format!("configured job #{}", index + 1))?;
    }

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                watch_warn!("Cannot listen for Ctrl-C: {}", err);
                return;
            }
            watch_info!("Interrupted, shutting down");
            shutdown.cancel();
        }
    });
    tokio::spawn(console::run_console(
        scheduler.clone(),
        fetcher,
        shutdown.clone(),
    ));

    scheduler.run(shutdown).await;
    Ok(())
}
