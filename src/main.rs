#![allow(missing_docs)]

//! tailgram — tail log files, forward matching lines to Telegram.
//!
//! `tailgram start` runs the watcher loop; `tailgram check` validates
//! configuration and patterns without sending anything.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::{mpsc, watch};
use tracing::{error, info, warn};

use tailgram::config::Config;
use tailgram::logging;
use tailgram::notify::{Dispatcher, TelegramSink};
use tailgram::patterns::PatternSet;
use tailgram::source::TailSource;
use tailgram::watcher::Watcher;

/// Buffer size for the shared line funnel.
const FUNNEL_CAPACITY: usize = 256;

#[derive(Parser)]
#[command(name = "tailgram", about = "Log watcher with Telegram notifications")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Tail the configured files and forward matching lines.
    Start,
    /// Validate configuration and pattern compilation, then exit.
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    // A .env file is optional; the real environment always wins.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    match cli.command {
        Command::Start => start().await,
        Command::Check => check(),
    }
}

/// Compile both pattern sets from configuration entries.
///
/// A malformed pattern is fatal here, before anything is tailed.
fn compile_sets(config: &Config) -> Result<(PatternSet, PatternSet)> {
    let raw = PatternSet::compile(&config.raw_only_patterns)
        .context("invalid raw-forward pattern (RAW_ONLY_PATTERNS)")?;
    let triggers =
        PatternSet::compile(&config.keywords).context("invalid trigger pattern (KEYWORDS)")?;
    Ok((raw, triggers))
}

/// Run the watcher: spawn tails, announce startup, loop until shutdown.
async fn start() -> Result<()> {
    let config = Config::from_env().context("failed to load configuration")?;
    let _logging_guard = logging::init_production(&config.logs_dir)?;

    info!("tailgram starting");

    let (raw, triggers) = compile_sets(&config)?;

    let (line_tx, line_rx) = mpsc::channel(FUNNEL_CAPACITY);
    let mut sources = Vec::with_capacity(config.log_files.len());
    for path in &config.log_files {
        let source = TailSource::spawn(path, line_tx.clone())
            .with_context(|| format!("failed to start tailing {}", path.display()))?;
        sources.push(source);
    }
    // The watcher sees a closed funnel once every reader task is gone.
    drop(line_tx);

    let dispatcher = Dispatcher::new(TelegramSink::new(&config.bot_token, &config.chat_id));

    // Startup notifications: banner is best-effort, last-line doubly so.
    if let Err(e) = dispatcher.send_online_banner(&config.log_files).await {
        error!(error = %e, "startup banner send failed");
    }
    if let Some(first) = config.log_files.first() {
        dispatcher.send_last_line(first).await;
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        wait_for_signal().await;
        let _ = shutdown_tx.send(true);
    });

    let mut watcher = Watcher::new(raw, triggers, dispatcher, config.blackout, line_rx);
    watcher.run(shutdown_rx).await;

    for source in sources {
        source.close().await;
    }

    info!("tailgram exited");
    Ok(())
}

/// Validate configuration and report what would run.
fn check() -> Result<()> {
    logging::init_cli();

    let config = Config::from_env().context("failed to load configuration")?;
    let (raw, triggers) = compile_sets(&config)?;

    println!("configuration OK");
    for path in &config.log_files {
        println!("  file: {}", path.display());
    }
    println!("  trigger patterns: {}", triggers.len());
    println!("  raw-forward patterns: {}", raw.len());
    println!("  blackout: {}s", config.blackout.as_secs());
    Ok(())
}

/// Wait for ctrl-c or, on unix, SIGTERM.
async fn wait_for_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(s) => s,
            Err(e) => {
                warn!(error = %e, "SIGTERM handler unavailable, ctrl-c only");
                if let Err(e) = tokio::signal::ctrl_c().await {
                    error!(error = %e, "signal wait failed");
                }
                return;
            }
        };

        tokio::select! {
            _ = tokio::signal::ctrl_c() => info!("received ctrl-c"),
            _ = sigterm.recv() => info!("received SIGTERM"),
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "signal wait failed");
        }
    }
}
