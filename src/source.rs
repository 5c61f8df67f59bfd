//! Line sources: supervised `tail -F` processes feeding a single funnel.
//!
//! Each watched file gets one `tail -n 0 -F` child whose stdout lines are
//! forwarded, tagged with their path, into a shared mpsc channel. The
//! channel is the single serializing point: reader tasks run concurrently
//! but classification and gate access happen only on the consumer side.
//!
//! `tail -F` owns rotation handling; end-of-stream on a handle is silent.
//! Stderr from tail is logged at `warn` and never enters the funnel.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// How long to wait for a terminated tail child to exit.
const CLOSE_WAIT_SECS: u64 = 2;

/// One log line tagged with the file it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLine {
    /// Watched file that produced the line.
    pub path: PathBuf,
    /// Line text, trailing newline stripped.
    pub text: String,
}

/// Errors from starting a line source.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The tail child process could not be spawned.
    #[error("failed to spawn tail for {path}: {source}")]
    Spawn {
        /// Watched file path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The spawned child was missing an expected pipe.
    #[error("tail for {path} has no captured {stream} pipe")]
    MissingPipe {
        /// Watched file path.
        path: PathBuf,
        /// Which pipe was absent.
        stream: &'static str,
    },
}

/// A supervised `tail -n 0 -F` process for one watched file.
///
/// Registered once at startup per configured path and kept until
/// shutdown; reconnection across log rotation is tail's job.
pub struct TailSource {
    path: PathBuf,
    child: Child,
    stdout_task: JoinHandle<()>,
    stderr_task: JoinHandle<()>,
}

impl TailSource {
    /// Spawn tail for `path` and start forwarding its stdout lines into `tx`.
    ///
    /// `-n 0` skips existing content; only lines appended after startup
    /// are forwarded.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] when the child cannot be spawned or its
    /// pipes were not captured.
    pub fn spawn(path: &Path, tx: mpsc::Sender<SourceLine>) -> Result<Self, SourceError> {
        let mut child = Command::new("tail")
            .arg("-n")
            .arg("0")
            .arg("-F")
            .arg(path)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| SourceError::Spawn {
                path: path.to_owned(),
                source,
            })?;

        let stdout = child.stdout.take().ok_or_else(|| SourceError::MissingPipe {
            path: path.to_owned(),
            stream: "stdout",
        })?;
        let stderr = child.stderr.take().ok_or_else(|| SourceError::MissingPipe {
            path: path.to_owned(),
            stream: "stderr",
        })?;

        let stdout_path = path.to_owned();
        let stdout_task = tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(text)) => {
                        let line = SourceLine {
                            path: stdout_path.clone(),
                            text,
                        };
                        if tx.send(line).await.is_err() {
                            debug!(path = %stdout_path.display(), "funnel closed, reader exiting");
                            break;
                        }
                    }
                    // End of stream: tail exited or was closed. Rotation
                    // never reaches here; tail -F follows it internally.
                    Ok(None) => break,
                    Err(e) => {
                        warn!(path = %stdout_path.display(), error = %e, "tail stdout read error");
                        break;
                    }
                }
            }
        });

        let stderr_path = path.to_owned();
        let stderr_task = tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(text)) = lines.next_line().await {
                // tail chatter (rotation notices, access errors) is logged,
                // never classified or forwarded.
                warn!(path = %stderr_path.display(), msg = %text, "tail stderr");
            }
        });

        info!(path = %path.display(), "watching");

        Ok(Self {
            path: path.to_owned(),
            child,
            stdout_task,
            stderr_task,
        })
    }

    /// Watched file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Terminate the tail child and wait for it, bounded by a short timeout.
    pub async fn close(mut self) {
        if let Err(e) = self.child.start_kill() {
            debug!(path = %self.path.display(), error = %e, "tail already gone");
        }
        match tokio::time::timeout(Duration::from_secs(CLOSE_WAIT_SECS), self.child.wait()).await {
            Ok(Ok(status)) => {
                debug!(path = %self.path.display(), %status, "tail exited");
            }
            Ok(Err(e)) => {
                warn!(path = %self.path.display(), error = %e, "error awaiting tail exit");
            }
            Err(_) => {
                warn!(path = %self.path.display(), "tail did not exit within close timeout");
            }
        }
        self.stdout_task.abort();
        self.stderr_task.abort();
    }
}
