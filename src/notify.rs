//! Notification dispatch: MarkdownV2 escaping, the Telegram sink, and
//! the dispatcher that formats raw and trigger messages.
//!
//! The sink is a trait so the watcher loop can be exercised against a
//! recording double. The real sink posts `sendMessage` to the Telegram
//! Bot API with a strict-markup parse mode, decoded through a typed
//! `ok`/`description` response wrapper.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

/// Base URL for the Telegram Bot API.
const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Per-request timeout for `sendMessage`, in seconds.
const SEND_TIMEOUT_SECS: u64 = 10;

/// Bold title prepended to trigger notifications.
const TRIGGER_TITLE: &str = "*Received Task*";

/// Characters Telegram's MarkdownV2 mode reserves.
const MDV2_RESERVED: &[char] = &[
    '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!',
];

/// Escape a line for Telegram MarkdownV2.
///
/// Every reserved character is prefixed with a backslash. Applied to all
/// outbound payload text, including the startup banner and the last-line
/// notice.
pub fn escape_markdown_v2(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        if MDV2_RESERVED.contains(&ch) {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

/// Delivery errors from the notification sink.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// The Telegram API answered with `ok: false`.
    #[error("Telegram API error: {0}")]
    Api(String),
    /// HTTP transport error (timeout, DNS, connection reset).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// A sink that accepts one formatted message and attempts delivery.
///
/// At-most-once: a returned error means the message is gone; callers log
/// and move on, never retry.
#[async_trait]
pub trait NotifySink: Send + Sync {
    /// Deliver `text` (already escaped for the sink's markup mode).
    async fn send(&self, text: &str) -> Result<(), NotifyError>;
}

/// Build the `sendMessage` request body.
///
/// Strict-markup mode with link previews off; `text` must already be
/// escaped for MarkdownV2.
fn send_message_body(chat_id: &str, text: &str) -> serde_json::Value {
    serde_json::json!({
        "chat_id": chat_id,
        "text": text,
        "parse_mode": "MarkdownV2",
        "disable_web_page_preview": true,
    })
}

/// Generic Telegram Bot API response wrapper.
#[derive(Debug, Deserialize)]
struct TelegramResponse {
    ok: bool,
    description: Option<String>,
}

/// Real sink: HTTPS `sendMessage` against the Telegram Bot API.
pub struct TelegramSink {
    client: reqwest::Client,
    bot_token: String,
    chat_id: String,
}

impl TelegramSink {
    /// Create a sink for the given bot token and destination chat.
    pub fn new(bot_token: impl Into<String>, chat_id: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            bot_token: bot_token.into(),
            chat_id: chat_id.into(),
        }
    }
}

#[async_trait]
impl NotifySink for TelegramSink {
    async fn send(&self, text: &str) -> Result<(), NotifyError> {
        let url = format!("{}/bot{}/sendMessage", TELEGRAM_API_BASE, self.bot_token);
        let body = send_message_body(&self.chat_id, text);

        let resp = self
            .client
            .post(&url)
            .json(&body)
            .timeout(Duration::from_secs(SEND_TIMEOUT_SECS))
            .send()
            .await?;

        let response: TelegramResponse = resp.json().await?;
        if !response.ok {
            return Err(NotifyError::Api(
                response
                    .description
                    .unwrap_or_else(|| "unknown error".to_owned()),
            ));
        }
        Ok(())
    }
}

/// Formats and sends raw and trigger notifications through a sink.
pub struct Dispatcher<S: NotifySink> {
    sink: S,
}

impl<S: NotifySink> Dispatcher<S> {
    /// Wrap a sink.
    pub fn new(sink: S) -> Self {
        Self { sink }
    }

    /// Forward a raw-category line verbatim, no title.
    ///
    /// # Errors
    ///
    /// Returns the sink's [`NotifyError`] on delivery failure; callers
    /// log and continue.
    pub async fn send_raw(&self, line: &str) -> Result<(), NotifyError> {
        self.sink.send(&escape_markdown_v2(line)).await
    }

    /// Send a trigger-category line under the bold trigger title.
    ///
    /// The caller extends the blackout gate only when this returns `Ok`;
    /// a failed send must leave the gate exactly as it was.
    ///
    /// # Errors
    ///
    /// Returns the sink's [`NotifyError`] on delivery failure.
    pub async fn send_trigger(&self, line: &str) -> Result<(), NotifyError> {
        let text = format!("{TRIGGER_TITLE}\n{}", escape_markdown_v2(line));
        self.sink.send(&text).await
    }

    /// Send the startup banner naming all watched files.
    ///
    /// # Errors
    ///
    /// Returns the sink's [`NotifyError`] on delivery failure; startup
    /// continues regardless.
    pub async fn send_online_banner(&self, files: &[std::path::PathBuf]) -> Result<(), NotifyError> {
        let listing = files
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        let text = format!(
            "*Log Watcher is online*\n*Files:* {}",
            escape_markdown_v2(&listing)
        );
        self.sink.send(&text).await
    }

    /// Best-effort notice with the last non-empty line of `path`.
    ///
    /// Any failure (unreadable file, empty file, delivery error) is
    /// downgraded to a warning; startup never aborts on this. The read
    /// is lossy so stray non-UTF-8 bytes in the log do not lose the line.
    pub async fn send_last_line(&self, path: &Path) {
        let contents = match tokio::fs::read(path).await {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "could not read last log line");
                return;
            }
        };

        let Some(last) = contents.lines().rev().find(|l| !l.trim().is_empty()) else {
            info!(path = %path.display(), "no last log line to report");
            return;
        };

        let text = format!("*Last log line:*\n{}", escape_markdown_v2(last.trim()));
        if let Err(e) = self.sink.send(&text).await {
            warn!(error = %e, "last-line notice failed (non-fatal)");
        }
    }
}
