//! Configuration loading and validation.
//!
//! All configuration comes from environment variables (a `.env` file is
//! honoured via `dotenvy` in `main`). Missing credentials or an empty
//! file list are fatal before the watcher loop starts.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Default trigger pattern: a "start prepare task: <n>" line.
pub const DEFAULT_KEYWORDS: &str = r"re:start prepare task:\s*\d+";

/// Default raw-forward patterns: task submission and proof-finish lines.
pub const DEFAULT_RAW_ONLY: &[&str] = &[
    r"re:submit\s+taskData,\s*task:\s*\d+.*",
    r"re:task:\s*\d+\s+process\s+submitProofData\s+finish",
];

/// Default blackout window after a successful trigger send, in seconds.
pub const DEFAULT_BLACKOUT_SECONDS: u64 = 300;

/// Default directory for rotating file logs in production mode.
pub const DEFAULT_LOGS_DIR: &str = "logs";

/// Fatal configuration errors, reported before the loop starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required environment variable is missing or blank.
    #[error("required environment variable {0} is not set")]
    MissingVar(&'static str),
    /// A numeric environment variable failed to parse.
    #[error("environment variable {var} has invalid value {value:?}: expected an integer")]
    InvalidNumber {
        /// Variable name.
        var: &'static str,
        /// The offending value.
        value: String,
    },
}

/// Resolved runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Telegram Bot API token.
    pub bot_token: String,
    /// Destination chat identifier.
    pub chat_id: String,
    /// Log files to tail, in configuration order.
    pub log_files: Vec<PathBuf>,
    /// Trigger pattern entries (`re:` prefix = regex, else literal).
    pub keywords: Vec<String>,
    /// Raw-forward pattern entries, same syntax.
    pub raw_only_patterns: Vec<String>,
    /// Width of the blackout window after a successful trigger send.
    pub blackout: Duration,
    /// Directory for rotating file logs.
    pub logs_dir: PathBuf,
}

impl Config {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the bot token, chat ID, or file list is
    /// missing, or if `BLACKOUT_SECONDS` is not an integer.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    /// Load configuration through a custom variable resolver.
    ///
    /// Takes a resolver closure so tests can inject variables without
    /// mutating the process environment.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Config::from_env`].
    pub fn from_env_with(env: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bot_token = require(&env, "TELEGRAM_BOT_TOKEN")?;
        let chat_id = require(&env, "TELEGRAM_CHAT_ID")?;

        let log_files: Vec<PathBuf> = split_list(&env("LOG_FILES").unwrap_or_default())
            .into_iter()
            .map(PathBuf::from)
            .collect();
        if log_files.is_empty() {
            return Err(ConfigError::MissingVar("LOG_FILES"));
        }

        let keywords = match env("KEYWORDS") {
            Some(raw) => split_list(&raw),
            None => vec![DEFAULT_KEYWORDS.to_owned()],
        };

        let raw_only_patterns = match env("RAW_ONLY_PATTERNS") {
            Some(raw) => split_list(&raw),
            None => DEFAULT_RAW_ONLY.iter().map(|s| (*s).to_owned()).collect(),
        };

        let blackout = match env("BLACKOUT_SECONDS") {
            Some(raw) => {
                let secs: u64 = raw
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidNumber {
                        var: "BLACKOUT_SECONDS",
                        value: raw.clone(),
                    })?;
                Duration::from_secs(secs)
            }
            None => Duration::from_secs(DEFAULT_BLACKOUT_SECONDS),
        };

        let logs_dir = env("TAILGRAM_LOGS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_LOGS_DIR));

        Ok(Self {
            bot_token,
            chat_id,
            log_files,
            keywords,
            raw_only_patterns,
            blackout,
            logs_dir,
        })
    }
}

/// Fetch a required variable, treating blank values as absent.
fn require(
    env: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<String, ConfigError> {
    match env(key) {
        Some(v) if !v.trim().is_empty() => Ok(v.trim().to_owned()),
        _ => Err(ConfigError::MissingVar(key)),
    }
}

/// Split a comma-separated list, trimming entries and dropping blanks.
fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}
