//! Tailgram — a log watcher that forwards matching lines to Telegram.
//!
//! Tails one or more append-only log files, classifies each new line
//! against two independent pattern sets (raw-forward and triggering),
//! and sends qualifying lines to a Telegram chat. A successful trigger
//! send opens a blackout window that suppresses further trigger
//! notifications for a configurable duration; raw forwards are never
//! suppressed.
//!
//! See `DESIGN.md` for architecture notes.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod blackout;
pub mod classify;
pub mod config;
pub mod logging;
pub mod notify;
pub mod patterns;
pub mod source;
pub mod watcher;
