//! The watcher loop: classify incoming lines and dispatch notifications.
//!
//! Single consumer of the line funnel. Each tick drains one batch of
//! ready lines; gate openness is computed once per batch, so a trigger
//! that fires mid-batch does not gate later lines of the same batch
//! (matching the per-wakeup check of the original multiplexer design).

use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tracing::{debug, error, info};

use crate::blackout::BlackoutGate;
use crate::classify::{classify, Category};
use crate::notify::{Dispatcher, NotifySink};
use crate::patterns::PatternSet;
use crate::source::SourceLine;

/// Maximum lines drained per tick. A throughput knob only; gating is
/// per-batch regardless of batch size.
const TICK_BATCH: usize = 64;

/// The line-classification and notification-dispatch engine.
///
/// Owns the pattern sets, the blackout gate, and the dispatcher. All
/// cross-iteration mutable state (the gate) lives here and is touched
/// only by [`Watcher::run`].
pub struct Watcher<S: NotifySink> {
    raw: PatternSet,
    triggers: PatternSet,
    gate: BlackoutGate,
    dispatcher: Dispatcher<S>,
    blackout: Duration,
    rx: mpsc::Receiver<SourceLine>,
}

impl<S: NotifySink> Watcher<S> {
    /// Assemble the watcher from its compiled parts.
    pub fn new(
        raw: PatternSet,
        triggers: PatternSet,
        dispatcher: Dispatcher<S>,
        blackout: Duration,
        rx: mpsc::Receiver<SourceLine>,
    ) -> Self {
        Self {
            raw,
            triggers,
            gate: BlackoutGate::new(),
            dispatcher,
            blackout,
            rx,
        }
    }

    /// Run until a shutdown signal arrives or every line source is gone.
    ///
    /// Each tick waits for the next batch of lines or the shutdown flag.
    /// A shutdown observed mid-wait stops before the next batch; the
    /// in-flight batch is always finished first.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) {
        info!(
            raw_patterns = self.raw.len(),
            trigger_patterns = self.triggers.len(),
            blackout_secs = self.blackout.as_secs(),
            "watcher running"
        );

        let mut batch: Vec<SourceLine> = Vec::with_capacity(TICK_BATCH);
        loop {
            batch.clear();
            tokio::select! {
                _ = shutdown.changed() => {
                    info!("shutdown signal received");
                    break;
                }
                received = self.rx.recv_many(&mut batch, TICK_BATCH) => {
                    if received == 0 {
                        info!("all line sources closed");
                        break;
                    }
                    self.process_batch(&mut batch).await;
                }
            }
        }

        info!("watcher stopped");
    }

    /// Process one tick's batch in arrival order.
    ///
    /// Gate openness is read once, against the tick's `now`, for every
    /// trigger line in the batch.
    async fn process_batch(&mut self, batch: &mut Vec<SourceLine>) {
        let now = Instant::now();
        let gate_open = self.gate.is_open_at(now);

        for line in batch.drain(..) {
            self.handle_line(&line, gate_open).await;
        }
    }

    /// Classify and dispatch a single line.
    async fn handle_line(&mut self, line: &SourceLine, gate_open: bool) {
        let text = line.text.trim_end_matches(['\n', '\r']);
        let decision = classify(text, &self.raw, &self.triggers);

        match decision.category {
            // Raw forwards bypass the gate entirely.
            Category::Raw => {
                if let Err(e) = self.dispatcher.send_raw(text).await {
                    error!(path = %line.path.display(), error = %e, "raw forward failed");
                }
            }
            Category::Trigger => {
                if !gate_open {
                    debug!(path = %line.path.display(), "trigger suppressed by blackout");
                    return;
                }
                match self.dispatcher.send_trigger(text).await {
                    Ok(()) => {
                        // Deadline counts from the send, not the tick start,
                        // and overwrites any earlier deadline.
                        self.gate.extend(Instant::now(), self.blackout);
                        info!(
                            path = %line.path.display(),
                            pattern = decision.matched.map(|m| m.entry()).unwrap_or_default(),
                            blackout_secs = self.blackout.as_secs(),
                            "trigger sent, blackout engaged"
                        );
                    }
                    // A failed send must not silence future genuine triggers:
                    // the gate is left exactly as it was.
                    Err(e) => {
                        error!(path = %line.path.display(), error = %e, "trigger send failed");
                    }
                }
            }
            Category::Ignore => {}
        }
    }
}
