//! End-to-end watcher loop scenarios with a scripted line source and a
//! recording sink, driven on tokio's paused clock.

use std::path::PathBuf;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use tailgram::config::{DEFAULT_KEYWORDS, DEFAULT_RAW_ONLY};
use tailgram::notify::Dispatcher;
use tailgram::patterns::PatternSet;
use tailgram::source::SourceLine;
use tailgram::watcher::Watcher;

use crate::common::RecordingSink;

/// Blackout window used throughout these tests.
const WINDOW: Duration = Duration::from_secs(300);

/// A raw-forward line under the default patterns, usable as a probe: once
/// it shows up in the sink, everything fed before it has been decided.
const RAW_PROBE: &str = "submit taskData, task: 7 foo";

fn line(text: &str) -> SourceLine {
    SourceLine {
        path: PathBuf::from("test.log"),
        text: text.to_owned(),
    }
}

fn default_sets() -> (PatternSet, PatternSet) {
    let raw = PatternSet::compile(DEFAULT_RAW_ONLY.iter().copied()).expect("raw set");
    let triggers = PatternSet::compile([DEFAULT_KEYWORDS]).expect("trigger set");
    (raw, triggers)
}

/// A running watcher wired to a scripted source and a recording sink.
struct Harness {
    sink: RecordingSink,
    tx: Option<mpsc::Sender<SourceLine>>,
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl Harness {
    fn start() -> Self {
        let sink = RecordingSink::new();
        let (tx, rx) = mpsc::channel(64);
        let (shutdown, shutdown_rx) = watch::channel(false);
        let (raw, triggers) = default_sets();
        let mut watcher = Watcher::new(raw, triggers, Dispatcher::new(sink.clone()), WINDOW, rx);
        let handle = tokio::spawn(async move {
            watcher.run(shutdown_rx).await;
        });
        Self {
            sink,
            tx: Some(tx),
            shutdown,
            handle,
        }
    }

    async fn feed(&self, text: &str) {
        self.tx
            .as_ref()
            .expect("source open")
            .send(line(text))
            .await
            .expect("feed line");
    }

    /// Wait (on the virtual clock) until the sink holds `n` messages.
    async fn wait_for_count(&self, n: usize) {
        for _ in 0..1_000 {
            if self.sink.count() >= n {
                return;
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        panic!("sink never reached {n} messages: {:?}", self.sink.sent());
    }

    /// Let the watcher drain and decide every line fed so far.
    async fn settle(&self) {
        let tx = self.tx.as_ref().expect("source open");
        while tx.capacity() < tx.max_capacity() {
            tokio::task::yield_now().await;
        }
        for _ in 0..32 {
            tokio::task::yield_now().await;
        }
    }

    /// Close the source and wait for the loop to stop; returns the transcript.
    async fn finish(mut self) -> Vec<String> {
        self.tx.take();
        self.handle.await.expect("watcher task");
        self.sink.sent()
    }
}

#[tokio::test(start_paused = true)]
async fn trigger_sends_titled_message_and_closes_gate() {
    let harness = Harness::start();

    harness.feed("2024-01-01 start prepare task: 42").await;
    harness.wait_for_count(1).await;
    assert!(harness.sink.sent()[0].starts_with("*Received Task*\n"));

    // A second trigger inside the window is discarded without sending.
    harness.feed("start prepare task: 43").await;
    harness.feed(RAW_PROBE).await;
    harness.wait_for_count(2).await;

    let transcript = harness.finish().await;
    assert_eq!(transcript.len(), 2);
    assert!(transcript[0].contains("task: 42"));
    assert_eq!(transcript[1], RAW_PROBE);
}

#[tokio::test(start_paused = true)]
async fn gate_reopens_at_window_end() {
    let harness = Harness::start();

    harness.feed("start prepare task: 1").await;
    harness.wait_for_count(1).await;

    // Mid-window: suppressed.
    tokio::time::advance(Duration::from_secs(100)).await;
    harness.feed("start prepare task: 2").await;
    harness.feed(RAW_PROBE).await;
    harness.wait_for_count(2).await;
    assert_eq!(harness.sink.count(), 2);

    // Past the window: admitted again.
    tokio::time::advance(Duration::from_secs(300)).await;
    harness.feed("start prepare task: 3").await;
    harness.wait_for_count(3).await;

    let transcript = harness.finish().await;
    assert!(transcript[0].contains("task: 1"));
    assert_eq!(transcript[1], RAW_PROBE);
    assert!(transcript[2].contains("task: 3"));
}

#[tokio::test(start_paused = true)]
async fn raw_forward_bypasses_an_active_blackout() {
    let harness = Harness::start();

    harness.feed("start prepare task: 9").await;
    harness.wait_for_count(1).await;

    harness.feed("task: 9 process submitProofData finish").await;
    harness.wait_for_count(2).await;

    let transcript = harness.finish().await;
    assert_eq!(transcript[1], "task: 9 process submitProofData finish");
    assert!(!transcript[1].contains("Received Task"));
}

#[tokio::test(start_paused = true)]
async fn unmatched_lines_cause_no_send() {
    let harness = Harness::start();

    harness.feed("hello world").await;
    harness.feed(RAW_PROBE).await;
    harness.wait_for_count(1).await;

    let transcript = harness.finish().await;
    assert_eq!(transcript, vec![RAW_PROBE.to_owned()]);
}

#[tokio::test(start_paused = true)]
async fn failed_trigger_send_leaves_gate_open() {
    let harness = Harness::start();

    harness.sink.set_failing(true);
    harness.feed("start prepare task: 5").await;
    harness.settle().await;
    assert_eq!(harness.sink.count(), 0, "failed send must not record");

    // The failed attempt must not have armed the blackout: the next
    // trigger goes straight through.
    harness.sink.set_failing(false);
    harness.feed("start prepare task: 6").await;
    harness.wait_for_count(1).await;

    let transcript = harness.finish().await;
    assert_eq!(transcript.len(), 1);
    assert!(transcript[0].contains("task: 6"));
}

#[tokio::test(start_paused = true)]
async fn triggers_in_one_batch_all_see_the_pre_tick_gate() {
    // Queue both triggers before the loop starts so they land in the
    // same tick batch; both are judged against the gate state at the
    // top of the tick, so both dispatch.
    let sink = RecordingSink::new();
    let (tx, rx) = mpsc::channel(64);
    let (_shutdown, shutdown_rx) = watch::channel(false);
    let (raw, triggers) = default_sets();

    tx.send(line("start prepare task: 10")).await.expect("feed");
    tx.send(line("start prepare task: 11")).await.expect("feed");
    drop(tx);

    let mut watcher = Watcher::new(raw, triggers, Dispatcher::new(sink.clone()), WINDOW, rx);
    watcher.run(shutdown_rx).await;

    let transcript = sink.sent();
    assert_eq!(transcript.len(), 2);
    assert!(transcript[0].contains("task: 10"));
    assert!(transcript[1].contains("task: 11"));
}

#[tokio::test(start_paused = true)]
async fn shutdown_signal_stops_the_loop() {
    let harness = Harness::start();

    harness.shutdown.send(true).expect("signal");
    // The source stays open; the loop must exit on the signal alone.
    harness.handle.await.expect("watcher task");
    assert_eq!(harness.sink.count(), 0);
}
