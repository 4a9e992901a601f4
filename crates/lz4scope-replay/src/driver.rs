use std::fmt::Display;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use lz4scope_types::{QueueError, ReplayStats};

use crate::payload::extract_action;
use crate::queue::FileQueueManager;

/// Destination for replayed messages
pub trait MessageSink {
    type Error: Display;

    fn send(&mut self, action: &str) -> Result<(), Self::Error>;
}

/// Replays a prepared corpus into a sink, one message per step
pub struct ReplayDriver<S> {
    queue: FileQueueManager,
    sink: S,
    stats: ReplayStats,
    limit: Option<u64>,
}

impl<S: MessageSink> ReplayDriver<S> {
    /// Drive `queue`, which should already be prepared
    pub fn new(queue: FileQueueManager, sink: S) -> Self {
        Self {
            queue,
            sink,
            stats: ReplayStats::default(),
            limit: None,
        }
    }

    /// Stop after `limit` delivery attempts
    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Send the next extractable message, skipping records without one.
    ///
    /// Returns the action handed to the sink (whether or not the sink
    /// accepted it), or `None` when the corpus or the limit is exhausted.
    pub fn step(&mut self) -> Option<String> {
        if self.limit_reached() {
            return None;
        }
        let action = self.next_action()?;

        match self.sink.send(&action) {
            Ok(()) => self.stats.sent += 1,
            Err(e) => {
                tracing::warn!(error = %e, "message send failed");
                self.stats.failed += 1;
            }
        }
        Some(action)
    }

    /// Step once per `interval` until the corpus ends or `cancel` fires
    pub async fn run(&mut self, interval: Duration, cancel: CancellationToken) -> ReplayStats {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!(sent = self.stats.sent, "replay cancelled");
                    break;
                }

                _ = ticker.tick() => {
                    if self.step().is_none() {
                        tracing::info!(
                            sent = self.stats.sent,
                            failed = self.stats.failed,
                            skipped = self.stats.skipped,
                            "replay finished"
                        );
                        break;
                    }
                }
            }
        }

        self.stats
    }

    /// Rewind the corpus and clear the counters
    pub fn restart(&mut self) -> Result<usize, QueueError> {
        let files = self.queue.restart()?;
        self.stats = ReplayStats::default();
        Ok(files)
    }

    pub fn stats(&self) -> ReplayStats {
        self.stats
    }

    pub fn queue(&self) -> &FileQueueManager {
        &self.queue
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    fn next_action(&mut self) -> Option<String> {
        loop {
            let line = self.queue.read_next_line()?;
            match extract_action(&line) {
                Some(action) => return Some(action),
                None => {
                    tracing::debug!(
                        line = self.queue.total_lines_read(),
                        "no action in record, skipping"
                    );
                    self.stats.skipped += 1;
                }
            }
        }
    }

    fn limit_reached(&self) -> bool {
        self.limit
            .is_some_and(|limit| self.stats.sent + self.stats.failed >= limit)
    }
}
