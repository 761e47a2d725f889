//! Coordination between the scheduler and its workers.
//!
//! Workers report through an [`EventSender`]: relayed console output, a
//! completion (with the nested configuration the fetched working copy
//! carries, if any) or a failure. A worker posts its messages before its
//! completion or failure. The [`Coordinator`] is the scheduler's side of the
//! channel; it owns the pending-job count and the sticky failure flag, so all
//! bookkeeping happens on one task and no state is shared between workers.
//!
//! For every job, `queued == completed + failed + pending` holds at all
//! times once the job's events have been consumed.

use std::path::PathBuf;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::utils::console;

/// An event reported by a worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerEvent {
    /// Output to relay to the console
    Message(String),
    /// A job finished successfully
    Completed {
        /// Dependency name
        name: String,
        /// Nested configuration found in the working copy
        discovered: Option<PathBuf>,
    },
    /// A job failed
    Failed {
        /// Dependency name
        name: String,
    },
}

/// Worker side of the coordination channel.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: UnboundedSender<WorkerEvent>,
}

impl EventSender {
    fn send(&self, event: WorkerEvent) {
        // the coordinator only goes away once the run is over
        if self.tx.send(event).is_err() {
            tracing::trace!("coordinator gone; dropping worker event");
        }
    }

    /// Relay a block of output.
    pub fn post_message(&self, text: impl Into<String>) {
        self.send(WorkerEvent::Message(text.into()));
    }

    /// Report a successful job.
    pub fn mark_complete(&self, name: impl Into<String>, discovered: Option<PathBuf>) {
        self.send(WorkerEvent::Completed {
            name: name.into(),
            discovered,
        });
    }

    /// Report a failed job.
    pub fn mark_failed(&self, name: impl Into<String>) {
        self.send(WorkerEvent::Failed {
            name: name.into(),
        });
    }
}

/// Job accounting for a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CoordinatorStats {
    /// Jobs ever queued
    pub queued: usize,
    /// Jobs reported complete
    pub completed: usize,
    /// Jobs reported failed
    pub failed: usize,
    /// Jobs queued but not yet reported
    pub pending: usize,
}

/// Scheduler side of the coordination channel.
#[derive(Debug)]
pub struct Coordinator {
    tx: UnboundedSender<WorkerEvent>,
    rx: UnboundedReceiver<WorkerEvent>,
    tolerate_failures: bool,
    failure: bool,
    stats: CoordinatorStats,
}

impl Coordinator {
    /// Create a coordinator.
    ///
    /// With `tolerate_failures`, a failed job does not cut
    /// [`await_next`](Self::await_next) short; every pending job is waited
    /// for.
    #[must_use]
    pub fn new(tolerate_failures: bool) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx,
            tolerate_failures,
            failure: false,
            stats: CoordinatorStats::default(),
        }
    }

    /// A sender for a worker.
    #[must_use]
    pub fn sender(&self) -> EventSender {
        EventSender {
            tx: self.tx.clone(),
        }
    }

    /// Account for a job about to be submitted.
    pub const fn mark_queued(&mut self) {
        self.stats.queued += 1;
        self.stats.pending += 1;
    }

    /// Whether any job has failed.
    #[must_use]
    pub const fn failure(&self) -> bool {
        self.failure
    }

    /// Jobs queued but not yet reported.
    #[must_use]
    pub const fn pending(&self) -> usize {
        self.stats.pending
    }

    /// Job accounting so far.
    #[must_use]
    pub const fn stats(&self) -> CoordinatorStats {
        self.stats
    }

    /// Wait for the next discovered configuration.
    ///
    /// Relays worker output while waiting. Returns `None` once nothing is
    /// pending, or as soon as a failure has been recorded when failures are
    /// not tolerated; events already received are always consumed first.
    pub async fn await_next(&mut self) -> Option<PathBuf> {
        loop {
            let event = if let Ok(event) = self.rx.try_recv() {
                event
            } else {
                if self.stats.pending == 0 || (self.failure && !self.tolerate_failures) {
                    return None;
                }
                // a sender is held by the coordinator itself
                self.rx.recv().await?
            };

            if let Some(discovered) = self.handle(event) {
                return Some(discovered);
            }
        }
    }

    /// Consume every event already received, without waiting.
    ///
    /// Called once the worker pool has been joined, so every finished job's
    /// report is accounted for. Returns configurations discovered by jobs
    /// that finished after the scheduler stopped waiting.
    pub fn settle(&mut self) -> Vec<PathBuf> {
        let mut discovered = Vec::new();
        while let Ok(event) = self.rx.try_recv() {
            discovered.extend(self.handle(event));
        }
        discovered
    }

    fn handle(&mut self, event: WorkerEvent) -> Option<PathBuf> {
        match event {
            WorkerEvent::Message(text) => {
                console::log(text);
                None
            }
            WorkerEvent::Completed {
                name,
                discovered,
            } => {
                tracing::debug!("dependency completed: {name}");
                self.stats.pending = self.stats.pending.saturating_sub(1);
                self.stats.completed += 1;
                discovered
            }
            WorkerEvent::Failed {
                name,
            } => {
                tracing::debug!("dependency failed: {name}");
                self.failure = true;
                self.stats.pending = self.stats.pending.saturating_sub(1);
                self.stats.failed += 1;
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_nothing_pending_returns_none() {
        let mut coordinator = Coordinator::new(false);
        assert_eq!(coordinator.await_next().await, None);
    }

    #[tokio::test]
    async fn test_discovered_paths_are_returned() {
        let mut coordinator = Coordinator::new(false);
        let sender = coordinator.sender();

        for _ in 0..3 {
            coordinator.mark_queued();
        }
        sender.post_message("fetching a...");
        sender.mark_complete("a", Some(PathBuf::from("/work/a/fetchdep.yml")));
        sender.mark_complete("b", None);
        sender.mark_complete("c", Some(PathBuf::from("/work/c/.fetchdep")));

        assert_eq!(coordinator.await_next().await, Some(PathBuf::from("/work/a/fetchdep.yml")));
        assert_eq!(coordinator.await_next().await, Some(PathBuf::from("/work/c/.fetchdep")));
        assert_eq!(coordinator.await_next().await, None);

        let stats = coordinator.stats();
        assert_eq!(stats.queued, 3);
        assert_eq!(stats.completed, 3);
        assert_eq!(stats.pending, 0);
    }

    #[tokio::test]
    async fn test_waits_for_late_workers() {
        let mut coordinator = Coordinator::new(false);
        coordinator.mark_queued();

        let sender = coordinator.sender();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            sender.mark_complete("slow", Some(PathBuf::from("/work/slow/fetchdep.yml")));
        });

        assert_eq!(coordinator.await_next().await, Some(PathBuf::from("/work/slow/fetchdep.yml")));
        assert_eq!(coordinator.pending(), 0);
    }

    #[tokio::test]
    async fn test_failure_stops_waiting() {
        let mut coordinator = Coordinator::new(false);
        coordinator.mark_queued();
        coordinator.mark_queued();
        coordinator.sender().mark_failed("broken");

        // the other job is still pending, but the failure ends the wait
        assert_eq!(coordinator.await_next().await, None);
        assert!(coordinator.failure());
        assert_eq!(coordinator.pending(), 1);

        coordinator.sender().mark_complete("late", Some(PathBuf::from("/late")));
        assert_eq!(coordinator.settle(), [PathBuf::from("/late")]);

        let stats = coordinator.stats();
        assert_eq!(stats.queued, stats.completed + stats.failed);
        assert_eq!(stats.pending, 0);
    }

    #[tokio::test]
    async fn test_tolerated_failure_keeps_draining() {
        let mut coordinator = Coordinator::new(true);
        coordinator.mark_queued();
        coordinator.mark_queued();

        let sender = coordinator.sender();
        sender.mark_failed("broken");
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            sender.mark_complete("fine", Some(PathBuf::from("/work/fine/fetchdep.yml")));
        });

        assert_eq!(coordinator.await_next().await, Some(PathBuf::from("/work/fine/fetchdep.yml")));
        assert_eq!(coordinator.await_next().await, None);
        assert!(coordinator.failure());
        assert_eq!(coordinator.stats().failed, 1);
    }
}
