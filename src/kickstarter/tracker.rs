//! Completion tracking for seed chains
//!
//! The spider has no notion of "done"; the application counts chains itself
//! and waits for the count to reach zero before shutting down.

use tokio::sync::watch;

/// Counts seed chains that have not finished yet
///
/// Each seed URL starts a chain of pages linked by `has_more`. The chain is
/// finished when a page has no successor, or when a page of the chain cannot
/// be fetched or decoded. [`CompletionTracker::wait`] resolves once every
/// chain added so far has finished.
#[derive(Debug)]
pub struct CompletionTracker {
    pending: watch::Sender<usize>,
}

impl CompletionTracker {
    pub fn new() -> Self {
        Self {
            pending: watch::Sender::new(0),
        }
    }

    /// Registers `chains` new chains
    pub fn add(&self, chains: usize) {
        self.pending.send_modify(|pending| *pending += chains);
    }

    /// Marks one chain finished
    pub fn done(&self) {
        self.pending.send_modify(|pending| {
            if *pending == 0 {
                tracing::warn!("Chain finished more often than it was started");
            } else {
                *pending -= 1;
            }
        });
    }

    /// Number of chains still running
    pub fn pending(&self) -> usize {
        *self.pending.borrow()
    }

    /// Waits until no chain is running
    pub async fn wait(&self) {
        let mut pending = self.pending.subscribe();
        // The sender lives in `self`, so the channel cannot close while waiting.
        let _ = pending.wait_for(|pending| *pending == 0).await;
    }
}

impl Default for CompletionTracker {
    fn default() -> Self {
        Self::new()
    }
}
