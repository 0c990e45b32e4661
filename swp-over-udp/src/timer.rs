//! Per-chunk retransmission timers.
//!
//! Every outstanding chunk owns exactly one timer: a spawned tokio task that
//! sleeps for the retransmission timeout, fires, and goes back to sleep until
//! it is cancelled.  [`TimerTable`] maps sequence numbers to those tasks so
//! the ACK path can cancel them.
//!
//! Cancellation is `JoinHandle::abort`, which is **not** synchronous: a timer
//! may already be running its callback when the abort lands.  Callbacks must
//! therefore re-check that their chunk is still outstanding before acting.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::task::JoinHandle;

#[derive(Debug, Default)]
pub struct TimerTable {
    timers: Mutex<HashMap<u32, JoinHandle<()>>>,
}

impl TimerTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock the table.  Callers that also need the send buffer must take the
    /// buffer lock first.
    pub fn lock(&self) -> TimerGuard<'_> {
        TimerGuard(self.timers.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Number of armed timers.
    pub fn len(&self) -> usize {
        self.lock().0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sequence numbers with an armed timer, ascending.
    pub fn armed(&self) -> Vec<u32> {
        let mut seqs: Vec<u32> = self.lock().0.keys().copied().collect();
        seqs.sort_unstable();
        seqs
    }

    /// Abort every timer.
    pub fn cancel_all(&self) {
        for (_, handle) in self.lock().0.drain() {
            handle.abort();
        }
    }
}

/// Exclusive access to the timer table.
pub struct TimerGuard<'a>(MutexGuard<'a, HashMap<u32, JoinHandle<()>>>);

impl TimerGuard<'_> {
    /// Record `handle` as the timer for `seq`, aborting any timer it replaces.
    pub fn arm(&mut self, seq: u32, handle: JoinHandle<()>) {
        if let Some(old) = self.0.insert(seq, handle) {
            old.abort();
        }
    }

    /// Abort and forget the timer for `seq`.  Returns `false` if none was
    /// armed.
    pub fn cancel(&mut self, seq: u32) -> bool {
        match self.0.remove(&seq) {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn sleeper() -> JoinHandle<()> {
        tokio::spawn(tokio::time::sleep(Duration::from_secs(3600)))
    }

    #[tokio::test]
    async fn arm_and_cancel() {
        let table = TimerTable::new();
        table.lock().arm(3, sleeper());
        table.lock().arm(1, sleeper());
        assert_eq!(table.armed(), vec![1, 3]);

        assert!(table.lock().cancel(3));
        assert!(!table.lock().cancel(3));
        assert_eq!(table.armed(), vec![1]);
    }

    #[tokio::test]
    async fn rearm_aborts_previous_handle() {
        let table = TimerTable::new();
        let first = sleeper();
        let abort = first.abort_handle();
        table.lock().arm(0, first);
        table.lock().arm(0, sleeper());
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
        assert!(abort.is_finished());
        assert_eq!(table.len(), 1);
    }

    #[tokio::test]
    async fn cancel_all_empties_table() {
        let table = TimerTable::new();
        for seq in 0..4 {
            table.lock().arm(seq, sleeper());
        }
        table.cancel_all();
        assert!(table.is_empty());
    }
}
