//! In-process conversation history.
//!
//! An append-only log of exchanges behind one mutex. Every read hands out a
//! copy, so a snapshot taken before a `clear()` keeps its contents.

use std::sync::{Mutex, MutexGuard};

use lightlocal_core::Exchange;

/// Process-wide store of completed exchanges.
///
/// Storage is unbounded; callers decide how much of the tail they read.
#[derive(Debug, Default)]
pub struct HistoryStore {
    exchanges: Mutex<Vec<Exchange>>,
}

impl HistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The guarded data is a plain `Vec` that is never left half-updated,
    /// so a poisoned lock is still safe to use.
    fn lock(&self) -> MutexGuard<'_, Vec<Exchange>> {
        self.exchanges.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Add one exchange at the end.
    pub fn append(&self, exchange: Exchange) {
        let mut exchanges = self.lock();
        exchanges.push(exchange);
        tracing::debug!(len = exchanges.len(), "Exchange appended to history");
    }

    /// Copy of the last `n` exchanges, oldest first.
    ///
    /// Returns everything when fewer than `n` are stored.
    pub fn snapshot_tail(&self, n: usize) -> Vec<Exchange> {
        let exchanges = self.lock();
        let start = exchanges.len().saturating_sub(n);
        exchanges[start..].to_vec()
    }

    /// Copy of the whole history, oldest first.
    pub fn snapshot(&self) -> Vec<Exchange> {
        self.lock().clone()
    }

    /// Replace the history with an empty one.
    pub fn clear(&self) {
        let previous = std::mem::take(&mut *self.lock());
        tracing::info!(dropped = previous.len(), "History cleared");
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
