use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use droidscope_types::Entry;

/// Thread-safe sliding window of assembled entries.
///
/// Eviction is never decided here: the ceiling in force depends on the
/// stream mode, so the backpressure controller issues the trim and the
/// buffer executes it. Entries leave only from the front or via `clear`.
#[derive(Clone, Default)]
pub struct EntryBuffer {
    entries: Arc<RwLock<VecDeque<Entry>>>,
    next_id: Arc<AtomicU64>,
}

impl EntryBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry, assigning the next sequential id.
    /// Returns the post-append length for the controller's verdict.
    pub fn push(&self, mut entry: Entry) -> usize {
        entry.id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let mut entries = self.entries.write();
        entries.push_back(entry);
        entries.len()
    }

    /// Extend the newest entry in place.
    /// Returns `false` when the buffer is empty and there is nothing to extend.
    pub fn append_to_newest(&self, line: &str) -> bool {
        let mut entries = self.entries.write();
        match entries.back_mut() {
            Some(entry) => {
                entry.push_line(line);
                true
            }
            None => false,
        }
    }

    /// Drop oldest entries until at most `ceiling` remain.
    /// Returns how many were dropped.
    pub fn trim_front_to(&self, ceiling: usize) -> usize {
        let mut entries = self.entries.write();
        let mut dropped = 0;
        while entries.len() > ceiling {
            entries.pop_front();
            dropped += 1;
        }
        dropped
    }

    /// Remove everything and restart id assignment.
    pub fn clear(&self) {
        self.entries.write().clear();
        self.next_id.store(0, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Clone out the current contents for a read-only projection.
    pub fn snapshot(&self) -> Vec<Entry> {
        self.entries.read().iter().cloned().collect()
    }

    /// The `n` most recent entries.
    pub fn tail(&self, n: usize) -> Vec<Entry> {
        let entries = self.entries.read();
        let start = entries.len().saturating_sub(n);
        entries.iter().skip(start).cloned().collect()
    }
}
