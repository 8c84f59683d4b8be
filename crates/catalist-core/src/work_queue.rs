//! Lock-free work queue for distributing dataset scans across workers

use std::sync::atomic::{AtomicUsize, Ordering};

/// Lock-free queue handing out items to workers.
///
/// Workers call [`next()`](WorkQueue::next) to atomically claim the next
/// item, so each item is claimed exactly once regardless of worker count.
pub struct WorkQueue<T> {
    items: Vec<T>,
    cursor: AtomicUsize,
}

impl<T> WorkQueue<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items,
            cursor: AtomicUsize::new(0),
        }
    }

    /// Claim the next item (lock-free).
    pub fn next(&self) -> Option<&T> {
        let i = self.cursor.fetch_add(1, Ordering::Relaxed);
        self.items.get(i)
    }

    pub fn total(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
