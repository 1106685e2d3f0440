//! Pending register writes
//!
//! At most one pending value per holding register offset. A later insert for
//! the same offset replaces the value and keeps the original position, so
//! drains run in first-insert order.
//!
//! Draining works on a snapshot: the lock is never held across a write, and
//! adapters may keep inserting while a drain is running. An entry is removed
//! after its attempt unless a newer value for that offset arrived meanwhile;
//! the newer value then waits for the next drain.

use std::collections::{BTreeMap, HashMap};
use std::future::Future;

use parking_lot::Mutex;

#[derive(Debug, Clone, Copy)]
struct Entry {
    value: u16,
    /// Position in drain order
    sequence: u64,
    /// Bumped on every overwrite
    revision: u64,
}

#[derive(Debug, Default)]
struct QueueInner {
    entries: HashMap<u16, Entry>,
    order: BTreeMap<u64, u16>,
    next_sequence: u64,
    next_revision: u64,
}

/// One failed write from a drain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedWrite<E> {
    pub offset: u16,
    pub value: u16,
    pub error: E,
}

/// Summary of a drain pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrainReport<E> {
    pub attempted: usize,
    pub failed: Vec<FailedWrite<E>>,
}

impl<E> DrainReport<E> {
    pub fn succeeded(&self) -> usize {
        self.attempted - self.failed.len()
    }
}

/// Ordered, deduplicating write queue
#[derive(Debug, Default)]
pub struct WriteQueue {
    inner: Mutex<QueueInner>,
}

impl WriteQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `value` for `offset`, replacing any pending value
    pub fn insert(&self, offset: u16, value: u16) {
        let mut inner = self.inner.lock();
        inner.next_revision += 1;
        let revision = inner.next_revision;

        if let Some(entry) = inner.entries.get_mut(&offset) {
            entry.value = value;
            entry.revision = revision;
            return;
        }

        let sequence = inner.next_sequence;
        inner.next_sequence += 1;
        inner.order.insert(sequence, offset);
        inner.entries.insert(
            offset,
            Entry {
                value,
                sequence,
                revision,
            },
        );
    }

    pub fn size(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().entries.is_empty()
    }

    /// Pending value for an offset
    pub fn pending(&self, offset: u16) -> Option<u16> {
        self.inner.lock().entries.get(&offset).map(|e| e.value)
    }

    /// Pending `(offset, value)` pairs in drain order
    pub fn snapshot(&self) -> Vec<(u16, u16)> {
        let inner = self.inner.lock();
        inner
            .order
            .values()
            .filter_map(|offset| inner.entries.get(offset).map(|e| (*offset, e.value)))
            .collect()
    }

    /// Attempt every pending write once, in order.
    ///
    /// Each entry is removed after its attempt whether it succeeded or not;
    /// failures are reported, never retried here.
    pub async fn drain<F, Fut, E>(&self, mut write: F) -> DrainReport<E>
    where
        F: FnMut(u16, u16) -> Fut,
        Fut: Future<Output = Result<(), E>>,
    {
        let batch: Vec<(u16, u16, u64)> = {
            let inner = self.inner.lock();
            inner
                .order
                .values()
                .filter_map(|offset| {
                    inner
                        .entries
                        .get(offset)
                        .map(|e| (*offset, e.value, e.revision))
                })
                .collect()
        };

        let mut report = DrainReport {
            attempted: 0,
            failed: Vec::new(),
        };

        for (offset, value, revision) in batch {
            let result = write(offset, value).await;
            report.attempted += 1;
            self.remove_if_unchanged(offset, revision);

            if let Err(error) = result {
                report.failed.push(FailedWrite {
                    offset,
                    value,
                    error,
                });
            }
        }

        report
    }

    fn remove_if_unchanged(&self, offset: u16, revision: u64) {
        let mut inner = self.inner.lock();
        let unchanged = inner
            .entries
            .get(&offset)
            .is_some_and(|e| e.revision == revision);
        if unchanged {
            if let Some(entry) = inner.entries.remove(&offset) {
                inner.order.remove(&entry.sequence);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_insert_same_offset_keeps_one_entry_with_latest_value() {
        let queue = WriteQueue::new();
        queue.insert(5, 180);
        queue.insert(12, 1);
        queue.insert(5, 200);

        assert_eq!(queue.size(), 2);
        assert_eq!(queue.pending(5), Some(200));
        // overwrite keeps first-insert position
        assert_eq!(queue.snapshot(), vec![(5, 200), (12, 1)]);
    }

    #[tokio::test]
    async fn test_drain_visits_in_insertion_order_and_empties() {
        let queue = WriteQueue::new();
        queue.insert(58, 1);
        queue.insert(1, 3);
        queue.insert(12, 0);

        let mut seen = Vec::new();
        let report = queue
            .drain(|offset, value| {
                seen.push((offset, value));
                async { Ok::<(), String>(()) }
            })
            .await;

        assert_eq!(seen, vec![(58, 1), (1, 3), (12, 0)]);
        assert_eq!(report.attempted, 3);
        assert_eq!(report.succeeded(), 3);
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_drain_removes_failed_writes() {
        let queue = WriteQueue::new();
        queue.insert(5, 180);
        queue.insert(12, 1);

        let report = queue
            .drain(|offset, _| async move {
                if offset == 5 {
                    Err("timeout".to_string())
                } else {
                    Ok(())
                }
            })
            .await;

        assert_eq!(report.attempted, 2);
        assert_eq!(
            report.failed,
            vec![FailedWrite {
                offset: 5,
                value: 180,
                error: "timeout".to_string()
            }]
        );
        // no retry: the failed write is gone
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_insert_during_drain_survives_for_next_cycle() {
        let queue = Arc::new(WriteQueue::new());
        queue.insert(5, 180);
        queue.insert(12, 1);

        let inner_queue = Arc::clone(&queue);
        let report = queue
            .drain(move |offset, _| {
                if offset == 5 {
                    // newer value for the same register and a brand new one
                    inner_queue.insert(5, 190);
                    inner_queue.insert(1, 2);
                }
                async { Ok::<(), String>(()) }
            })
            .await;

        assert_eq!(report.attempted, 2);
        assert_eq!(queue.snapshot(), vec![(5, 190), (1, 2)]);
    }

    #[tokio::test]
    async fn test_drain_empty_queue() {
        let queue = WriteQueue::new();
        let report = queue
            .drain(|_, _| async { Ok::<(), String>(()) })
            .await;
        assert_eq!(report.attempted, 0);
        assert!(report.failed.is_empty());
    }
}
