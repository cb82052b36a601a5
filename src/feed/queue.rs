//! Fixed-capacity FIFO between the feed ingestor and request handlers.
//!
//! Both operations are non-blocking: a full queue rejects, an empty queue
//! reports `Empty`. A single mutex serialises callers, so FIFO order is the
//! order in which enqueues acquired the lock.

use std::collections::VecDeque;
use std::sync::Mutex;
use thiserror::Error;

/// Capacity used when none is configured.
pub const DEFAULT_CAPACITY: usize = 10;

/// Queue operation failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum QueueError {
    /// The queue already holds `capacity` items.
    #[error("queue is full (capacity {capacity})")]
    Full { capacity: usize },

    /// Nothing to dequeue.
    #[error("queue is empty")]
    Empty,
}

/// Bounded, thread-safe FIFO.
#[derive(Debug)]
pub struct BoundedQueue<T> {
    items: Mutex<VecDeque<T>>,
    capacity: usize,
}

impl<T> BoundedQueue<T> {
    /// Create a queue holding at most `capacity` items.
    ///
    /// # Panics
    /// If `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "queue capacity must be > 0");
        Self {
            items: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Append an item, or fail immediately when full.
    pub fn enqueue(&self, item: T) -> Result<(), QueueError> {
        let mut items = self.items.lock().expect("queue mutex poisoned");
        if items.len() >= self.capacity {
            return Err(QueueError::Full {
                capacity: self.capacity,
            });
        }
        items.push_back(item);
        Ok(())
    }

    /// Remove the oldest item, or fail immediately when empty.
    pub fn dequeue(&self) -> Result<T, QueueError> {
        self.items
            .lock()
            .expect("queue mutex poisoned")
            .pop_front()
            .ok_or(QueueError::Empty)
    }

    /// Current depth.
    pub fn len(&self) -> usize {
        self.items.lock().expect("queue mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<T> Default for BoundedQueue<T> {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
