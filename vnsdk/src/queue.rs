//! A bounded, mutex-protected multi-producer/multi-consumer queue. The
//! outstanding-command queue and the measurement queue are both short
//! (bounded by `SensorConfig`) with low contention (one listener, one caller
//! at a time per queue), so a `Mutex<VecDeque<T>>` is sufficient; no
//! lock-free structure is warranted.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

struct Inner<T> {
    items: Mutex<VecDeque<T>>,
    not_empty: Condvar,
    capacity: usize,
}

/// An owned handle to a bounded queue. Cloning shares the same underlying
/// queue (cheap `Arc` clone).
pub struct BoundedQueue<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for BoundedQueue<T> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone() }
    }
}

impl<T> BoundedQueue<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                items: Mutex::new(VecDeque::with_capacity(capacity.min(256))),
                not_empty: Condvar::new(),
                capacity,
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    pub fn len(&self) -> usize {
        self.inner.items.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Pushes `item`; returns `false` (and leaves the queue unchanged) if the
    /// queue is already at capacity. Never blocks.
    #[must_use]
    pub fn push(&self, item: T) -> bool {
        let mut items = self.inner.items.lock().unwrap();
        if items.len() >= self.inner.capacity {
            return false;
        }
        items.push_back(item);
        self.inner.not_empty.notify_one();
        true
    }

    pub fn pop(&self) -> Option<T> {
        self.inner.items.lock().unwrap().pop_front()
    }

    /// Blocks until an item is available or `timeout` elapses.
    pub fn pop_blocking(&self, timeout: Duration) -> Option<T> {
        let deadline = Instant::now() + timeout;
        let mut items = self.inner.items.lock().unwrap();
        loop {
            if let Some(item) = items.pop_front() {
                return Some(item);
            }
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            let (guard, result) = self
                .inner
                .not_empty
                .wait_timeout(items, deadline - now)
                .unwrap();
            items = guard;
            if result.timed_out() && items.is_empty() {
                return None;
            }
        }
    }

    /// Returns a clone of the most recently pushed item without removing it,
    /// if any.
    pub fn peek_back(&self) -> Option<T>
    where
        T: Clone,
    {
        self.inner.items.lock().unwrap().back().cloned()
    }
}
