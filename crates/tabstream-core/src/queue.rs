use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{Condvar, Mutex};

/// Fixed-capacity blocking FIFO with cancellation.
///
/// `push` blocks while the queue is full, `pop` blocks while it is empty;
/// `cancel` wakes every waiter and makes both operations fail from then on.
/// The expected topology is one producer and one consumer, but the queue is
/// safe under any number of each.
#[derive(Debug)]
pub struct BoundedQueue<T> {
    capacity: usize,
    slots: Mutex<VecDeque<T>>,
    not_full: Condvar,
    not_empty: Condvar,
    cancelled: AtomicBool,
}

impl<T> BoundedQueue<T> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            slots: Mutex::new(VecDeque::with_capacity(capacity)),
            not_full: Condvar::new(),
            not_empty: Condvar::new(),
            cancelled: AtomicBool::new(false),
        }
    }

    /// Blocks until a slot is free, then enqueues `item`. Returns `false` if
    /// the queue was cancelled (the item is dropped).
    pub fn push(&self, item: T) -> bool {
        let mut slots = self.slots.lock();
        while slots.len() >= self.capacity && !self.is_cancelled() {
            self.not_full.wait(&mut slots);
        }
        if self.is_cancelled() {
            return false;
        }
        slots.push_back(item);
        drop(slots);
        self.not_empty.notify_one();
        true
    }

    /// Blocks until an item is available and dequeues it. Returns `None` if
    /// the queue was cancelled.
    pub fn pop(&self) -> Option<T> {
        let mut slots = self.slots.lock();
        while slots.is_empty() && !self.is_cancelled() {
            self.not_empty.wait(&mut slots);
        }
        if self.is_cancelled() {
            return None;
        }
        let item = slots.pop_front();
        drop(slots);
        self.not_full.notify_one();
        item
    }

    /// Poisons the queue: all current and future waiters return failure.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
        // Take the lock so a waiter between its predicate check and its wait
        // cannot miss the wakeup.
        let _guard = self.slots.lock();
        self.not_full.notify_all();
        self.not_empty.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
