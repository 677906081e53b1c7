//! Bounded, mutex-guarded, multi-producer single-consumer mailbox.
//!
//! Every worker owns exactly one mailbox. Producers are arbitrary submitter
//! threads plus the pool's dispatch path; the sole intended consumer is the
//! owning worker's service thread. The ring and its indices live under one
//! mutex and nothing else is touched under that mutex.
//!
//! Contents survive a restart of the owning worker: the mailbox belongs to
//! the [`Worker`](crate::core::Worker), not to its service thread, and is
//! only destroyed at worker teardown.

use std::fmt;

use parking_lot::Mutex;

use crate::core::work::WorkItem;

/// Rejection returned by [`Mailbox::push`] at capacity. Hands the item back
/// so the producer decides whether to retry, redirect, or drop.
pub struct MailboxFull(
    /// The rejected item.
    pub WorkItem,
);

impl fmt::Debug for MailboxFull {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("MailboxFull").field(&self.0).finish()
    }
}

impl fmt::Display for MailboxFull {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mailbox full")
    }
}

impl std::error::Error for MailboxFull {}

struct Ring {
    slots: Box<[Option<WorkItem>]>,
    head: usize,
    tail: usize,
    count: usize,
}

/// A bounded FIFO of [`WorkItem`]s.
///
/// Invariants: `(tail - head) mod capacity == count` and
/// `0 <= count <= capacity`. Items pushed by a single producer are popped in
/// that producer's push order; across producers, only mutex acquisition
/// order decides.
pub struct Mailbox {
    inner: Mutex<Ring>,
    capacity: usize,
}

impl Mailbox {
    /// Create a mailbox with `capacity` slots.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero; the pool validates capacity before any
    /// mailbox is constructed.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "mailbox capacity must be > 0");
        let slots = (0..capacity).map(|_| None).collect();
        Self {
            inner: Mutex::new(Ring {
                slots,
                head: 0,
                tail: 0,
                count: 0,
            }),
            capacity,
        }
    }

    /// Enqueue an item, rejecting with the item handed back when full.
    ///
    /// # Errors
    ///
    /// Returns [`MailboxFull`] iff `count == capacity` at the point of push.
    pub fn push(&self, item: WorkItem) -> Result<(), MailboxFull> {
        let mut ring = self.inner.lock();
        if ring.count == self.capacity {
            return Err(MailboxFull(item));
        }
        let tail = ring.tail;
        ring.slots[tail] = Some(item);
        ring.tail = (tail + 1) % self.capacity;
        ring.count += 1;
        Ok(())
    }

    /// Dequeue the oldest item, or `None` when empty.
    ///
    /// Intended for the owning worker's thread; correctness under multiple
    /// consumers is not promised (every item is still delivered at most
    /// once, but FIFO observation per producer is not).
    pub fn pop(&self) -> Option<WorkItem> {
        let mut ring = self.inner.lock();
        if ring.count == 0 {
            return None;
        }
        let head = ring.head;
        let item = ring.slots[head].take();
        ring.head = (head + 1) % self.capacity;
        ring.count -= 1;
        item
    }

    /// Number of queued items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().count
    }

    /// Whether the mailbox holds no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the mailbox is at capacity.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.len() == self.capacity
    }

    /// Slot count fixed at construction.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
