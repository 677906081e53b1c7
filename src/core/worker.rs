//! Workers: numbered execution units with a private arena, a mailbox, and a
//! dedicated service thread.
//!
//! A worker's identity is its `pid`, equal to its index in the pool's worker
//! array and stable for the pool's lifetime. The memory region behind the
//! arena is allocated once at construction and reused across every restart;
//! only the bump offset is rewound when the worker is rebuilt.
//!
//! Liveness is a cooperative atomic flag. The service loop exits at its next
//! observation of `alive == false`; nothing preempts a running work item.
//! The core does not catch faults in user procedures, but the service thread
//! publishes `alive = false` on its way out even when user code unwinds, so
//! a panicked worker is observable to the supervisor as an ordinary death.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::core::arena::Arena;
use crate::core::error::PoolError;
use crate::core::mailbox::{Mailbox, MailboxFull};
use crate::core::pool::PoolCounters;
use crate::core::work::WorkItem;

/// A numbered execution unit owned by a pool.
///
/// At most one service thread is associated with a worker at a time: while
/// `alive` is true exactly one thread is running the service loop; once
/// `alive` is false the thread has either exited or is guaranteed to exit at
/// its next observation of the flag.
pub struct Worker {
    pid: usize,
    alive: Arc<AtomicBool>,
    mailbox: Arc<Mailbox>,
    arena: Arc<Arena>,
    thread: Mutex<Option<JoinHandle<()>>>,
    idle_backoff: Duration,
    stack_size: usize,
    counters: Arc<PoolCounters>,
}

impl Worker {
    /// Allocate a worker's region, arena, and mailbox. Does not spawn the
    /// service thread; the pool starts workers once every allocation has
    /// succeeded, so a partial init can be unwound without joining anything.
    pub(crate) fn new(
        pid: usize,
        memory_per_worker: usize,
        mailbox_capacity: usize,
        idle_backoff: Duration,
        stack_size: usize,
        counters: Arc<PoolCounters>,
    ) -> Result<Self, PoolError> {
        let arena = Arena::new(memory_per_worker)?;
        Ok(Self {
            pid,
            alive: Arc::new(AtomicBool::new(false)),
            mailbox: Arc::new(Mailbox::new(mailbox_capacity)),
            arena: Arc::new(arena),
            thread: Mutex::new(None),
            idle_backoff,
            stack_size,
            counters,
        })
    }

    /// Dense identity of this worker, equal to its index in the pool.
    #[must_use]
    pub fn pid(&self) -> usize {
        self.pid
    }

    /// Observe the cooperative liveness flag.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    /// Request this worker to stop by publishing `alive = false`.
    ///
    /// The service thread exits at its next observation: after the current
    /// work item returns, or within one idle backoff when the mailbox is
    /// empty. The supervisor will rebuild the worker on its next scan.
    pub fn crash(&self) {
        debug!(pid = self.pid, "worker marked dead");
        self.alive.store(false, Ordering::Release);
    }

    /// Enqueue an item directly onto this worker's mailbox.
    ///
    /// No liveness check: items pushed while the worker is down stay queued
    /// and are consumed after the worker restarts.
    ///
    /// # Errors
    ///
    /// Returns [`MailboxFull`] with the item handed back when the mailbox is
    /// at capacity.
    pub fn push(&self, item: WorkItem) -> Result<(), MailboxFull> {
        self.mailbox.push(item)
    }

    /// The worker's mailbox.
    #[must_use]
    pub fn mailbox(&self) -> &Mailbox {
        &self.mailbox
    }

    /// The worker's bump arena.
    #[must_use]
    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    /// Mark alive and spawn the service thread.
    pub(crate) fn start(&self) -> Result<(), PoolError> {
        let mut slot = self.thread.lock();
        debug_assert!(slot.is_none(), "worker {} already has a thread", self.pid);
        self.alive.store(true, Ordering::Release);
        self.spawn_service(&mut slot)
    }

    /// Rebuild this worker in place: stop and join any existing thread,
    /// rewind the arena over the same region, then spawn a fresh service
    /// thread. The mailbox is untouched; queued items survive.
    ///
    /// Holding the thread-slot lock for the whole operation serializes a
    /// manual recovery racing the supervisor's.
    pub(crate) fn restart(&self) -> Result<(), PoolError> {
        let mut slot = self.thread.lock();
        self.alive.store(false, Ordering::Release);
        if let Some(handle) = slot.take() {
            if handle.join().is_err() {
                warn!(pid = self.pid, "previous service thread had panicked");
            }
        }
        self.arena.reset();
        self.alive.store(true, Ordering::Release);
        self.spawn_service(&mut slot)?;
        self.counters.restarts_one();
        Ok(())
    }

    /// Publish death and join the service thread. Used at pool teardown.
    pub(crate) fn stop_and_join(&self) {
        self.alive.store(false, Ordering::Release);
        let handle = self.thread.lock().take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                warn!(pid = self.pid, "service thread had panicked");
            }
        }
    }

    fn spawn_service(&self, slot: &mut Option<JoinHandle<()>>) -> Result<(), PoolError> {
        let pid = self.pid;
        let alive = Arc::clone(&self.alive);
        let mailbox = Arc::clone(&self.mailbox);
        let counters = Arc::clone(&self.counters);
        let idle_backoff = self.idle_backoff;
        let handle = thread::Builder::new()
            .name(format!("wp-worker-{pid}"))
            .stack_size(self.stack_size)
            .spawn(move || service_loop(pid, &alive, &mailbox, &counters, idle_backoff))
            .map_err(|e| {
                self.alive.store(false, Ordering::Release);
                PoolError::Init(format!("spawn worker {pid}: {e}"))
            })?;
        *slot = Some(handle);
        Ok(())
    }
}

impl std::fmt::Debug for Worker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worker")
            .field("pid", &self.pid)
            .field("alive", &self.is_alive())
            .field("queued", &self.mailbox.len())
            .finish_non_exhaustive()
    }
}

/// Publishes `alive = false` when the service thread exits, whether the exit
/// was cooperative or an unwind out of a work item.
struct ExitGuard {
    pid: usize,
    alive: Arc<AtomicBool>,
}

impl Drop for ExitGuard {
    fn drop(&mut self) {
        if thread::panicking() {
            warn!(
                pid = self.pid,
                "worker thread unwound inside a work item; marking dead"
            );
        }
        self.alive.store(false, Ordering::Release);
    }
}

/// Pop-and-run until `alive` goes false. The hot path takes only the mailbox
/// mutex; an empty mailbox backs off for `idle_backoff` per iteration.
fn service_loop(
    pid: usize,
    alive: &Arc<AtomicBool>,
    mailbox: &Mailbox,
    counters: &PoolCounters,
    idle_backoff: Duration,
) {
    let _exit = ExitGuard {
        pid,
        alive: Arc::clone(alive),
    };
    debug!(pid, "worker thread started");
    while alive.load(Ordering::Acquire) {
        match mailbox.pop() {
            Some(item) => {
                item.run();
                counters.completed_one();
            }
            None => thread::sleep(idle_backoff),
        }
    }
    debug!(pid, "worker thread exiting");
}
