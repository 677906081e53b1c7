//! The pool: dispatch, supervision, and lifecycle over a fixed worker set.
//!
//! The pool owns an ordered, fixed-length array of workers; the array is the
//! canonical source of worker identities and is never resized. Dispatch is
//! best-effort round-robin with a fallback scan over live workers, and a
//! single supervisor thread rebuilds any worker whose liveness flag has gone
//! false.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use tracing::{debug, info, warn};

use crate::config::PoolConfig;
use crate::core::error::PoolError;
use crate::core::mailbox::MailboxFull;
use crate::core::work::WorkItem;
use crate::core::worker::Worker;

/// Internal counters, bumped lock-free from submitters and worker threads.
///
/// `completed` is bumped with release ordering after a work item returns and
/// read with acquire ordering by [`WhirlPool::stats`], so a caller that
/// observes a completion count may also read the output buffers of the
/// completed items.
#[derive(Debug, Default)]
pub(crate) struct PoolCounters {
    submitted: AtomicU64,
    completed: AtomicU64,
    rejected_full: AtomicU64,
    restarts: AtomicU64,
}

impl PoolCounters {
    pub(crate) fn submitted_one(&self) {
        self.submitted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn completed_one(&self) {
        self.completed.fetch_add(1, Ordering::Release);
    }

    pub(crate) fn rejected_one(&self) {
        self.rejected_full.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn restarts_one(&self) {
        self.restarts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot_completed(&self) -> u64 {
        self.completed.load(Ordering::Acquire)
    }
}

/// Point-in-time statistics about pool activity.
#[derive(Debug, Clone, Default)]
pub struct PoolStats {
    /// Number of workers in the pool, live or not.
    pub workers: usize,
    /// Workers currently observed alive.
    pub live_workers: usize,
    /// Items accepted by [`WhirlPool::submit`].
    pub submitted: u64,
    /// Items whose procedure has returned.
    pub completed: u64,
    /// Submissions rejected because the target mailbox was full.
    pub rejected_full: u64,
    /// Worker rebuilds performed, by the supervisor or [`WhirlPool::recover`].
    pub restarts: u64,
}

/// State shared between the pool handle, the supervisor, and nothing else.
struct PoolShared {
    workers: Box<[Worker]>,
    running: AtomicBool,
    cursor: AtomicUsize,
    counters: Arc<PoolCounters>,
    supervise_interval: Duration,
    /// Pairs with `stop_signal` so a teardown interrupts the supervisor's
    /// sleep instead of waiting out a full interval.
    stopping: Mutex<bool>,
    stop_signal: Condvar,
}

/// An actor-style worker pool with supervised recovery.
///
/// Shutting down is idempotent and also happens on drop: the supervisor is
/// joined first so it cannot resurrect a worker mid-teardown, then every
/// worker is stopped and joined. After shutdown returns, no thread owned by
/// the pool is running and dropping the pool frees every region.
pub struct WhirlPool {
    shared: Arc<PoolShared>,
    supervisor: Mutex<Option<JoinHandle<()>>>,
}

impl WhirlPool {
    /// Build the worker array and start the pool.
    ///
    /// All allocations (arenas, mailboxes) happen before any thread is
    /// spawned; if a later step fails, every worker started so far is
    /// stopped and joined before the error is returned.
    ///
    /// # Errors
    ///
    /// [`PoolError::InvalidConfig`] if the configuration fails validation,
    /// [`PoolError::Init`] on allocation or thread-spawn failure.
    pub fn new(config: PoolConfig) -> Result<Self, PoolError> {
        config.validate().map_err(PoolError::InvalidConfig)?;

        let counters = Arc::new(PoolCounters::default());
        let mut workers = Vec::with_capacity(config.workers);
        for pid in 0..config.workers {
            workers.push(Worker::new(
                pid,
                config.memory_per_worker,
                config.mailbox_capacity,
                config.idle_backoff(),
                config.thread_stack_size,
                Arc::clone(&counters),
            )?);
        }

        for (started, worker) in workers.iter().enumerate() {
            if let Err(e) = worker.start() {
                for earlier in &workers[..started] {
                    earlier.stop_and_join();
                }
                return Err(e);
            }
        }

        let shared = Arc::new(PoolShared {
            workers: workers.into_boxed_slice(),
            running: AtomicBool::new(true),
            cursor: AtomicUsize::new(0),
            counters,
            supervise_interval: config.supervise_interval(),
            stopping: Mutex::new(false),
            stop_signal: Condvar::new(),
        });

        let supervisor = {
            let shared = Arc::clone(&shared);
            thread::Builder::new()
                .name("wp-supervisor".into())
                .spawn(move || supervisor_loop(&shared))
        };
        let supervisor = match supervisor {
            Ok(handle) => handle,
            Err(e) => {
                shared.running.store(false, Ordering::Release);
                for worker in shared.workers.iter() {
                    worker.stop_and_join();
                }
                return Err(PoolError::Init(format!("spawn supervisor: {e}")));
            }
        };

        info!(
            workers = config.workers,
            memory_per_worker = config.memory_per_worker,
            mailbox_capacity = config.mailbox_capacity,
            "pool initialized"
        );

        Ok(Self {
            shared,
            supervisor: Mutex::new(Some(supervisor)),
        })
    }

    /// Dispatch a work item to a live worker.
    ///
    /// Round-robin over the worker array, advancing the cursor before the
    /// liveness check; a dead worker at the cursor falls back to an
    /// index-order scan for the first live one. The cursor update is
    /// deliberately not an atomic read-modify-write: duplicates and skips
    /// under contention are acceptable because the goal is distribution,
    /// not fairness, and the fallback scan guarantees progress.
    ///
    /// A full target mailbox is an immediate error; the pool never blocks,
    /// retries, or redirects a rejected item.
    ///
    /// # Errors
    ///
    /// [`PoolError::NoLiveWorker`] if every worker is observed dead,
    /// [`PoolError::MailboxFull`] if the chosen worker's mailbox is at
    /// capacity.
    pub fn submit(&self, item: WorkItem) -> Result<(), PoolError> {
        let workers = &self.shared.workers;
        let n = workers.len();
        let c = self.shared.cursor.load(Ordering::Acquire) % n;
        self.shared.cursor.store((c + 1) % n, Ordering::Release);

        let pid = if workers[c].is_alive() {
            Some(c)
        } else {
            workers.iter().position(Worker::is_alive)
        };
        let Some(pid) = pid else {
            return Err(PoolError::NoLiveWorker);
        };

        match workers[pid].push(item) {
            Ok(()) => {
                self.shared.counters.submitted_one();
                debug!(pid, "work item dispatched");
                Ok(())
            }
            Err(MailboxFull(_)) => {
                self.shared.counters.rejected_one();
                Err(PoolError::MailboxFull)
            }
        }
    }

    /// Address a worker directly by pid.
    ///
    /// Chiefly for test and recovery flows; production code should prefer
    /// [`WhirlPool::submit`].
    ///
    /// # Errors
    ///
    /// [`PoolError::InvalidPid`] when out of range, [`PoolError::NotAlive`]
    /// when the worker is currently down.
    pub fn worker(&self, pid: usize) -> Result<&Worker, PoolError> {
        let worker = self
            .shared
            .workers
            .get(pid)
            .ok_or(PoolError::InvalidPid(pid))?;
        if !worker.is_alive() {
            return Err(PoolError::NotAlive(pid));
        }
        Ok(worker)
    }

    /// Rebuild a worker in place without waiting for the supervisor.
    ///
    /// A still-live worker is stopped first. The arena is rewound over the
    /// same region, the mailbox keeps whatever the previous thread had not
    /// consumed, and a fresh service thread is spawned.
    ///
    /// # Errors
    ///
    /// [`PoolError::InvalidPid`] when out of range, [`PoolError::NotAlive`]
    /// when the pool has already shut down, [`PoolError::Init`] if the
    /// replacement thread cannot be spawned.
    pub fn recover(&self, pid: usize) -> Result<(), PoolError> {
        let worker = self
            .shared
            .workers
            .get(pid)
            .ok_or(PoolError::InvalidPid(pid))?;
        // A pool being torn down owns its workers; they stay down.
        if !self.shared.running.load(Ordering::Acquire) {
            return Err(PoolError::NotAlive(pid));
        }
        info!(pid, "recovering worker");
        worker.restart()
    }

    /// Number of workers, live or not.
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.shared.workers.len()
    }

    /// Snapshot of pool statistics.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        let counters = &self.shared.counters;
        PoolStats {
            workers: self.shared.workers.len(),
            live_workers: self.shared.workers.iter().filter(|w| w.is_alive()).count(),
            submitted: counters.submitted.load(Ordering::Relaxed),
            completed: counters.snapshot_completed(),
            rejected_full: counters.rejected_full.load(Ordering::Relaxed),
            restarts: counters.restarts.load(Ordering::Relaxed),
        }
    }

    /// Stop the supervisor and every worker, joining all of them.
    ///
    /// Idempotent: the first call tears down, later calls return
    /// immediately. Queued items that no worker consumed are dropped with
    /// their mailboxes; in-flight procedures run to completion first.
    pub fn shutdown(&self) {
        if !self.shared.running.swap(false, Ordering::AcqRel) {
            return;
        }
        info!("shutting down pool");

        // Supervisor first, so a dead worker cannot be resurrected between
        // its stop and its join below.
        {
            let mut stopping = self.shared.stopping.lock();
            *stopping = true;
            self.shared.stop_signal.notify_all();
        }
        let supervisor = self.supervisor.lock().take();
        if let Some(handle) = supervisor {
            if handle.join().is_err() {
                warn!("supervisor thread had panicked");
            }
        }

        for worker in self.shared.workers.iter() {
            worker.stop_and_join();
        }
        info!("pool shut down");
    }
}

impl Drop for WhirlPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for WhirlPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WhirlPool")
            .field("workers", &self.shared.workers.len())
            .field("running", &self.shared.running.load(Ordering::Acquire))
            .finish_non_exhaustive()
    }
}

/// Scan for dead workers and rebuild them until the pool stops running.
fn supervisor_loop(shared: &PoolShared) {
    debug!("supervisor started");
    while shared.running.load(Ordering::Acquire) {
        for worker in shared.workers.iter() {
            if worker.is_alive() {
                continue;
            }
            // A teardown in progress owns the dead workers now.
            if !shared.running.load(Ordering::Acquire) {
                break;
            }
            info!(pid = worker.pid(), "restarting dead worker");
            if let Err(e) = worker.restart() {
                warn!(pid = worker.pid(), error = %e, "worker restart failed");
            }
        }
        let mut stopping = shared.stopping.lock();
        if !*stopping {
            let _ = shared
                .stop_signal
                .wait_for(&mut stopping, shared.supervise_interval);
        }
    }
    debug!("supervisor exiting");
}
