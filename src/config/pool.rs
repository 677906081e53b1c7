//! Pool configuration structure.

use std::time::Duration;

use serde::{Deserialize, Serialize};

const DEFAULT_MEMORY_PER_WORKER: usize = 1024 * 1024;
const DEFAULT_MAILBOX_CAPACITY: usize = 64;
const DEFAULT_IDLE_BACKOFF_MS: u64 = 1;
const DEFAULT_SUPERVISE_INTERVAL_MS: u64 = 10;
const DEFAULT_THREAD_STACK_SIZE: usize = 2 * 1024 * 1024;

fn default_workers() -> usize {
    num_cpus::get()
}

fn default_memory_per_worker() -> usize {
    DEFAULT_MEMORY_PER_WORKER
}

fn default_mailbox_capacity() -> usize {
    DEFAULT_MAILBOX_CAPACITY
}

fn default_idle_backoff_ms() -> u64 {
    DEFAULT_IDLE_BACKOFF_MS
}

fn default_supervise_interval_ms() -> u64 {
    DEFAULT_SUPERVISE_INTERVAL_MS
}

fn default_thread_stack_size() -> usize {
    DEFAULT_THREAD_STACK_SIZE
}

/// Pool configuration.
///
/// Every field has a default, so a partial JSON document parses; validation
/// happens at pool construction and in [`PoolConfig::from_json_str`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Number of workers. Defaults to the logical CPU count.
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Bytes in each worker's arena region. Default 1 MiB.
    #[serde(default = "default_memory_per_worker")]
    pub memory_per_worker: usize,
    /// Slots in each worker's mailbox. Default 64.
    #[serde(default = "default_mailbox_capacity")]
    pub mailbox_capacity: usize,
    /// Sleep between polls of an empty mailbox, in milliseconds. Default 1.
    #[serde(default = "default_idle_backoff_ms")]
    pub idle_backoff_ms: u64,
    /// Sleep between supervisor scans, in milliseconds. Default 10.
    #[serde(default = "default_supervise_interval_ms")]
    pub supervise_interval_ms: u64,
    /// Stack size for worker and supervisor threads. Default 2 MiB.
    #[serde(default = "default_thread_stack_size")]
    pub thread_stack_size: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            memory_per_worker: DEFAULT_MEMORY_PER_WORKER,
            mailbox_capacity: DEFAULT_MAILBOX_CAPACITY,
            idle_backoff_ms: DEFAULT_IDLE_BACKOFF_MS,
            supervise_interval_ms: DEFAULT_SUPERVISE_INTERVAL_MS,
            thread_stack_size: DEFAULT_THREAD_STACK_SIZE,
        }
    }
}

impl PoolConfig {
    /// Configuration with all defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the worker count.
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Set the per-worker arena size in bytes.
    #[must_use]
    pub fn with_memory_per_worker(mut self, bytes: usize) -> Self {
        self.memory_per_worker = bytes;
        self
    }

    /// Set the per-worker mailbox capacity.
    #[must_use]
    pub fn with_mailbox_capacity(mut self, slots: usize) -> Self {
        self.mailbox_capacity = slots;
        self
    }

    /// Set the idle backoff in milliseconds.
    #[must_use]
    pub fn with_idle_backoff_ms(mut self, ms: u64) -> Self {
        self.idle_backoff_ms = ms;
        self
    }

    /// Set the supervisor scan interval in milliseconds.
    #[must_use]
    pub fn with_supervise_interval_ms(mut self, ms: u64) -> Self {
        self.supervise_interval_ms = ms;
        self
    }

    /// Set the worker thread stack size in bytes.
    #[must_use]
    pub fn with_thread_stack_size(mut self, bytes: usize) -> Self {
        self.thread_stack_size = bytes;
        self
    }

    /// Idle backoff as a [`Duration`].
    #[must_use]
    pub fn idle_backoff(&self) -> Duration {
        Duration::from_millis(self.idle_backoff_ms)
    }

    /// Supervisor scan interval as a [`Duration`].
    #[must_use]
    pub fn supervise_interval(&self) -> Duration {
        Duration::from_millis(self.supervise_interval_ms)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if self.workers == 0 {
            return Err("workers must be greater than 0".into());
        }
        if self.memory_per_worker == 0 {
            return Err("memory_per_worker must be greater than 0".into());
        }
        if self.mailbox_capacity == 0 {
            return Err("mailbox_capacity must be greater than 0".into());
        }
        if self.thread_stack_size == 0 {
            return Err("thread_stack_size must be greater than 0".into());
        }
        Ok(())
    }

    /// Parse a configuration from a JSON string and validate it.
    ///
    /// # Errors
    ///
    /// Returns a parse or validation error description.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }
}
