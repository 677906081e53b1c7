//! Error types for pool operations.

use thiserror::Error;

/// Errors produced by pool and worker operations.
///
/// Every error is returned to the immediate caller. The pool does not retry,
/// does not translate one kind into another, and does not log at the API
/// boundary; what the caller does with a rejection is the caller's policy.
#[derive(Debug, Error)]
pub enum PoolError {
    /// The target worker's mailbox is at capacity.
    #[error("mailbox full")]
    MailboxFull,
    /// Every worker was observed dead at dispatch time. Transient while the
    /// supervisor is rebuilding workers.
    #[error("no live worker available")]
    NoLiveWorker,
    /// Worker pid out of range for this pool.
    #[error("invalid worker pid {0}")]
    InvalidPid(usize),
    /// The targeted worker is currently down.
    #[error("worker {0} is not alive")]
    NotAlive(usize),
    /// Configuration validation failed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// Allocation or thread-spawn failure during init or recovery. Any
    /// partially constructed state has been unwound.
    #[error("initialization failed: {0}")]
    Init(String),
}
