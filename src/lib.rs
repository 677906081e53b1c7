//! # Whirlpool
//!
//! An actor-style, in-process worker pool with per-worker mailboxes, bump
//! arenas, and supervised recovery.
//!
//! The pool hosts a fixed set of long-lived workers. Each worker is bound to
//! its own OS thread and owns a private memory region with a resettable bump
//! arena layered over it, plus a bounded multi-producer single-consumer
//! mailbox of pending work. A supervisor thread watches a cooperative
//! liveness flag on every worker and rebuilds dead workers in place, reusing
//! the same memory region so recovered workers keep their cache locality.
//!
//! ## Core Problem Solved
//!
//! CPU-bound pipelines often want actor-like isolation without the weight of
//! an actor framework or an async runtime:
//!
//! - **Worker-private memory**: scratch allocations stay on one worker and
//!   are reclaimed wholesale by resetting a bump pointer, not item by item
//! - **Bounded admission**: a full mailbox is an error handed back to the
//!   submitter, never a silent drop or an unbounded queue
//! - **Crash visibility**: a worker that marks itself dead (or unwinds) is
//!   detected and rebuilt by the supervisor within one scan interval
//! - **Zero-copy dispatch**: work items borrow the caller's input and output
//!   buffers instead of copying payloads through the pool
//!
//! ## Quick Example
//!
//! ```rust,no_run
//! use whirlpool::config::PoolConfig;
//! use whirlpool::core::{WhirlPool, WorkItem};
//!
//! fn shout(input: &[u8], output: &mut [u8]) {
//!     let n = input.len().min(output.len());
//!     for (dst, src) in output[..n].iter_mut().zip(input) {
//!         *dst = src.to_ascii_uppercase();
//!     }
//! }
//!
//! let pool = WhirlPool::new(PoolConfig::new().with_workers(4)).unwrap();
//!
//! let input = *b"hello";
//! let mut output = [0u8; 5];
//! // SAFETY: both buffers outlive the pool and nothing else touches
//! // `output` until the work completes.
//! let item = unsafe { WorkItem::new(shout, &input, &mut output) };
//! pool.submit(item).unwrap();
//! ```
//!
//! For complete examples, see:
//! - `tests/pool_test.rs` - dispatch and backpressure scenarios
//! - `tests/recovery_test.rs` - crash, recovery, and teardown scenarios

#![deny(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

/// Core runtime: work items, mailboxes, arenas, workers, and the pool.
pub mod core;
/// Configuration model for pool sizing and timing.
pub mod config;
/// Shared utilities.
pub mod util;
