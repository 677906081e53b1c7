//! Core runtime: work items, mailboxes, arenas, workers, and the pool.

pub mod arena;
pub mod error;
pub mod mailbox;
pub mod pool;
pub mod work;
pub mod worker;

pub use arena::Arena;
pub use error::PoolError;
pub use mailbox::{Mailbox, MailboxFull};
pub use pool::{PoolStats, WhirlPool};
pub use work::{WorkFn, WorkItem};
pub use worker::Worker;
