//! Configuration model for pool sizing and timing.

pub mod pool;

pub use pool::PoolConfig;
