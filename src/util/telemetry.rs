//! Tracing bootstrap for pool lifecycle events.
//!
//! The runtime logs through `tracing`: pool init and shutdown at `info`,
//! worker restarts at `info`/`warn`, per-item dispatch and thread
//! start/exit at `debug`. Restart and exit events are emitted from the
//! named runtime threads (`wp-worker-{pid}`, `wp-supervisor`), so the
//! subscriber installed here includes thread names in its output.

use tracing_subscriber::EnvFilter;

/// Default directive when `RUST_LOG` is unset: lifecycle events from this
/// crate only, without per-item `debug` noise.
const DEFAULT_FILTER: &str = "whirlpool=info";

/// Install a subscriber for the pool's lifecycle events.
///
/// Honors `RUST_LOG` when set and falls back to [`DEFAULT_FILTER`]
/// otherwise. A no-op if a subscriber is already installed, so embedding
/// applications keep their own; call this from binaries and stress rigs
/// that have none.
pub fn init_tracing() {
    if tracing::dispatcher::has_been_set() {
        return;
    }
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_names(true)
        .try_init();
}
