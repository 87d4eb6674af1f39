use std::io;

use mem_primitives::{AllocError, MemTarget};

use crate::config::ConfigError;

/// Error type for a load run.
///
/// Configuration errors happen before anything is acquired. Allocation and
/// spawn errors stop further worker startup; already running workers are
/// still joined and released. Fault counts are not errors.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("worker {worker} ({target}): buffer setup failed: {source}")]
    Buffer {
        worker: usize,
        target: MemTarget,
        #[source]
        source: AllocError,
    },

    #[error("worker {worker} ({target}): thread start failed: {source}")]
    Spawn {
        worker: usize,
        target: MemTarget,
        #[source]
        source: io::Error,
    },

    #[error("{0} worker thread(s) could not be joined")]
    Join(usize),
}
