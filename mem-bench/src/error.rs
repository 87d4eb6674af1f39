use mem_primitives::AllocError;

#[derive(Debug, thiserror::Error)]
pub enum BenchError {
    #[error("Invalid test number {0}. Use 1, 2, 3, 4 or 5.")]
    InvalidTest(u32),

    #[error("Invalid size '{0}'. Use one of the following: 1MB, 2MB, 4MB, 8MB, 256MB, 512MB, 1GB")]
    InvalidSize(String),

    #[error("Invalid size {size} for test {test}. Allowed sizes are: 1MB, 4MB, 8MB, or 1GB.")]
    SizeNotAllowed { test: u32, size: String },

    #[error("Test 3 requires a thread count. Usage: mem-bench 3 <SIZE> <THREADS>")]
    MissingThreads,

    #[error("Invalid thread count {0}. Use 1, 2, 4, or 8.")]
    InvalidThreads(usize),

    #[error("Iteration count must be at least 1")]
    NoIterations,

    #[error(transparent)]
    Alloc(#[from] AllocError),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to write {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
