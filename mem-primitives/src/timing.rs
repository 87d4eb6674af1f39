//! Wall-clock timing utilities.

use std::time::{Duration, Instant};

/// Simple wall-clock timer.
pub struct BenchTimer {
    start: Instant,
}

impl BenchTimer {
    /// Start the timer.
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Elapsed time in seconds.
    pub fn stop(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

/// Time a closure, returning its result and the elapsed seconds.
pub fn time_secs<T>(f: impl FnOnce() -> T) -> (T, f64) {
    let timer = BenchTimer::start();
    let out = f();
    (out, timer.stop())
}

/// Throughput in GiB/s for `bytes` moved in `secs`.
pub fn gib_per_sec(bytes: u64, secs: f64) -> f64 {
    if secs > 0.0 {
        bytes as f64 / (1024.0 * 1024.0 * 1024.0) / secs
    } else {
        0.0
    }
}
