//! Iteration progress for copy tests. indicatif hides the bar when stderr is
//! not a terminal.

use indicatif::{ProgressBar, ProgressStyle};

use crate::harness::IterationSample;

const US_PER_SEC: f64 = 1_000_000.0;

pub struct BenchProgress {
    bar: ProgressBar,
}

impl BenchProgress {
    /// Bar over `iterations` copy iterations, prefixed with `label`.
    pub fn new(label: &str, iterations: u32) -> Self {
        let bar = ProgressBar::new(iterations as u64);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.cyan} {prefix} [{bar:24}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        bar.set_prefix(label.to_string());
        bar.enable_steady_tick(std::time::Duration::from_millis(100));
        Self { bar }
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }

    /// Callback for [`run_bench`](crate::harness::run_bench).
    pub fn callback(&self) -> impl Fn(&IterationSample) + '_ {
        move |sample: &IterationSample| {
            self.bar.set_position(sample.iteration as u64 + 1);
            self.bar.set_message(phase_message(sample));
        }
    }
}

/// Latest T1/T2/T3 timings in microseconds.
pub fn phase_message(sample: &IterationSample) -> String {
    format!(
        "T1 {:.1}us  T2 {:.1}us  T3 {:.1}us",
        sample.invalidate * US_PER_SEC,
        sample.copy * US_PER_SEC,
        sample.flush * US_PER_SEC
    )
}
