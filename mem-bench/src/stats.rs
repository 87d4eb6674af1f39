use serde::{Deserialize, Serialize};

/// Descriptive statistics for one timed phase, in seconds. Every sample is
/// kept; there is no outlier removal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub mean: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
    pub stddev: f64,
    pub cv_percent: f64,
    pub sample_count: usize,
}

/// Compute descriptive statistics from timing samples.
pub fn compute_stats(samples: &[f64]) -> Stats {
    if samples.is_empty() {
        return Stats {
            mean: 0.0,
            median: 0.0,
            min: 0.0,
            max: 0.0,
            stddev: 0.0,
            cv_percent: 0.0,
            sample_count: 0,
        };
    }

    if samples.len() == 1 {
        return Stats {
            mean: samples[0],
            median: samples[0],
            min: samples[0],
            max: samples[0],
            stddev: 0.0,
            cv_percent: 0.0,
            sample_count: 1,
        };
    }

    let mut sorted: Vec<f64> = samples.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let mean = sorted.iter().sum::<f64>() / sorted.len() as f64;
    let median = compute_median(&sorted);
    let min = sorted[0];
    let max = sorted[sorted.len() - 1];

    let variance =
        sorted.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (sorted.len() - 1) as f64;
    let stddev = variance.sqrt();
    let cv_percent = if mean > 0.0 {
        (stddev / mean) * 100.0
    } else {
        0.0
    };

    Stats {
        mean,
        median,
        min,
        max,
        stddev,
        cv_percent,
        sample_count: sorted.len(),
    }
}

/// Compute the median of a sorted slice.
fn compute_median(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return 0.0;
    }
    if n % 2 == 0 {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    } else {
        sorted[n / 2]
    }
}
