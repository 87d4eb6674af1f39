//! JSON output for benchmark results.
//!
//! Wraps a [`BenchResult`] with host metadata and a timestamp.

use std::fs;
use std::path::Path;

use serde::Serialize;

use crate::error::BenchError;
use crate::harness::{BenchResult, BENCH_TARGET};

#[derive(Serialize)]
struct JsonReport<'a> {
    tool: &'static str,
    version: &'static str,
    host: HostHeader,
    timestamp: String,
    result: &'a BenchResult,
}

#[derive(Serialize)]
struct HostHeader {
    arch: &'static str,
    os: &'static str,
    cpus: usize,
    target: String,
}

impl HostHeader {
    fn detect() -> Self {
        Self {
            arch: std::env::consts::ARCH,
            os: std::env::consts::OS,
            cpus: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            target: BENCH_TARGET.to_string(),
        }
    }
}

/// Write `result` to `path`, creating parent directories as needed.
pub fn write_json(path: &str, result: &BenchResult) -> Result<(), BenchError> {
    let report = JsonReport {
        tool: "mem-bench",
        version: env!("CARGO_PKG_VERSION"),
        host: HostHeader::detect(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        result,
    };

    let json = serde_json::to_string_pretty(&report)?;

    let io_err = |source| BenchError::Io {
        path: path.to_string(),
        source,
    };
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
    }
    fs::write(path, json).map_err(io_err)?;

    println!("JSON results written to: {}", path);
    Ok(())
}
