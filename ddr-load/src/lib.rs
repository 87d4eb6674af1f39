//! DDR memory-controller pattern load harness.
//!
//! One worker thread per (target, slot) pair fills its own buffer with a test
//! pattern, optionally reads it back, or measures copy bandwidth, until it
//! finishes, the run time elapses, or the process is signalled.

pub mod cli;
pub mod config;
pub mod driver;
pub mod error;
pub mod report;
pub mod signal;
pub mod worker;

use std::ffi::OsString;
use std::io::Write;
use std::sync::atomic::AtomicBool;

use clap::Parser;
use mem_primitives::MemoryAllocator;

use cli::LoadArgs;
use config::RunConfig;
use driver::Driver;
use error::LoadError;

/// Parse `argv`, run the load, write the report to `out`. Returns the exit
/// code.
pub fn run_cli<A, I, T>(argv: I, alloc: &A, shutdown: &AtomicBool, out: &mut dyn Write) -> i32
where
    A: MemoryAllocator,
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let args = match LoadArgs::try_parse_from(argv) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("{}", e);
            return 1;
        }
    };
    let config = match RunConfig::from_args(&args) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };

    let summary = Driver::new(&config, alloc, shutdown).run();

    if let Err(e) = report::write_summary(out, &summary, config.performance) {
        tracing::warn!(error = %e, "failed to write report");
    }
    if let Some(e) = &summary.startup_error {
        eprintln!("Error: {}", e);
    }
    if summary.join_failures > 0 {
        eprintln!("Error: {}", LoadError::Join(summary.join_failures));
    }
    if summary.total_faults() > 0 {
        tracing::warn!(faults = summary.total_faults(), "memory faults observed");
    }

    if summary.success() {
        0
    } else {
        1
    }
}
