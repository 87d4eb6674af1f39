//! Measurement harness: allocates a source and destination buffer, runs the
//! selected test, and returns structured results.
//!
//! Copy tests time each iteration in three phases:
//! 1. T1: invalidate the source cache
//! 2. T2: copy source to destination
//! 3. T3: flush the destination cache

use std::hint::black_box;

use serde::Serialize;

use mem_primitives::timing::gib_per_sec;
use mem_primitives::{
    BenchTimer, CacheMode, CopyKind, DeviceBuffer, Mapped, MemTarget, MemoryAllocator,
};

use crate::config::{format_size, BenchConfig, BenchTest};
use crate::error::BenchError;
use crate::stats::{compute_stats, Stats};

/// Both benchmark buffers live on this target.
pub const BENCH_TARGET: MemTarget = MemTarget::Dms0;

/// Byte the source buffer is filled with.
pub const SOURCE_FILL: u8 = 0xAA;

/// Byte the single-write test stores.
pub const WRITE_FILL: u8 = 0x55;

const PROGRESS_EVERY: u32 = 50;

/// Result of an iterated copy test.
#[derive(Debug, Clone, Serialize)]
pub struct CopyResult {
    pub test: BenchTest,
    pub strategy: String,
    pub size: usize,
    pub iterations: u32,
    /// T1
    pub invalidate: Stats,
    /// T2
    pub copy: Stats,
    /// T3
    pub flush: Stats,
    pub copy_gb_per_sec: f64,
    /// Destination matched the source after the last iteration.
    pub verified: bool,
}

/// Result of a single timed read or write.
#[derive(Debug, Clone, Serialize)]
pub struct AccessResult {
    pub test: BenchTest,
    pub size: usize,
    pub secs: f64,
    pub gb_per_sec: f64,
}

/// Phase timings of one copy iteration, in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IterationSample {
    pub iteration: u32,
    pub iterations: u32,
    pub invalidate: f64,
    pub copy: f64,
    pub flush: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BenchResult {
    Copy(CopyResult),
    Access(AccessResult),
}

/// Allocate, map and fill the buffers, then run `config.test`.
///
/// Buffers are unmapped and released before returning on every path.
pub fn run_bench<A: MemoryAllocator>(
    config: &BenchConfig,
    alloc: &A,
    progress_cb: Option<&dyn Fn(&IterationSample)>,
) -> Result<BenchResult, BenchError> {
    let mut input = Mapped::new(alloc.allocate(config.size, BENCH_TARGET, CacheMode::Cached)?)?;
    let mut output = Mapped::new(alloc.allocate(config.size, BENCH_TARGET, CacheMode::Cached)?)?;
    tracing::debug!(
        size = config.size,
        target = %BENCH_TARGET,
        test = config.test.number(),
        "benchmark buffers mapped"
    );

    input.fill(SOURCE_FILL);
    input.flush();

    let result = match config.test.copy_kind() {
        Some(kind) => BenchResult::Copy(run_copy(config, kind, &input, &mut output, progress_cb)),
        None => BenchResult::Access(run_access(config, &input, &mut output)),
    };
    Ok(result)
}

fn run_copy<B: DeviceBuffer>(
    config: &BenchConfig,
    kind: CopyKind,
    input: &Mapped<B>,
    output: &mut Mapped<B>,
    progress_cb: Option<&dyn Fn(&IterationSample)>,
) -> CopyResult {
    let strategy = kind.build();
    let size_label = format_size(config.size);
    let n = config.iterations as usize;
    let mut t1 = Vec::with_capacity(n);
    let mut t2 = Vec::with_capacity(n);
    let mut t3 = Vec::with_capacity(n);

    for i in 0..config.iterations {
        let timer = BenchTimer::start();
        input.invalidate();
        let invalidate = timer.stop();

        let timer = BenchTimer::start();
        strategy.copy(output.as_mut_slice(), input.as_slice());
        let copy = timer.stop();

        let timer = BenchTimer::start();
        output.flush();
        let flush = timer.stop();

        t1.push(invalidate);
        t2.push(copy);
        t3.push(flush);

        if let Some(cb) = progress_cb {
            if i % PROGRESS_EVERY == 0 || i + 1 == config.iterations {
                cb(&IterationSample {
                    iteration: i,
                    iterations: config.iterations,
                    invalidate,
                    copy,
                    flush,
                });
            }
        }
    }

    let verified = output.as_slice().iter().all(|&b| b == SOURCE_FILL);
    if !verified {
        eprintln!(
            "WARNING: {} @ {}: destination does not match source",
            strategy.name(),
            size_label
        );
    }

    let copy = compute_stats(&t2);
    CopyResult {
        test: config.test,
        strategy: strategy.name().to_string(),
        size: config.size,
        iterations: config.iterations,
        copy_gb_per_sec: gib_per_sec(config.size as u64, copy.mean),
        invalidate: compute_stats(&t1),
        copy,
        flush: compute_stats(&t3),
        verified,
    }
}

/// Single read: device source into host memory. Single write: host memory
/// into the device destination.
fn run_access<B: DeviceBuffer>(
    config: &BenchConfig,
    input: &Mapped<B>,
    output: &mut Mapped<B>,
) -> AccessResult {
    let secs = match config.test {
        BenchTest::SingleWrite => {
            let host = vec![WRITE_FILL; config.size];
            let timer = BenchTimer::start();
            output.as_mut_slice().copy_from_slice(&host);
            let secs = timer.stop();
            output.flush();
            secs
        }
        _ => {
            let mut host = vec![0u8; config.size];
            input.invalidate();
            let timer = BenchTimer::start();
            host.copy_from_slice(input.as_slice());
            let secs = timer.stop();
            black_box(&host);
            secs
        }
    };

    AccessResult {
        test: config.test,
        size: config.size,
        secs,
        gb_per_sec: gib_per_sec(config.size as u64, secs),
    }
}
