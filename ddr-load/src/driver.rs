//! Worker lifecycle: allocate, map, start, wait, stop, join, release.
//!
//! Buffers move into their worker thread and come back only through the
//! join result, so nothing is released before its thread has been joined.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use mem_primitives::{CacheMode, CopyStrategy, DeviceBuffer, Mapped, MemTarget, MemoryAllocator};

use crate::config::RunConfig;
use crate::error::LoadError;
use crate::worker::{Worker, WorkerOutcome, WorkerParams, WorkerReport, SOURCE_FILL};

/// Target the performance-mode source buffers are allocated on.
pub const PERF_SOURCE_TARGET: MemTarget = MemTarget::Dms0;

/// How often the driver checks flags, the deadline and the shutdown request.
pub const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Extra time performance workers get to notice their own deadline before
/// the driver stops them.
pub const PERF_GRACE: Duration = Duration::from_secs(1);

/// A started worker thread.
pub struct WorkerTask<B: DeviceBuffer> {
    pub id: usize,
    pub target: MemTarget,
    pub slot: usize,
    active: Arc<AtomicBool>,
    handle: JoinHandle<WorkerOutcome<B>>,
}

impl<B: DeviceBuffer> WorkerTask<B> {
    fn is_running(&self) -> bool {
        self.active.load(Ordering::Acquire) && !self.handle.is_finished()
    }

    fn stop(&self) {
        self.active.store(false, Ordering::Release);
    }
}

/// Result of one driver run.
#[derive(Debug)]
pub struct RunSummary {
    /// Reports of every joined worker, in start order.
    pub reports: Vec<WorkerReport>,
    pub planned: usize,
    pub started: usize,
    pub startup_error: Option<LoadError>,
    pub join_failures: usize,
    pub interrupted: bool,
}

impl RunSummary {
    pub fn success(&self) -> bool {
        self.startup_error.is_none() && self.join_failures == 0
    }

    pub fn total_bytes(&self) -> u64 {
        self.reports.iter().map(|r| r.bytes_moved).sum()
    }

    pub fn total_faults(&self) -> u64 {
        self.reports.iter().map(|r| r.fault_count()).sum()
    }
}

pub struct Driver<'a, A: MemoryAllocator> {
    config: &'a RunConfig,
    alloc: &'a A,
    copy: Arc<dyn CopyStrategy>,
    shutdown: &'a AtomicBool,
}

impl<'a, A: MemoryAllocator> Driver<'a, A> {
    pub fn new(config: &'a RunConfig, alloc: &'a A, shutdown: &'a AtomicBool) -> Self {
        Self {
            config,
            alloc,
            copy: Arc::from(config.copy.build()),
            shutdown,
        }
    }

    pub fn run(&self) -> RunSummary {
        let plan = self.config.worker_plan();
        let mut tasks: Vec<WorkerTask<A::Buffer>> = Vec::with_capacity(plan.len());
        let mut startup_error = None;

        tracing::info!(
            workers = plan.len(),
            pattern = %self.config.pattern,
            size = self.config.size,
            performance = self.config.performance,
            copy = self.copy.name(),
            "starting workers"
        );

        for (id, &(target, slot)) in plan.iter().enumerate() {
            if self.shutdown_requested() {
                break;
            }
            match self.start_worker(id, target, slot) {
                Ok(task) => tasks.push(task),
                Err(e) => {
                    tracing::error!(worker = id, %target, error = %e, "worker startup failed");
                    startup_error = Some(e);
                    break;
                }
            }
        }
        let started = tasks.len();

        let interrupted = if startup_error.is_none() {
            self.wait(&tasks)
        } else {
            false
        };

        for task in &tasks {
            task.stop();
        }

        let mut outcomes = Vec::with_capacity(tasks.len());
        let mut join_failures = 0;
        for task in tasks {
            match task.handle.join() {
                Ok(outcome) => outcomes.push(outcome),
                Err(_) => {
                    tracing::error!(
                        worker = task.id,
                        target = %task.target,
                        "worker thread panicked"
                    );
                    join_failures += 1;
                }
            }
        }

        // Every thread has been joined; release the buffers.
        let reports = outcomes
            .into_iter()
            .map(|WorkerOutcome { buffer, source, report }| {
                drop(buffer);
                drop(source);
                report
            })
            .collect();
        tracing::info!(started, join_failures, "all workers joined");

        RunSummary {
            reports,
            planned: plan.len(),
            started,
            startup_error,
            join_failures,
            interrupted,
        }
    }

    fn shutdown_requested(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    fn start_worker(
        &self,
        id: usize,
        target: MemTarget,
        slot: usize,
    ) -> Result<WorkerTask<A::Buffer>, LoadError> {
        let size = self.config.size;
        let buf = self
            .alloc
            .allocate(size, target, self.config.cache_mode())
            .and_then(Mapped::new)
            .map_err(|source| LoadError::Buffer {
                worker: id,
                target,
                source,
            })?;

        let source = if self.config.performance {
            let mut src = self
                .alloc
                .allocate(size, PERF_SOURCE_TARGET, CacheMode::Cached)
                .and_then(Mapped::new)
                .map_err(|source| LoadError::Buffer {
                    worker: id,
                    target: PERF_SOURCE_TARGET,
                    source,
                })?;
            src.fill(SOURCE_FILL);
            src.flush();
            Some(src)
        } else {
            None
        };

        let active = Arc::new(AtomicBool::new(true));
        let worker = Worker::new(
            WorkerParams::from_config(self.config, id, target, slot),
            buf,
            source,
            self.copy.clone(),
            active.clone(),
        );
        let handle = thread::Builder::new()
            .name(format!("load-{}-{}", target, slot))
            .spawn(move || worker.run())
            .map_err(|source| LoadError::Spawn {
                worker: id,
                target,
                source,
            })?;
        tracing::debug!(worker = id, %target, slot, "worker thread started");

        Ok(WorkerTask {
            id,
            target,
            slot,
            active,
            handle,
        })
    }

    /// Block until every worker is done, the deadline passes, or shutdown
    /// is requested. Returns true if stopped by shutdown.
    fn wait(&self, tasks: &[WorkerTask<A::Buffer>]) -> bool {
        let deadline = self.config.duration.map(|d| {
            if self.config.performance {
                d + PERF_GRACE
            } else {
                d
            }
        });
        let start = Instant::now();

        loop {
            if self.shutdown_requested() {
                tracing::info!("shutdown requested, stopping workers");
                return true;
            }
            if tasks.iter().all(|t| !t.is_running()) {
                return false;
            }
            if let Some(limit) = deadline {
                if start.elapsed() >= limit {
                    tracing::info!(
                        secs = limit.as_secs_f64(),
                        "run time elapsed, stopping workers"
                    );
                    return false;
                }
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}
