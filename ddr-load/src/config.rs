//! Validated run configuration.

use std::time::Duration;

use mem_primitives::{
    targets_in_mask, CacheMode, CopyKind, MemTarget, PatternKind, ALL_TARGETS_MASK,
};

use crate::cli::{CopyArg, LoadArgs};

/// Upper bound on `-w`.
pub const MAX_WORKERS_PER_TARGET: u32 = 1024;

/// Upper bound on `--copy-threads`.
pub const MAX_COPY_THREADS: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid DDRC mask {0:#x}: at most 0x1f is supported")]
    InvalidMask(u32),
    #[error("Invalid DDRC mask 0x0: no target selected")]
    EmptyMask,
    #[error("Invalid pattern type {0}: expected 0..=11")]
    InvalidPattern(u32),
    #[error("Invalid buffer size {0:#x}: must be a non-zero multiple of 8 bytes")]
    InvalidSize(usize),
    #[error("Invalid worker count {0}: expected 1..=1024 per target")]
    InvalidWorkers(u32),
    #[error("Invalid copy thread count {0}: expected 1..=64")]
    InvalidCopyThreads(usize),
}

/// Immutable per-invocation settings shared by every worker.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub pattern: PatternKind,
    pub value: u64,
    pub size: usize,
    /// `None` runs until the pattern completes or shutdown is requested.
    pub duration: Option<Duration>,
    pub ddrc_mask: u32,
    pub workers_per_target: usize,
    pub random_access: bool,
    pub readback: bool,
    pub performance: bool,
    pub verify: bool,
    pub copy: CopyKind,
    pub seed: u64,
}

impl RunConfig {
    pub fn from_args(args: &LoadArgs) -> Result<Self, ConfigError> {
        if args.ddrc_mask > ALL_TARGETS_MASK {
            return Err(ConfigError::InvalidMask(args.ddrc_mask));
        }
        if args.ddrc_mask == 0 {
            return Err(ConfigError::EmptyMask);
        }
        let pattern = PatternKind::from_selector(args.pattern)
            .ok_or(ConfigError::InvalidPattern(args.pattern))?;
        if args.size < 8 || args.size % 8 != 0 {
            return Err(ConfigError::InvalidSize(args.size));
        }
        if args.workers == 0 || args.workers > MAX_WORKERS_PER_TARGET {
            return Err(ConfigError::InvalidWorkers(args.workers));
        }
        let copy = match args.copy {
            CopyArg::Library => CopyKind::Library,
            CopyArg::Block => CopyKind::Block,
            CopyArg::Chunked => {
                if args.copy_threads == 0 || args.copy_threads > MAX_COPY_THREADS {
                    return Err(ConfigError::InvalidCopyThreads(args.copy_threads));
                }
                CopyKind::Chunked {
                    threads: args.copy_threads,
                }
            }
        };

        Ok(Self {
            pattern,
            value: args.value,
            size: args.size,
            duration: (args.time > 0).then(|| Duration::from_secs(args.time)),
            ddrc_mask: args.ddrc_mask,
            workers_per_target: args.workers as usize,
            random_access: args.random,
            readback: args.readback,
            performance: args.performance,
            verify: args.verify,
            copy,
            seed: args.seed.unwrap_or_else(rand::random),
        })
    }

    pub fn targets(&self) -> impl Iterator<Item = MemTarget> {
        targets_in_mask(self.ddrc_mask)
    }

    /// Total workers: selected targets times workers per target.
    pub fn worker_count(&self) -> usize {
        self.ddrc_mask.count_ones() as usize * self.workers_per_target
    }

    /// (target, slot) for every worker, in start order.
    pub fn worker_plan(&self) -> Vec<(MemTarget, usize)> {
        self.targets()
            .flat_map(|t| (0..self.workers_per_target).map(move |slot| (t, slot)))
            .collect()
    }

    /// Walking/adjacency patterns and readback runs read what they wrote and
    /// get uncached buffers; plain loads use cached ones.
    pub fn cache_mode(&self) -> CacheMode {
        if self.pattern.needs_uncached() || self.readback {
            CacheMode::Uncached
        } else {
            CacheMode::Cached
        }
    }
}
