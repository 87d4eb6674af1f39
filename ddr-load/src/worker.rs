//! Per-task load loop.
//!
//! Each worker owns one mapped buffer (plus a source buffer in performance
//! mode) and runs `Filling -> CacheSync -> Readback -> Terminated`. The
//! liveness flag is checked at the top of every pass and every
//! [`CHECK_INTERVAL`] words; the worker clears it itself when it finishes.

use std::hint::black_box;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use mem_primitives::pattern::{
    adjacent_bytes_intact, byte_lane_offset, expected_word, walking_byte, worker_seed,
    ADJACENT_BYTE, ADJACENT_LANE,
};
use mem_primitives::timing::gib_per_sec;
use mem_primitives::{
    BenchTimer, CopyStrategy, DeviceBuffer, Mapped, MemTarget, PatternGen, PatternKind, WORD_SIZE,
};

use crate::config::RunConfig;

/// Words processed between liveness checks.
pub const CHECK_INTERVAL: usize = 4096;

/// Byte the performance-mode source buffer is filled with.
pub const SOURCE_FILL: u8 = 0xAA;

/// The slice of [`RunConfig`] one worker needs.
#[derive(Debug, Clone)]
pub struct WorkerParams {
    pub id: usize,
    pub target: MemTarget,
    pub slot: usize,
    pub pattern: PatternKind,
    pub value: u64,
    pub random_access: bool,
    pub readback: bool,
    pub performance: bool,
    pub verify: bool,
    pub duration: Option<Duration>,
    pub seed: u64,
}

impl WorkerParams {
    pub fn from_config(config: &RunConfig, id: usize, target: MemTarget, slot: usize) -> Self {
        Self {
            id,
            target,
            slot,
            pattern: config.pattern,
            value: config.value,
            random_access: config.random_access,
            readback: config.readback,
            performance: config.performance,
            verify: config.verify,
            duration: config.duration,
            seed: worker_seed(config.seed, id),
        }
    }
}

/// What one worker observed.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerReport {
    pub id: usize,
    pub target: MemTarget,
    pub slot: usize,
    pub pattern: PatternKind,
    pub performance: bool,
    /// The worker finished on its own rather than being stopped.
    pub completed: bool,
    pub passes: u64,
    pub bytes_moved: u64,
    pub elapsed: Duration,
    pub walking_mismatches: u64,
    pub adjacency_errors: u64,
    pub readback_mismatches: u64,
    /// Wrapping sum of the readback pass, if one ran to the end.
    pub checksum: Option<u64>,
}

impl WorkerReport {
    fn new(params: &WorkerParams) -> Self {
        Self {
            id: params.id,
            target: params.target,
            slot: params.slot,
            pattern: params.pattern,
            performance: params.performance,
            completed: false,
            passes: 0,
            bytes_moved: 0,
            elapsed: Duration::ZERO,
            walking_mismatches: 0,
            adjacency_errors: 0,
            readback_mismatches: 0,
            checksum: None,
        }
    }

    pub fn throughput_gib(&self) -> f64 {
        gib_per_sec(self.bytes_moved, self.elapsed.as_secs_f64())
    }

    pub fn fault_count(&self) -> u64 {
        self.walking_mismatches + self.adjacency_errors + self.readback_mismatches
    }
}

/// Buffers and report handed back through the join handle.
pub struct WorkerOutcome<B: DeviceBuffer> {
    pub buffer: B,
    pub source: Option<B>,
    pub report: WorkerReport,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Filling,
    CacheSync,
    Readback,
    Terminated,
}

pub struct Worker<B: DeviceBuffer> {
    params: WorkerParams,
    buf: Mapped<B>,
    source: Option<Mapped<B>>,
    copy: Arc<dyn CopyStrategy>,
    active: Arc<AtomicBool>,
    gen: PatternGen,
    report: WorkerReport,
}

impl<B: DeviceBuffer> Worker<B> {
    pub fn new(
        params: WorkerParams,
        buf: Mapped<B>,
        source: Option<Mapped<B>>,
        copy: Arc<dyn CopyStrategy>,
        active: Arc<AtomicBool>,
    ) -> Self {
        let gen = PatternGen::new(params.pattern, params.value, params.seed);
        let report = WorkerReport::new(&params);
        Self {
            params,
            buf,
            source,
            copy,
            active,
            gen,
            report,
        }
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Run to completion or until the liveness flag is cleared.
    pub fn run(mut self) -> WorkerOutcome<B> {
        tracing::debug!(
            worker = self.params.id,
            target = %self.params.target,
            pattern = %self.params.pattern,
            bytes = self.buf.len(),
            "worker started"
        );
        let timer = BenchTimer::start();
        let mut phase = Phase::Filling;

        while phase != Phase::Terminated {
            phase = match phase {
                Phase::Filling => {
                    if self.is_active() && self.fill_pass() {
                        Phase::CacheSync
                    } else {
                        self.report.elapsed = timer.elapsed();
                        Phase::Terminated
                    }
                }
                Phase::CacheSync => {
                    self.buf.flush();
                    self.report.passes += 1;
                    if self.params.performance && !self.deadline_reached(&timer) {
                        Phase::Filling
                    } else {
                        self.report.elapsed = timer.elapsed();
                        self.report.completed = true;
                        if self.params.readback {
                            Phase::Readback
                        } else {
                            Phase::Terminated
                        }
                    }
                }
                Phase::Readback => {
                    self.readback();
                    Phase::Terminated
                }
                Phase::Terminated => Phase::Terminated,
            };
        }

        self.active.store(false, Ordering::Release);
        tracing::debug!(
            worker = self.params.id,
            completed = self.report.completed,
            passes = self.report.passes,
            "worker stopped"
        );

        let Worker {
            buf,
            source,
            report,
            ..
        } = self;
        WorkerOutcome {
            buffer: buf.into_inner(),
            source: source.map(Mapped::into_inner),
            report,
        }
    }

    fn deadline_reached(&self, timer: &BenchTimer) -> bool {
        match self.params.duration {
            Some(limit) => timer.elapsed() >= limit,
            None => false,
        }
    }

    /// One pass over the buffer. Returns false if interrupted.
    fn fill_pass(&mut self) -> bool {
        if self.params.performance {
            return self.copy_pass();
        }
        match self.params.pattern {
            PatternKind::WalkingOnes => self.walk_pass(true),
            PatternKind::WalkingZeros => self.walk_pass(false),
            PatternKind::CheckAdjacent => self.adjacency_pass(),
            _ => self.word_pass(),
        }
    }

    fn copy_pass(&mut self) -> bool {
        let Some(source) = self.source.as_ref() else {
            return false;
        };
        self.copy.copy(self.buf.as_mut_slice(), source.as_slice());
        self.report.bytes_moved += self.buf.len() as u64;
        true
    }

    /// Word offset for step `i` of a pass.
    fn offset(&mut self, i: usize, words: usize) -> usize {
        if self.params.random_access {
            self.gen.random_offset(words)
        } else {
            i
        }
    }

    fn word_pass(&mut self) -> bool {
        let words = self.buf.word_count();
        let base = self.buf.base_addr();
        for i in 0..words {
            if i % CHECK_INTERVAL == 0 && !self.is_active() {
                return false;
            }
            let off = self.offset(i, words);
            let word = self.gen.next_word(base, off);
            self.buf.write_word(off, word);
            self.report.bytes_moved += WORD_SIZE as u64;
        }
        true
    }

    /// Walk a single set (or cleared) bit through every byte, re-reading
    /// after each store.
    fn walk_pass(&mut self, ones: bool) -> bool {
        let words = self.buf.word_count();
        for i in 0..words {
            if i % CHECK_INTERVAL == 0 && !self.is_active() {
                return false;
            }
            let off = self.offset(i, words);
            for byte in off * WORD_SIZE..(off + 1) * WORD_SIZE {
                for bit in 0..8 {
                    let v = walking_byte(ones, bit);
                    self.buf.write_byte(byte, v);
                    if self.buf.read_byte(byte) != v {
                        self.report.walking_mismatches += 1;
                    }
                }
            }
            self.report.bytes_moved += WORD_SIZE as u64;
        }
        true
    }

    /// Store the word, overwrite one lane, and check that no other lane moved.
    fn adjacency_pass(&mut self) -> bool {
        let words = self.buf.word_count();
        let value = self.params.value;
        let lane = byte_lane_offset(ADJACENT_LANE);
        for i in 0..words {
            if i % CHECK_INTERVAL == 0 && !self.is_active() {
                return false;
            }
            let off = self.offset(i, words);
            self.buf.write_word(off, value);
            self.buf.write_byte(off * WORD_SIZE + lane, ADJACENT_BYTE);
            let observed = self.buf.read_word(off);
            if !adjacent_bytes_intact(value, observed, ADJACENT_LANE) {
                self.report.adjacency_errors += 1;
            }
            self.report.bytes_moved += WORD_SIZE as u64;
        }
        true
    }

    /// Expected value of word `off` after a completed pass, when known.
    fn expected(&self, off: usize) -> Option<u64> {
        if !self.params.verify || self.params.random_access {
            return None;
        }
        if self.params.performance {
            return Some(u64::from_ne_bytes([SOURCE_FILL; WORD_SIZE]));
        }
        expected_word(self.params.pattern, self.params.value, self.buf.base_addr(), off)
    }

    fn readback(&mut self) {
        self.buf.invalidate();
        let words = self.buf.word_count();
        let mut sum = 0u64;
        for i in 0..words {
            if i % CHECK_INTERVAL == 0 && !self.is_active() {
                return;
            }
            let word = self.buf.read_word(i);
            sum = sum.wrapping_add(word);
            if let Some(want) = self.expected(i) {
                if word != want {
                    self.report.readback_mismatches += 1;
                }
            }
        }
        self.report.checksum = Some(black_box(sum));
    }
}
