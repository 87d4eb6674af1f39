mod common;

use std::sync::atomic::AtomicBool;
use std::thread;
use std::time::Duration;

use common::{assert_lifecycle, Op, TrackingAllocator};
use ddr_load::config::RunConfig;
use ddr_load::driver::{Driver, PERF_SOURCE_TARGET};
use ddr_load::error::LoadError;
use mem_primitives::{AllocError, CacheMode, CopyKind, MemTarget, PatternKind};

fn config(mask: u32, workers: usize, pattern: PatternKind) -> RunConfig {
    RunConfig {
        pattern,
        value: 0xA55A_AA55_5AA5_55AA,
        size: 0x8000,
        duration: None,
        ddrc_mask: mask,
        workers_per_target: workers,
        random_access: false,
        readback: false,
        performance: false,
        verify: false,
        copy: CopyKind::Library,
        seed: 11,
    }
}

#[test]
fn test_one_task_per_target_and_slot() {
    let alloc = TrackingAllocator::new();
    let shutdown = AtomicBool::new(false);
    let c = config(0x15, 3, PatternKind::Fixed55);
    let summary = Driver::new(&c, &alloc, &shutdown).run();

    assert!(summary.success());
    assert_eq!(summary.planned, 9);
    assert_eq!(summary.started, 9);
    assert_eq!(summary.reports.len(), 9);
    for op in [Op::Alloc, Op::Map, Op::Unmap, Op::Free] {
        assert_eq!(alloc.count(op), 9, "{op:?}");
    }

    let mut per_target = [0usize; 5];
    for r in &summary.reports {
        per_target[r.target.bit() as usize] += 1;
    }
    assert_eq!(per_target, [3, 0, 3, 0, 3]);
    assert_lifecycle(&alloc.events(), thread::current().id());
}

#[test]
fn test_buffers_freed_after_every_unmap() {
    let alloc = TrackingAllocator::new();
    let shutdown = AtomicBool::new(false);
    let c = config(0x3, 2, PatternKind::User);
    Driver::new(&c, &alloc, &shutdown).run();

    let events = alloc.events();
    let first_free = events.iter().position(|e| e.op == Op::Free).unwrap();
    let last_unmap = events.iter().rposition(|e| e.op == Op::Unmap).unwrap();
    assert!(
        last_unmap < first_free,
        "a buffer was freed before every worker had finished"
    );
}

#[test]
fn test_cache_mode_follows_pattern() {
    let alloc = TrackingAllocator::new();
    let shutdown = AtomicBool::new(false);
    Driver::new(&config(0x1, 1, PatternKind::WalkingOnes), &alloc, &shutdown).run();
    Driver::new(&config(0x1, 1, PatternKind::Fixed5a), &alloc, &shutdown).run();

    let caches: Vec<CacheMode> = alloc
        .events()
        .iter()
        .filter(|e| e.op == Op::Alloc)
        .map(|e| e.cache)
        .collect();
    assert_eq!(caches, vec![CacheMode::Uncached, CacheMode::Cached]);
}

#[test]
fn test_performance_allocates_cached_source() {
    let alloc = TrackingAllocator::new();
    let shutdown = AtomicBool::new(false);
    let mut c = config(0x10, 2, PatternKind::Random);
    c.performance = true;
    c.duration = Some(Duration::from_millis(100));
    let summary = Driver::new(&c, &alloc, &shutdown).run();

    assert!(summary.success());
    assert_eq!(alloc.count(Op::Alloc), 4);
    assert_eq!(alloc.count(Op::Free), 4);
    let sources: Vec<_> = alloc
        .events()
        .into_iter()
        .filter(|e| e.op == Op::Alloc && e.target == PERF_SOURCE_TARGET)
        .collect();
    assert_eq!(sources.len(), 2);
    assert!(sources.iter().all(|e| e.cache == CacheMode::Cached));
    assert!(summary.total_bytes() >= 2 * 0x8000);
    assert_lifecycle(&alloc.events(), thread::current().id());
}

#[test]
fn test_allocation_failure_unwinds_started_workers() {
    // Third allocation fails: workers 0 and 1 are already running.
    let alloc = TrackingAllocator::failing_alloc(2);
    let shutdown = AtomicBool::new(false);
    let c = config(0x1f, 1, PatternKind::Fixed55);
    let summary = Driver::new(&c, &alloc, &shutdown).run();

    assert!(!summary.success());
    assert_eq!(summary.planned, 5);
    assert_eq!(summary.started, 2);
    assert_eq!(summary.reports.len(), 2);
    assert!(matches!(
        summary.startup_error,
        Some(LoadError::Buffer {
            worker: 2,
            target: MemTarget::Dms2,
            source: AllocError::Allocate { .. },
        })
    ));
    assert_eq!(alloc.count(Op::Alloc), 2);
    assert_eq!(alloc.count(Op::Free), 2);
    assert_lifecycle(&alloc.events(), thread::current().id());
}

#[test]
fn test_map_failure_frees_unmapped_buffer() {
    let alloc = TrackingAllocator::failing_map(1);
    let shutdown = AtomicBool::new(false);
    let c = config(0x1, 3, PatternKind::Fixed55);
    let summary = Driver::new(&c, &alloc, &shutdown).run();

    assert!(!summary.success());
    assert_eq!(summary.started, 1);
    assert!(matches!(
        summary.startup_error,
        Some(LoadError::Buffer {
            worker: 1,
            source: AllocError::Map { .. },
            ..
        })
    ));
    assert_eq!(alloc.count(Op::Alloc), 2);
    assert_eq!(alloc.count(Op::Map), 1);
    assert_eq!(alloc.count(Op::Unmap), 1);
    assert_eq!(alloc.count(Op::Free), 2);
    assert_lifecycle(&alloc.events(), thread::current().id());
}

#[test]
fn test_source_allocation_failure_releases_destination() {
    // Allocation 1 is worker 0's performance source.
    let alloc = TrackingAllocator::failing_alloc(1);
    let shutdown = AtomicBool::new(false);
    let mut c = config(0x2, 1, PatternKind::Random);
    c.performance = true;
    c.duration = Some(Duration::from_millis(50));
    let summary = Driver::new(&c, &alloc, &shutdown).run();

    assert_eq!(summary.started, 0);
    assert!(matches!(
        summary.startup_error,
        Some(LoadError::Buffer { target, .. }) if target == PERF_SOURCE_TARGET
    ));
    assert_eq!(alloc.count(Op::Alloc), 1);
    assert_eq!(alloc.count(Op::Free), 1);
    assert_lifecycle(&alloc.events(), thread::current().id());
}
