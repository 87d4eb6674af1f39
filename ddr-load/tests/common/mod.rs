#![allow(dead_code)]

use std::io;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, ThreadId};

use mem_primitives::{
    AllocError, CacheMode, DeviceBuffer, MemTarget, MemfdAllocator, MemfdBuffer, MemoryAllocator,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Alloc,
    Map,
    Unmap,
    Free,
}

#[derive(Debug, Clone)]
pub struct Event {
    pub op: Op,
    pub buffer: usize,
    pub target: MemTarget,
    pub cache: CacheMode,
    pub thread: ThreadId,
}

type Log = Arc<Mutex<Vec<Event>>>;

/// Memfd allocator that records every buffer lifecycle step and can be told
/// to fail a given allocation or mapping.
#[derive(Default)]
pub struct TrackingAllocator {
    inner: MemfdAllocator,
    log: Log,
    next: AtomicUsize,
    fail_alloc_at: Option<usize>,
    fail_map_at: Option<usize>,
    corrupt_word: Option<usize>,
}

impl TrackingAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the allocation with this sequence number (0-based).
    pub fn failing_alloc(n: usize) -> Self {
        Self {
            fail_alloc_at: Some(n),
            ..Self::default()
        }
    }

    /// Fail mapping of the buffer with this sequence number.
    pub fn failing_map(n: usize) -> Self {
        Self {
            fail_map_at: Some(n),
            ..Self::default()
        }
    }

    /// Every buffer flips all bits of word `index` when its cache is
    /// invalidated, as a failing memory cell would show up on readback.
    pub fn corrupting(index: usize) -> Self {
        Self {
            corrupt_word: Some(index),
            ..Self::default()
        }
    }

    pub fn events(&self) -> Vec<Event> {
        self.log.lock().unwrap().clone()
    }

    pub fn count(&self, op: Op) -> usize {
        self.events().iter().filter(|e| e.op == op).count()
    }

    fn record(log: &Log, op: Op, buffer: usize, target: MemTarget, cache: CacheMode) {
        log.lock().unwrap().push(Event {
            op,
            buffer,
            target,
            cache,
            thread: thread::current().id(),
        });
    }
}

impl MemoryAllocator for TrackingAllocator {
    type Buffer = TrackedBuffer;

    fn allocate(
        &self,
        size: usize,
        target: MemTarget,
        cache: CacheMode,
    ) -> Result<TrackedBuffer, AllocError> {
        let id = self.next.fetch_add(1, Ordering::SeqCst);
        if self.fail_alloc_at == Some(id) {
            return Err(AllocError::Allocate {
                size,
                target,
                source: io::Error::from_raw_os_error(libc::ENOMEM),
            });
        }
        let inner = self.inner.allocate(size, target, cache)?;
        Self::record(&self.log, Op::Alloc, id, target, cache);
        Ok(TrackedBuffer {
            inner,
            id,
            log: self.log.clone(),
            fail_map: self.fail_map_at == Some(id),
            corrupt_word: self.corrupt_word,
            base: None,
        })
    }
}

pub struct TrackedBuffer {
    inner: MemfdBuffer,
    id: usize,
    log: Log,
    fail_map: bool,
    corrupt_word: Option<usize>,
    /// Address of the live mapping.
    base: Option<usize>,
}

impl TrackedBuffer {
    fn record(&self, op: Op) {
        TrackingAllocator::record(
            &self.log,
            op,
            self.id,
            self.inner.target(),
            self.inner.cache_mode(),
        );
    }
}

impl DeviceBuffer for TrackedBuffer {
    fn len(&self) -> usize {
        self.inner.len()
    }

    fn target(&self) -> MemTarget {
        self.inner.target()
    }

    fn cache_mode(&self) -> CacheMode {
        self.inner.cache_mode()
    }

    fn map(&mut self) -> Result<NonNull<u8>, AllocError> {
        if self.fail_map {
            return Err(AllocError::Map {
                target: self.inner.target(),
                source: io::Error::from_raw_os_error(libc::ENOMEM),
            });
        }
        let ptr = self.inner.map()?;
        self.base = Some(ptr.as_ptr() as usize);
        self.record(Op::Map);
        Ok(ptr)
    }

    fn unmap(&mut self) {
        self.record(Op::Unmap);
        self.base = None;
        self.inner.unmap();
    }

    fn flush_cache(&self) {
        self.inner.flush_cache();
    }

    fn invalidate_cache(&self) {
        self.inner.invalidate_cache();
        if let (Some(index), Some(base)) = (self.corrupt_word, self.base) {
            assert!((index + 1) * 8 <= self.inner.len(), "word {index} out of range");
            let word = (base + index * 8) as *mut u64;
            // SAFETY: the buffer is mapped and the word lies inside it.
            unsafe { word.write_volatile(!word.read_volatile()) };
        }
    }
}

impl Drop for TrackedBuffer {
    fn drop(&mut self) {
        self.record(Op::Free);
    }
}

/// Check per-buffer ordering: alloc, then map/unmap pairs, then one free,
/// with the free on `driver`.
pub fn assert_lifecycle(events: &[Event], driver: ThreadId) {
    let ids: std::collections::BTreeSet<usize> = events.iter().map(|e| e.buffer).collect();
    for id in ids {
        let ops: Vec<&Event> = events.iter().filter(|e| e.buffer == id).collect();
        assert_eq!(ops.first().map(|e| e.op), Some(Op::Alloc), "buffer {id}: {ops:?}");
        assert_eq!(ops.last().map(|e| e.op), Some(Op::Free), "buffer {id}: {ops:?}");
        assert_eq!(ops.iter().filter(|e| e.op == Op::Free).count(), 1, "buffer {id} freed twice");
        let maps = ops.iter().filter(|e| e.op == Op::Map).count();
        let unmaps = ops.iter().filter(|e| e.op == Op::Unmap).count();
        assert_eq!(maps, unmaps, "buffer {id}: unbalanced map/unmap");
        assert_eq!(
            ops.last().map(|e| e.thread),
            Some(driver),
            "buffer {id} freed off the driver thread"
        );
    }
}
