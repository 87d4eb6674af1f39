//! Buffer allocation interface and the mapped-buffer guard.
//!
//! A [`MemoryAllocator`] hands out [`DeviceBuffer`] handles. A handle must be
//! mapped before its memory can be touched; [`Mapped`] owns a mapped handle,
//! provides volatile word/byte access, and unmaps exactly once. Dropping a
//! handle releases its memory.

use std::io;
use std::mem::ManuallyDrop;
use std::ptr::{self, NonNull};

use serde::{Deserialize, Serialize};

use crate::target::MemTarget;

/// Size of one pattern word in bytes.
pub const WORD_SIZE: usize = std::mem::size_of::<u64>();

/// CPU cache policy requested for an allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CacheMode {
    /// Normal write-back cached mapping.
    Cached,
    /// Mapping intended for readback tests; the backend avoids lazy faults
    /// so every access reaches memory.
    Uncached,
}

/// Error type for allocation and mapping.
#[derive(Debug, thiserror::Error)]
pub enum AllocError {
    #[error("allocation of {size} bytes on {target} failed: {source}")]
    Allocate {
        size: usize,
        target: MemTarget,
        source: io::Error,
    },
    #[error("mapping buffer on {target} failed: {source}")]
    Map { target: MemTarget, source: io::Error },
    #[error("invalid buffer size {0}")]
    InvalidSize(usize),
}

/// A handle to a physically backed buffer. Dropping it frees the memory.
pub trait DeviceBuffer: Send {
    /// Usable size in bytes.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn target(&self) -> MemTarget;

    fn cache_mode(&self) -> CacheMode;

    /// Map the buffer into the address space and return its base address.
    fn map(&mut self) -> Result<NonNull<u8>, AllocError>;

    /// Undo a successful [`map`](DeviceBuffer::map).
    fn unmap(&mut self);

    /// Write back dirty cache lines of the mapped range.
    fn flush_cache(&self);

    /// Discard cached copies so subsequent reads come from memory.
    fn invalidate_cache(&self);
}

/// Source of device buffers.
pub trait MemoryAllocator: Send + Sync {
    type Buffer: DeviceBuffer + 'static;

    fn allocate(
        &self,
        size: usize,
        target: MemTarget,
        cache: CacheMode,
    ) -> Result<Self::Buffer, AllocError>;
}

/// A mapped buffer. Owns the handle; unmaps it exactly once.
pub struct Mapped<B: DeviceBuffer> {
    buf: B,
    base: NonNull<u8>,
    len: usize,
}

// SAFETY: the mapping is reachable only through this guard, which owns the
// handle exclusively. Moving the guard moves the only access path.
unsafe impl<B: DeviceBuffer> Send for Mapped<B> {}

impl<B: DeviceBuffer> std::fmt::Debug for Mapped<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mapped")
            .field("target", &self.buf.target())
            .field("base", &self.base)
            .field("len", &self.len)
            .finish()
    }
}

impl<B: DeviceBuffer> Mapped<B> {
    /// Map `buf`. On failure the handle is dropped, which frees it.
    pub fn new(mut buf: B) -> Result<Self, AllocError> {
        let base = buf.map()?;
        let len = buf.len();
        Ok(Self { buf, base, len })
    }

    /// Unmap and return the handle.
    pub fn into_inner(self) -> B {
        let this = ManuallyDrop::new(self);
        // SAFETY: `this` is never touched again and its Drop is suppressed,
        // so the handle is moved out exactly once.
        let mut buf = unsafe { ptr::read(&this.buf) };
        buf.unmap();
        buf
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of whole words in the buffer.
    pub fn word_count(&self) -> usize {
        self.len / WORD_SIZE
    }

    /// Virtual base address of the mapping.
    pub fn base_addr(&self) -> usize {
        self.base.as_ptr() as usize
    }

    /// Virtual address of word `index`.
    pub fn word_addr(&self, index: usize) -> usize {
        self.base_addr() + index * WORD_SIZE
    }

    pub fn target(&self) -> MemTarget {
        self.buf.target()
    }

    pub fn cache_mode(&self) -> CacheMode {
        self.buf.cache_mode()
    }

    #[inline]
    pub fn write_word(&mut self, index: usize, value: u64) {
        assert!(index < self.word_count(), "word index {index} out of range");
        // SAFETY: index is in bounds and the mapping is page aligned.
        unsafe { ptr::write_volatile(self.base.as_ptr().cast::<u64>().add(index), value) }
    }

    #[inline]
    pub fn read_word(&self, index: usize) -> u64 {
        assert!(index < self.word_count(), "word index {index} out of range");
        // SAFETY: index is in bounds and the mapping is page aligned.
        unsafe { ptr::read_volatile(self.base.as_ptr().cast::<u64>().add(index)) }
    }

    #[inline]
    pub fn write_byte(&mut self, index: usize, value: u8) {
        assert!(index < self.len, "byte index {index} out of range");
        // SAFETY: index is in bounds.
        unsafe { ptr::write_volatile(self.base.as_ptr().add(index), value) }
    }

    #[inline]
    pub fn read_byte(&self, index: usize) -> u8 {
        assert!(index < self.len, "byte index {index} out of range");
        // SAFETY: index is in bounds.
        unsafe { ptr::read_volatile(self.base.as_ptr().add(index)) }
    }

    pub fn as_slice(&self) -> &[u8] {
        // SAFETY: the mapping is valid for `len` bytes while self is alive.
        unsafe { std::slice::from_raw_parts(self.base.as_ptr(), self.len) }
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        // SAFETY: the mapping is valid for `len` bytes and uniquely borrowed.
        unsafe { std::slice::from_raw_parts_mut(self.base.as_ptr(), self.len) }
    }

    pub fn fill(&mut self, byte: u8) {
        self.as_mut_slice().fill(byte);
    }

    pub fn flush(&self) {
        self.buf.flush_cache();
    }

    pub fn invalidate(&self) {
        self.buf.invalidate_cache();
    }
}

impl<B: DeviceBuffer> Drop for Mapped<B> {
    fn drop(&mut self) {
        self.buf.unmap();
    }
}
