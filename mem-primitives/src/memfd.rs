//! memfd-backed allocator.
//!
//! Each allocation is an anonymous memory file sized with `ftruncate`. The
//! file descriptor is the buffer handle; mapping is a `MAP_SHARED` mmap of
//! the file. Cache maintenance goes through `msync` bracketed by full fences.

use std::ffi::CString;
use std::io;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};
use std::ptr::NonNull;
use std::sync::atomic::{fence, Ordering};

use crate::alloc::{AllocError, CacheMode, DeviceBuffer, MemoryAllocator};
use crate::target::MemTarget;

/// System page size in bytes.
pub fn page_size() -> usize {
    // SAFETY: sysconf has no preconditions.
    let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if size > 0 {
        size as usize
    } else {
        4096
    }
}

/// Round a size up to the next page boundary. `None` if that overflows.
#[inline]
pub fn align_to_page(size: usize) -> Option<usize> {
    let page = page_size();
    size.checked_add(page - 1).map(|s| s & !(page - 1))
}

/// Allocator producing [`MemfdBuffer`]s.
#[derive(Debug, Default, Clone, Copy)]
pub struct MemfdAllocator;

impl MemfdAllocator {
    pub fn new() -> Self {
        Self
    }
}

impl MemoryAllocator for MemfdAllocator {
    type Buffer = MemfdBuffer;

    fn allocate(
        &self,
        size: usize,
        target: MemTarget,
        cache: CacheMode,
    ) -> Result<MemfdBuffer, AllocError> {
        MemfdBuffer::create(size, target, cache)
    }
}

/// A buffer backed by an anonymous memory file.
pub struct MemfdBuffer {
    fd: OwnedFd,
    size: usize,
    mapped_len: usize,
    target: MemTarget,
    cache: CacheMode,
    ptr: Option<NonNull<u8>>,
}

impl std::fmt::Debug for MemfdBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemfdBuffer")
            .field("fd", &self.fd.as_raw_fd())
            .field("size", &self.size)
            .field("target", &self.target)
            .field("cache", &self.cache)
            .field("mapped", &self.ptr.is_some())
            .finish()
    }
}

// SAFETY: the raw pointer is only dereferenced through `Mapped`, which owns
// the buffer exclusively.
unsafe impl Send for MemfdBuffer {}

impl MemfdBuffer {
    fn create(size: usize, target: MemTarget, cache: CacheMode) -> Result<Self, AllocError> {
        let mapped_len = match align_to_page(size) {
            Some(len) if size > 0 && len <= libc::off_t::MAX as usize => len,
            _ => return Err(AllocError::InvalidSize(size)),
        };
        let alloc_err = |source| AllocError::Allocate {
            size,
            target,
            source,
        };

        let name = CString::new(format!("memload-{}", target.label()))
            .map_err(|e| alloc_err(io::Error::new(io::ErrorKind::InvalidInput, e)))?;

        // SAFETY: name is a valid NUL-terminated string.
        let raw = unsafe { libc::memfd_create(name.as_ptr(), libc::MFD_CLOEXEC) };
        if raw < 0 {
            return Err(alloc_err(io::Error::last_os_error()));
        }
        // SAFETY: raw is a freshly created descriptor owned by nobody else.
        let fd = unsafe { OwnedFd::from_raw_fd(raw) };

        // SAFETY: fd is a valid memfd.
        if unsafe { libc::ftruncate(fd.as_raw_fd(), mapped_len as libc::off_t) } != 0 {
            return Err(alloc_err(io::Error::last_os_error()));
        }

        Ok(Self {
            fd,
            size,
            mapped_len,
            target,
            cache,
            ptr: None,
        })
    }

    fn sync(&self, flags: libc::c_int) {
        if let Some(ptr) = self.ptr {
            // SAFETY: ptr/mapped_len describe a live page-aligned mapping.
            unsafe {
                libc::msync(ptr.as_ptr().cast(), self.mapped_len, flags);
            }
        }
    }
}

impl DeviceBuffer for MemfdBuffer {
    fn len(&self) -> usize {
        self.size
    }

    fn target(&self) -> MemTarget {
        self.target
    }

    fn cache_mode(&self) -> CacheMode {
        self.cache
    }

    fn map(&mut self) -> Result<NonNull<u8>, AllocError> {
        if let Some(ptr) = self.ptr {
            return Ok(ptr);
        }
        let mut flags = libc::MAP_SHARED;
        if self.cache == CacheMode::Uncached {
            flags |= libc::MAP_POPULATE;
        }
        // SAFETY: fd is valid and sized to mapped_len; MAP_FAILED is checked.
        let ptr = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                self.mapped_len,
                libc::PROT_READ | libc::PROT_WRITE,
                flags,
                self.fd.as_raw_fd(),
                0,
            )
        };
        if ptr == libc::MAP_FAILED {
            return Err(AllocError::Map {
                target: self.target,
                source: io::Error::last_os_error(),
            });
        }
        let ptr = NonNull::new(ptr.cast::<u8>()).ok_or_else(|| AllocError::Map {
            target: self.target,
            source: io::Error::new(io::ErrorKind::Other, "mmap returned null"),
        })?;
        self.ptr = Some(ptr);
        Ok(ptr)
    }

    fn unmap(&mut self) {
        if let Some(ptr) = self.ptr.take() {
            // SAFETY: ptr was returned by mmap with mapped_len bytes.
            unsafe {
                libc::munmap(ptr.as_ptr().cast(), self.mapped_len);
            }
        }
    }

    fn flush_cache(&self) {
        fence(Ordering::SeqCst);
        self.sync(libc::MS_SYNC);
    }

    fn invalidate_cache(&self) {
        self.sync(libc::MS_INVALIDATE);
        fence(Ordering::SeqCst);
    }
}

impl Drop for MemfdBuffer {
    fn drop(&mut self) {
        self.unmap();
        // fd closed by OwnedFd
    }
}
