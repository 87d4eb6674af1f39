//! Bulk copy strategies.
//!
//! - `LibraryCopy`: `copy_from_slice`, i.e. the platform memcpy.
//! - `BlockCopy`: 128-byte blocks moved as sixteen 64-bit loads followed by
//!   sixteen stores, the shape of a paired load/store copy loop.
//! - `ChunkedCopy`: the range split across scoped threads released together
//!   by a barrier; the last thread takes the remainder.

use std::sync::Barrier;

use serde::{Deserialize, Serialize};

/// Bytes moved per iteration of [`BlockCopy`].
pub const BLOCK_BYTES: usize = 128;

/// A way of copying `src` into `dst`. Both slices have equal length.
pub trait CopyStrategy: Send + Sync {
    fn name(&self) -> &str;

    fn copy(&self, dst: &mut [u8], src: &[u8]);
}

/// Strategy selector used on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CopyKind {
    Library,
    Block,
    Chunked { threads: usize },
}

impl CopyKind {
    pub fn build(self) -> Box<dyn CopyStrategy> {
        match self {
            CopyKind::Library => Box::new(LibraryCopy),
            CopyKind::Block => Box::new(BlockCopy),
            CopyKind::Chunked { threads } => Box::new(ChunkedCopy::new(threads)),
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LibraryCopy;

impl CopyStrategy for LibraryCopy {
    fn name(&self) -> &str {
        "library"
    }

    fn copy(&self, dst: &mut [u8], src: &[u8]) {
        dst.copy_from_slice(src);
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct BlockCopy;

impl CopyStrategy for BlockCopy {
    fn name(&self) -> &str {
        "block"
    }

    fn copy(&self, dst: &mut [u8], src: &[u8]) {
        assert_eq!(dst.len(), src.len(), "copy length mismatch");
        let mut d_blocks = dst.chunks_exact_mut(BLOCK_BYTES);
        let mut s_blocks = src.chunks_exact(BLOCK_BYTES);
        for (d, s) in (&mut d_blocks).zip(&mut s_blocks) {
            let mut regs = [0u64; BLOCK_BYTES / 8];
            for (r, word) in regs.iter_mut().zip(s.chunks_exact(8)) {
                *r = u64::from_ne_bytes([
                    word[0], word[1], word[2], word[3], word[4], word[5], word[6], word[7],
                ]);
            }
            for (r, word) in regs.iter().zip(d.chunks_exact_mut(8)) {
                word.copy_from_slice(&r.to_ne_bytes());
            }
        }
        d_blocks
            .into_remainder()
            .copy_from_slice(s_blocks.remainder());
    }
}

/// Multi-threaded copy over contiguous chunks.
#[derive(Debug, Clone, Copy)]
pub struct ChunkedCopy {
    threads: usize,
}

impl ChunkedCopy {
    pub fn new(threads: usize) -> Self {
        Self {
            threads: threads.max(1),
        }
    }

    pub fn threads(&self) -> usize {
        self.threads
    }
}

/// Split `len` bytes into `threads` chunks; the last absorbs the remainder.
pub fn chunk_bounds(len: usize, threads: usize) -> Vec<(usize, usize)> {
    let threads = threads.max(1);
    let chunk = len / threads;
    (0..threads)
        .map(|i| {
            let start = i * chunk;
            let end = if i == threads - 1 { len } else { start + chunk };
            (start, end)
        })
        .collect()
}

impl CopyStrategy for ChunkedCopy {
    fn name(&self) -> &str {
        "chunked"
    }

    fn copy(&self, dst: &mut [u8], src: &[u8]) {
        assert_eq!(dst.len(), src.len(), "copy length mismatch");
        let bounds = chunk_bounds(dst.len(), self.threads);
        let barrier = Barrier::new(bounds.len());

        std::thread::scope(|s| {
            let mut rest = dst;
            for &(start, end) in &bounds {
                let (d, tail) = std::mem::take(&mut rest).split_at_mut(end - start);
                rest = tail;
                let sv = &src[start..end];
                let barrier = &barrier;
                s.spawn(move || {
                    barrier.wait();
                    d.copy_from_slice(sv);
                });
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 31 + 7) as u8).collect()
    }

    fn check(strategy: &dyn CopyStrategy, len: usize) {
        let src = source(len);
        let mut dst = vec![0u8; len];
        strategy.copy(&mut dst, &src);
        assert_eq!(dst, src, "{} copy of {} bytes", strategy.name(), len);
    }

    #[test]
    fn test_library_copy() {
        check(&LibraryCopy, 4096);
    }

    #[test]
    fn test_block_copy_with_remainder() {
        check(&BlockCopy, 128 * 5 + 13);
        check(&BlockCopy, 7);
        check(&BlockCopy, 0);
    }

    #[test]
    fn test_chunked_copy_various_threads() {
        for threads in [1, 2, 4, 8] {
            check(&ChunkedCopy::new(threads), 10_007);
        }
    }

    #[test]
    fn test_chunked_copy_more_threads_than_bytes() {
        check(&ChunkedCopy::new(8), 3);
    }

    #[test]
    fn test_chunk_bounds_cover_range() {
        let b = chunk_bounds(10, 3);
        assert_eq!(b, vec![(0, 3), (3, 6), (6, 10)]);
        assert_eq!(chunk_bounds(5, 0), vec![(0, 5)]);
    }

    #[test]
    fn test_copy_kind_build_names() {
        assert_eq!(CopyKind::Library.build().name(), "library");
        assert_eq!(CopyKind::Block.build().name(), "block");
        assert_eq!(CopyKind::Chunked { threads: 2 }.build().name(), "chunked");
    }
}
