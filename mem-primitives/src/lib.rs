pub mod alloc;
pub mod copy;
pub mod memfd;
pub mod pattern;
pub mod target;
pub mod timing;

pub use alloc::{AllocError, CacheMode, DeviceBuffer, Mapped, MemoryAllocator, WORD_SIZE};
pub use copy::{BlockCopy, ChunkedCopy, CopyKind, CopyStrategy, LibraryCopy};
pub use memfd::{MemfdAllocator, MemfdBuffer};
pub use pattern::{PatternGen, PatternKind};
pub use target::{targets_in_mask, MemTarget, ALL_TARGETS_MASK, TARGETS};
pub use timing::BenchTimer;
