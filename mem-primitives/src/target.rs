//! Physical memory targets and controller-mask decoding.
//!
//! Bit `n` of a controller mask selects `TARGETS[n]`: the four DDR memory
//! controllers (DMS0..DMS3) followed by the on-chip memory.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A physical memory region buffers can be allocated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MemTarget {
    Dms0,
    Dms1,
    Dms2,
    Dms3,
    Ocm,
}

/// Lookup table indexed by controller-mask bit position.
pub const TARGETS: [MemTarget; 5] = [
    MemTarget::Dms0,
    MemTarget::Dms1,
    MemTarget::Dms2,
    MemTarget::Dms3,
    MemTarget::Ocm,
];

/// Mask with every available target selected.
pub const ALL_TARGETS_MASK: u32 = (1 << TARGETS.len()) - 1;

impl MemTarget {
    /// Bit position of this target in a controller mask.
    pub fn bit(self) -> u32 {
        match self {
            MemTarget::Dms0 => 0,
            MemTarget::Dms1 => 1,
            MemTarget::Dms2 => 2,
            MemTarget::Dms3 => 3,
            MemTarget::Ocm => 4,
        }
    }

    /// Target for a mask bit position, if one exists.
    pub fn from_bit(bit: u32) -> Option<Self> {
        TARGETS.get(bit as usize).copied()
    }

    /// Short lowercase label used in logs and reports.
    pub fn label(self) -> &'static str {
        match self {
            MemTarget::Dms0 => "dms0",
            MemTarget::Dms1 => "dms1",
            MemTarget::Dms2 => "dms2",
            MemTarget::Dms3 => "dms3",
            MemTarget::Ocm => "ocm",
        }
    }
}

impl fmt::Display for MemTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Targets selected by `mask`, in ascending bit order.
///
/// Bits above the last available target are ignored; callers validate the
/// mask against [`ALL_TARGETS_MASK`] first.
pub fn targets_in_mask(mask: u32) -> impl Iterator<Item = MemTarget> {
    TARGETS
        .iter()
        .copied()
        .filter(move |t| (mask >> t.bit()) & 1 == 1)
}
