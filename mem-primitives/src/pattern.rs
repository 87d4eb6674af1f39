//! Test patterns for memory-controller load.
//!
//! Selectors 0..=11 are stable and appear on the command line:
//!
//! | Sel | Pattern                                   |
//! |-----|-------------------------------------------|
//! | 0   | 0x55 bytes                                |
//! | 1   | 0xAA bytes                                |
//! | 2   | 0x5A bytes                                |
//! | 3   | 0xA5 bytes                                |
//! | 4   | 0x55AA halfwords                          |
//! | 5   | 0xAA55 halfwords                          |
//! | 6   | pseudo-random words                       |
//! | 7   | each word holds its own address           |
//! | 8   | user supplied 8-byte value                |
//! | 9   | walking 1 within every byte               |
//! | 10  | walking 0 within every byte               |
//! | 11  | adjacent-byte disturbance check           |

use std::fmt;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Byte lane perturbed by the adjacency check.
pub const ADJACENT_LANE: usize = 3;
/// Byte written into [`ADJACENT_LANE`] by the adjacency check.
pub const ADJACENT_BYTE: u8 = 0x55;
/// Default user pattern value.
pub const DEFAULT_USER_VALUE: u64 = 0xA55A_AA55_5AA5_55AA;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PatternKind {
    Fixed55,
    FixedAa,
    Fixed5a,
    FixedA5,
    Alt55aa,
    AltAa55,
    Random,
    Address,
    User,
    WalkingOnes,
    WalkingZeros,
    CheckAdjacent,
}

impl PatternKind {
    pub const ALL: [PatternKind; 12] = [
        PatternKind::Fixed55,
        PatternKind::FixedAa,
        PatternKind::Fixed5a,
        PatternKind::FixedA5,
        PatternKind::Alt55aa,
        PatternKind::AltAa55,
        PatternKind::Random,
        PatternKind::Address,
        PatternKind::User,
        PatternKind::WalkingOnes,
        PatternKind::WalkingZeros,
        PatternKind::CheckAdjacent,
    ];

    /// Pattern for a command-line selector.
    pub fn from_selector(sel: u32) -> Option<Self> {
        Self::ALL.get(sel as usize).copied()
    }

    pub fn selector(self) -> u32 {
        self as u32
    }

    /// Compile-time constant word for the fixed patterns.
    pub fn fixed_word(self) -> Option<u64> {
        match self {
            PatternKind::Fixed55 => Some(0x5555_5555_5555_5555),
            PatternKind::FixedAa => Some(0xAAAA_AAAA_AAAA_AAAA),
            PatternKind::Fixed5a => Some(0x5A5A_5A5A_5A5A_5A5A),
            PatternKind::FixedA5 => Some(0xA5A5_A5A5_A5A5_A5A5),
            PatternKind::Alt55aa => Some(0x55AA_55AA_55AA_55AA),
            PatternKind::AltAa55 => Some(0xAA55_AA55_AA55_AA55),
            _ => None,
        }
    }

    pub fn is_walking(self) -> bool {
        matches!(self, PatternKind::WalkingOnes | PatternKind::WalkingZeros)
    }

    /// Walking and adjacency patterns read back as they write, so their
    /// buffers are allocated uncached.
    pub fn needs_uncached(self) -> bool {
        self.is_walking() || self == PatternKind::CheckAdjacent
    }

    /// Whether the expected value of every word is known after a fill pass.
    pub fn is_deterministic(self) -> bool {
        self != PatternKind::Random
    }

    pub fn description(self) -> &'static str {
        match self {
            PatternKind::Fixed55 => "0x55",
            PatternKind::FixedAa => "0xAA",
            PatternKind::Fixed5a => "0x5A",
            PatternKind::FixedA5 => "0xA5",
            PatternKind::Alt55aa => "0x55AA",
            PatternKind::AltAa55 => "0xAA55",
            PatternKind::Random => "random",
            PatternKind::Address => "8-byte address",
            PatternKind::User => "8-byte user defined",
            PatternKind::WalkingOnes => "walking 1's",
            PatternKind::WalkingZeros => "walking 0's",
            PatternKind::CheckAdjacent => "adjacent byte check",
        }
    }
}

impl fmt::Display for PatternKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.selector(), self.description())
    }
}

/// Value written at `bit` (0..8) of a walking pattern.
///
/// Walking ones run `0x80, 0x40, .. 0x01`; walking zeros are the complements.
#[inline]
pub fn walking_byte(ones: bool, bit: u32) -> u8 {
    let v = 0x80u8 >> bit;
    if ones {
        v
    } else {
        !v
    }
}

/// The full 8-step walk for one byte.
pub fn walking_sequence(ones: bool) -> [u8; 8] {
    let mut seq = [0u8; 8];
    for (bit, slot) in seq.iter_mut().enumerate() {
        *slot = walking_byte(ones, bit as u32);
    }
    seq
}

/// Effective address of word `offset` in a buffer mapped at `base`.
#[inline]
pub fn address_word(base: usize, offset: usize) -> u64 {
    (base + offset * std::mem::size_of::<u64>()) as u64
}

/// Replace byte lane `index` (0 = least significant) of `value`.
#[inline]
pub fn modify_byte(value: u64, index: usize, new_byte: u8) -> u64 {
    let shift = index * 8;
    (value & !(0xFFu64 << shift)) | ((new_byte as u64) << shift)
}

/// True when every byte lane other than `index` matches between `expected`
/// and `observed`.
#[inline]
pub fn adjacent_bytes_intact(expected: u64, observed: u64, index: usize) -> bool {
    let keep = !(0xFFu64 << (index * 8));
    (expected & keep) == (observed & keep)
}

/// Memory byte offset of lane `index` inside a native-endian word.
#[inline]
pub fn byte_lane_offset(index: usize) -> usize {
    if cfg!(target_endian = "little") {
        index
    } else {
        7 - index
    }
}

/// Derive a per-worker seed from the process seed.
pub fn worker_seed(process_seed: u64, worker: usize) -> u64 {
    process_seed ^ (worker as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

/// Word generator for the word-fill patterns.
pub struct PatternGen {
    kind: PatternKind,
    value: u64,
    rng: StdRng,
}

impl PatternGen {
    pub fn new(kind: PatternKind, value: u64, seed: u64) -> Self {
        Self {
            kind,
            value,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn kind(&self) -> PatternKind {
        self.kind
    }

    /// Word to store at `offset` of a buffer mapped at `base`.
    pub fn next_word(&mut self, base: usize, offset: usize) -> u64 {
        match self.kind {
            PatternKind::Random => self.rng.gen::<u64>(),
            PatternKind::Address => address_word(base, offset),
            kind => kind.fixed_word().unwrap_or(self.value),
        }
    }

    /// Random word offset in `0..words`, drawn with replacement.
    pub fn random_offset(&mut self, words: usize) -> usize {
        self.rng.gen_range(0..words)
    }
}

/// The value a sequential fill pass leaves at `offset`.
///
/// Walking patterns leave the last step of the walk in every byte.
pub fn expected_word(kind: PatternKind, value: u64, base: usize, offset: usize) -> Option<u64> {
    match kind {
        PatternKind::Random => None,
        PatternKind::WalkingOnes => Some(u64::from_ne_bytes([walking_byte(true, 7); 8])),
        PatternKind::WalkingZeros => Some(u64::from_ne_bytes([walking_byte(false, 7); 8])),
        PatternKind::Address => Some(address_word(base, offset)),
        PatternKind::User => Some(value),
        PatternKind::CheckAdjacent => Some(modify_byte(value, ADJACENT_LANE, ADJACENT_BYTE)),
        fixed => fixed.fixed_word(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_roundtrip() {
        for (i, k) in PatternKind::ALL.iter().enumerate() {
            assert_eq!(PatternKind::from_selector(i as u32), Some(*k));
            assert_eq!(k.selector(), i as u32);
        }
        assert_eq!(PatternKind::from_selector(12), None);
        assert_eq!(PatternKind::from_selector(99), None);
    }

    #[test]
    fn test_walking_ones_order() {
        assert_eq!(
            walking_sequence(true),
            [0x80, 0x40, 0x20, 0x10, 0x08, 0x04, 0x02, 0x01]
        );
    }

    #[test]
    fn test_walking_zeros_are_complements() {
        let ones = walking_sequence(true);
        let zeros = walking_sequence(false);
        for (o, z) in ones.iter().zip(zeros.iter()) {
            assert_eq!(*z, !*o);
        }
        assert_eq!(zeros[0], 0x7F);
        assert_eq!(zeros[7], 0xFE);
    }

    #[test]
    fn test_fixed_words() {
        assert_eq!(PatternKind::Fixed55.fixed_word(), Some(0x5555555555555555));
        assert_eq!(PatternKind::AltAa55.fixed_word(), Some(0xAA55AA55AA55AA55));
        assert_eq!(PatternKind::Random.fixed_word(), None);
    }

    #[test]
    fn test_modify_byte() {
        assert_eq!(modify_byte(0, 3, 0x55), 0x0000_0000_5500_0000);
        assert_eq!(modify_byte(u64::MAX, 0, 0), 0xFFFF_FFFF_FFFF_FF00);
        assert_eq!(modify_byte(u64::MAX, 7, 0x12), 0x12FF_FFFF_FFFF_FFFF);
    }

    #[test]
    fn test_adjacent_intact_ignores_modified_lane() {
        let v = DEFAULT_USER_VALUE;
        let m = modify_byte(v, 3, 0x00);
        assert!(adjacent_bytes_intact(v, m, 3));
        assert!(!adjacent_bytes_intact(v, m ^ (1 << 40), 3));
        assert!(!adjacent_bytes_intact(v, m ^ 1, 3));
    }

    #[test]
    fn test_address_word() {
        assert_eq!(address_word(0x1000, 0), 0x1000);
        assert_eq!(address_word(0x1000, 3), 0x1018);
    }

    #[test]
    fn test_generator_deterministic_except_random() {
        for kind in PatternKind::ALL {
            if kind == PatternKind::Random {
                continue;
            }
            let mut a = PatternGen::new(kind, 0x1234, 1);
            let mut b = PatternGen::new(kind, 0x1234, 2);
            for off in 0..32 {
                assert_eq!(a.next_word(0x4000, off), b.next_word(0x4000, off));
            }
        }
    }

    #[test]
    fn test_random_differs_by_seed() {
        let mut a = PatternGen::new(PatternKind::Random, 0, 1);
        let mut b = PatternGen::new(PatternKind::Random, 0, 2);
        let wa: Vec<u64> = (0..8).map(|i| a.next_word(0, i)).collect();
        let wb: Vec<u64> = (0..8).map(|i| b.next_word(0, i)).collect();
        assert_ne!(wa, wb);
    }

    #[test]
    fn test_random_offset_in_range() {
        let mut g = PatternGen::new(PatternKind::Fixed55, 0, 7);
        for _ in 0..1000 {
            assert!(g.random_offset(17) < 17);
        }
    }

    #[test]
    fn test_worker_seed_distinct() {
        assert_ne!(worker_seed(42, 0), worker_seed(42, 1));
        assert_eq!(worker_seed(42, 0), 42);
    }

    #[test]
    fn test_expected_word_after_walk() {
        assert_eq!(
            expected_word(PatternKind::WalkingOnes, 0, 0, 5),
            Some(0x0101_0101_0101_0101)
        );
        assert_eq!(
            expected_word(PatternKind::WalkingZeros, 0, 0, 5),
            Some(0xFEFE_FEFE_FEFE_FEFE)
        );
        assert_eq!(expected_word(PatternKind::Random, 0, 0, 5), None);
    }

    #[test]
    fn test_needs_uncached() {
        assert!(PatternKind::WalkingOnes.needs_uncached());
        assert!(PatternKind::CheckAdjacent.needs_uncached());
        assert!(!PatternKind::User.needs_uncached());
    }
}
