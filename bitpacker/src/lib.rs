//! Block bitpacking of sorted `u32` lists and lower bound search
//! directly on the packed representation.
//!
//! Lists are split into blocks of [`BLOCK_LEN`] integers. Each block stores
//! the deltas between consecutive values, packed on a bit width that is
//! shared by every block of the list. The delta base of a block is the last
//! value of the previous block, and `0` for the first block.
//!
//! The packed layout is the one of [`bitpacking::BitPacker4x`]: four
//! interleaved 32 bits lanes.
mod bitpacker;
mod blocked_bitpacker;
mod lower_bound;

use thiserror::Error;

pub use crate::bitpacker::{BlockScan, PackedBlock};
pub use crate::blocked_bitpacker::{pack_sorted, unpack_sorted, PackedBlocks};
pub use crate::lower_bound::{advance_accumulator, find_lower_bound, BlockSearch, SearchState};

/// Number of integers in a block.
pub const BLOCK_LEN: usize = 128;

/// Highest bit width a block can be packed with.
pub const MAX_NUM_BITS: u8 = 32;

/// Error raised when a buffer or a list does not match the packed block layout.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LayoutError {
    /// Only lists made of full blocks can be packed with a uniform bit width.
    #[error("The number of values ({0}) is not a multiple of the block length")]
    UnalignedLength(usize),
    /// Bit widths above 32 cannot hold a `u32`.
    #[error("Invalid bit width: {0}")]
    InvalidNumBits(u8),
    /// Some delta of the list does not fit on the requested bit width.
    #[error("Packing requires {required} bits, got {actual}")]
    NumBitsTooSmall { required: u8, actual: u8 },
    /// The packed buffer length disagrees with the number of values and the bit width.
    #[error("Expected {expected} packed bytes, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },
}

/// Result of a lower bound search.
///
/// `position` is the absolute index of the first element greater or equal
/// to the target. If there is no such element, `position` is the number of
/// values in the list and `value` is the last element of the list
/// (`0` for an empty list).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LowerBound {
    pub position: usize,
    pub value: u32,
}

impl LowerBound {
    /// Returns true iff the search landed on an element of a list of `num_vals` values.
    pub fn is_found(&self, num_vals: usize) -> bool {
        self.position < num_vals
    }
}

/// Computes the number of bits required to express the largest value of `vals`.
///
/// For a sorted list starting from `0`, no delta can be larger than the
/// maximum value, so this bit width is enough to pack the deltas.
pub fn num_bits(vals: &[u32]) -> u8 {
    let max_val = vals.iter().copied().max().unwrap_or(0u32);
    (32u32 - max_val.leading_zeros()) as u8
}

/// Returns the size in bytes of a packed block, given `num_bits`.
pub fn packed_block_len(num_bits: u8) -> usize {
    num_bits as usize * BLOCK_LEN / 8
}

#[test]
fn test_num_bits() {
    assert_eq!(num_bits(&[]), 0u8);
    assert_eq!(num_bits(&[0]), 0u8);
    assert_eq!(num_bits(&[1]), 1u8);
    assert_eq!(num_bits(&[1, 2]), 2u8);
    assert_eq!(num_bits(&[3, 2]), 2u8);
    assert_eq!(num_bits(&[4]), 3u8);
    assert_eq!(num_bits(&[255]), 8u8);
    assert_eq!(num_bits(&[3, 256]), 9u8);
    assert_eq!(num_bits(&[u32::MAX]), 32u8);
}

#[test]
fn test_packed_block_len() {
    assert_eq!(packed_block_len(0), 0);
    assert_eq!(packed_block_len(1), 16);
    assert_eq!(packed_block_len(13), 208);
    assert_eq!(packed_block_len(32), 512);
}

#[test]
fn test_lower_bound_is_found() {
    let lower_bound = LowerBound {
        position: 3,
        value: 12,
    };
    assert!(lower_bound.is_found(4));
    assert!(!lower_bound.is_found(3));
}
