use bitpacking::{BitPacker, BitPacker4x};

use crate::bitpacker::PackedBlock;
use crate::{packed_block_len, LayoutError, BLOCK_LEN, MAX_NUM_BITS};

/// Packs a sorted list, block by block, using the same bit width for every block.
///
/// The list length has to be a multiple of `BLOCK_LEN`, and `num_bits` has
/// to be large enough for every delta (see [`crate::num_bits`]).
pub fn pack_sorted(vals: &[u32], num_bits: u8) -> Result<Vec<u8>, LayoutError> {
    if num_bits > MAX_NUM_BITS {
        return Err(LayoutError::InvalidNumBits(num_bits));
    }
    if vals.len() % BLOCK_LEN != 0 {
        return Err(LayoutError::UnalignedLength(vals.len()));
    }
    let bitpacker = BitPacker4x::new();
    let mut output = vec![0u8; vals.len() / BLOCK_LEN * packed_block_len(num_bits)];
    let mut offset = 0;
    let mut initial = 0u32;
    for block in vals.chunks_exact(BLOCK_LEN) {
        let required_num_bits = bitpacker.num_bits_sorted(initial, block);
        if required_num_bits > num_bits {
            return Err(LayoutError::NumBitsTooSmall {
                required: required_num_bits,
                actual: num_bits,
            });
        }
        offset += bitpacker.compress_sorted(initial, block, &mut output[offset..], num_bits);
        initial = block[BLOCK_LEN - 1];
    }
    debug_assert_eq!(offset, output.len());
    Ok(output)
}

/// Unpacks a list packed with [`pack_sorted`] into `output`.
///
/// # Panics
///
/// Panics if `output` is not exactly `num_vals` long.
pub fn unpack_sorted(
    data: &[u8],
    num_vals: usize,
    num_bits: u8,
    output: &mut [u32],
) -> Result<(), LayoutError> {
    PackedBlocks::open(data, num_vals, num_bits)?.unpack(output);
    Ok(())
}

/// Read-only view over a sequence of packed blocks sharing the same bit width.
#[derive(Clone, Copy, Debug)]
pub struct PackedBlocks<'a> {
    data: &'a [u8],
    num_vals: usize,
    num_bits: u8,
}

impl<'a> PackedBlocks<'a> {
    /// Checks that `data` holds exactly the `num_vals / BLOCK_LEN` blocks packed
    /// on `num_bits` bits.
    pub fn open(
        data: &'a [u8],
        num_vals: usize,
        num_bits: u8,
    ) -> Result<PackedBlocks<'a>, LayoutError> {
        if num_bits > MAX_NUM_BITS {
            return Err(LayoutError::InvalidNumBits(num_bits));
        }
        if num_vals % BLOCK_LEN != 0 {
            return Err(LayoutError::UnalignedLength(num_vals));
        }
        let expected = num_vals / BLOCK_LEN * packed_block_len(num_bits);
        if data.len() != expected {
            return Err(LayoutError::LengthMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(PackedBlocks {
            data,
            num_vals,
            num_bits,
        })
    }

    pub fn num_vals(&self) -> usize {
        self.num_vals
    }

    pub fn num_bits(&self) -> u8 {
        self.num_bits
    }

    pub fn num_blocks(&self) -> usize {
        self.num_vals / BLOCK_LEN
    }

    /// Returns the `block_ord`-th block, or `None` past the last block.
    pub fn block(&self, block_ord: usize) -> Option<PackedBlock<'a>> {
        if block_ord >= self.num_blocks() {
            return None;
        }
        let block_len = packed_block_len(self.num_bits);
        let start = block_ord * block_len;
        PackedBlock::open(&self.data[start..start + block_len], self.num_bits).ok()
    }

    pub fn iter(&self) -> impl Iterator<Item = PackedBlock<'a>> + '_ {
        (0..self.num_blocks()).filter_map(move |block_ord| self.block(block_ord))
    }

    /// Unpacks every block into `output`.
    ///
    /// # Panics
    ///
    /// Panics if `output` is not exactly `num_vals` long.
    pub fn unpack(&self, output: &mut [u32]) {
        assert_eq!(
            output.len(),
            self.num_vals,
            "The output buffer must hold exactly `num_vals` values."
        );
        let bitpacker = BitPacker4x::new();
        let mut initial = 0u32;
        for (block, block_output) in self.iter().zip(output.chunks_exact_mut(BLOCK_LEN)) {
            bitpacker.decompress_sorted(initial, block.as_bytes(), block_output, self.num_bits);
            initial = block_output[BLOCK_LEN - 1];
        }
    }
}
