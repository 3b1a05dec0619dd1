//! Binary packing with one bit width per block.
//!
//! ```text
//! | count: u32 LE | num_bits | packed block | num_bits | packed block | ... | vbyte tail |
//! ```
//!
//! Every full block of `BLOCK_LEN` values is packed on the smallest bit
//! width that fits its deltas. The remaining `count % BLOCK_LEN` values are
//! stored as variable byte deltas. The delta base of a block, or of the tail,
//! is the last value of the previous block.

use bitpacking::{BitPacker, BitPacker4x};
use byteorder::{ByteOrder, LittleEndian};
use intcodec_bitpacker::{packed_block_len, BlockScan, LowerBound, PackedBlock, BLOCK_LEN, MAX_NUM_BITS};

use super::vbyte::{self, VByteView};
use crate::{HarnessError, Result};

/// Length of the count header.
pub const HEADER_LEN: usize = 4;

/// Upper bound of the number of bytes needed to encode `num_vals` values.
pub fn max_compressed_len(num_vals: usize) -> usize {
    HEADER_LEN
        + num_vals / BLOCK_LEN * (1 + packed_block_len(MAX_NUM_BITS))
        + vbyte::max_compressed_len(num_vals % BLOCK_LEN)
}

/// Encodes `input` into `output` and returns the number of bytes written.
///
/// # Panics
///
/// Panics if `output` is shorter than `max_compressed_len(input.len())`
/// or if `input` holds more than `u32::MAX` values.
pub fn encode_sorted(input: &[u32], output: &mut [u8]) -> usize {
    let num_vals = u32::try_from(input.len()).expect("Too many values for a BP128 list.");
    LittleEndian::write_u32(&mut output[..HEADER_LEN], num_vals);
    let bitpacker = BitPacker4x::new();
    let mut cursor = HEADER_LEN;
    let mut initial = 0u32;
    let mut blocks = input.chunks_exact(BLOCK_LEN);
    for block in &mut blocks {
        let num_bits = bitpacker.num_bits_sorted(initial, block);
        output[cursor] = num_bits;
        cursor += 1;
        cursor += bitpacker.compress_sorted(initial, block, &mut output[cursor..], num_bits);
        initial = block[BLOCK_LEN - 1];
    }
    cursor += vbyte::compress_sorted(blocks.remainder(), &mut output[cursor..], initial);
    cursor
}

/// Validated view over a BP128 buffer.
#[derive(Clone, Copy, Debug)]
pub struct Bp128View<'a> {
    num_vals: usize,
    blocks: &'a [u8],
    tail: VByteView<'a>,
}

impl<'a> Bp128View<'a> {
    /// Walks the block headers to check that blocks and tail exactly fill `bytes`.
    pub fn open(bytes: &'a [u8]) -> Result<Bp128View<'a>> {
        if bytes.len() < HEADER_LEN {
            return Err(HarnessError::corrupted(format!(
                "BP128 buffer of {} bytes has no count header",
                bytes.len()
            )));
        }
        let num_vals = LittleEndian::read_u32(&bytes[..HEADER_LEN]) as usize;
        let mut cursor = HEADER_LEN;
        for block_ord in 0..num_vals / BLOCK_LEN {
            let Some(&num_bits) = bytes.get(cursor) else {
                return Err(HarnessError::corrupted(format!(
                    "BP128 block {block_ord} is missing"
                )));
            };
            if num_bits > MAX_NUM_BITS {
                return Err(HarnessError::corrupted(format!(
                    "BP128 block {block_ord} announces {num_bits} bits"
                )));
            }
            cursor += 1 + packed_block_len(num_bits);
            if cursor > bytes.len() {
                return Err(HarnessError::corrupted(format!(
                    "BP128 block {block_ord} runs past the buffer end"
                )));
            }
        }
        let tail = VByteView::open(&bytes[cursor..], num_vals % BLOCK_LEN, 0u32)?;
        Ok(Bp128View {
            num_vals,
            blocks: &bytes[HEADER_LEN..cursor],
            tail,
        })
    }

    pub fn num_vals(&self) -> usize {
        self.num_vals
    }

    pub fn num_blocks(&self) -> usize {
        self.num_vals / BLOCK_LEN
    }

    fn packed_blocks(&self) -> Bp128Blocks<'a> {
        Bp128Blocks {
            data: self.blocks,
            cursor: 0,
        }
    }

    /// Decodes every value into `output`, which must be `num_vals` long.
    pub fn decode_into(&self, output: &mut [u32]) {
        debug_assert_eq!(output.len(), self.num_vals);
        let bitpacker = BitPacker4x::new();
        let mut initial = 0u32;
        let (blocks_output, tail_output) = output.split_at_mut(self.num_blocks() * BLOCK_LEN);
        for (block, block_output) in self
            .packed_blocks()
            .zip(blocks_output.chunks_exact_mut(BLOCK_LEN))
        {
            bitpacker.decompress_sorted(initial, block.as_bytes(), block_output, block.num_bits());
            initial = block_output[BLOCK_LEN - 1];
        }
        self.tail.with_offset(initial).uncompress_sorted(tail_output);
    }

    /// Returns the first value greater or equal to `target`.
    ///
    /// Blocks are scanned in place with their own bit width, then the tail.
    pub fn lower_bound(&self, target: u32) -> Option<LowerBound> {
        let mut accumulator = 0u32;
        for (block_ord, block) in self.packed_blocks().enumerate() {
            match block.search(accumulator, target) {
                BlockScan::Hit { position, value } => {
                    return Some(LowerBound {
                        position: block_ord * BLOCK_LEN + position,
                        value,
                    });
                }
                BlockScan::Exhausted { last_value } => accumulator = last_value,
            }
        }
        let tail_start = self.num_blocks() * BLOCK_LEN;
        self.tail
            .with_offset(accumulator)
            .lower_bound(target)
            .map(|lower_bound| LowerBound {
                position: tail_start + lower_bound.position,
                value: lower_bound.value,
            })
    }
}

/// Iterates over blocks whose headers were checked by [`Bp128View::open`].
struct Bp128Blocks<'a> {
    data: &'a [u8],
    cursor: usize,
}

impl<'a> Iterator for Bp128Blocks<'a> {
    type Item = PackedBlock<'a>;

    fn next(&mut self) -> Option<PackedBlock<'a>> {
        let num_bits = *self.data.get(self.cursor)?;
        let start = self.cursor + 1;
        let end = start + packed_block_len(num_bits);
        self.cursor = end;
        PackedBlock::open(self.data.get(start..end)?, num_bits).ok()
    }
}
