use byteorder::{ByteOrder, LittleEndian};

use crate::{packed_block_len, LayoutError, BLOCK_LEN, MAX_NUM_BITS};

const NUM_LANES: usize = 4;
const LANE_WORD_NUM_BYTES: usize = 4;

/// Outcome of scanning a single packed block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockScan {
    /// `position` (in `0..BLOCK_LEN`) is the first value of the block greater
    /// or equal to the target.
    Hit { position: usize, value: u32 },
    /// Every value of the block is lower than the target.
    /// `last_value` is the last value of the block.
    Exhausted { last_value: u32 },
}

impl BlockScan {
    /// Position within the block, `BLOCK_LEN` if the block was exhausted.
    pub fn position(&self) -> usize {
        match *self {
            BlockScan::Hit { position, .. } => position,
            BlockScan::Exhausted { .. } => BLOCK_LEN,
        }
    }
}

/// Read-only view over a block of `BLOCK_LEN` delta-coded values.
///
/// Deltas are read in place. Value `idx` sits in lane `idx % 4`, at bit
/// offset `(idx / 4) * num_bits` of its lane. Lanes are made of 32 bits
/// little endian words, interleaved: word `w` of lane `l` is the
/// `4 * w + l`-th word of the block.
#[derive(Clone, Copy, Debug)]
pub struct PackedBlock<'a> {
    data: &'a [u8],
    num_bits: u32,
    mask: u32,
}

impl<'a> PackedBlock<'a> {
    /// Opens a block. `data` must be exactly `packed_block_len(num_bits)` long.
    pub fn open(data: &'a [u8], num_bits: u8) -> Result<PackedBlock<'a>, LayoutError> {
        if num_bits > MAX_NUM_BITS {
            return Err(LayoutError::InvalidNumBits(num_bits));
        }
        let expected = packed_block_len(num_bits);
        if data.len() != expected {
            return Err(LayoutError::LengthMismatch {
                expected,
                actual: data.len(),
            });
        }
        let mask = if num_bits == MAX_NUM_BITS {
            u32::MAX
        } else {
            (1u32 << num_bits) - 1u32
        };
        Ok(PackedBlock {
            data,
            num_bits: u32::from(num_bits),
            mask,
        })
    }

    pub fn num_bits(&self) -> u8 {
        self.num_bits as u8
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        self.data
    }

    #[inline]
    fn lane_word(&self, word: usize, lane: usize) -> u32 {
        let start = (word * NUM_LANES + lane) * LANE_WORD_NUM_BYTES;
        LittleEndian::read_u32(&self.data[start..start + LANE_WORD_NUM_BYTES])
    }

    /// Returns the `idx`-th delta of the block.
    ///
    /// # Panics
    ///
    /// Panics if `idx >= BLOCK_LEN`.
    #[inline]
    pub fn delta(&self, idx: usize) -> u32 {
        assert!(idx < BLOCK_LEN, "Delta index {idx} is out of the block.");
        if self.num_bits == 0 {
            return 0;
        }
        let lane = idx % NUM_LANES;
        let addr_in_bits = (idx / NUM_LANES) * self.num_bits as usize;
        let word = addr_in_bits / 32;
        let bit_shift = (addr_in_bits % 32) as u32;
        let mut val = self.lane_word(word, lane) >> bit_shift;
        if bit_shift + self.num_bits > 32 {
            // The value straddles two words of the lane.
            val |= self.lane_word(word + 1, lane) << (32 - bit_shift);
        }
        val & self.mask
    }

    /// Searches the first value greater or equal to `target`.
    ///
    /// Values are rebuilt on the fly by adding the deltas to `accumulator`,
    /// which is the value preceding the first element of the block.
    /// Scanning stops at the first hit: the rest of the block is never read.
    pub fn search(&self, accumulator: u32, target: u32) -> BlockScan {
        let mut value = accumulator;
        for position in 0..BLOCK_LEN {
            value = value.wrapping_add(self.delta(position));
            if value >= target {
                return BlockScan::Hit { position, value };
            }
        }
        BlockScan::Exhausted { last_value: value }
    }

    /// Returns the last value of the block, given the value preceding its first element.
    pub fn last_value(&self, accumulator: u32) -> u32 {
        (0..BLOCK_LEN).fold(accumulator, |value, idx| value.wrapping_add(self.delta(idx)))
    }
}
