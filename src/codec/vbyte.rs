//! Variable byte codec for sorted lists.
//!
//! Each value is stored as the delta to its predecessor, 7 bits per byte,
//! lowest bits first. The high bit of a byte is set iff more bytes of the
//! same value follow. The number of values is not part of the encoding.

use intcodec_bitpacker::LowerBound;

use crate::{HarnessError, Result};

const CONTINUATION_BIT: u8 = 128u8;
const PAYLOAD_MASK: u8 = 127u8;
const MAX_VINT_LEN: usize = 5;

/// Upper bound of the number of bytes needed to encode `num_vals` values.
pub fn max_compressed_len(num_vals: usize) -> usize {
    num_vals * MAX_VINT_LEN
}

/// Compresses a sorted array of `u32` integers,
/// using delta-encoding and variable bytes encoding.
///
/// `offset` is the value of the hypothetical previous element
/// in the delta-encoding. Returns the number of bytes written.
#[inline(always)]
pub fn compress_sorted(input: &[u32], output: &mut [u8], mut offset: u32) -> usize {
    let mut byte_written = 0;
    for &v in input {
        let mut to_encode: u32 = v.wrapping_sub(offset);
        offset = v;
        loop {
            let next_byte: u8 = (to_encode % 128u32) as u8;
            to_encode /= 128u32;
            if to_encode == 0u32 {
                output[byte_written] = next_byte;
                byte_written += 1;
                break;
            } else {
                output[byte_written] = next_byte | CONTINUATION_BIT;
                byte_written += 1;
            }
        }
    }
    byte_written
}

/// Validated view over variable byte encoded deltas.
#[derive(Clone, Copy, Debug)]
pub struct VByteView<'a> {
    data: &'a [u8],
    num_vals: usize,
    offset: u32,
}

impl<'a> VByteView<'a> {
    /// Checks that `data` holds exactly `num_vals` well formed values.
    ///
    /// `offset` is the value preceding the first encoded value.
    pub fn open(data: &'a [u8], num_vals: usize, offset: u32) -> Result<VByteView<'a>> {
        let mut num_terminated = 0;
        let mut value_len = 0;
        for &byte in data {
            value_len += 1;
            if value_len > MAX_VINT_LEN {
                return Err(HarnessError::corrupted(format!(
                    "vbyte value {num_terminated} spans more than {MAX_VINT_LEN} bytes"
                )));
            }
            if byte & CONTINUATION_BIT == 0 {
                num_terminated += 1;
                value_len = 0;
            }
        }
        if value_len != 0 {
            return Err(HarnessError::corrupted("vbyte data ends within a value"));
        }
        if num_terminated != num_vals {
            return Err(HarnessError::corrupted(format!(
                "expected {num_vals} vbyte values, found {num_terminated}"
            )));
        }
        Ok(VByteView {
            data,
            num_vals,
            offset,
        })
    }

    pub fn num_vals(&self) -> usize {
        self.num_vals
    }

    pub fn num_bytes(&self) -> usize {
        self.data.len()
    }

    /// Returns the same view, rebuilding values from another `offset`.
    pub fn with_offset(self, offset: u32) -> VByteView<'a> {
        VByteView { offset, ..self }
    }

    /// Uncompresses the values into `output`, which must be `num_vals` long.
    ///
    /// Returns the number of bytes read.
    pub fn uncompress_sorted(&self, output: &mut [u32]) -> usize {
        debug_assert_eq!(output.len(), self.num_vals);
        let mut read_byte = 0;
        let mut result = self.offset;
        for output_mut in output.iter_mut() {
            let mut shift = 0u32;
            loop {
                let cur_byte = self.data[read_byte];
                read_byte += 1;
                result = result.wrapping_add(u32::from(cur_byte & PAYLOAD_MASK) << shift);
                if cur_byte & CONTINUATION_BIT == 0u8 {
                    break;
                }
                shift += 7;
            }
            *output_mut = result;
        }
        read_byte
    }

    /// Iterates over the values, rebuilt from their deltas.
    pub fn iter(&self) -> VByteIter<'a> {
        VByteIter {
            data: self.data,
            cursor: 0,
            value: self.offset,
        }
    }

    /// Returns the first value greater or equal to `target`.
    pub fn lower_bound(&self, target: u32) -> Option<LowerBound> {
        self.iter()
            .enumerate()
            .find(|&(_, value)| value >= target)
            .map(|(position, value)| LowerBound { position, value })
    }
}

pub struct VByteIter<'a> {
    data: &'a [u8],
    cursor: usize,
    value: u32,
}

impl<'a> Iterator for VByteIter<'a> {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        if self.cursor >= self.data.len() {
            return None;
        }
        let mut shift = 0u32;
        loop {
            let cur_byte = self.data[self.cursor];
            self.cursor += 1;
            self.value = self
                .value
                .wrapping_add(u32::from(cur_byte & PAYLOAD_MASK) << shift);
            if cur_byte & CONTINUATION_BIT == 0u8 {
                return Some(self.value);
            }
            shift += 7;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compress(input: &[u32], offset: u32) -> Vec<u8> {
        let mut output = vec![0u8; max_compressed_len(input.len())];
        let written_len = compress_sorted(input, &mut output, offset);
        output.truncate(written_len);
        output
    }

    #[test]
    fn test_encode_vint_known_bytes() {
        assert_eq!(compress(&[1, 129, 16_513], 0), vec![1, 128, 1, 128, 128, 1]);
        assert_eq!(compress(&[u32::MAX], 0), vec![255, 255, 255, 255, 15]);
    }

    #[test]
    fn test_encode_vint() {
        let input: Vec<u32> = (0u32..123u32).map(|i| 4 + i * 7 / 2).collect();
        for offset in [0u32, 1u32, 2u32] {
            let encoded_data = compress(&input, offset);
            let view = VByteView::open(&encoded_data, input.len(), offset).unwrap();
            let mut output = vec![0u32; input.len()];
            let consumed_num_bytes = view.uncompress_sorted(&mut output);
            assert_eq!(consumed_num_bytes, encoded_data.len());
            assert_eq!(output, input);
            assert_eq!(view.iter().collect::<Vec<u32>>(), input);
        }
    }

    #[test]
    fn test_lower_bound() {
        let input = vec![3u32, 3, 200, 70_000, 70_001];
        let encoded_data = compress(&input, 0);
        let view = VByteView::open(&encoded_data, input.len(), 0).unwrap();
        assert_eq!(
            view.lower_bound(3),
            Some(LowerBound {
                position: 0,
                value: 3
            })
        );
        assert_eq!(
            view.lower_bound(4),
            Some(LowerBound {
                position: 2,
                value: 200
            })
        );
        assert_eq!(
            view.lower_bound(70_001),
            Some(LowerBound {
                position: 4,
                value: 70_001
            })
        );
        assert_eq!(view.lower_bound(70_002), None);
    }

    #[test]
    fn test_open_rejects_wrong_count() {
        let encoded_data = compress(&[1, 2, 3], 0);
        assert!(matches!(
            VByteView::open(&encoded_data, 4, 0),
            Err(HarnessError::CorruptedBuffer(_))
        ));
    }

    #[test]
    fn test_open_rejects_truncated_value() {
        let encoded_data = compress(&[1, 200_000], 0);
        let truncated = &encoded_data[..encoded_data.len() - 1];
        assert!(matches!(
            VByteView::open(truncated, 2, 0),
            Err(HarnessError::CorruptedBuffer(_))
        ));
    }

    #[test]
    fn test_open_rejects_overlong_value() {
        let data = [128u8, 128, 128, 128, 128, 1];
        assert!(matches!(
            VByteView::open(&data, 1, 0),
            Err(HarnessError::CorruptedBuffer(_))
        ));
    }
}
