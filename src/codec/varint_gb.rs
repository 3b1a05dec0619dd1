//! Group varint layout with delta coding.
//!
//! ```text
//! | count: u32 LE | selector | 1..=4 deltas | selector | 1..=4 deltas | ...
//! ```
//!
//! Values are grouped by four. Each group starts with a selector byte
//! holding, on 2 bits per value, the number of bytes of its delta minus one.
//! The last group holds the `count % 4` remaining values, if any.

use byteorder::{ByteOrder, LittleEndian};
use intcodec_bitpacker::LowerBound;

use super::{num_delta_bytes, read_delta};
use crate::{HarnessError, Result};

/// Length of the count header.
pub const HEADER_LEN: usize = 4;

const GROUP_LEN: usize = 4;

/// Upper bound of the number of bytes needed to encode `num_vals` values.
pub fn max_compressed_len(num_vals: usize) -> usize {
    HEADER_LEN + (num_vals + GROUP_LEN - 1) / GROUP_LEN + num_vals * 4
}

#[inline]
fn selector_len(selector: u8, idx_in_group: usize) -> usize {
    usize::from((selector >> (2 * idx_in_group)) & 3u8) + 1
}

/// Encodes `input` into `output` and returns the number of bytes written.
///
/// # Panics
///
/// Panics if `output` is shorter than `max_compressed_len(input.len())`
/// or if `input` holds more than `u32::MAX` values.
pub fn encode_sorted(input: &[u32], output: &mut [u8]) -> usize {
    let num_vals = u32::try_from(input.len()).expect("Too many values for a group varint list.");
    LittleEndian::write_u32(&mut output[..HEADER_LEN], num_vals);
    let mut cursor = HEADER_LEN;
    let mut previous = 0u32;
    for group in input.chunks(GROUP_LEN) {
        let selector_pos = cursor;
        cursor += 1;
        let mut selector = 0u8;
        for (idx_in_group, &val) in group.iter().enumerate() {
            let delta = val.wrapping_sub(previous);
            previous = val;
            let num_bytes = num_delta_bytes(delta);
            selector |= ((num_bytes - 1) as u8) << (2 * idx_in_group);
            output[cursor..cursor + num_bytes].copy_from_slice(&delta.to_le_bytes()[..num_bytes]);
            cursor += num_bytes;
        }
        output[selector_pos] = selector;
    }
    cursor
}

/// Validated view over a group varint buffer.
#[derive(Clone, Copy, Debug)]
pub struct VarIntGbView<'a> {
    num_vals: usize,
    groups: &'a [u8],
}

impl<'a> VarIntGbView<'a> {
    /// Walks the selectors to check that the groups exactly fill `bytes`.
    pub fn open(bytes: &'a [u8]) -> Result<VarIntGbView<'a>> {
        if bytes.len() < HEADER_LEN {
            return Err(HarnessError::corrupted(format!(
                "group varint buffer of {} bytes has no count header",
                bytes.len()
            )));
        }
        let num_vals = LittleEndian::read_u32(&bytes[..HEADER_LEN]) as usize;
        let groups = &bytes[HEADER_LEN..];
        let mut cursor = 0;
        let mut remaining = num_vals;
        while remaining > 0 {
            let group_len = remaining.min(GROUP_LEN);
            let Some(&selector) = groups.get(cursor) else {
                return Err(HarnessError::corrupted(format!(
                    "group varint selector missing at offset {}",
                    HEADER_LEN + cursor
                )));
            };
            cursor += 1;
            cursor += (0..group_len)
                .map(|idx_in_group| selector_len(selector, idx_in_group))
                .sum::<usize>();
            if cursor > groups.len() {
                return Err(HarnessError::corrupted(
                    "group varint data runs past the buffer end",
                ));
            }
            remaining -= group_len;
        }
        if cursor != groups.len() {
            return Err(HarnessError::corrupted(format!(
                "{} trailing bytes after the last group varint group",
                groups.len() - cursor
            )));
        }
        Ok(VarIntGbView { num_vals, groups })
    }

    pub fn num_vals(&self) -> usize {
        self.num_vals
    }

    /// Iterates over the values, rebuilt from their deltas.
    pub fn iter(&self) -> VarIntGbIter<'a> {
        VarIntGbIter {
            view: *self,
            idx: 0,
            cursor: 0,
            selector: 0u8,
            value: 0u32,
        }
    }

    /// Decodes every value into `output`, which must be `num_vals` long.
    pub fn decode_into(&self, output: &mut [u32]) {
        debug_assert_eq!(output.len(), self.num_vals);
        for (output_mut, value) in output.iter_mut().zip(self.iter()) {
            *output_mut = value;
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

pub struct VarIntGbIter<'a> {
    view: VarIntGbView<'a>,
    idx: usize,
    cursor: usize,
    selector: u8,
    value: u32,
}

impl<'a> Iterator for VarIntGbIter<'a> {
    type Item = u32;

    #[inline]
    fn next(&mut self) -> Option<u32> {
        if self.idx >= self.view.num_vals {
            return None;
        }
        let idx_in_group = self.idx % GROUP_LEN;
        if idx_in_group == 0 {
            self.selector = self.view.groups[self.cursor];
            self.cursor += 1;
        }
        let num_bytes = selector_len(self.selector, idx_in_group);
        let delta = read_delta(&self.view.groups[self.cursor..self.cursor + num_bytes]);
        self.cursor += num_bytes;
        self.idx += 1;
        self.value = self.value.wrapping_add(delta);
        Some(self.value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.view.num_vals - self.idx;
        (remaining, Some(remaining))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(input: &[u32]) -> Vec<u8> {
        let mut output = vec![0u8; max_compressed_len(input.len())];
        let written_len = encode_sorted(input, &mut output);
        output.truncate(written_len);
        output
    }

    #[test]
    fn test_layout() {
        // deltas: 2, 300, 0, 70_000, 5
        let input = [2u32, 302, 302, 70_302, 70_307];
        let encoded = encode(&input);
        assert_eq!(
            encoded,
            vec![
                5, 0, 0, 0, // count
                0b10_00_01_00, 2, 44, 1, 0, 112, 17, 1, // first group
                0b00, 5, // partial group
            ]
        );
    }

    #[test]
    fn test_round_trip() {
        for num_vals in [0usize, 1, 3, 4, 5, 127, 128, 1_001] {
            let input: Vec<u32> = (0..num_vals as u32).map(|i| i * 3 + i * i * 11).collect();
            let encoded = encode(&input);
            let view = VarIntGbView::open(&encoded).unwrap();
            assert_eq!(view.num_vals(), num_vals);
            let mut output = vec![0u32; num_vals];
            view.decode_into(&mut output);
            assert_eq!(output, input);
        }
    }

    #[test]
    fn test_lower_bound() {
        let input: Vec<u32> = (1u32..=9).map(|i| i * 1_000).collect();
        let encoded = encode(&input);
        let view = VarIntGbView::open(&encoded).unwrap();
        assert_eq!(
            view.lower_bound(5_000),
            Some(LowerBound {
                position: 4,
                value: 5_000
            })
        );
        assert_eq!(
            view.lower_bound(8_001),
            Some(LowerBound {
                position: 8,
                value: 9_000
            })
        );
        assert_eq!(view.lower_bound(9_001), None);
    }

    #[test]
    fn test_open_rejects_inconsistent_buffers() {
        let encoded = encode(&[1, 2, 3, 400, 500_000]);
        for truncated_len in 0..encoded.len() {
            assert!(matches!(
                VarIntGbView::open(&encoded[..truncated_len]),
                Err(HarnessError::CorruptedBuffer(_))
            ));
        }
        let mut with_junk = encoded.clone();
        with_junk.push(0u8);
        assert!(matches!(
            VarIntGbView::open(&with_junk),
            Err(HarnessError::CorruptedBuffer(_))
        ));
    }
}
