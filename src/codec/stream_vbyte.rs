//! StreamVByte layout with delta coding.
//!
//! ```text
//! | count: u32 LE | keys: ceil(count / 4) bytes | data |
//! ```
//!
//! The key of the `i`-th value is stored on bits `2 * (i % 4)` of key byte
//! `i / 4` and equals the number of data bytes of its delta, minus one.
//! Deltas are stored little endian, back to back, in the data region.

use byteorder::{ByteOrder, LittleEndian};
use intcodec_bitpacker::LowerBound;

use super::{num_delta_bytes, read_delta};
use crate::{HarnessError, Result};

/// Length of the count header.
pub const HEADER_LEN: usize = 4;

/// Number of key bytes for `num_vals` values (2 bits per value, rounded up).
pub fn control_bytes_len(num_vals: usize) -> usize {
    (num_vals + 3) / 4
}

/// Upper bound of the number of bytes needed to encode `num_vals` values.
pub fn max_compressed_len(num_vals: usize) -> usize {
    HEADER_LEN + control_bytes_len(num_vals) + num_vals * 4
}

#[inline]
fn key_len(keys: &[u8], idx: usize) -> usize {
    usize::from((keys[idx / 4] >> (2 * (idx % 4))) & 3u8) + 1
}

/// Encodes `input` into `output` and returns the number of bytes written.
///
/// # Panics
///
/// Panics if `output` is shorter than `max_compressed_len(input.len())`
/// or if `input` holds more than `u32::MAX` values.
pub fn encode_sorted(input: &[u32], output: &mut [u8]) -> usize {
    let num_vals = u32::try_from(input.len()).expect("Too many values for a StreamVByte list.");
    LittleEndian::write_u32(&mut output[..HEADER_LEN], num_vals);
    let data_start = HEADER_LEN + control_bytes_len(input.len());
    let (keys, data) = output[HEADER_LEN..].split_at_mut(data_start - HEADER_LEN);
    keys.fill(0u8);
    let mut data_len = 0;
    let mut previous = 0u32;
    for (idx, &val) in input.iter().enumerate() {
        let delta = val.wrapping_sub(previous);
        previous = val;
        let num_bytes = num_delta_bytes(delta);
        keys[idx / 4] |= ((num_bytes - 1) as u8) << (2 * (idx % 4));
        data[data_len..data_len + num_bytes].copy_from_slice(&delta.to_le_bytes()[..num_bytes]);
        data_len += num_bytes;
    }
    data_start + data_len
}

/// Validated view over a StreamVByte buffer, split in its key and data regions.
#[derive(Clone, Copy, Debug)]
pub struct StreamVByteView<'a> {
    num_vals: usize,
    keys: &'a [u8],
    data: &'a [u8],
}

impl<'a> StreamVByteView<'a> {
    /// Locates the key and data regions of `bytes`.
    ///
    /// The data region must be exactly as long as the keys announce.
    pub fn open(bytes: &'a [u8]) -> Result<StreamVByteView<'a>> {
        if bytes.len() < HEADER_LEN {
            return Err(HarnessError::corrupted(format!(
                "StreamVByte buffer of {} bytes has no count header",
                bytes.len()
            )));
        }
        let num_vals = LittleEndian::read_u32(&bytes[..HEADER_LEN]) as usize;
        let data_start = HEADER_LEN + control_bytes_len(num_vals);
        if bytes.len() < data_start {
            return Err(HarnessError::corrupted(format!(
                "StreamVByte key region of {num_vals} values ends at {data_start}, past the \
                 buffer end ({})",
                bytes.len()
            )));
        }
        let keys = &bytes[HEADER_LEN..data_start];
        let data = &bytes[data_start..];
        let expected_data_len: usize = (0..num_vals).map(|idx| key_len(keys, idx)).sum();
        if data.len() != expected_data_len {
            return Err(HarnessError::corrupted(format!(
                "StreamVByte keys announce {expected_data_len} data bytes, got {}",
                data.len()
            )));
        }
        Ok(StreamVByteView {
            num_vals,
            keys,
            data,
        })
    }

    pub fn num_vals(&self) -> usize {
        self.num_vals
    }

    pub fn keys(&self) -> &'a [u8] {
        self.keys
    }

    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Iterates over the values, rebuilt from their deltas.
    pub fn iter(&self) -> StreamVByteIter<'a> {
        StreamVByteIter {
            view: *self,
            idx: 0,
            data_cursor: 0,
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
    ///
    /// Keys and data are walked together, no value is materialized
    /// besides the running one.
    pub fn lower_bound(&self, target: u32) -> Option<LowerBound> {
        self.iter()
            .enumerate()
            .find(|&(_, value)| value >= target)
            .map(|(position, value)| LowerBound { position, value })
    }
}

pub struct StreamVByteIter<'a> {
    view: StreamVByteView<'a>,
    idx: usize,
    data_cursor: usize,
    value: u32,
}

impl<'a> Iterator for StreamVByteIter<'a> {
    type Item = u32;

    #[inline]
    fn next(&mut self) -> Option<u32> {
        if self.idx >= self.view.num_vals {
            return None;
        }
        let num_bytes = key_len(self.view.keys, self.idx);
        let delta = read_delta(&self.view.data[self.data_cursor..self.data_cursor + num_bytes]);
        self.idx += 1;
        self.data_cursor += num_bytes;
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
        // deltas: 1, 255, 256, 65_536, 16_777_216
        let input = [1u32, 256, 512, 66_048, 16_843_264];
        let encoded = encode(&input);
        assert_eq!(&encoded[..4], &[5, 0, 0, 0]);
        // keys, lowest bits first: 0, 0, 1, 2 then 3
        assert_eq!(encoded[4], 0b1001_0000);
        assert_eq!(encoded[5], 0b0000_0011);
        let view = StreamVByteView::open(&encoded).unwrap();
        assert_eq!(view.keys().len(), 2);
        assert_eq!(view.data().len(), 1 + 1 + 2 + 3 + 4);
        assert_eq!(&view.data()[..4], &[1, 255, 0, 1]);
        assert_eq!(encoded.len(), 4 + 2 + 11);
    }

    #[test]
    fn test_round_trip() {
        let input: Vec<u32> = (0u32..1_000).map(|i| i * i * 37).collect();
        let encoded = encode(&input);
        let view = StreamVByteView::open(&encoded).unwrap();
        assert_eq!(view.num_vals(), input.len());
        let mut output = vec![0u32; input.len()];
        view.decode_into(&mut output);
        assert_eq!(output, input);
    }

    #[test]
    fn test_empty() {
        let encoded = encode(&[]);
        assert_eq!(encoded, vec![0, 0, 0, 0]);
        let view = StreamVByteView::open(&encoded).unwrap();
        assert_eq!(view.iter().count(), 0);
        assert_eq!(view.lower_bound(0), None);
    }

    #[test]
    fn test_lower_bound() {
        let input = [10u32, 10, 300, 70_000];
        let encoded = encode(&input);
        let view = StreamVByteView::open(&encoded).unwrap();
        assert_eq!(
            view.lower_bound(10),
            Some(LowerBound {
                position: 0,
                value: 10
            })
        );
        assert_eq!(
            view.lower_bound(11),
            Some(LowerBound {
                position: 2,
                value: 300
            })
        );
        assert_eq!(view.lower_bound(70_001), None);
    }

    #[test]
    fn test_open_rejects_missing_header() {
        assert!(matches!(
            StreamVByteView::open(&[1, 0]),
            Err(HarnessError::CorruptedBuffer(_))
        ));
    }

    #[test]
    fn test_open_rejects_truncated_keys() {
        // 9 values require 3 key bytes.
        assert!(matches!(
            StreamVByteView::open(&[9, 0, 0, 0, 0, 0]),
            Err(HarnessError::CorruptedBuffer(_))
        ));
    }

    #[test]
    fn test_open_rejects_truncated_data() {
        let encoded = encode(&[1, 1_000, 1_000_000]);
        assert!(matches!(
            StreamVByteView::open(&encoded[..encoded.len() - 1]),
            Err(HarnessError::CorruptedBuffer(_))
        ));
        let mut with_junk = encoded.clone();
        with_junk.push(173u8);
        assert!(matches!(
            StreamVByteView::open(&with_junk),
            Err(HarnessError::CorruptedBuffer(_))
        ));
    }
}
