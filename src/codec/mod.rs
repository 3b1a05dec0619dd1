//! Codec adapters.
//!
//! Every codec exposes the same surface through [`CodecKind`]: encoding a
//! sorted list into a [`CompressedList`], decoding it back, and searching a
//! lower bound directly on the compressed bytes.
//!
//! A [`CompressedList`] remembers the codec that produced it, as well as
//! the bookkeeping its format does not describe by itself. It can only be
//! read back by the same codec.

mod bp128;
mod stream_vbyte;
mod varint_gb;
mod vbyte;

use std::fmt;

use byteorder::{ByteOrder, LittleEndian};
use intcodec_bitpacker::{find_lower_bound, pack_sorted, LowerBound, PackedBlocks, BLOCK_LEN};
use log::debug;

pub use self::bp128::Bp128View;
pub use self::stream_vbyte::StreamVByteView;
pub use self::varint_gb::VarIntGbView;
pub use self::vbyte::VByteView;
use crate::{HarnessError, Result};

/// Number of bytes required to store `delta` little endian, between 1 and 4.
#[inline]
pub(crate) fn num_delta_bytes(delta: u32) -> usize {
    match delta {
        0..=0xFF => 1,
        0x100..=0xFFFF => 2,
        0x1_0000..=0xFF_FFFF => 3,
        _ => 4,
    }
}

/// Reads a delta stored little endian on `bytes.len()` bytes.
#[inline]
pub(crate) fn read_delta(bytes: &[u8]) -> u32 {
    LittleEndian::read_uint(bytes, bytes.len()) as u32
}

/// The closed set of codecs under test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodecKind {
    /// StreamVByte layout, delta coded.
    StreamVByte,
    /// Group varint, delta coded.
    VarIntGb,
    /// Variable byte, delta coded.
    VByte,
    /// Binary packing with one bit width per block and a variable byte tail.
    Bp128,
    /// Binary packing with a single bit width for the whole list.
    /// Only lists made of full blocks are supported.
    Bp128Raw,
}

impl CodecKind {
    pub const ALL: [CodecKind; 5] = [
        CodecKind::StreamVByte,
        CodecKind::VarIntGb,
        CodecKind::VByte,
        CodecKind::Bp128,
        CodecKind::Bp128Raw,
    ];

    /// Human readable name of the codec.
    pub fn name(self) -> &'static str {
        match self {
            CodecKind::StreamVByte => "Stream VByte",
            CodecKind::VarIntGb => "VarIntGB",
            CodecKind::VByte => "VByte",
            CodecKind::Bp128 => "BP128",
            CodecKind::Bp128Raw => "BP128R",
        }
    }

    /// Label of the codec native lookup in benchmark reports.
    pub fn label(self) -> &'static str {
        match self {
            CodecKind::StreamVByte => "svb_scan",
            CodecKind::VarIntGb => "varintgb_scan",
            CodecKind::VByte => "vbyte_scan",
            CodecKind::Bp128 => "bp128_scan",
            CodecKind::Bp128Raw => "bp128r_scan",
        }
    }

    /// Returns true iff a list of `num_vals` values can be encoded.
    pub fn supports(self, num_vals: usize) -> bool {
        match self {
            CodecKind::Bp128Raw => num_vals % BLOCK_LEN == 0,
            _ => true,
        }
    }

    /// Encodes a sorted list.
    pub fn encode(self, vals: &[u32]) -> Result<CompressedList> {
        let mut num_bits = 0u8;
        let bytes = match self {
            CodecKind::StreamVByte => encode_with_scratch(
                vals,
                stream_vbyte::max_compressed_len(vals.len()),
                stream_vbyte::encode_sorted,
            ),
            CodecKind::VarIntGb => encode_with_scratch(
                vals,
                varint_gb::max_compressed_len(vals.len()),
                varint_gb::encode_sorted,
            ),
            CodecKind::VByte => {
                encode_with_scratch(vals, vbyte::max_compressed_len(vals.len()), |input, output| {
                    vbyte::compress_sorted(input, output, 0u32)
                })
            }
            CodecKind::Bp128 => encode_with_scratch(
                vals,
                bp128::max_compressed_len(vals.len()),
                bp128::encode_sorted,
            ),
            CodecKind::Bp128Raw => {
                num_bits = intcodec_bitpacker::num_bits(vals);
                pack_sorted(vals, num_bits)?
            }
        };
        debug!(
            "{} encoded {} values into {} bytes",
            self.name(),
            vals.len(),
            bytes.len()
        );
        Ok(CompressedList {
            codec: self,
            num_vals: vals.len(),
            num_bits,
            bytes,
        })
    }

    /// Checks that `compressed` was produced by this codec and opens a view over it.
    pub fn open(self, compressed: &CompressedList) -> Result<CodecView<'_>> {
        if compressed.codec != self {
            return Err(HarnessError::CodecMismatch {
                expected: self,
                actual: compressed.codec,
            });
        }
        let bytes = compressed.as_bytes();
        let view = match self {
            CodecKind::StreamVByte => CodecView::StreamVByte(StreamVByteView::open(bytes)?),
            CodecKind::VarIntGb => CodecView::VarIntGb(VarIntGbView::open(bytes)?),
            CodecKind::VByte => {
                CodecView::VByte(VByteView::open(bytes, compressed.num_vals(), 0u32)?)
            }
            CodecKind::Bp128 => CodecView::Bp128(Bp128View::open(bytes)?),
            CodecKind::Bp128Raw => CodecView::Bp128Raw(PackedBlocks::open(
                bytes,
                compressed.num_vals(),
                compressed.num_bits(),
            )?),
        };
        if view.num_vals() != compressed.num_vals() {
            return Err(HarnessError::corrupted(format!(
                "{} buffer holds {} values, {} were encoded",
                self.name(),
                view.num_vals(),
                compressed.num_vals()
            )));
        }
        Ok(view)
    }

    /// Decodes `compressed` into a new list.
    pub fn decode(self, compressed: &CompressedList) -> Result<Vec<u32>> {
        let view = self.open(compressed)?;
        let mut output = vec![0u32; compressed.num_vals()];
        view.decode_into(&mut output);
        Ok(output)
    }

    /// Searches the first value greater or equal to `target` in `compressed`.
    pub fn lower_bound(self, compressed: &CompressedList, target: u32) -> Result<Option<LowerBound>> {
        Ok(self.open(compressed)?.lower_bound(target))
    }
}

impl fmt::Display for CodecKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Encodes `vals` in a scratch buffer of at least 4 bytes per value,
/// then keeps only the bytes the encoder reports.
fn encode_with_scratch(
    vals: &[u32],
    max_compressed_len: usize,
    encoder: impl FnOnce(&[u32], &mut [u8]) -> usize,
) -> Vec<u8> {
    let mut scratch = vec![0u8; max_compressed_len.max(vals.len() * 4)];
    let written_len = encoder(vals, &mut scratch[..]);
    scratch.truncate(written_len);
    scratch
}

/// A list compressed by one of the codecs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompressedList {
    codec: CodecKind,
    num_vals: usize,
    num_bits: u8,
    bytes: Vec<u8>,
}

impl CompressedList {
    /// Assembles a compressed list from its parts, without any check.
    ///
    /// `num_bits` is only meaningful for [`CodecKind::Bp128Raw`].
    pub fn from_parts(codec: CodecKind, num_vals: usize, num_bits: u8, bytes: Vec<u8>) -> Self {
        CompressedList {
            codec,
            num_vals,
            num_bits,
            bytes,
        }
    }

    pub fn codec(&self) -> CodecKind {
        self.codec
    }

    /// Number of values of the original list.
    pub fn num_vals(&self) -> usize {
        self.num_vals
    }

    /// Bit width shared by every block, for [`CodecKind::Bp128Raw`].
    pub fn num_bits(&self) -> u8 {
        self.num_bits
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Number of compressed bytes.
    pub fn num_bytes(&self) -> usize {
        self.bytes.len()
    }

    /// Number of bytes of the original list.
    pub fn raw_num_bytes(&self) -> usize {
        self.num_vals * std::mem::size_of::<u32>()
    }

    /// Compressed size over raw size, `0` for an empty list.
    pub fn ratio(&self) -> f64 {
        if self.num_vals == 0 {
            return 0f64;
        }
        self.num_bytes() as f64 / self.raw_num_bytes() as f64
    }
}

/// Validated view over a compressed list, ready for repeated lookups.
#[derive(Clone, Copy, Debug)]
pub enum CodecView<'a> {
    StreamVByte(StreamVByteView<'a>),
    VarIntGb(VarIntGbView<'a>),
    VByte(VByteView<'a>),
    Bp128(Bp128View<'a>),
    Bp128Raw(PackedBlocks<'a>),
}

impl<'a> CodecView<'a> {
    pub fn num_vals(&self) -> usize {
        match self {
            CodecView::StreamVByte(view) => view.num_vals(),
            CodecView::VarIntGb(view) => view.num_vals(),
            CodecView::VByte(view) => view.num_vals(),
            CodecView::Bp128(view) => view.num_vals(),
            CodecView::Bp128Raw(blocks) => blocks.num_vals(),
        }
    }

    /// Decodes every value into `output`.
    ///
    /// # Panics
    ///
    /// Panics if `output` is not exactly `num_vals` long.
    pub fn decode_into(&self, output: &mut [u32]) {
        assert_eq!(
            output.len(),
            self.num_vals(),
            "The output buffer must hold exactly `num_vals` values."
        );
        match self {
            CodecView::StreamVByte(view) => view.decode_into(output),
            CodecView::VarIntGb(view) => view.decode_into(output),
            CodecView::VByte(view) => {
                view.uncompress_sorted(output);
            }
            CodecView::Bp128(view) => view.decode_into(output),
            CodecView::Bp128Raw(blocks) => blocks.unpack(output),
        }
    }

    /// Searches the first value greater or equal to `target`.
    ///
    /// Returns `None` if every value is lower than `target`.
    pub fn lower_bound(&self, target: u32) -> Option<LowerBound> {
        match self {
            CodecView::StreamVByte(view) => view.lower_bound(target),
            CodecView::VarIntGb(view) => view.lower_bound(target),
            CodecView::VByte(view) => view.lower_bound(target),
            CodecView::Bp128(view) => view.lower_bound(target),
            CodecView::Bp128Raw(blocks) => {
                let lower_bound = find_lower_bound(blocks, target);
                if lower_bound.is_found(blocks.num_vals()) {
                    Some(lower_bound)
                } else {
                    None
                }
            }
        }
    }
}
