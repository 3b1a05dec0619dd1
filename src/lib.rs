//! # `intcodec_bench`
//!
//! Round trip checks and lookup benchmarks of sorted `u32` list codecs.
//!
//! Lists are compressed with one of the [`CodecKind`]s, then searched
//! directly in their compressed form: lookups rebuild values from their
//! deltas on the fly and stop at the first value greater or equal to the
//! target. The block packed codec relies on the lower bound search of
//! [`intcodec_bitpacker`].
//!
//! ```rust
//! use intcodec_bench::{generator, CodecKind};
//!
//! # fn main() -> intcodec_bench::Result<()> {
//! let vals = generator::generate_sorted(256, 8);
//! let compressed = CodecKind::Bp128Raw.encode(&vals)?;
//! let lower_bound = CodecKind::Bp128Raw
//!     .lower_bound(&compressed, vals[200])?
//!     .expect("every value of the list is found");
//! assert_eq!(lower_bound.value, vals[200]);
//! assert_eq!(CodecKind::Bp128Raw.decode(&compressed)?, vals);
//! # Ok(())
//! # }
//! ```

pub mod bench;
pub mod codec;
mod error;
pub mod generator;
pub mod timer;
pub mod verify;

pub use intcodec_bitpacker::LowerBound;

pub use crate::codec::{CodecKind, CodecView, CompressedList};
pub use crate::error::HarnessError;

/// Harness result.
pub type Result<T> = std::result::Result<T, HarnessError>;
