//! Definition of the harness errors.

use std::io;

use intcodec_bitpacker::LayoutError;
use thiserror::Error;

use crate::codec::CodecKind;

/// Every failure aborts the run it happened in. None of them is retried.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// The decoded list does not have as many values as the original list.
    #[error("Decoded list has {actual} values, expected {expected}")]
    SizeMismatch { expected: usize, actual: usize },
    /// The decoded list differs from the original list.
    #[error("nth={index} elements do not match: expected {expected}, got {actual}")]
    ValueMismatch {
        index: usize,
        expected: u32,
        actual: u32,
    },
    /// A lookup failed for a target that is known to be in the list.
    #[error("[{label}] value {target} not found")]
    LookupNotFound { label: &'static str, target: u32 },
    /// A compressed list was handed to a codec that did not produce it.
    #[error("List encoded with {actual:?} cannot be read as {expected:?}")]
    CodecMismatch {
        expected: CodecKind,
        actual: CodecKind,
    },
    /// The compressed bytes disagree with the bookkeeping of the codec.
    #[error("Corrupted buffer: {0}")]
    CorruptedBuffer(String),
    /// The packed blocks do not match their declared layout.
    #[error("Invalid block layout: {0}")]
    BlockLayout(#[from] LayoutError),
    /// Writing the report failed.
    #[error("An IO error occurred: '{0}'")]
    Io(#[from] io::Error),
}

impl HarnessError {
    pub(crate) fn corrupted(comment: impl Into<String>) -> HarnessError {
        HarnessError::CorruptedBuffer(comment.into())
    }
}
