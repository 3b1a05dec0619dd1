//! Round trip checks of the codecs.

use log::{debug, info};

use crate::codec::{CodecKind, CompressedList};
use crate::{HarnessError, Result};

/// Compares a decoded list with the original list.
///
/// Fails on the first difference.
pub fn verify(original: &[u32], decoded: &[u32]) -> Result<()> {
    if original.len() != decoded.len() {
        return Err(HarnessError::SizeMismatch {
            expected: original.len(),
            actual: decoded.len(),
        });
    }
    if let Some((index, (&expected, &actual))) = original
        .iter()
        .zip(decoded.iter())
        .enumerate()
        .find(|(_, (expected, actual))| expected != actual)
    {
        return Err(HarnessError::ValueMismatch {
            index,
            expected,
            actual,
        });
    }
    Ok(())
}

/// Sizes measured while checking a codec.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CodecReport {
    pub codec: CodecKind,
    pub num_vals: usize,
    pub raw_num_bytes: usize,
    pub compressed_num_bytes: usize,
}

impl CodecReport {
    fn new(compressed: &CompressedList) -> CodecReport {
        CodecReport {
            codec: compressed.codec(),
            num_vals: compressed.num_vals(),
            raw_num_bytes: compressed.raw_num_bytes(),
            compressed_num_bytes: compressed.num_bytes(),
        }
    }

    /// Compressed size over raw size, `0` for an empty list.
    pub fn ratio(&self) -> f64 {
        if self.raw_num_bytes == 0 {
            return 0f64;
        }
        self.compressed_num_bytes as f64 / self.raw_num_bytes as f64
    }
}

/// Encodes `vals` with `codec`, decodes it back and checks the result.
pub fn check_codec(codec: CodecKind, vals: &[u32]) -> Result<CodecReport> {
    let compressed = codec.encode(vals)?;
    let decoded = codec.decode(&compressed)?;
    verify(vals, &decoded)?;
    let report = CodecReport::new(&compressed);
    debug!("{codec} round trip ok ({report:?})");
    Ok(report)
}

/// Checks every codec able to encode `vals`, stopping at the first failure.
pub fn check_all(vals: &[u32]) -> Result<Vec<CodecReport>> {
    info!("checking codecs on {} values", vals.len());
    CodecKind::ALL
        .iter()
        .filter(|codec| codec.supports(vals.len()))
        .map(|&codec| check_codec(codec, vals))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::generate_sorted;

    #[test]
    fn test_verify_ok() {
        assert!(verify(&[1, 2, 3], &[1, 2, 3]).is_ok());
        assert!(verify(&[], &[]).is_ok());
    }

    #[test]
    fn test_verify_size_mismatch() {
        match verify(&[1, 2, 3], &[1, 2]) {
            Err(HarnessError::SizeMismatch { expected, actual }) => {
                assert_eq!(expected, 3);
                assert_eq!(actual, 2);
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn test_verify_reports_first_mismatch() {
        match verify(&[1, 2, 3, 4], &[1, 5, 3, 6]) {
            Err(HarnessError::ValueMismatch {
                index,
                expected,
                actual,
            }) => {
                assert_eq!(index, 1);
                assert_eq!(expected, 2);
                assert_eq!(actual, 5);
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn test_value_mismatch_message() {
        let err = verify(&[0, 7], &[0, 8]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "nth=1 elements do not match: expected 7, got 8"
        );
    }

    #[test]
    fn test_check_all() {
        let vals = generate_sorted(512, 19);
        let reports = check_all(&vals).unwrap();
        let codecs: Vec<CodecKind> = reports.iter().map(|report| report.codec).collect();
        assert_eq!(codecs, CodecKind::ALL.to_vec());
        for report in &reports {
            assert_eq!(report.num_vals, 512);
            assert_eq!(report.raw_num_bytes, 2_048);
            assert!(report.ratio() < 1.0, "{:?}", report);
        }
    }

    #[test]
    fn test_check_all_skips_partial_blocks_for_bp128_raw() {
        let vals = generate_sorted(300, 4);
        let reports = check_all(&vals).unwrap();
        assert_eq!(reports.len(), 4);
        assert!(reports
            .iter()
            .all(|report| report.codec != CodecKind::Bp128Raw));
    }

    #[test]
    fn test_ratio_of_empty_list() {
        let report = check_codec(CodecKind::VByte, &[]).unwrap();
        assert_eq!(report.compressed_num_bytes, 0);
        assert_eq!(report.ratio(), 0.0);
    }
}
