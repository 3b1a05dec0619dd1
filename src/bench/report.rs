use std::io::{self, Write};

use super::{BenchResult, OutputFormat};
use crate::verify::CodecReport;

/// Writes benchmark results, in human readable or CSV form.
pub struct Reporter<W: Write> {
    wrt: W,
    format: OutputFormat,
}

impl<W: Write> Reporter<W> {
    pub fn new(wrt: W, format: OutputFormat) -> Reporter<W> {
        Reporter { wrt, format }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Announces a new configuration. CSV output has no section headers.
    pub fn start_configuration(&mut self, count: usize, shift: u32) -> io::Result<()> {
        if self.format == OutputFormat::Human {
            writeln!(
                self.wrt,
                ">>>>>>>> start benchmarking for bucket size: {count} bitshift: {shift}"
            )?;
        }
        Ok(())
    }

    pub fn report(&mut self, result: &BenchResult) -> io::Result<()> {
        let label = result.pattern.label();
        match self.format {
            OutputFormat::Human => {
                write!(
                    self.wrt,
                    "+++ bench done for {label} elapsed = {} cs = {}",
                    result.elapsed_millis, result.checksum
                )?;
                if let Some(packed_num_bytes) = result.packed_num_bytes {
                    write!(self.wrt, " packed = {packed_num_bytes}")?;
                }
                writeln!(self.wrt)
            }
            OutputFormat::Csv => writeln!(
                self.wrt,
                "{}, {label}, {}",
                result.num_vals, result.elapsed_millis
            ),
        }
    }

    /// Reports the sizes measured by a codec check.
    pub fn report_codec(&mut self, report: &CodecReport) -> io::Result<()> {
        writeln!(
            self.wrt,
            "{} input bytes={} compressed bytes={} ratio={:.4}",
            report.codec.name(),
            report.raw_num_bytes,
            report.compressed_num_bytes,
            report.ratio()
        )
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.wrt.flush()
    }

    pub fn into_inner(self) -> W {
        self.wrt
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bench::AccessPattern;
    use crate::codec::CodecKind;

    fn result(pattern: AccessPattern, packed_num_bytes: Option<usize>) -> BenchResult {
        BenchResult {
            pattern,
            num_vals: 256,
            elapsed_millis: 1.5,
            checksum: 42,
            packed_num_bytes,
        }
    }

    fn output(reporter: Reporter<Vec<u8>>) -> String {
        String::from_utf8(reporter.into_inner()).unwrap()
    }

    #[test]
    fn test_human_report() {
        let mut reporter = Reporter::new(Vec::new(), OutputFormat::Human);
        reporter.start_configuration(256, 8).unwrap();
        reporter
            .report(&result(AccessPattern::BinaryScan, None))
            .unwrap();
        reporter
            .report(&result(AccessPattern::Codec(CodecKind::StreamVByte), Some(300)))
            .unwrap();
        assert_eq!(
            output(reporter),
            ">>>>>>>> start benchmarking for bucket size: 256 bitshift: 8\n+++ bench done for \
             binary_scan elapsed = 1.5 cs = 42\n+++ bench done for svb_scan elapsed = 1.5 cs = \
             42 packed = 300\n"
        );
    }

    #[test]
    fn test_csv_report() {
        let mut reporter = Reporter::new(Vec::new(), OutputFormat::Csv);
        reporter.start_configuration(256, 8).unwrap();
        reporter
            .report(&result(AccessPattern::Codec(CodecKind::Bp128Raw), Some(300)))
            .unwrap();
        assert_eq!(output(reporter), "256, bp128r_scan, 1.5\n");
    }

    #[test]
    fn test_codec_report() {
        let mut reporter = Reporter::new(Vec::new(), OutputFormat::Human);
        reporter
            .report_codec(&CodecReport {
                codec: CodecKind::Bp128Raw,
                num_vals: 512,
                raw_num_bytes: 2_048,
                compressed_num_bytes: 800,
            })
            .unwrap();
        assert_eq!(
            output(reporter),
            "BP128R input bytes=2048 compressed bytes=800 ratio=0.3906\n"
        );
    }
}
