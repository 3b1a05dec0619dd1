//! Benchmark driver.
//!
//! For every configuration (list size, shift), a [`Workload`] is prepared
//! once: the sorted list, its shuffled targets, and the list compressed by
//! every codec. Each [`AccessPattern`] then looks every target up,
//! `iterations` times in a row, under a [`Stopwatch`].

mod report;

use std::io;

use log::{debug, info};

pub use self::report::Reporter;
use crate::codec::{CodecKind, CompressedList};
use crate::generator::{generate_sorted, generate_targets};
use crate::timer::Stopwatch;
use crate::{HarnessError, Result};

/// Shifts applied to every list size when benchmarking with range shifting.
pub const SHIFTS: [u32; 4] = [0, 8, 16, 24];

/// Benchmarked list sizes.
pub const LIST_SIZES: [usize; 5] = [128, 256, 512, 1_024, 2_048];

/// Number of passes over the targets, per access pattern.
pub const DEFAULT_ITERATIONS: u32 = 10_000;

/// How benchmark results are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// One sentence per result, with checksum and packed size.
    #[default]
    Human,
    /// `size, label, elapsed` rows.
    Csv,
}

/// Parameters of a benchmark run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenchConfig {
    pub iterations: u32,
    pub output: OutputFormat,
    pub list_sizes: Vec<usize>,
    /// Shifts used when `shift_mode` is on. Without it, lists are not shifted.
    pub shifts: Vec<u32>,
    pub shift_mode: bool,
    /// Seed of the target shuffle.
    pub target_seed: u64,
}

impl Default for BenchConfig {
    fn default() -> Self {
        BenchConfig {
            iterations: DEFAULT_ITERATIONS,
            output: OutputFormat::Human,
            list_sizes: LIST_SIZES.to_vec(),
            shifts: SHIFTS.to_vec(),
            shift_mode: false,
            target_seed: 0u64,
        }
    }
}

impl BenchConfig {
    /// Shifts benchmarked for every list size.
    pub fn active_shifts(&self) -> Vec<u32> {
        if self.shift_mode {
            self.shifts.clone()
        } else {
            vec![0]
        }
    }
}

/// A way of looking up targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessPattern {
    /// Linear scan of the decoded list.
    LinearScan,
    /// Binary search in the decoded list.
    BinaryScan,
    /// Lower bound search directly on the compressed list.
    Codec(CodecKind),
}

impl AccessPattern {
    pub fn label(self) -> &'static str {
        match self {
            AccessPattern::LinearScan => "linear_scan",
            AccessPattern::BinaryScan => "binary_scan",
            AccessPattern::Codec(codec) => codec.label(),
        }
    }

    /// Every access pattern, in reporting order.
    pub fn all() -> impl Iterator<Item = AccessPattern> {
        [AccessPattern::LinearScan, AccessPattern::BinaryScan]
            .into_iter()
            .chain(CodecKind::ALL.into_iter().map(AccessPattern::Codec))
    }
}

/// The data shared by every access pattern of a configuration.
#[derive(Debug, Clone)]
pub struct Workload {
    vals: Vec<u32>,
    targets: Vec<u32>,
    shift: u32,
    compressed: Vec<CompressedList>,
}

impl Workload {
    /// Generates the list, its targets, and encodes it with every codec that supports its length.
    pub fn prepare(count: usize, shift: u32, target_seed: u64) -> Result<Workload> {
        let vals = generate_sorted(count, shift);
        let targets = generate_targets(&vals, target_seed);
        let compressed = CodecKind::ALL
            .iter()
            .filter(|codec| codec.supports(count))
            .map(|codec| codec.encode(&vals))
            .collect::<Result<Vec<CompressedList>>>()?;
        debug!(
            "workload of {count} values, shift {shift}: {} encodings",
            compressed.len()
        );
        Ok(Workload {
            vals,
            targets,
            shift,
            compressed,
        })
    }

    pub fn vals(&self) -> &[u32] {
        &self.vals
    }

    pub fn targets(&self) -> &[u32] {
        &self.targets
    }

    pub fn shift(&self) -> u32 {
        self.shift
    }

    /// Returns the list compressed by `codec`, if `codec` supports its length.
    pub fn compressed(&self, codec: CodecKind) -> Option<&CompressedList> {
        self.compressed
            .iter()
            .find(|compressed| compressed.codec() == codec)
    }

    /// Returns true iff `pattern` can be run on this workload.
    pub fn supports(&self, pattern: AccessPattern) -> bool {
        match pattern {
            AccessPattern::LinearScan | AccessPattern::BinaryScan => true,
            AccessPattern::Codec(codec) => self.compressed(codec).is_some(),
        }
    }
}

fn check_found(label: &'static str, target: u32, found: Option<u32>) -> Result<u32> {
    match found {
        Some(value) if value == target => Ok(value),
        _ => Err(HarnessError::LookupNotFound { label, target }),
    }
}

/// Looks every target up once and returns the wrapping sum of the values found.
///
/// Every target belongs to the list, so a lookup missing its target is an error.
pub fn lookup_checksum(pattern: AccessPattern, workload: &Workload) -> Result<u32> {
    let label = pattern.label();
    let vals = workload.vals();
    let mut checksum = 0u32;
    match pattern {
        AccessPattern::LinearScan => {
            for &target in workload.targets() {
                let found = vals.iter().copied().find(|&val| val >= target);
                checksum = checksum.wrapping_add(check_found(label, target, found)?);
            }
        }
        AccessPattern::BinaryScan => {
            for &target in workload.targets() {
                let position = vals.partition_point(|&val| val < target);
                let found = vals.get(position).copied();
                checksum = checksum.wrapping_add(check_found(label, target, found)?);
            }
        }
        AccessPattern::Codec(codec) => {
            let compressed = workload
                .compressed(codec)
                .ok_or_else(|| HarnessError::corrupted(format!("{codec} has no encoded list")))?;
            let view = codec.open(compressed)?;
            for &target in workload.targets() {
                let found = view
                    .lower_bound(target)
                    .map(|lower_bound| lower_bound.value);
                checksum = checksum.wrapping_add(check_found(label, target, found)?);
            }
        }
    }
    Ok(checksum)
}

/// Outcome of an access pattern over a workload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BenchResult {
    pub pattern: AccessPattern,
    pub num_vals: usize,
    pub elapsed_millis: f64,
    /// Wrapping sum of the checksums of every iteration.
    pub checksum: u32,
    /// Size of the compressed list, for codec patterns.
    pub packed_num_bytes: Option<usize>,
}

/// Runs `pattern` `config.iterations` times over `workload`.
pub fn run_pattern(
    pattern: AccessPattern,
    workload: &Workload,
    config: &BenchConfig,
) -> Result<BenchResult> {
    let mut checksum = 0u32;
    let stopwatch = Stopwatch::start();
    for _ in 0..config.iterations {
        checksum = checksum.wrapping_add(lookup_checksum(pattern, workload)?);
    }
    let elapsed_millis = stopwatch.elapsed_millis();
    let packed_num_bytes = match pattern {
        AccessPattern::Codec(codec) => workload.compressed(codec).map(CompressedList::num_bytes),
        _ => None,
    };
    Ok(BenchResult {
        pattern,
        num_vals: workload.vals().len(),
        elapsed_millis,
        checksum,
        packed_num_bytes,
    })
}

/// Benchmarks every supported access pattern on a list of `count` values shifted by `shift`.
pub fn run_configuration<W: io::Write>(
    count: usize,
    shift: u32,
    config: &BenchConfig,
    reporter: &mut Reporter<W>,
) -> Result<Vec<BenchResult>> {
    reporter.start_configuration(count, shift)?;
    let workload = Workload::prepare(count, shift, config.target_seed)?;
    let mut results = Vec::new();
    for pattern in AccessPattern::all() {
        if !workload.supports(pattern) {
            debug!("skipping {} for {count} values", pattern.label());
            continue;
        }
        let result = run_pattern(pattern, &workload, config)?;
        reporter.report(&result)?;
        results.push(result);
    }
    Ok(results)
}

/// Benchmarks every configuration of `config`.
pub fn run_benchmarks<W: io::Write>(
    config: &BenchConfig,
    reporter: &mut Reporter<W>,
) -> Result<Vec<BenchResult>> {
    info!(
        "benchmarking {} list sizes, {} iterations",
        config.list_sizes.len(),
        config.iterations
    );
    let mut results = Vec::new();
    for &count in &config.list_sizes {
        for shift in config.active_shifts() {
            results.extend(run_configuration(count, shift, config, reporter)?);
        }
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quick_config() -> BenchConfig {
        BenchConfig {
            iterations: 1,
            output: OutputFormat::Csv,
            ..BenchConfig::default()
        }
    }

    #[test]
    fn test_default_config() {
        let config = BenchConfig::default();
        assert_eq!(config.iterations, 10_000);
        assert_eq!(config.output, OutputFormat::Human);
        assert_eq!(config.list_sizes, vec![128, 256, 512, 1_024, 2_048]);
        assert_eq!(config.active_shifts(), vec![0]);
        let shifted = BenchConfig {
            shift_mode: true,
            ..config
        };
        assert_eq!(shifted.active_shifts(), vec![0, 8, 16, 24]);
    }

    #[test]
    fn test_labels() {
        let labels: Vec<&str> = AccessPattern::all().map(AccessPattern::label).collect();
        assert_eq!(
            labels,
            vec![
                "linear_scan",
                "binary_scan",
                "svb_scan",
                "varintgb_scan",
                "vbyte_scan",
                "bp128_scan",
                "bp128r_scan"
            ]
        );
    }

    #[test]
    fn test_every_pattern_agrees_on_checksum() {
        let workload = Workload::prepare(512, 8, 3).unwrap();
        let expected = workload
            .vals()
            .iter()
            .fold(0u32, |sum, &val| sum.wrapping_add(val));
        for pattern in AccessPattern::all() {
            assert_eq!(
                lookup_checksum(pattern, &workload).unwrap(),
                expected,
                "{}",
                pattern.label()
            );
        }
    }

    #[test]
    fn test_workload_skips_bp128_raw_on_partial_blocks() {
        let workload = Workload::prepare(200, 0, 0).unwrap();
        assert!(!workload.supports(AccessPattern::Codec(CodecKind::Bp128Raw)));
        assert!(workload.supports(AccessPattern::Codec(CodecKind::Bp128)));
        assert!(matches!(
            lookup_checksum(AccessPattern::Codec(CodecKind::Bp128Raw), &workload),
            Err(HarnessError::CorruptedBuffer(_))
        ));
    }

    #[test]
    fn test_missing_target_is_an_error() {
        let mut workload = Workload::prepare(128, 0, 0).unwrap();
        let missing = workload.vals()[127].wrapping_add(1);
        workload.targets[5] = missing;
        for pattern in AccessPattern::all() {
            match lookup_checksum(pattern, &workload) {
                Err(HarnessError::LookupNotFound { label, target }) => {
                    assert_eq!(label, pattern.label());
                    assert_eq!(target, missing);
                }
                other => panic!("unexpected result {other:?}"),
            }
        }
    }

    #[test]
    fn test_target_between_values_is_an_error() {
        let mut workload = Workload::prepare(256, 0, 0).unwrap();
        let (low, high) = (workload.vals()[10], workload.vals()[11]);
        assert!(high - low > 1);
        workload.targets[0] = low + 1;
        assert!(matches!(
            lookup_checksum(AccessPattern::Codec(CodecKind::Bp128Raw), &workload),
            Err(HarnessError::LookupNotFound {
                label: "bp128r_scan",
                ..
            })
        ));
        assert!(matches!(
            lookup_checksum(AccessPattern::BinaryScan, &workload),
            Err(HarnessError::LookupNotFound { .. })
        ));
    }

    #[test]
    fn test_run_pattern_accumulates_checksum() {
        let workload = Workload::prepare(128, 16, 0).unwrap();
        let single = lookup_checksum(AccessPattern::LinearScan, &workload).unwrap();
        let config = BenchConfig {
            iterations: 3,
            ..quick_config()
        };
        let result = run_pattern(AccessPattern::LinearScan, &workload, &config).unwrap();
        assert_eq!(result.checksum, single.wrapping_mul(3));
        assert_eq!(result.num_vals, 128);
        assert_eq!(result.packed_num_bytes, None);
        let codec_result = run_pattern(
            AccessPattern::Codec(CodecKind::VarIntGb),
            &workload,
            &config,
        )
        .unwrap();
        assert_eq!(codec_result.checksum, result.checksum);
        assert!(codec_result.packed_num_bytes.is_some());
    }

    #[test]
    fn test_run_configuration_csv() {
        let config = quick_config();
        let mut reporter = Reporter::new(Vec::new(), config.output);
        let results = run_configuration(128, 0, &config, &mut reporter).unwrap();
        assert_eq!(results.len(), 7);
        let output = String::from_utf8(reporter.into_inner()).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 7);
        for (line, pattern) in lines.iter().zip(AccessPattern::all()) {
            let fields: Vec<&str> = line.split(", ").collect();
            assert_eq!(fields.len(), 3);
            assert_eq!(fields[0], "128");
            assert_eq!(fields[1], pattern.label());
            assert!(fields[2].parse::<f64>().is_ok());
        }
    }

    #[test]
    fn test_run_benchmarks_visits_every_configuration() {
        let config = BenchConfig {
            list_sizes: vec![128, 200],
            shift_mode: true,
            output: OutputFormat::Human,
            ..quick_config()
        };
        let mut reporter = Reporter::new(Vec::new(), config.output);
        let results = run_benchmarks(&config, &mut reporter).unwrap();
        assert_eq!(results.len(), 4 * 7 + 4 * 6);
        let output = String::from_utf8(reporter.into_inner()).unwrap();
        assert_eq!(
            output
                .lines()
                .filter(|line| line.starts_with(">>>>>>>> start benchmarking"))
                .count(),
            8
        );
        assert!(output.contains(">>>>>>>> start benchmarking for bucket size: 200 bitshift: 24"));
    }
}
