use std::io::{self, BufWriter, Write};
use std::process::ExitCode;

use clap::Parser;
use intcodec_bench::bench::{self, BenchConfig, OutputFormat, Reporter, DEFAULT_ITERATIONS};
use intcodec_bench::{generator, verify};
use log::{error, info};

/// Number of values of the correctness check list.
const CHECK_LIST_LEN: usize = 512;
/// Right shift applied to the correctness check list.
const CHECK_LIST_SHIFT: u32 = 19;

/// Checks and benchmarks lookups on compressed sorted lists.
#[derive(Parser, Debug)]
#[command(name = "intcodec-bench")]
struct Cli {
    /// Run the codec round trip checks before benchmarking.
    #[arg(short, long)]
    test: bool,
    /// Perform benchmarking with range shifting.
    #[arg(short, long)]
    shift: bool,
    /// Print results in csv-like format.
    #[arg(short = 'C', long = "cvs", visible_alias = "csv")]
    cvs: bool,
    /// Iterations count.
    #[arg(short, long, default_value_t = DEFAULT_ITERATIONS)]
    iters: u32,
}

impl Cli {
    fn bench_config(&self) -> BenchConfig {
        BenchConfig {
            iterations: self.iters,
            output: if self.cvs {
                OutputFormat::Csv
            } else {
                OutputFormat::Human
            },
            shift_mode: self.shift,
            ..BenchConfig::default()
        }
    }
}

fn run<W: Write>(cli: &Cli, reporter: &mut Reporter<W>) -> intcodec_bench::Result<()> {
    if cli.test {
        info!("running codec checks");
        let vals = generator::generate_sorted(CHECK_LIST_LEN, CHECK_LIST_SHIFT);
        for report in verify::check_all(&vals)? {
            reporter.report_codec(&report)?;
        }
    }
    let config = cli.bench_config();
    bench::run_benchmarks(&config, reporter)?;
    reporter.flush()?;
    Ok(())
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            eprint!("{err}");
            return ExitCode::from(1);
        }
    };
    env_logger::init();
    let stdout = io::stdout();
    let mut reporter = Reporter::new(BufWriter::new(stdout.lock()), cli.bench_config().output);
    match run(&cli, &mut reporter) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let _ = reporter.flush();
            error!("run aborted: {err}");
            eprintln!("{err}");
            ExitCode::from(2)
        }
    }
}
