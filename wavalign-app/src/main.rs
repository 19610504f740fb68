//! wavalign - insert zeros into or remove samples from the beginning of a
//! test recording so it lines up with a reference (minimum sum of squared
//! differences).

mod session;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use session::{check_backward_limit, SearchSizes, MIN_PROBES, MIN_WINDOW};
use wavalign_library::{write_aligned, Config, OutputFormat, SignalLoader};

/// Align a test recording to a reference by minimum sum of squared differences.
#[derive(Parser)]
#[command(
    name = "wavalign",
    version,
    about = "Insert zeros or remove samples at the start of TST to align it with REF",
    after_help = "Setting a search range far beyond the SSD length increases the\n\
                  likelihood of finding a minimum SSD that does not align the files."
)]
struct Cli {
    /// Reference audio file.
    #[arg(required_unless_present = "write_config")]
    reference: Option<PathBuf>,

    /// Audio file to align.
    #[arg(required_unless_present = "write_config")]
    test: Option<PathBuf>,

    /// Output WAV file (same as -o).
    out: Option<PathBuf>,

    /// Output WAV file.
    #[arg(short = 'o', conflicts_with = "out")]
    output: Option<PathBuf>,

    /// SSD interval length in samples [default: 3000 ms].
    #[arg(short, long, value_parser = clap::value_parser!(u32).range(MIN_WINDOW as i64..))]
    length: Option<u32>,

    /// Max offset in samples [default: 500 ms].
    #[arg(short = 'n', long = "offset", value_parser = clap::value_parser!(u32).range(MIN_PROBES as i64..))]
    offset: Option<u32>,

    /// Only print the best offset value.
    #[arg(short, long)]
    quiet: bool,

    /// Max backward offset (number of zeros to insert) [default: 1].
    /// A negative value allows unlimited backward offset.
    #[arg(long, allow_negative_numbers = true)]
    back: Option<i64>,

    /// Output format: 0 - same as REF, 1 - same as TST.
    #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(0..=1))]
    format: u8,

    /// Integer output with 16, 24 or 32 bits per sample.
    #[arg(long, value_parser = parse_bps, conflicts_with = "float")]
    bps: Option<u16>,

    /// 32-bit float output.
    #[arg(long)]
    float: bool,

    /// Save the current defaults (with --back applied) to the config file and exit.
    #[arg(long)]
    write_config: bool,

    /// Enable verbose (debug-level) logging.
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn output_path(&self) -> Option<&PathBuf> {
        self.output.as_ref().or(self.out.as_ref())
    }

    fn output_format(&self) -> OutputFormat {
        if self.float {
            OutputFormat::Float
        } else if let Some(bits) = self.bps {
            OutputFormat::Int(bits)
        } else if self.format == 0 {
            OutputFormat::SameAsReference
        } else {
            OutputFormat::SameAsTest
        }
    }
}

/// Save `config`, with the `--back` override applied, to `path`
fn write_config(cli: &Cli, mut config: Config, path: &Path) -> Result<()> {
    if let Some(back) = cli.back {
        config.back_max = back.max(-1);
    }
    config
        .save_to(path)
        .with_context(|| format!("can't write {}", path.display()))?;
    println!("Configuration written to {}", path.display());
    Ok(())
}

fn parse_bps(value: &str) -> Result<u16, String> {
    match value.parse::<u16>() {
        Ok(bits @ (16 | 24 | 32)) => Ok(bits),
        _ => Err(format!("expected 16, 24 or 32, got {}", value)),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(std::io::stderr)
        .init();

    let config = Config::load();
    if cli.write_config {
        return write_config(&cli, config, &Config::config_path());
    }

    let (Some(reference_path), Some(test_path)) = (&cli.reference, &cli.test) else {
        bail!("reference and test file names are required");
    };

    let loader = SignalLoader::new();
    let reference = loader
        .load(reference_path)
        .with_context(|| format!("can't open for reading: {}", reference_path.display()))?;
    let test = loader
        .load(test_path)
        .with_context(|| format!("can't open for reading: {}", test_path.display()))?;

    let defaults = SearchSizes::from_config(&config, reference.sample_rate);
    let sizes = SearchSizes {
        probe_count: cli.offset.map_or(defaults.probe_count, |n| n as usize),
        window_len: cli.length.map_or(defaults.window_len, |n| n as usize),
    };

    let report = session::align(&reference, &test, sizes, &config.trim)?;
    let best = *report.alignment.best();

    if cli.quiet {
        println!("{}", best.offset);
    } else {
        for (name, trim) in [("reference", report.reference_trim), ("test", report.test_trim)] {
            println!(
                "Samples ignored from {:<10} {} ({} zeros + {} low energy)",
                format!("{}:", name),
                trim.total(),
                trim.zeros,
                trim.low_energy
            );
        }
        println!("Max offset: {}", report.sizes.probe_count);
        println!("SSD length: {}", report.sizes.window_len);
        for candidate in report.alignment.candidates() {
            println!("offset={} ssd={:.6}", candidate.offset, candidate.score);
        }
    }

    check_backward_limit(best.offset, cli.back.unwrap_or(config.back_max))?;

    if let Some(path) = cli.output_path() {
        let format = cli.output_format().resolve(reference.format, test.format);
        write_aligned(path, &test, best.offset, format)
            .with_context(|| format!("can't write {}", path.display()))?;
    }

    Ok(())
}
