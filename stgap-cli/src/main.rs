//! STGAP SPI Decoder CLI Application
//!
//! Command-line front end for the stgap-decoder library. It adds:
//! - Saleae Logic 2 SPI analyzer CSV import
//! - TOML configuration files
//! - Text and JSON-lines output

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use stgap_decoder::Decoder;

mod capture;
mod config;
mod report;

use capture::CaptureReader;
use config::{AppConfig, OutputFormat};
use report::{ReportConfig, ReportWriter};

/// STGAP SPI Decoder - Decode STGAP1BS/STGAP1AS daisy-chain SPI captures
#[derive(Parser, Debug)]
#[command(name = "stgap-cli")]
#[command(about = "Decode STGAP1BS gate driver SPI captures (Saleae Logic 2 CSV)", long_about = None)]
#[command(version)]
struct Args {
    /// Saleae Logic 2 SPI analyzer CSV export(s)
    #[arg(value_name = "FILE")]
    inputs: Vec<PathBuf>,

    /// Path to configuration file (config.toml)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Output file for decoded words (default: stdout)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum)]
    format: Option<OutputFormat>,

    /// Only decode rows from the analyzer with this name
    #[arg(long, value_name = "NAME")]
    analyzer: Option<String>,

    /// Show raw MOSI/MISO words
    #[arg(short = 'x', long)]
    hex: bool,

    /// Use absolute timestamps instead of relative (seconds from first word)
    #[arg(short, long)]
    absolute_time: bool,

    /// Annotate matching CRCs as well as mismatches
    #[arg(long)]
    crc_debug: bool,

    /// Skip CRC verification
    #[arg(long, conflicts_with = "crc_debug")]
    no_crc: bool,

    /// Verbosity level (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging
    init_logging(args.verbose, args.quiet);

    log::info!("STGAP SPI Decoder CLI v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Using decoder library v{}", stgap_decoder::VERSION);

    let config = resolve_config(&args)?;
    if config.input.files.is_empty() {
        bail!("No capture files given (pass FILE arguments or [input] files in --config)");
    }

    run(&config)
}

/// Merge the optional config file with command-line overrides
fn resolve_config(args: &Args) -> Result<AppConfig> {
    let mut config = match &args.config {
        Some(path) => {
            log::info!("Loading configuration from: {:?}", path);
            config::load_config(path)?
        }
        None => AppConfig::default(),
    };

    if !args.inputs.is_empty() {
        config.input.files = args.inputs.clone();
    }
    if args.analyzer.is_some() {
        config.input.analyzer = args.analyzer.clone();
    }
    if let Some(format) = args.format {
        config.output.format = format;
    }
    if args.output.is_some() {
        config.output.path = args.output.clone();
    }
    config.output.show_raw |= args.hex;
    config.output.absolute_time |= args.absolute_time;
    if args.crc_debug {
        config.decoder.debug_crc = true;
    }
    if args.no_crc {
        config.decoder.verify_crc = false;
        config.decoder.debug_crc = false;
    }

    log::debug!("Effective configuration: {:?}", config);
    Ok(config)
}

/// Decode every configured capture, each with its own decoding context
fn run(config: &AppConfig) -> Result<()> {
    let out: Box<dyn Write> = match &config.output.path {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {:?}", path))?;
            Box::new(BufWriter::new(file))
        }
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };

    let mut writer = ReportWriter::new(
        out,
        ReportConfig {
            format: config.output.format,
            show_raw: config.output.show_raw,
            use_relative_time: !config.output.absolute_time,
            start_time: None,
        },
    );

    for path in &config.input.files {
        decode_capture(path, config, &mut writer)?;
    }

    writer.flush()
}

fn decode_capture<W: Write>(
    path: &Path,
    config: &AppConfig,
    writer: &mut ReportWriter<W>,
) -> Result<()> {
    log::info!("Decoding capture: {:?}", path);

    let mut decoder = Decoder::with_config(config.decoder.clone())?;
    let mut reader = CaptureReader::open(path)?.with_analyzer(config.input.analyzer.clone());
    writer.start_capture();

    for event in reader.events() {
        let event = event.with_context(|| format!("Failed to read capture: {:?}", path))?;
        if let Some(result) = decoder.process(&event) {
            writer.write(&result)?;
        }
    }

    let stats = decoder.stats();
    log::info!("{:?}: {}", path, report::summary_line(&stats));
    if stats.crc_errors > 0 {
        log::warn!("{:?}: {} CRC errors", path, stats.crc_errors);
    }

    Ok(())
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: u8, quiet: bool) {
    use env_logger::Builder;
    use log::LevelFilter;

    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    Builder::new()
        .filter_level(level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}
