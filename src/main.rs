/*!
 * usfsampler - Main Entry Point
 *
 * Replays a recorded access trace through the burst sampler and writes one
 * sample segment per burst.
 */

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context};
use clap::Parser;
use serde::Serialize;
use tracing::{error, info};

use reuse_sampler::core::limits::{
    DEFAULT_BURST_PERIOD, DEFAULT_BURST_SIZE, DEFAULT_SAMPLE_PERIOD, DEFAULT_SEED,
};
use reuse_sampler::sampler::line_size_lg2;
use reuse_sampler::{
    init_tracing, replay, FileTraceWriter, PeriodKind, ReplayStats, Sampler, SamplerConfig,
    SamplerStats, TraceReader,
};

/// Burst-based reuse sampler for access traces
#[derive(Debug, Parser)]
#[command(name = "usfsampler", version, about)]
struct Args {
    /// Input access trace
    #[arg(short = 'i', long = "infile")]
    infile: PathBuf,

    /// Output base name, bursts are written to `<outfile>.<n>`
    #[arg(short = 'o', long = "outfile")]
    outfile: PathBuf,

    /// Average time between samples
    #[arg(short = 's', long, default_value_t = DEFAULT_SAMPLE_PERIOD)]
    sample_period: u64,

    /// Sample period generator (exp/const)
    #[arg(short = 'S', long, default_value = "exp")]
    sample_rnd: PeriodKind,

    /// Average time between bursts
    #[arg(short = 'b', long, default_value_t = DEFAULT_BURST_PERIOD)]
    burst_period: u64,

    /// Burst period generator (exp/const)
    #[arg(short = 'B', long, default_value = "exp")]
    burst_rnd: PeriodKind,

    /// Burst length in accesses, 0 samples continuously
    #[arg(short = 'z', long, default_value_t = DEFAULT_BURST_SIZE)]
    burst_size: u64,

    /// Cache line size in bytes (power of two)
    #[arg(short = 'l', long, default_value_t = 64)]
    line_size: u64,

    /// Random seed
    #[arg(short = 'r', long, default_value_t = DEFAULT_SEED)]
    seed: u64,

    /// Increase log verbosity (repeatable)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Print run statistics as JSON on stdout
    #[arg(long)]
    stats_json: bool,
}

#[derive(Debug, Serialize)]
struct RunReport {
    replay: ReplayStats,
    sampler: SamplerStats,
}

fn build_config(args: &Args) -> anyhow::Result<SamplerConfig> {
    let lg2 = line_size_lg2(args.line_size).context("Invalid --line-size")?;
    let config = SamplerConfig::builder()
        .base_path(&args.outfile)
        .sample_period(args.sample_period)
        .sample_kind(args.sample_rnd)
        .burst_period(args.burst_period)
        .burst_kind(args.burst_rnd)
        .burst_size(args.burst_size)
        .line_size_lg2(lg2)
        .seed(args.seed)
        .argv(std::env::args().collect())
        .build()
        .context("Invalid sampler configuration")?;
    Ok(config)
}

fn run(args: &Args) -> anyhow::Result<RunReport> {
    let reader = TraceReader::open(&args.infile)
        .with_context(|| format!("Unable to open trace file {}", args.infile.display()))?;
    if !reader.header().is_trace() {
        bail!("{}: is not a trace file", args.infile.display());
    }

    let config = build_config(args)?;
    let mut sampler = Sampler::with_writer(config, FileTraceWriter::new().with_create_dirs())
        .context("Unable to initialize sampler")?;

    // Finalize runs on both paths so dangling watchpoints still reach disk
    let replayed = replay(reader, &mut sampler);
    let finalized = sampler.finalize();

    let replay = replayed.context("Sampler error")?;
    let sampler = finalized.context("Unable to finalize sampler")?;
    Ok(RunReport { replay, sampler })
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);

    info!(
        infile = %args.infile.display(),
        outfile = %args.outfile.display(),
        "usfsampler starting"
    );

    match run(&args) {
        Ok(report) => {
            info!(
                events = report.replay.events,
                samples = report.sampler.samples,
                dangling = report.sampler.dangling,
                bursts = report.sampler.bursts,
                "usfsampler finished"
            );
            if args.stats_json {
                match serde_json::to_string_pretty(&report) {
                    Ok(json) => println!("{json}"),
                    Err(e) => {
                        error!(error = %e, "failed to encode statistics");
                        return ExitCode::FAILURE;
                    }
                }
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
