use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use synth_core::calendar::TimeRange;
use synth_core::orchestrator::GenerationOrchestrator;
use synth_core::weather::RetryPolicy;
use synth_runner::{
    export_dataset, export_summaries, export_topology, parse_timestamp, run_replicates, sequential_seeds,
    CsvWeatherSource, ExportFormat, RunSummary, TopologyConfig,
};

// ── CLI definition ─────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "synth",
    about = "Generate synthetic hourly retail sales",
    long_about = "Generate synthetic hourly retail sales driven by weather,\n\
                  time of day and salesperson availability."
)]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate one dataset and export its tables
    Generate {
        #[command(flatten)]
        input: InputArgs,
        /// Run seed
        #[arg(long, default_value_t = 42, env = "SYNTH_SEED")]
        seed: u64,
        /// Output directory
        #[arg(long, default_value = "out")]
        out: PathBuf,
        #[arg(value_enum, long, default_value_t = Format::Parquet)]
        format: Format,
        /// Exit with an error if any locale failed to fetch weather
        #[arg(long)]
        strict: bool,
    },
    /// Run the same topology under many seeds and export one summary per run
    Replicate {
        #[command(flatten)]
        input: InputArgs,
        /// First seed; replicates use consecutive seeds
        #[arg(long, default_value_t = 0)]
        base_seed: u64,
        #[arg(long, default_value_t = 10)]
        replicates: usize,
        /// Summary file path
        #[arg(long, default_value = "summaries.csv")]
        output: PathBuf,
        #[arg(value_enum, long, default_value_t = Format::Csv)]
        format: Format,
    },
    /// Export the topology as location, product and salesperson tables
    Topology {
        /// Topology JSON file
        #[arg(long)]
        topology: PathBuf,
        /// Output directory
        #[arg(long, default_value = "out")]
        out: PathBuf,
        #[arg(value_enum, long, default_value_t = Format::Parquet)]
        format: Format,
    },
}

#[derive(Args)]
struct InputArgs {
    /// Topology JSON file
    #[arg(long)]
    topology: PathBuf,
    /// Weather CSV file (location,timestamp,temperature,rainfall)
    #[arg(long)]
    weather: PathBuf,
    /// Range start, inclusive (RFC 3339 or YYYY-MM-DD)
    #[arg(long, value_parser = parse_time)]
    start: DateTime<Utc>,
    /// Range end, exclusive
    #[arg(long, value_parser = parse_time)]
    end: DateTime<Utc>,
    /// Worker threads; defaults to one per core
    #[arg(long)]
    threads: Option<usize>,
    /// Attempts per weather request
    #[arg(long, default_value_t = 4)]
    attempts: u32,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Parquet,
    Csv,
    Json,
}

impl From<Format> for ExportFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Parquet => ExportFormat::Parquet,
            Format::Csv => ExportFormat::Csv,
            Format::Json => ExportFormat::Json,
        }
    }
}

// ── helpers ────────────────────────────────────────────────────────

fn parse_time(value: &str) -> Result<DateTime<Utc>, String> {
    parse_timestamp(value).map_err(|e| e.to_string())
}

fn init_tracing(verbose: bool) {
    let filter = if verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

impl InputArgs {
    fn range(&self) -> Result<TimeRange> {
        TimeRange::new(self.start, self.end).context("invalid time range")
    }

    fn orchestrator(&self) -> Result<GenerationOrchestrator> {
        let topology = TopologyConfig::from_path(&self.topology)
            .with_context(|| format!("loading topology {}", self.topology.display()))?;
        let weather = CsvWeatherSource::from_path(&self.weather)
            .with_context(|| format!("loading weather {}", self.weather.display()))?;
        if weather.is_empty() {
            warn!(path = %self.weather.display(), "weather file has no rows");
        }
        let retry = RetryPolicy {
            max_attempts: self.attempts.max(1),
            ..RetryPolicy::default()
        };
        let orchestrator = topology.build_orchestrator(Box::new(weather), retry, self.threads)?;
        Ok(orchestrator)
    }
}

fn generate(input: &InputArgs, seed: u64, out: &Path, format: Format, strict: bool) -> Result<()> {
    let range = input.range()?;
    let orchestrator = input.orchestrator()?;
    let report = orchestrator.run(&range, seed)?;

    for failure in &report.failures {
        warn!(
            locale_id = %failure.locale_id,
            location = %failure.location,
            error = %failure.error,
            "locale produced no data"
        );
    }
    if strict && !report.is_complete() {
        bail!("{} locale(s) failed to fetch weather", report.failures.len());
    }

    let written = export_dataset(&report.dataset, out, format.into())?;
    let summary = RunSummary::from_report(&report);
    info!(
        seed,
        accepted = summary.accepted_total,
        assigned = summary.assigned_total,
        unassigned = summary.unassigned_total,
        files = written.len(),
        "generation complete"
    );
    for path in written {
        println!("{}", path.display());
    }
    Ok(())
}

fn replicate(
    input: &InputArgs,
    base_seed: u64,
    replicates: usize,
    output: &Path,
    format: Format,
) -> Result<()> {
    if replicates == 0 {
        bail!("--replicates must be at least 1");
    }
    let range = input.range()?;
    let orchestrator = input.orchestrator()?;
    let seeds = sequential_seeds(base_seed, replicates);
    let summaries = run_replicates(&orchestrator, &range, &seeds, input.threads, true)?;
    export_summaries(&summaries, output, format.into())?;
    info!(replicates, path = %output.display(), "replicate summaries written");
    Ok(())
}

fn topology(topology: &Path, out: &Path, format: Format) -> Result<()> {
    let config = TopologyConfig::from_path(topology)
        .with_context(|| format!("loading topology {}", topology.display()))?;
    let written = export_topology(&config, out, format.into())?;
    for path in written {
        println!("{}", path.display());
    }
    Ok(())
}

// ── main ───────────────────────────────────────────────────────────

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match &cli.command {
        Commands::Generate {
            input,
            seed,
            out,
            format,
            strict,
        } => generate(input, *seed, out, *format, *strict),
        Commands::Replicate {
            input,
            base_seed,
            replicates,
            output,
            format,
        } => replicate(input, *base_seed, *replicates, output, *format),
        Commands::Topology {
            topology: path,
            out,
            format,
        } => topology(path, out, *format),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("error: {error:#}");
            ExitCode::FAILURE
        }
    }
}
