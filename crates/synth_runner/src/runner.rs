//! Replicate runs: the same topology generated under many seeds.
//!
//! Replicates run in parallel on one rayon pool, and each replicate's locales
//! are scheduled on that same pool.

use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use tracing::info;

use synth_core::calendar::TimeRange;
use synth_core::error::SynthError;
use synth_core::orchestrator::{GenerationOrchestrator, RunReport};

use crate::metrics::RunSummary;

/// Run `orchestrator` once per seed and summarize each run.
///
/// Results come back in seed order. The first run that fails aborts the
/// batch.
pub fn run_replicates(
    orchestrator: &GenerationOrchestrator,
    range: &TimeRange,
    seeds: &[u64],
    num_threads: Option<usize>,
    show_progress: bool,
) -> Result<Vec<RunSummary>, SynthError> {
    let pb = if show_progress && !seeds.is_empty() {
        let bar = ProgressBar::new(seeds.len() as u64);
        if let Ok(style) = ProgressStyle::default_bar().template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})",
        ) {
            bar.set_style(style.progress_chars("#>-"));
        }
        Some(bar)
    } else {
        None
    };

    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(threads) = num_threads {
        builder = builder.num_threads(threads);
    }
    let pool = builder.build()?;

    info!(replicates = seeds.len(), "starting replicate runs");
    let pb_clone = pb.clone();
    let results: Result<Vec<RunSummary>, SynthError> = pool.install(|| {
        seeds
            .par_iter()
            .map(|seed| {
                let report = orchestrator.run(range, *seed)?;
                if let Some(ref progress_bar) = pb_clone {
                    progress_bar.inc(1);
                }
                Ok(RunSummary::from_report(&report))
            })
            .collect()
    });

    if let Some(ref progress_bar) = pb {
        progress_bar.finish_with_message("Completed");
    }
    results
}

/// Seeds `base, base + 1, ...` for `count` replicates.
pub fn sequential_seeds(base: u64, count: usize) -> Vec<u64> {
    (0..count as u64).map(|i| base.wrapping_add(i)).collect()
}

/// Single run, kept for symmetry with [`run_replicates`].
pub fn run_once(
    orchestrator: &GenerationOrchestrator,
    range: &TimeRange,
    seed: u64,
) -> Result<(RunReport, RunSummary), SynthError> {
    let report = orchestrator.run(range, seed)?;
    let summary = RunSummary::from_report(&report);
    Ok((report, summary))
}
