//! Summary metrics over generated runs.

use std::collections::BTreeMap;

use chrono::Timelike;
use serde::Serialize;

use synth_core::locale::{HourlyDraw, LocaleStats};
use synth_core::orchestrator::RunReport;

/// Mean accepted sales per hour of day.
///
/// Only hours a locale was open contribute, because closed hours never
/// produce a draw. Hours with no draws are absent from the map.
pub fn mean_sales_by_hour(draws: &[HourlyDraw]) -> BTreeMap<u32, f64> {
    let mut sums: BTreeMap<u32, (u64, u64)> = BTreeMap::new();
    for draw in draws {
        let entry = sums.entry(draw.timestamp.hour()).or_default();
        entry.0 += draw.accepted_count;
        entry.1 += 1;
    }
    sums.into_iter()
        .map(|(hour, (total, count))| (hour, total as f64 / count as f64))
        .collect()
}

/// Aggregate figures for one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub seed: u64,
    /// Locale-hours that produced a draw.
    pub hours: usize,
    pub baseline_total: u64,
    pub accepted_total: u64,
    pub assigned_total: u64,
    pub unassigned_total: u64,
    /// Accepted over baseline; 0.0 when nothing was drawn.
    pub acceptance_ratio: f64,
    /// Hour of day with the highest mean accepted sales.
    pub peak_mean_hour: Option<u32>,
    pub failed_locales: usize,
}

impl RunSummary {
    pub fn from_report(report: &RunReport) -> Self {
        let totals = report
            .locale_stats
            .values()
            .fold(LocaleStats::default(), |mut acc, stats| {
                acc.hours += stats.hours;
                acc.baseline_total += stats.baseline_total;
                acc.accepted_total += stats.accepted_total;
                acc.assigned_total += stats.assigned_total;
                acc.unassigned_total += stats.unassigned_total;
                acc
            });
        let acceptance_ratio = if totals.baseline_total == 0 {
            0.0
        } else {
            totals.accepted_total as f64 / totals.baseline_total as f64
        };
        let peak_mean_hour = mean_sales_by_hour(&report.dataset.draws)
            .into_iter()
            .max_by(|a, b| a.1.total_cmp(&b.1).then(b.0.cmp(&a.0)))
            .map(|(hour, _)| hour);

        Self {
            seed: report.seed,
            hours: totals.hours,
            baseline_total: totals.baseline_total,
            accepted_total: totals.accepted_total,
            assigned_total: totals.assigned_total,
            unassigned_total: totals.unassigned_total,
            acceptance_ratio,
            peak_mean_hour,
            failed_locales: report.failures.len(),
        }
    }
}
