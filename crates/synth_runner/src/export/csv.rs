use serde::Serialize;

use synth_core::locale::HourlyDraw;
use synth_core::orchestrator::{SalesRecord, WeatherRecord};

use crate::error::ExportError;
use crate::metrics::RunSummary;

pub(crate) fn export_sales_csv_impl(
    records: &[SalesRecord],
    file: std::fs::File,
) -> Result<(), ExportError> {
    let mut wtr = csv::Writer::from_writer(file);
    wtr.write_record([
        "timestamp",
        "locale_id",
        "recipient_id",
        "product_id",
        "quantity",
        "weather_index",
    ])?;
    for record in records {
        wtr.write_record([
            &record.timestamp.to_rfc3339(),
            &record.locale_id.to_string(),
            &record.recipient_id.to_string(),
            &record.product_id.to_string(),
            &record.quantity.to_string(),
            &record.weather_index.to_string(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

pub(crate) fn export_draws_csv_impl(
    draws: &[HourlyDraw],
    file: std::fs::File,
) -> Result<(), ExportError> {
    let mut wtr = csv::Writer::from_writer(file);
    wtr.write_record([
        "timestamp",
        "locale_id",
        "baseline_count",
        "rejection_rate",
        "accepted_count",
        "unassigned_count",
        "weather_index",
        "daytime_factor",
    ])?;
    for draw in draws {
        wtr.write_record([
            &draw.timestamp.to_rfc3339(),
            &draw.locale_id.to_string(),
            &draw.baseline_count.to_string(),
            &draw.rejection_rate.to_string(),
            &draw.accepted_count.to_string(),
            &draw.unassigned_count.to_string(),
            &draw.weather_index.to_string(),
            &draw.daytime_factor.to_string(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

pub(crate) fn export_weather_csv_impl(
    rows: &[WeatherRecord],
    file: std::fs::File,
) -> Result<(), ExportError> {
    let mut wtr = csv::Writer::from_writer(file);
    wtr.write_record([
        "timestamp",
        "locale_id",
        "temperature",
        "rainfall",
        "weather_index",
    ])?;
    for row in rows {
        wtr.write_record([
            &row.timestamp.to_rfc3339(),
            &row.locale_id.to_string(),
            &row.temperature.to_string(),
            &row.rainfall.to_string(),
            &row.weather_index.to_string(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

pub(crate) fn export_summaries_csv_impl(
    summaries: &[RunSummary],
    file: std::fs::File,
) -> Result<(), ExportError> {
    let mut wtr = csv::Writer::from_writer(file);
    wtr.write_record([
        "seed",
        "hours",
        "baseline_total",
        "accepted_total",
        "assigned_total",
        "unassigned_total",
        "acceptance_ratio",
        "peak_mean_hour",
        "failed_locales",
    ])?;
    for summary in summaries {
        wtr.write_record([
            &summary.seed.to_string(),
            &summary.hours.to_string(),
            &summary.baseline_total.to_string(),
            &summary.accepted_total.to_string(),
            &summary.assigned_total.to_string(),
            &summary.unassigned_total.to_string(),
            &summary.acceptance_ratio.to_string(),
            &summary
                .peak_mean_hour
                .map(|h| h.to_string())
                .unwrap_or_default(),
            &summary.failed_locales.to_string(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Header from the row type's field names.
pub(crate) fn export_rows_csv_impl<T: Serialize>(
    rows: &[T],
    file: std::fs::File,
) -> Result<(), ExportError> {
    let mut wtr = csv::Writer::from_writer(file);
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}
