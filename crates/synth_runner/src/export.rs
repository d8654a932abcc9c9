//! Writers for generated datasets.
//!
//! Sales, hourly draws and weather rows each go to their own table, and the
//! topology can be written next to them as dimension tables. Parquet is the
//! primary format; CSV and JSON are offered for inspection.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use synth_core::locale::HourlyDraw;
use synth_core::orchestrator::{SalesRecord, UnifiedDataset, WeatherRecord};

use crate::config::TopologyConfig;
use crate::error::ExportError;
use crate::metrics::RunSummary;
use crate::topology::TopologyTables;

#[path = "export/csv.rs"]
mod csv;
#[path = "export/json.rs"]
mod json;
#[path = "export/parquet.rs"]
mod parquet;
#[path = "export/writer_utils.rs"]
mod writer_utils;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    #[default]
    Parquet,
    Csv,
    Json,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Parquet => "parquet",
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }
}

/// Write sales records. Fails on an empty slice.
pub fn export_sales(
    records: &[SalesRecord],
    path: impl AsRef<Path>,
    format: ExportFormat,
) -> Result<(), ExportError> {
    writer_utils::ensure_not_empty(records)?;
    let file = writer_utils::create_output_file(path)?;
    match format {
        ExportFormat::Parquet => parquet::export_sales_parquet_impl(records, file),
        ExportFormat::Csv => csv::export_sales_csv_impl(records, file),
        ExportFormat::Json => json::export_to_json_impl(records, file),
    }
}

/// Write hourly draws. Fails on an empty slice.
pub fn export_draws(
    draws: &[HourlyDraw],
    path: impl AsRef<Path>,
    format: ExportFormat,
) -> Result<(), ExportError> {
    writer_utils::ensure_not_empty(draws)?;
    let file = writer_utils::create_output_file(path)?;
    match format {
        ExportFormat::Parquet => parquet::export_draws_parquet_impl(draws, file),
        ExportFormat::Csv => csv::export_draws_csv_impl(draws, file),
        ExportFormat::Json => json::export_to_json_impl(draws, file),
    }
}

/// Write weather rows. Fails on an empty slice.
pub fn export_weather(
    rows: &[WeatherRecord],
    path: impl AsRef<Path>,
    format: ExportFormat,
) -> Result<(), ExportError> {
    writer_utils::ensure_not_empty(rows)?;
    let file = writer_utils::create_output_file(path)?;
    match format {
        ExportFormat::Parquet => parquet::export_weather_parquet_impl(rows, file),
        ExportFormat::Csv => csv::export_weather_csv_impl(rows, file),
        ExportFormat::Json => json::export_to_json_impl(rows, file),
    }
}

/// Write replicate summaries. Fails on an empty slice.
pub fn export_summaries(
    summaries: &[RunSummary],
    path: impl AsRef<Path>,
    format: ExportFormat,
) -> Result<(), ExportError> {
    writer_utils::ensure_not_empty(summaries)?;
    let file = writer_utils::create_output_file(path)?;
    match format {
        ExportFormat::Parquet => parquet::export_summaries_parquet_impl(summaries, file),
        ExportFormat::Csv => csv::export_summaries_csv_impl(summaries, file),
        ExportFormat::Json => json::export_to_json_impl(summaries, file),
    }
}

/// Write every non-empty table of `dataset` into `dir` as `sales.*`,
/// `draws.*` and `weather.*`. Returns the paths written.
pub fn export_dataset(
    dataset: &UnifiedDataset,
    dir: impl AsRef<Path>,
    format: ExportFormat,
) -> Result<Vec<PathBuf>, ExportError> {
    let dir = dir.as_ref();
    let ext = format.extension();
    let mut written = Vec::new();

    if !dataset.sales.is_empty() {
        let path = dir.join(format!("sales.{ext}"));
        export_sales(&dataset.sales, &path, format)?;
        written.push(path);
    }
    if !dataset.draws.is_empty() {
        let path = dir.join(format!("draws.{ext}"));
        export_draws(&dataset.draws, &path, format)?;
        written.push(path);
    }
    if !dataset.weather.is_empty() {
        let path = dir.join(format!("weather.{ext}"));
        export_weather(&dataset.weather, &path, format)?;
        written.push(path);
    }

    info!(dir = %dir.display(), files = written.len(), "dataset exported");
    Ok(written)
}

fn write_table<T: Serialize>(
    rows: &[T],
    path: &Path,
    format: ExportFormat,
    parquet_impl: fn(&[T], std::fs::File) -> Result<(), ExportError>,
) -> Result<(), ExportError> {
    writer_utils::ensure_not_empty(rows)?;
    let file = writer_utils::create_output_file(path)?;
    match format {
        ExportFormat::Parquet => parquet_impl(rows, file),
        ExportFormat::Csv => csv::export_rows_csv_impl(rows, file),
        ExportFormat::Json => json::export_to_json_impl(rows, file),
    }
}

/// Write the topology into `dir` as `locations.*`, `products.*`,
/// `product_locations.*`, `salespeople.*` and `salesperson_products.*`,
/// skipping empty tables. Returns the paths written.
pub fn export_topology(
    topology: &TopologyConfig,
    dir: impl AsRef<Path>,
    format: ExportFormat,
) -> Result<Vec<PathBuf>, ExportError> {
    let tables = TopologyTables::from_config(topology)?;
    let dir = dir.as_ref();
    let ext = format.extension();
    let mut written = Vec::new();

    macro_rules! table {
        ($rows:expr, $name:literal, $parquet:path) => {
            if !$rows.is_empty() {
                let path = dir.join(format!(concat!($name, ".{}"), ext));
                write_table(&$rows, &path, format, $parquet)?;
                written.push(path);
            }
        };
    }
    table!(tables.locations, "locations", parquet::export_locations_parquet_impl);
    table!(tables.products, "products", parquet::export_products_parquet_impl);
    table!(
        tables.product_locations,
        "product_locations",
        parquet::export_product_locations_parquet_impl
    );
    table!(tables.salespeople, "salespeople", parquet::export_salespeople_parquet_impl);
    table!(
        tables.salesperson_products,
        "salesperson_products",
        parquet::export_salesperson_products_parquet_impl
    );

    info!(dir = %dir.display(), files = written.len(), "topology exported");
    Ok(written)
}
