use std::sync::Arc;

use arrow::array::{
    ArrayRef, Float64Array, StringArray, TimestampMillisecondArray, UInt32Array, UInt64Array,
    UInt8Array,
};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, Utc};
use parquet::arrow::ArrowWriter;
use parquet::file::properties::WriterProperties;

use synth_core::locale::HourlyDraw;
use synth_core::orchestrator::{SalesRecord, WeatherRecord};

use crate::error::ExportError;
use crate::metrics::RunSummary;
use crate::topology::{
    LocationRow, ProductLocationRow, ProductRow, SalespersonProductRow, SalespersonRow,
};

const UTC: &str = "UTC";

fn timestamp_field(name: &str) -> Field {
    Field::new(
        name,
        DataType::Timestamp(TimeUnit::Millisecond, Some(UTC.into())),
        false,
    )
}

fn timestamp_array<'a>(timestamps: impl Iterator<Item = &'a DateTime<Utc>>) -> ArrayRef {
    Arc::new(
        TimestampMillisecondArray::from(timestamps.map(|ts| ts.timestamp_millis()).collect::<Vec<_>>())
            .with_timezone(UTC),
    )
}

fn write_record_batch(
    file: std::fs::File,
    schema: Schema,
    arrays: Vec<ArrayRef>,
) -> Result<(), ExportError> {
    let batch = RecordBatch::try_new(Arc::new(schema), arrays)?;
    let props = WriterProperties::builder().build();
    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}

pub(crate) fn export_sales_parquet_impl(
    records: &[SalesRecord],
    file: std::fs::File,
) -> Result<(), ExportError> {
    let schema = Schema::new(vec![
        timestamp_field("timestamp"),
        Field::new("locale_id", DataType::UInt32, false),
        Field::new("recipient_id", DataType::UInt32, false),
        Field::new("product_id", DataType::UInt32, false),
        Field::new("quantity", DataType::UInt64, false),
        Field::new("weather_index", DataType::Float64, false),
    ]);
    let arrays: Vec<ArrayRef> = vec![
        timestamp_array(records.iter().map(|r| &r.timestamp)),
        Arc::new(UInt32Array::from(
            records.iter().map(|r| r.locale_id.0).collect::<Vec<_>>(),
        )),
        Arc::new(UInt32Array::from(
            records.iter().map(|r| r.recipient_id.0).collect::<Vec<_>>(),
        )),
        Arc::new(UInt32Array::from(
            records.iter().map(|r| r.product_id.0).collect::<Vec<_>>(),
        )),
        Arc::new(UInt64Array::from(
            records.iter().map(|r| r.quantity).collect::<Vec<_>>(),
        )),
        Arc::new(Float64Array::from(
            records.iter().map(|r| r.weather_index).collect::<Vec<_>>(),
        )),
    ];
    write_record_batch(file, schema, arrays)
}

pub(crate) fn export_draws_parquet_impl(
    draws: &[HourlyDraw],
    file: std::fs::File,
) -> Result<(), ExportError> {
    let schema = Schema::new(vec![
        timestamp_field("timestamp"),
        Field::new("locale_id", DataType::UInt32, false),
        Field::new("baseline_count", DataType::UInt64, false),
        Field::new("rejection_rate", DataType::Float64, false),
        Field::new("accepted_count", DataType::UInt64, false),
        Field::new("unassigned_count", DataType::UInt64, false),
        Field::new("weather_index", DataType::Float64, false),
        Field::new("daytime_factor", DataType::Float64, false),
    ]);
    let arrays: Vec<ArrayRef> = vec![
        timestamp_array(draws.iter().map(|d| &d.timestamp)),
        Arc::new(UInt32Array::from(
            draws.iter().map(|d| d.locale_id.0).collect::<Vec<_>>(),
        )),
        Arc::new(UInt64Array::from(
            draws.iter().map(|d| d.baseline_count).collect::<Vec<_>>(),
        )),
        Arc::new(Float64Array::from(
            draws.iter().map(|d| d.rejection_rate).collect::<Vec<_>>(),
        )),
        Arc::new(UInt64Array::from(
            draws.iter().map(|d| d.accepted_count).collect::<Vec<_>>(),
        )),
        Arc::new(UInt64Array::from(
            draws.iter().map(|d| d.unassigned_count).collect::<Vec<_>>(),
        )),
        Arc::new(Float64Array::from(
            draws.iter().map(|d| d.weather_index).collect::<Vec<_>>(),
        )),
        Arc::new(Float64Array::from(
            draws.iter().map(|d| d.daytime_factor).collect::<Vec<_>>(),
        )),
    ];
    write_record_batch(file, schema, arrays)
}

pub(crate) fn export_weather_parquet_impl(
    rows: &[WeatherRecord],
    file: std::fs::File,
) -> Result<(), ExportError> {
    let schema = Schema::new(vec![
        timestamp_field("timestamp"),
        Field::new("locale_id", DataType::UInt32, false),
        Field::new("temperature", DataType::Float64, false),
        Field::new("rainfall", DataType::Float64, false),
        Field::new("weather_index", DataType::Float64, false),
    ]);
    let arrays: Vec<ArrayRef> = vec![
        timestamp_array(rows.iter().map(|w| &w.timestamp)),
        Arc::new(UInt32Array::from(
            rows.iter().map(|w| w.locale_id.0).collect::<Vec<_>>(),
        )),
        Arc::new(Float64Array::from(
            rows.iter().map(|w| w.temperature).collect::<Vec<_>>(),
        )),
        Arc::new(Float64Array::from(
            rows.iter().map(|w| w.rainfall).collect::<Vec<_>>(),
        )),
        Arc::new(Float64Array::from(
            rows.iter().map(|w| w.weather_index).collect::<Vec<_>>(),
        )),
    ];
    write_record_batch(file, schema, arrays)
}

pub(crate) fn export_summaries_parquet_impl(
    summaries: &[RunSummary],
    file: std::fs::File,
) -> Result<(), ExportError> {
    let schema = Schema::new(vec![
        Field::new("seed", DataType::UInt64, false),
        Field::new("hours", DataType::UInt64, false),
        Field::new("baseline_total", DataType::UInt64, false),
        Field::new("accepted_total", DataType::UInt64, false),
        Field::new("assigned_total", DataType::UInt64, false),
        Field::new("unassigned_total", DataType::UInt64, false),
        Field::new("acceptance_ratio", DataType::Float64, false),
        Field::new("peak_mean_hour", DataType::UInt32, true),
        Field::new("failed_locales", DataType::UInt64, false),
    ]);
    let arrays: Vec<ArrayRef> = vec![
        Arc::new(UInt64Array::from(
            summaries.iter().map(|s| s.seed).collect::<Vec<_>>(),
        )),
        Arc::new(UInt64Array::from(
            summaries.iter().map(|s| s.hours as u64).collect::<Vec<_>>(),
        )),
        Arc::new(UInt64Array::from(
            summaries.iter().map(|s| s.baseline_total).collect::<Vec<_>>(),
        )),
        Arc::new(UInt64Array::from(
            summaries.iter().map(|s| s.accepted_total).collect::<Vec<_>>(),
        )),
        Arc::new(UInt64Array::from(
            summaries.iter().map(|s| s.assigned_total).collect::<Vec<_>>(),
        )),
        Arc::new(UInt64Array::from(
            summaries.iter().map(|s| s.unassigned_total).collect::<Vec<_>>(),
        )),
        Arc::new(Float64Array::from(
            summaries.iter().map(|s| s.acceptance_ratio).collect::<Vec<_>>(),
        )),
        Arc::new(UInt32Array::from(
            summaries.iter().map(|s| s.peak_mean_hour).collect::<Vec<_>>(),
        )),
        Arc::new(UInt64Array::from(
            summaries.iter().map(|s| s.failed_locales as u64).collect::<Vec<_>>(),
        )),
    ];
    write_record_batch(file, schema, arrays)
}

pub(crate) fn export_locations_parquet_impl(
    rows: &[LocationRow],
    file: std::fs::File,
) -> Result<(), ExportError> {
    let schema = Schema::new(vec![
        Field::new("locale_id", DataType::UInt32, false),
        Field::new("location", DataType::Utf8, false),
        Field::new("baseline_rate", DataType::Float64, false),
        Field::new("open_days", DataType::Utf8, false),
        Field::new("open_start", DataType::UInt8, false),
        Field::new("open_end", DataType::UInt8, false),
    ]);
    let arrays: Vec<ArrayRef> = vec![
        Arc::new(UInt32Array::from(
            rows.iter().map(|r| r.locale_id).collect::<Vec<_>>(),
        )),
        Arc::new(StringArray::from(
            rows.iter().map(|r| r.location.as_str()).collect::<Vec<_>>(),
        )),
        Arc::new(Float64Array::from(
            rows.iter().map(|r| r.baseline_rate).collect::<Vec<_>>(),
        )),
        Arc::new(StringArray::from(
            rows.iter().map(|r| r.open_days.as_str()).collect::<Vec<_>>(),
        )),
        Arc::new(UInt8Array::from(
            rows.iter().map(|r| r.open_start).collect::<Vec<_>>(),
        )),
        Arc::new(UInt8Array::from(
            rows.iter().map(|r| r.open_end).collect::<Vec<_>>(),
        )),
    ];
    write_record_batch(file, schema, arrays)
}

pub(crate) fn export_products_parquet_impl(
    rows: &[ProductRow],
    file: std::fs::File,
) -> Result<(), ExportError> {
    let schema = Schema::new(vec![Field::new("product_id", DataType::UInt32, false)]);
    let arrays: Vec<ArrayRef> = vec![Arc::new(UInt32Array::from(
        rows.iter().map(|r| r.product_id).collect::<Vec<_>>(),
    ))];
    write_record_batch(file, schema, arrays)
}

pub(crate) fn export_product_locations_parquet_impl(
    rows: &[ProductLocationRow],
    file: std::fs::File,
) -> Result<(), ExportError> {
    let schema = Schema::new(vec![
        Field::new("product_id", DataType::UInt32, false),
        Field::new("locale_id", DataType::UInt32, false),
    ]);
    let arrays: Vec<ArrayRef> = vec![
        Arc::new(UInt32Array::from(
            rows.iter().map(|r| r.product_id).collect::<Vec<_>>(),
        )),
        Arc::new(UInt32Array::from(
            rows.iter().map(|r| r.locale_id).collect::<Vec<_>>(),
        )),
    ];
    write_record_batch(file, schema, arrays)
}

pub(crate) fn export_salespeople_parquet_impl(
    rows: &[SalespersonRow],
    file: std::fs::File,
) -> Result<(), ExportError> {
    let schema = Schema::new(vec![
        Field::new("recipient_id", DataType::UInt32, false),
        Field::new("locale_id", DataType::UInt32, false),
        Field::new("hours_start", DataType::UInt8, false),
        Field::new("hours_end", DataType::UInt8, false),
        Field::new("performance_weight", DataType::Float64, false),
    ]);
    let arrays: Vec<ArrayRef> = vec![
        Arc::new(UInt32Array::from(
            rows.iter().map(|r| r.recipient_id).collect::<Vec<_>>(),
        )),
        Arc::new(UInt32Array::from(
            rows.iter().map(|r| r.locale_id).collect::<Vec<_>>(),
        )),
        Arc::new(UInt8Array::from(
            rows.iter().map(|r| r.hours_start).collect::<Vec<_>>(),
        )),
        Arc::new(UInt8Array::from(
            rows.iter().map(|r| r.hours_end).collect::<Vec<_>>(),
        )),
        Arc::new(Float64Array::from(
            rows.iter().map(|r| r.performance_weight).collect::<Vec<_>>(),
        )),
    ];
    write_record_batch(file, schema, arrays)
}

pub(crate) fn export_salesperson_products_parquet_impl(
    rows: &[SalespersonProductRow],
    file: std::fs::File,
) -> Result<(), ExportError> {
    let schema = Schema::new(vec![
        Field::new("recipient_id", DataType::UInt32, false),
        Field::new("product_id", DataType::UInt32, false),
    ]);
    let arrays: Vec<ArrayRef> = vec![
        Arc::new(UInt32Array::from(
            rows.iter().map(|r| r.recipient_id).collect::<Vec<_>>(),
        )),
        Arc::new(UInt32Array::from(
            rows.iter().map(|r| r.product_id).collect::<Vec<_>>(),
        )),
    ];
    write_record_batch(file, schema, arrays)
}
