//! Test helpers for common test setup and utilities.
//!
//! Shared by unit tests, integration tests and benchmarks.

use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::calendar::{HourWindow, TimeRange};
use crate::ids::{ProductId, RecipientId};
use crate::salesperson::{AvailabilityAssigner, SimpleSalesperson};
use crate::weather::{WeatherIndex, WeatherObservation};

/// Monday 2025-09-01 00:00 UTC.
///
/// # Panics
///
/// Never; the date is a valid constant.
pub fn test_epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 9, 1, 0, 0, 0)
        .single()
        .expect("test epoch is a valid timestamp")
}

/// `hours` whole hours starting at [`test_epoch`] plus `offset_hours`.
///
/// # Panics
///
/// Panics if `hours` is zero.
pub fn test_range(offset_hours: i64, hours: i64) -> TimeRange {
    let start = test_epoch() + Duration::hours(offset_hours);
    TimeRange::new(start, start + Duration::hours(hours)).expect("test range must be non-empty")
}

/// One observation per hour of `range` with constant readings.
pub fn constant_observations(range: &TimeRange, temperature: f64, rainfall: f64) -> Vec<WeatherObservation> {
    range
        .hours()
        .map(|ts| WeatherObservation::new(ts, temperature, rainfall))
        .collect()
}

/// One index per hour of `range` with a constant value.
pub fn constant_index(range: &TimeRange, value: f64) -> Vec<WeatherIndex> {
    range
        .hours()
        .map(|timestamp| WeatherIndex { timestamp, value })
        .collect()
}

/// Boxed salesperson with weight 1.0 selling `products`.
///
/// # Panics
///
/// Panics if the hour window or product list is invalid.
pub fn salesperson(id: u32, start: u8, end: u8, products: &[u32]) -> Box<dyn AvailabilityAssigner> {
    weighted_salesperson(id, start, end, 1.0, products)
}

/// Boxed salesperson with an explicit performance weight.
///
/// # Panics
///
/// Panics if the hour window, weight or product list is invalid.
pub fn weighted_salesperson(
    id: u32,
    start: u8,
    end: u8,
    weight: f64,
    products: &[u32],
) -> Box<dyn AvailabilityAssigner> {
    let window = HourWindow::new(start, end).expect("valid test hour window");
    Box::new(
        SimpleSalesperson::new(
            RecipientId(id),
            window,
            weight,
            products.iter().copied().map(ProductId),
        )
        .expect("valid test salesperson"),
    )
}
