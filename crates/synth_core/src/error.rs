//! Error taxonomy for the generation pipeline.
//!
//! Configuration errors are raised at construction time and abort a run before
//! any generation starts. Fetch errors are scoped to a single locale. Invariant
//! violations indicate a bug and always abort the run.

use thiserror::Error;

use crate::ids::{LocaleId, ProductId, RecipientId};

/// Invalid topology or model parameters. Always fatal.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("locale {locale}: baseline rate must be positive and finite, got {rate}")]
    NonPositiveBaselineRate { locale: LocaleId, rate: f64 },

    #[error("recipient {recipient}: performance weight must be positive and finite, got {weight}")]
    NonPositivePerformanceWeight { recipient: RecipientId, weight: f64 },

    #[error("open days must contain at least one weekday")]
    EmptyOpenDays,

    #[error("hour window {start}..{end} is empty")]
    EmptyHourWindow { start: u8, end: u8 },

    #[error("hour {0} is out of range (start 0-23, end 0-24)")]
    InvalidHour(u8),

    #[error("weekday index {0} is out of range (0 = Monday .. 6 = Sunday)")]
    InvalidWeekday(u8),

    #[error("recipient {recipient}: availability {start}..{end} must not wrap past midnight")]
    WrappingAvailability {
        recipient: RecipientId,
        start: u8,
        end: u8,
    },

    #[error("recipient {recipient} has no products to receive sales")]
    EmptyProductSet { recipient: RecipientId },

    #[error("product {product} is listed more than once for recipient {recipient}")]
    DuplicateProduct {
        recipient: RecipientId,
        product: ProductId,
    },

    #[error("locale {0} is configured more than once")]
    DuplicateLocale(LocaleId),

    #[error("recipient {recipient} is assigned to more than one locale (seen again in {locale})")]
    DuplicateRecipient {
        recipient: RecipientId,
        locale: LocaleId,
    },

    #[error("time range end must be strictly after start")]
    InvalidTimeRange,

    #[error("model parameter `{name}` is invalid: {value}")]
    InvalidModelParameter { name: &'static str, value: f64 },
}

/// Failure to obtain weather observations for a location.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// A single request failed; may be retried.
    #[error("weather request for `{location}` failed: {message}")]
    Request { location: String, message: String },

    /// The provider does not know the location. Not retried.
    #[error("weather provider has no data for location `{location}`")]
    UnknownLocation { location: String },

    /// Every retry attempt failed.
    #[error("weather fetch for `{location}` gave up after {attempts} attempts: {last_message}")]
    Exhausted {
        location: String,
        attempts: u32,
        last_message: String,
    },
}

impl FetchError {
    /// Whether another attempt could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FetchError::Request { .. })
    }
}

/// An internal consistency check failed. Never recovered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invariant violated in {stage}: expected {expected}, got {actual}")]
pub struct InvariantViolation {
    pub stage: &'static str,
    pub expected: u64,
    pub actual: u64,
}

/// Top-level error for a generation run.
#[derive(Debug, Error)]
pub enum SynthError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Invariant(#[from] InvariantViolation),

    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}
