//! JSON topology files.
//!
//! A topology lists locales, their opening schedule and their salespeople.
//! Every field with a sensible default may be omitted. Loading validates the
//! file through the core constructors, so a loaded topology is always usable.

use std::fs;
use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use synth_core::calendar::{HourWindow, OpenDays, OpenWindow};
use synth_core::daytime::{DaytimeNoise, DaytimeProfile, WeatherResponse};
use synth_core::ids::{LocaleId, ProductId, RecipientId};
use synth_core::locale::{BaselineKind, LocaleConfig, LocaleGenerator, SimpleLocaleGenerator};
use synth_core::orchestrator::GenerationOrchestrator;
use synth_core::salesperson::{AvailabilityAssigner, SimpleSalesperson};
use synth_core::weather::{RetryPolicy, WeatherModelKind, WeatherSource};

use crate::error::ConfigLoadError;

/// Parse an RFC 3339 timestamp, a naive `YYYY-MM-DDTHH:MM[:SS]` (taken as
/// UTC) or a bare `YYYY-MM-DD` (midnight UTC).
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, ConfigLoadError> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(ts.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| ConfigLoadError::Timestamp {
            value: value.to_string(),
            message: "expected RFC 3339, YYYY-MM-DDTHH:MM or YYYY-MM-DD".into(),
        })
}

/// Weekdays a locale opens, as an explicit list or an inclusive range.
/// Monday is 0.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OpenDaysSpec {
    List(Vec<u8>),
    Range { from: u8, to: u8 },
}

impl Default for OpenDaysSpec {
    fn default() -> Self {
        OpenDaysSpec::Range { from: 0, to: 5 }
    }
}

impl OpenDaysSpec {
    pub fn build(&self) -> Result<OpenDays, ConfigLoadError> {
        let days = match self {
            OpenDaysSpec::List(days) => OpenDays::from_indices(days.iter().copied())?,
            OpenDaysSpec::Range { from, to } => OpenDays::range(*from, *to)?,
        };
        Ok(days)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HoursSpec {
    pub start: u8,
    pub end: u8,
}

impl HoursSpec {
    pub fn build(&self) -> Result<HourWindow, ConfigLoadError> {
        Ok(HourWindow::new(self.start, self.end)?)
    }
}

fn default_open_hours() -> HoursSpec {
    HoursSpec { start: 8, end: 20 }
}

fn default_working_hours() -> HoursSpec {
    HoursSpec { start: 8, end: 16 }
}

fn default_performance_weight() -> f64 {
    1.0
}

fn default_peak_hour() -> f64 {
    DaytimeProfile::default().peak_hour
}

fn default_spread() -> f64 {
    DaytimeProfile::default().spread
}

fn default_weather_exponent() -> f64 {
    WeatherResponse::default().exponent
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DaytimeSpec {
    #[serde(default = "default_peak_hour")]
    pub peak_hour: f64,
    #[serde(default = "default_spread")]
    pub spread: f64,
}

impl Default for DaytimeSpec {
    fn default() -> Self {
        Self {
            peak_hour: default_peak_hour(),
            spread: default_spread(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseSpec {
    pub day_sigma: f64,
    pub hour_sigma: f64,
    pub smoothing_window: usize,
}

impl Default for NoiseSpec {
    fn default() -> Self {
        let noise = DaytimeNoise::default();
        Self {
            day_sigma: noise.day_sigma,
            hour_sigma: noise.hour_sigma,
            smoothing_window: noise.smoothing_window,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecipientSpec {
    pub id: u32,
    #[serde(default = "default_working_hours")]
    pub hours: HoursSpec,
    #[serde(default = "default_performance_weight")]
    pub performance_weight: f64,
    /// Falls back to the locale's products when absent.
    #[serde(default)]
    pub products: Option<Vec<u32>>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LocaleSpec {
    pub id: u32,
    pub location: String,
    #[serde(default)]
    pub open_days: OpenDaysSpec,
    #[serde(default = "default_open_hours")]
    pub open_hours: HoursSpec,
    pub baseline_rate: f64,
    #[serde(default)]
    pub baseline: BaselineKind,
    #[serde(default)]
    pub products: Vec<u32>,
    #[serde(default)]
    pub daytime: DaytimeSpec,
    #[serde(default = "default_weather_exponent")]
    pub weather_exponent: f64,
    #[serde(default)]
    pub daytime_noise: Option<NoiseSpec>,
    /// Overrides the topology-wide weather model.
    #[serde(default)]
    pub weather_model: Option<WeatherModelKind>,
    #[serde(default)]
    pub recipients: Vec<RecipientSpec>,
}

impl LocaleSpec {
    fn build_recipient(
        &self,
        spec: &RecipientSpec,
    ) -> Result<Box<dyn AvailabilityAssigner>, ConfigLoadError> {
        let products = spec.products.as_ref().unwrap_or(&self.products);
        let salesperson = SimpleSalesperson::new(
            RecipientId(spec.id),
            spec.hours.build()?,
            spec.performance_weight,
            products.iter().copied().map(ProductId),
        )?;
        Ok(Box::new(salesperson))
    }

    pub fn build(
        &self,
        default_model: &WeatherModelKind,
    ) -> Result<SimpleLocaleGenerator, ConfigLoadError> {
        let open_window = OpenWindow::new(self.open_days.build()?, self.open_hours.build()?);
        let noise = self
            .daytime_noise
            .map(|n| DaytimeNoise::new(n.day_sigma, n.hour_sigma, n.smoothing_window))
            .transpose()?;
        let config = LocaleConfig::new(
            LocaleId(self.id),
            self.location.clone(),
            open_window,
            self.baseline_rate,
        )?
        .with_baseline_kind(self.baseline)
        .with_daytime(DaytimeProfile::new(self.daytime.peak_hour, self.daytime.spread)?)
        .with_weather_response(WeatherResponse::new(self.weather_exponent)?)
        .with_daytime_noise(noise);

        let model = self.weather_model.as_ref().unwrap_or(default_model).build()?;
        let recipients = self
            .recipients
            .iter()
            .map(|spec| self.build_recipient(spec))
            .collect::<Result<Vec<_>, _>>()?;

        debug!(locale_id = self.id, recipients = recipients.len(), "locale configured");
        Ok(SimpleLocaleGenerator::new(config, model, recipients))
    }
}

/// Whole-run topology.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TopologyConfig {
    #[serde(default)]
    pub weather_model: WeatherModelKind,
    pub locales: Vec<LocaleSpec>,
}

impl TopologyConfig {
    pub fn from_json(contents: &str) -> Result<Self, ConfigLoadError> {
        Ok(serde_json::from_str(contents)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigLoadError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&contents)
    }

    pub fn build_locales(&self) -> Result<Vec<Box<dyn LocaleGenerator>>, ConfigLoadError> {
        self.locales
            .iter()
            .map(|spec| {
                spec.build(&self.weather_model)
                    .map(|locale| Box::new(locale) as Box<dyn LocaleGenerator>)
            })
            .collect()
    }

    /// Validate the topology and wire it to `source`.
    pub fn build_orchestrator(
        &self,
        source: Box<dyn WeatherSource>,
        retry_policy: RetryPolicy,
        num_threads: Option<usize>,
    ) -> Result<GenerationOrchestrator, ConfigLoadError> {
        let orchestrator = GenerationOrchestrator::new(self.build_locales()?, source)?
            .with_retry_policy(retry_policy)
            .with_num_threads(num_threads);
        Ok(orchestrator)
    }
}
