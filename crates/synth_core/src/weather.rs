//! Weather pleasantness model.
//!
//! Hourly observations are reduced to a bounded index in `[0, 1]`, where 1.0 is
//! ideal weather for shopping. Models are pluggable through
//! [`WeatherIndexProvider`]; [`WeatherModelKind`] is the serializable
//! descriptor used by configuration.

pub mod source;

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::ConfigError;

pub use source::{
    fetch_observations, RetryPolicy, RetryingWeatherSource, StaticWeatherSource, WeatherSource,
};

/// Raw hourly observation. Missing values are `None`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeatherObservation {
    pub timestamp: DateTime<Utc>,
    /// Mean air temperature, °C.
    pub temperature: Option<f64>,
    /// Accumulated rainfall over the hour, mm.
    pub rainfall: Option<f64>,
}

impl WeatherObservation {
    pub fn new(timestamp: DateTime<Utc>, temperature: f64, rainfall: f64) -> Self {
        Self {
            timestamp,
            temperature: Some(temperature),
            rainfall: Some(rainfall),
        }
    }

    /// Both values present and finite.
    pub fn is_complete(&self) -> bool {
        self.values().is_some()
    }

    fn values(&self) -> Option<(f64, f64)> {
        match (self.temperature, self.rainfall) {
            (Some(t), Some(r)) if t.is_finite() && r.is_finite() => Some((t, r)),
            _ => None,
        }
    }
}

/// Weather pleasantness at one hour, in `[0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeatherIndex {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

/// Turns observations into a pleasantness index.
///
/// Implementations must be pure: identical input yields identical output.
/// Incomplete observations are dropped, never coerced.
pub trait WeatherIndexProvider: Send + Sync + std::fmt::Debug {
    fn compute_index(&self, observations: &[WeatherObservation]) -> Vec<WeatherIndex>;
}

/// Linear penalties for temperature deviation and excess rainfall.
///
/// `index = 1 - 0.5 * |T - ideal| / temperature_span
///            - 0.5 * max(0, rain - tolerance) / rainfall_span`, clamped to `[0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimpleWeatherModel {
    pub ideal_temperature: f64,
    pub rainfall_tolerance: f64,
    /// Temperature deviation (°C) that costs half the index.
    pub temperature_span: f64,
    /// Rainfall above tolerance (mm) that costs half the index.
    pub rainfall_span: f64,
}

impl SimpleWeatherModel {
    pub fn new(
        ideal_temperature: f64,
        rainfall_tolerance: f64,
        temperature_span: f64,
        rainfall_span: f64,
    ) -> Result<Self, ConfigError> {
        if !ideal_temperature.is_finite() {
            return Err(ConfigError::InvalidModelParameter {
                name: "ideal_temperature",
                value: ideal_temperature,
            });
        }
        if !rainfall_tolerance.is_finite() || rainfall_tolerance < 0.0 {
            return Err(ConfigError::InvalidModelParameter {
                name: "rainfall_tolerance",
                value: rainfall_tolerance,
            });
        }
        if !temperature_span.is_finite() || temperature_span <= 0.0 {
            return Err(ConfigError::InvalidModelParameter {
                name: "temperature_span",
                value: temperature_span,
            });
        }
        if !rainfall_span.is_finite() || rainfall_span <= 0.0 {
            return Err(ConfigError::InvalidModelParameter {
                name: "rainfall_span",
                value: rainfall_span,
            });
        }
        Ok(Self {
            ideal_temperature,
            rainfall_tolerance,
            temperature_span,
            rainfall_span,
        })
    }

    /// Index for one pair of readings.
    pub fn index_value(&self, temperature: f64, rainfall: f64) -> f64 {
        let temperature_penalty =
            0.5 * (temperature - self.ideal_temperature).abs() / self.temperature_span;
        let rain_excess = (rainfall - self.rainfall_tolerance).max(0.0);
        let rain_penalty = 0.5 * rain_excess / self.rainfall_span;
        (1.0 - temperature_penalty - rain_penalty).clamp(0.0, 1.0)
    }
}

impl Default for SimpleWeatherModel {
    fn default() -> Self {
        Self {
            ideal_temperature: 21.0,
            rainfall_tolerance: 0.5,
            temperature_span: 15.0,
            rainfall_span: 0.5,
        }
    }
}

impl WeatherIndexProvider for SimpleWeatherModel {
    fn compute_index(&self, observations: &[WeatherObservation]) -> Vec<WeatherIndex> {
        let mut seen = BTreeSet::new();
        let mut dropped = 0usize;
        let mut indices = Vec::with_capacity(observations.len());

        for obs in observations {
            let Some((temperature, rainfall)) = obs.values() else {
                dropped += 1;
                continue;
            };
            // First complete reading wins for duplicated hours.
            if !seen.insert(obs.timestamp) {
                continue;
            }
            indices.push(WeatherIndex {
                timestamp: obs.timestamp,
                value: self.index_value(temperature, rainfall),
            });
        }

        if dropped > 0 {
            warn!(dropped, total = observations.len(), "dropped incomplete weather observations");
        }
        indices.sort_by_key(|idx| idx.timestamp);
        indices
    }
}

/// Index observations with the default spans of [`SimpleWeatherModel`].
pub fn compute_index(
    observations: &[WeatherObservation],
    ideal_temperature: f64,
    rainfall_tolerance: f64,
) -> Result<Vec<WeatherIndex>, ConfigError> {
    let defaults = SimpleWeatherModel::default();
    let model = SimpleWeatherModel::new(
        ideal_temperature,
        rainfall_tolerance,
        defaults.temperature_span,
        defaults.rainfall_span,
    )?;
    Ok(model.compute_index(observations))
}

/// Serializable weather model selection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WeatherModelKind {
    Simple {
        #[serde(default = "default_ideal_temperature")]
        ideal_temperature: f64,
        #[serde(default = "default_rainfall_tolerance")]
        rainfall_tolerance: f64,
        #[serde(default = "default_temperature_span")]
        temperature_span: f64,
        #[serde(default = "default_rainfall_span")]
        rainfall_span: f64,
    },
}

fn default_ideal_temperature() -> f64 {
    SimpleWeatherModel::default().ideal_temperature
}

fn default_rainfall_tolerance() -> f64 {
    SimpleWeatherModel::default().rainfall_tolerance
}

fn default_temperature_span() -> f64 {
    SimpleWeatherModel::default().temperature_span
}

fn default_rainfall_span() -> f64 {
    SimpleWeatherModel::default().rainfall_span
}

impl Default for WeatherModelKind {
    fn default() -> Self {
        let model = SimpleWeatherModel::default();
        WeatherModelKind::Simple {
            ideal_temperature: model.ideal_temperature,
            rainfall_tolerance: model.rainfall_tolerance,
            temperature_span: model.temperature_span,
            rainfall_span: model.rainfall_span,
        }
    }
}

impl WeatherModelKind {
    pub fn build(&self) -> Result<Box<dyn WeatherIndexProvider>, ConfigError> {
        match self {
            WeatherModelKind::Simple {
                ideal_temperature,
                rainfall_tolerance,
                temperature_span,
                rainfall_span,
            } => Ok(Box::new(SimpleWeatherModel::new(
                *ideal_temperature,
                *rainfall_tolerance,
                *temperature_span,
                *rainfall_span,
            )?)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn ts(hour: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 9, 1, 0, 0, 0).unwrap() + Duration::hours(hour)
    }

    #[test]
    fn ideal_weather_scores_exactly_one() {
        let model = SimpleWeatherModel::default();
        assert_eq!(model.index_value(21.0, 0.0), 1.0);
        assert_eq!(model.index_value(21.0, 0.5), 1.0);
        assert!(model.index_value(21.0, 0.6) < 1.0);
        assert!(model.index_value(21.5, 0.0) < 1.0);
    }

    #[test]
    fn index_decreases_away_from_ideal() {
        let model = SimpleWeatherModel::default();
        let warm = model.index_value(24.0, 0.0);
        let hot = model.index_value(28.0, 0.0);
        let cold = model.index_value(14.0, 0.0);
        assert!(hot < warm);
        assert!(cold < warm);

        let drizzle = model.index_value(21.0, 0.7);
        let downpour = model.index_value(21.0, 0.9);
        assert!(downpour < drizzle);
    }

    #[test]
    fn index_is_clamped() {
        let model = SimpleWeatherModel::default();
        assert_eq!(model.index_value(-30.0, 20.0), 0.0);
        let v = model.index_value(35.0, 1.0);
        assert!((0.0..=1.0).contains(&v));
    }

    #[test]
    fn incomplete_rows_are_dropped_not_coerced() {
        let observations = vec![
            WeatherObservation::new(ts(0), 21.0, 0.0),
            WeatherObservation {
                timestamp: ts(1),
                temperature: None,
                rainfall: Some(0.0),
            },
            WeatherObservation {
                timestamp: ts(2),
                temperature: Some(f64::NAN),
                rainfall: Some(0.0),
            },
            WeatherObservation {
                timestamp: ts(3),
                temperature: Some(18.0),
                rainfall: None,
            },
        ];
        let indices = SimpleWeatherModel::default().compute_index(&observations);
        assert_eq!(indices.len(), 1);
        assert_eq!(indices[0].timestamp, ts(0));
    }

    #[test]
    fn output_is_sorted_and_deduplicated() {
        let observations = vec![
            WeatherObservation::new(ts(2), 10.0, 0.0),
            WeatherObservation::new(ts(1), 21.0, 0.0),
            WeatherObservation::new(ts(2), 21.0, 0.0),
        ];
        let indices = SimpleWeatherModel::default().compute_index(&observations);
        assert_eq!(indices.len(), 2);
        assert_eq!(indices[0].timestamp, ts(1));
        assert_eq!(indices[1].timestamp, ts(2));
        assert!(indices[1].value < 1.0);
    }

    #[test]
    fn compute_index_is_pure() {
        let observations: Vec<_> = (0..24)
            .map(|h| WeatherObservation::new(ts(h), 10.0 + h as f64, (h % 5) as f64 * 0.3))
            .collect();
        let a = compute_index(&observations, 20.0, 0.2).unwrap();
        let b = compute_index(&observations, 20.0, 0.2).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn invalid_parameters_are_rejected() {
        assert!(SimpleWeatherModel::new(21.0, -0.1, 15.0, 0.5).is_err());
        assert!(SimpleWeatherModel::new(21.0, 0.5, 0.0, 0.5).is_err());
        assert!(SimpleWeatherModel::new(f64::NAN, 0.5, 15.0, 0.5).is_err());
        assert!(compute_index(&[], 21.0, f64::INFINITY).is_err());
    }

    #[test]
    fn default_kind_builds() {
        let provider = WeatherModelKind::default().build().unwrap();
        let indices = provider.compute_index(&[WeatherObservation::new(ts(0), 21.0, 0.0)]);
        assert_eq!(indices[0].value, 1.0);
    }
}
