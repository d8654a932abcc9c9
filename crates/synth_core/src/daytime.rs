//! Time-of-day and weather effects on sale acceptance.
//!
//! An hourly draw keeps each baseline sale with probability
//! `weather_factor(index) * daytime_factor(hour)`; the rejection rate is one
//! minus that product.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Timelike, Utc};
use rand_distr::{Distribution, LogNormal};
use serde::{Deserialize, Serialize};

use crate::distributions::seeded_rng;
use crate::error::ConfigError;

/// Gaussian acceptance curve over the hour of day.
///
/// Hour distance is measured around the clock, so a peak at 23:00 treats
/// 01:00 as two hours away.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DaytimeProfile {
    pub peak_hour: f64,
    /// Standard deviation of the curve, in hours.
    pub spread: f64,
}

impl DaytimeProfile {
    pub fn new(peak_hour: f64, spread: f64) -> Result<Self, ConfigError> {
        if !peak_hour.is_finite() || !(0.0..24.0).contains(&peak_hour) {
            return Err(ConfigError::InvalidModelParameter {
                name: "peak_hour",
                value: peak_hour,
            });
        }
        if !spread.is_finite() || spread <= 0.0 {
            return Err(ConfigError::InvalidModelParameter {
                name: "spread",
                value: spread,
            });
        }
        Ok(Self { peak_hour, spread })
    }

    /// Acceptance factor in `(0, 1]` for an hour of day; exactly 1.0 at the peak.
    pub fn factor(&self, hour: u32) -> f64 {
        let raw = (f64::from(hour % 24) - self.peak_hour).abs();
        let distance = raw.min(24.0 - raw);
        (-(distance * distance) / (2.0 * self.spread * self.spread)).exp()
    }

    pub fn factor_at(&self, ts: DateTime<Utc>) -> f64 {
        self.factor(ts.hour())
    }
}

impl Default for DaytimeProfile {
    /// Mid-afternoon peak at 14:00 with a three hour spread.
    fn default() -> Self {
        Self {
            peak_hour: 14.0,
            spread: 3.0,
        }
    }
}

/// Maps a weather index to an acceptance factor: `index ^ exponent`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeatherResponse {
    pub exponent: f64,
}

impl WeatherResponse {
    pub fn new(exponent: f64) -> Result<Self, ConfigError> {
        if !exponent.is_finite() || exponent <= 0.0 {
            return Err(ConfigError::InvalidModelParameter {
                name: "weather_exponent",
                value: exponent,
            });
        }
        Ok(Self { exponent })
    }

    pub fn factor(&self, index: f64) -> f64 {
        if index.is_nan() {
            return 0.0;
        }
        index.clamp(0.0, 1.0).powf(self.exponent)
    }
}

impl Default for WeatherResponse {
    fn default() -> Self {
        Self { exponent: 1.0 }
    }
}

/// `1 - weather_factor * daytime_factor`, clamped to `[0, 1]`.
pub fn rejection_rate(weather_factor: f64, daytime_factor: f64) -> f64 {
    let rate = 1.0 - weather_factor * daytime_factor;
    if rate.is_nan() {
        return 1.0;
    }
    rate.clamp(0.0, 1.0)
}

/// Multiplicative day-to-day and hour-to-hour jitter on the daytime factor.
///
/// Each calendar day gets one log-normal amplitude and each hour a smaller
/// log-normal jitter. The product is smoothed with a centered rolling mean
/// and clamped to `[0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DaytimeNoise {
    pub day_sigma: f64,
    pub hour_sigma: f64,
    /// Width of the centered rolling mean, in samples.
    pub smoothing_window: usize,
}

impl DaytimeNoise {
    pub fn new(day_sigma: f64, hour_sigma: f64, smoothing_window: usize) -> Result<Self, ConfigError> {
        for (name, value) in [("day_sigma", day_sigma), ("hour_sigma", hour_sigma)] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidModelParameter { name, value });
            }
        }
        if smoothing_window == 0 {
            return Err(ConfigError::InvalidModelParameter {
                name: "smoothing_window",
                value: 0.0,
            });
        }
        Ok(Self {
            day_sigma,
            hour_sigma,
            smoothing_window,
        })
    }

    /// Perturb `factors` (one per timestamp, same order) using draws seeded
    /// from `seed`. Each day's and each hour's draw depends only on its own
    /// date or timestamp.
    pub fn apply(&self, seed: u64, timestamps: &[DateTime<Utc>], factors: &[f64]) -> Vec<f64> {
        let mut day_scale: BTreeMap<NaiveDate, f64> = BTreeMap::new();
        let noisy: Vec<f64> = timestamps
            .iter()
            .zip(factors)
            .map(|(ts, base)| {
                let day = ts.date_naive();
                let day_factor = *day_scale.entry(day).or_insert_with(|| {
                    let key = day.and_hms_opt(0, 0, 0).map_or(0, |d| d.and_utc().timestamp());
                    lognormal_draw(self.day_sigma, seed, "day-noise", key)
                });
                let hour_factor = lognormal_draw(self.hour_sigma, seed, "hour-noise", ts.timestamp());
                base * day_factor * hour_factor
            })
            .collect();

        centered_rolling_mean(&noisy, self.smoothing_window)
            .into_iter()
            .map(|v| v.clamp(0.0, 1.0))
            .collect()
    }
}

impl Default for DaytimeNoise {
    fn default() -> Self {
        Self {
            day_sigma: 0.15,
            hour_sigma: 0.05,
            smoothing_window: 3,
        }
    }
}

fn lognormal_draw(sigma: f64, seed: u64, label: &str, key: i64) -> f64 {
    if sigma == 0.0 {
        return 1.0;
    }
    match LogNormal::new(0.0, sigma) {
        Ok(dist) => dist.sample(&mut seeded_rng(seed, label, key)),
        Err(_) => 1.0,
    }
}

/// Mean over a window centered on each sample; edges use the samples that
/// exist.
fn centered_rolling_mean(values: &[f64], window: usize) -> Vec<f64> {
    let before = (window - 1) / 2;
    let after = window - 1 - before;
    (0..values.len())
        .map(|i| {
            let lo = i.saturating_sub(before);
            let hi = (i + after + 1).min(values.len());
            let slice = &values[lo..hi];
            slice.iter().sum::<f64>() / slice.len() as f64
        })
        .collect()
}
