//! Per-locale sales generation.
//!
//! For every open hour with a weather index, a locale draws a baseline count,
//! thins it by the weather and time-of-day rejection rate, and apportions the
//! accepted sales to the salespeople available at that hour.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::apportion::{apportion, check_conserved};
use crate::calendar::{OpenWindow, TimeRange};
use crate::daytime::{rejection_rate, DaytimeNoise, DaytimeProfile, WeatherResponse};
use crate::distributions::{seeded_rng, thin, BaselineDistribution, ExpectedBaseline, PoissonBaseline};
use crate::error::{ConfigError, InvariantViolation};
use crate::ids::{LocaleId, ProductId, RecipientId};
use crate::salesperson::AvailabilityAssigner;
use crate::weather::{WeatherIndex, WeatherIndexProvider};

/// How the hourly baseline count is drawn.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaselineKind {
    /// Poisson draw with mean `baseline_rate`.
    #[default]
    Poisson,
    /// Always the rounded-up rate, for noise-free runs.
    Expected,
}

impl BaselineKind {
    fn build(self, rate: f64) -> Box<dyn BaselineDistribution> {
        match self {
            BaselineKind::Poisson => Box::new(PoissonBaseline::new(rate)),
            BaselineKind::Expected => Box::new(ExpectedBaseline { rate }),
        }
    }
}

/// Static description of a locale.
#[derive(Clone, Debug, PartialEq)]
pub struct LocaleConfig {
    pub id: LocaleId,
    /// Name the weather provider knows this locale by.
    pub location: String,
    pub open_window: OpenWindow,
    pub baseline_rate: f64,
    pub baseline_kind: BaselineKind,
    pub daytime: DaytimeProfile,
    pub weather_response: WeatherResponse,
    pub daytime_noise: Option<DaytimeNoise>,
}

impl LocaleConfig {
    pub fn new(
        id: LocaleId,
        location: impl Into<String>,
        open_window: OpenWindow,
        baseline_rate: f64,
    ) -> Result<Self, ConfigError> {
        if !baseline_rate.is_finite() || baseline_rate <= 0.0 {
            return Err(ConfigError::NonPositiveBaselineRate {
                locale: id,
                rate: baseline_rate,
            });
        }
        Ok(Self {
            id,
            location: location.into(),
            open_window,
            baseline_rate,
            baseline_kind: BaselineKind::default(),
            daytime: DaytimeProfile::default(),
            weather_response: WeatherResponse::default(),
            daytime_noise: None,
        })
    }

    pub fn with_baseline_kind(mut self, kind: BaselineKind) -> Self {
        self.baseline_kind = kind;
        self
    }

    pub fn with_daytime(mut self, daytime: DaytimeProfile) -> Self {
        self.daytime = daytime;
        self
    }

    pub fn with_weather_response(mut self, response: WeatherResponse) -> Self {
        self.weather_response = response;
        self
    }

    pub fn with_daytime_noise(mut self, noise: Option<DaytimeNoise>) -> Self {
        self.daytime_noise = noise;
        self
    }
}

/// One locale-hour of the thinning process.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HourlyDraw {
    pub timestamp: DateTime<Utc>,
    pub locale_id: LocaleId,
    pub baseline_count: u64,
    pub rejection_rate: f64,
    pub accepted_count: u64,
    pub weather_index: f64,
    pub daytime_factor: f64,
    /// Accepted sales no recipient was available to take.
    pub unassigned_count: u64,
}

/// Sales of one product by one recipient in one hour.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub timestamp: DateTime<Utc>,
    pub locale_id: LocaleId,
    pub recipient_id: RecipientId,
    pub product_id: ProductId,
    pub quantity: u64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocaleStats {
    pub hours: usize,
    /// Open hours skipped because no weather index was available.
    pub hours_without_weather: usize,
    pub baseline_total: u64,
    pub accepted_total: u64,
    pub assigned_total: u64,
    pub unassigned_total: u64,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct LocaleOutput {
    pub draws: Vec<HourlyDraw>,
    pub assignments: Vec<Assignment>,
    pub stats: LocaleStats,
}

/// Generates sales for one locale.
pub trait LocaleGenerator: Send + Sync + std::fmt::Debug {
    fn locale_id(&self) -> LocaleId;

    fn location(&self) -> &str;

    fn weather_model(&self) -> &dyn WeatherIndexProvider;

    fn recipient_ids(&self) -> Vec<RecipientId>;

    /// Generate draws and assignments for `range`.
    ///
    /// `seed` is this locale's sub-seed. Only open hours that have a weather
    /// index produce output.
    fn generate(
        &self,
        range: &TimeRange,
        weather: &[WeatherIndex],
        seed: u64,
    ) -> Result<LocaleOutput, InvariantViolation>;
}

/// Poisson baseline thinned by a weather response and a Gaussian daytime
/// curve, split over recipients by performance weight.
#[derive(Debug)]
pub struct SimpleLocaleGenerator {
    config: LocaleConfig,
    weather_model: Box<dyn WeatherIndexProvider>,
    baseline: Box<dyn BaselineDistribution>,
    recipients: Vec<Box<dyn AvailabilityAssigner>>,
}

impl SimpleLocaleGenerator {
    pub fn new(
        config: LocaleConfig,
        weather_model: Box<dyn WeatherIndexProvider>,
        recipients: Vec<Box<dyn AvailabilityAssigner>>,
    ) -> Self {
        let baseline = config.baseline_kind.build(config.baseline_rate);
        Self {
            config,
            weather_model,
            baseline,
            recipients,
        }
    }

    pub fn config(&self) -> &LocaleConfig {
        &self.config
    }

    pub fn recipients(&self) -> &[Box<dyn AvailabilityAssigner>] {
        &self.recipients
    }

    fn daytime_factors(&self, timestamps: &[DateTime<Utc>], seed: u64) -> Vec<f64> {
        let base: Vec<f64> = timestamps
            .iter()
            .map(|ts| self.config.daytime.factor_at(*ts))
            .collect();
        match &self.config.daytime_noise {
            Some(noise) => noise.apply(seed, timestamps, &base),
            None => base,
        }
    }

    fn distribute(
        &self,
        ts: DateTime<Utc>,
        accepted: u64,
        out: &mut Vec<Assignment>,
    ) -> Result<u64, InvariantViolation> {
        let available: Vec<&dyn AvailabilityAssigner> = self
            .recipients
            .iter()
            .map(|r| r.as_ref())
            .filter(|r| r.is_available(ts))
            .collect();
        if available.is_empty() {
            if accepted > 0 {
                debug!(locale_id = %self.config.id, %ts, accepted, "no recipient available, sales dropped");
            }
            return Ok(0);
        }

        let weights: Vec<f64> = available.iter().map(|r| r.performance_weight()).collect();
        let shares = apportion(accepted, &weights)?;
        check_conserved("recipient split", accepted, &shares)?;

        for (recipient, share) in available.iter().zip(shares) {
            let split = recipient.split_over_products(share)?;
            let split_total: Vec<u64> = split.values().copied().collect();
            check_conserved("product split", share, &split_total)?;
            out.extend(split.into_iter().map(|(product_id, quantity)| Assignment {
                timestamp: ts,
                locale_id: self.config.id,
                recipient_id: recipient.id(),
                product_id,
                quantity,
            }));
        }
        Ok(accepted)
    }
}

impl LocaleGenerator for SimpleLocaleGenerator {
    fn locale_id(&self) -> LocaleId {
        self.config.id
    }

    fn location(&self) -> &str {
        &self.config.location
    }

    fn weather_model(&self) -> &dyn WeatherIndexProvider {
        self.weather_model.as_ref()
    }

    fn recipient_ids(&self) -> Vec<RecipientId> {
        self.recipients.iter().map(|r| r.id()).collect()
    }

    fn generate(
        &self,
        range: &TimeRange,
        weather: &[WeatherIndex],
        seed: u64,
    ) -> Result<LocaleOutput, InvariantViolation> {
        let index_by_hour: BTreeMap<DateTime<Utc>, f64> =
            weather.iter().map(|w| (w.timestamp, w.value)).collect();

        let mut stats = LocaleStats::default();
        let mut timestamps = Vec::new();
        let mut indices = Vec::new();
        for ts in self.config.open_window.prune(range) {
            match index_by_hour.get(&ts) {
                Some(value) => {
                    timestamps.push(ts);
                    indices.push(*value);
                }
                None => stats.hours_without_weather += 1,
            }
        }
        if stats.hours_without_weather > 0 {
            debug!(
                locale_id = %self.config.id,
                skipped = stats.hours_without_weather,
                "open hours without weather index skipped"
            );
        }

        let daytime = self.daytime_factors(&timestamps, seed);
        let mut draws = Vec::with_capacity(timestamps.len());
        let mut assignments = Vec::new();

        for ((ts, weather_index), daytime_factor) in timestamps.iter().zip(indices).zip(daytime) {
            let mut rng = seeded_rng(seed, "hour", ts.timestamp());
            let baseline_count = self.baseline.sample(&mut rng);
            let weather_factor = self.config.weather_response.factor(weather_index);
            let rate = rejection_rate(weather_factor, daytime_factor);
            let accepted_count = thin(&mut rng, baseline_count, 1.0 - rate);
            if accepted_count > baseline_count {
                return Err(InvariantViolation {
                    stage: "thinning",
                    expected: baseline_count,
                    actual: accepted_count,
                });
            }

            let assigned = self.distribute(*ts, accepted_count, &mut assignments)?;
            let unassigned_count = accepted_count - assigned;

            stats.hours += 1;
            stats.baseline_total += baseline_count;
            stats.accepted_total += accepted_count;
            stats.assigned_total += assigned;
            stats.unassigned_total += unassigned_count;

            draws.push(HourlyDraw {
                timestamp: *ts,
                locale_id: self.config.id,
                baseline_count,
                rejection_rate: rate,
                accepted_count,
                weather_index,
                daytime_factor,
                unassigned_count,
            });
        }

        info!(
            locale_id = %self.config.id,
            hours = stats.hours,
            accepted = stats.accepted_total,
            unassigned = stats.unassigned_total,
            "locale generated"
        );
        Ok(LocaleOutput {
            draws,
            assignments,
            stats,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::{HourWindow, OpenDays};
    use crate::salesperson::SimpleSalesperson;
    use crate::weather::SimpleWeatherModel;
    use chrono::{Duration, TimeZone};

    fn ts(day: u32, hour: u32) -> DateTime<Utc> {
        // 2025-09-01 is a Monday.
        Utc.with_ymd_and_hms(2025, 9, day, hour, 0, 0).unwrap()
    }

    fn flat_weather(range: &TimeRange, value: f64) -> Vec<WeatherIndex> {
        range
            .hours()
            .map(|timestamp| WeatherIndex { timestamp, value })
            .collect()
    }

    fn salesperson(id: u32, start: u8, end: u8, weight: f64) -> Box<dyn AvailabilityAssigner> {
        Box::new(
            SimpleSalesperson::new(
                RecipientId(id),
                HourWindow::new(start, end).unwrap(),
                weight,
                [ProductId(1), ProductId(2), ProductId(3)],
            )
            .unwrap(),
        )
    }

    fn generator(recipients: Vec<Box<dyn AvailabilityAssigner>>) -> SimpleLocaleGenerator {
        let config = LocaleConfig::new(
            LocaleId(1),
            "Helsinki",
            OpenWindow::new(OpenDays::all(), HourWindow::all_day()),
            50.0,
        )
        .unwrap();
        SimpleLocaleGenerator::new(config, Box::new(SimpleWeatherModel::default()), recipients)
    }

    #[test]
    fn rejects_non_positive_rate() {
        let err = LocaleConfig::new(LocaleId(3), "Oulu", OpenWindow::default(), 0.0).unwrap_err();
        assert_eq!(
            err,
            ConfigError::NonPositiveBaselineRate {
                locale: LocaleId(3),
                rate: 0.0
            }
        );
        assert!(LocaleConfig::new(LocaleId(3), "Oulu", OpenWindow::default(), -2.0).is_err());
    }

    #[test]
    fn ideal_peak_hour_accepts_everything() {
        let generator = generator(vec![salesperson(7, 0, 24, 1.0)]);
        let range = TimeRange::new(ts(1, 14), ts(1, 15)).unwrap();
        let output = generator
            .generate(&range, &flat_weather(&range, 1.0), 99)
            .unwrap();

        assert_eq!(output.draws.len(), 1);
        let draw = &output.draws[0];
        assert_eq!(draw.rejection_rate, 0.0);
        assert_eq!(draw.accepted_count, draw.baseline_count);
        let total: u64 = output.assignments.iter().map(|a| a.quantity).sum();
        assert_eq!(total, draw.accepted_count);
        assert_eq!(output.assignments.len(), 3);
    }

    #[test]
    fn unavailable_hours_drop_sales_but_keep_draw() {
        let generator = generator(vec![salesperson(7, 8, 16, 1.0)]);
        let range = TimeRange::new(ts(1, 20), ts(1, 21)).unwrap();
        let output = generator
            .generate(&range, &flat_weather(&range, 1.0), 5)
            .unwrap();

        assert!(output.assignments.is_empty());
        let draw = &output.draws[0];
        assert!(draw.accepted_count > 0);
        assert_eq!(draw.unassigned_count, draw.accepted_count);
        assert_eq!(output.stats.unassigned_total, draw.accepted_count);
    }

    #[test]
    fn hours_without_weather_are_skipped() {
        let generator = generator(vec![salesperson(7, 0, 24, 1.0)]);
        let range = TimeRange::new(ts(1, 0), ts(1, 6)).unwrap();
        let mut weather = flat_weather(&range, 0.8);
        weather.retain(|w| w.timestamp != ts(1, 3));
        let output = generator.generate(&range, &weather, 5).unwrap();
        assert_eq!(output.draws.len(), 5);
        assert_eq!(output.stats.hours_without_weather, 1);
        assert!(output.draws.iter().all(|d| d.timestamp != ts(1, 3)));
    }

    #[test]
    fn weights_split_accepted_sales_exactly() {
        let generator = generator(vec![salesperson(1, 0, 24, 1.0), salesperson(2, 0, 24, 3.0)]);
        let range = TimeRange::new(ts(1, 0), ts(3, 0)).unwrap();
        let output = generator
            .generate(&range, &flat_weather(&range, 0.7), 17)
            .unwrap();

        for draw in &output.draws {
            let at_hour: u64 = output
                .assignments
                .iter()
                .filter(|a| a.timestamp == draw.timestamp)
                .map(|a| a.quantity)
                .sum();
            assert_eq!(at_hour, draw.accepted_count);
            assert!(draw.accepted_count <= draw.baseline_count);
        }
        let heavy: u64 = output
            .assignments
            .iter()
            .filter(|a| a.recipient_id == RecipientId(2))
            .map(|a| a.quantity)
            .sum();
        assert!(heavy * 2 > output.stats.assigned_total);
    }

    #[test]
    fn same_seed_same_output() {
        let generator = generator(vec![salesperson(1, 6, 22, 1.0)]);
        let range = TimeRange::new(ts(1, 0), ts(1, 0) + Duration::hours(48)).unwrap();
        let weather = flat_weather(&range, 0.6);
        let a = generator.generate(&range, &weather, 1234).unwrap();
        let b = generator.generate(&range, &weather, 1234).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn expected_baseline_is_noise_free() {
        let config = LocaleConfig::new(
            LocaleId(1),
            "Helsinki",
            OpenWindow::new(OpenDays::all(), HourWindow::all_day()),
            12.0,
        )
        .unwrap()
        .with_baseline_kind(BaselineKind::Expected);
        let generator = SimpleLocaleGenerator::new(
            config,
            Box::new(SimpleWeatherModel::default()),
            vec![salesperson(1, 0, 24, 1.0)],
        );
        let range = TimeRange::new(ts(1, 14), ts(1, 15)).unwrap();
        let output = generator
            .generate(&range, &flat_weather(&range, 1.0), 1)
            .unwrap();
        assert_eq!(output.draws[0].baseline_count, 12);
        assert_eq!(output.draws[0].accepted_count, 12);
    }
}
