//! Run-level coordination: weather retrieval, per-locale generation and the
//! merged dataset.
//!
//! Locales are processed in parallel on a rayon pool. Each locale works from
//! its own sub-seed, so adding or removing a locale never changes another
//! locale's output. Fetch failures are reported per locale; invariant
//! violations abort the run.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::calendar::TimeRange;
use crate::distributions::derive_seed;
use crate::error::{ConfigError, FetchError, InvariantViolation, SynthError};
use crate::ids::{LocaleId, ProductId, RecipientId};
use crate::locale::{HourlyDraw, LocaleGenerator, LocaleStats};
use crate::weather::{fetch_observations, RetryPolicy, WeatherObservation, WeatherSource};

/// One row of the unified sales dataset.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SalesRecord {
    pub timestamp: DateTime<Utc>,
    pub locale_id: LocaleId,
    pub recipient_id: RecipientId,
    pub product_id: ProductId,
    pub quantity: u64,
    pub weather_index: f64,
}

/// Weather used for one locale-hour.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeatherRecord {
    pub timestamp: DateTime<Utc>,
    pub locale_id: LocaleId,
    pub temperature: f64,
    pub rainfall: f64,
    pub weather_index: f64,
}

/// Merged output of every locale that completed.
///
/// Sales are ordered by `(timestamp, locale_id, recipient_id, product_id)`,
/// draws and weather by `(timestamp, locale_id)`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UnifiedDataset {
    pub sales: Vec<SalesRecord>,
    pub draws: Vec<HourlyDraw>,
    pub weather: Vec<WeatherRecord>,
}

impl UnifiedDataset {
    pub fn total_quantity(&self) -> u64 {
        self.sales.iter().map(|r| r.quantity).sum()
    }

    fn sort(&mut self) {
        self.sales.sort_by_key(|r| (r.timestamp, r.locale_id, r.recipient_id, r.product_id));
        self.draws.sort_by_key(|d| (d.timestamp, d.locale_id));
        self.weather.sort_by_key(|w| (w.timestamp, w.locale_id));
    }
}

/// A locale whose weather could not be fetched.
#[derive(Clone, Debug, PartialEq)]
pub struct LocaleFailure {
    pub locale_id: LocaleId,
    pub location: String,
    pub error: FetchError,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RunReport {
    pub seed: u64,
    pub range: TimeRange,
    pub dataset: UnifiedDataset,
    pub locale_stats: BTreeMap<LocaleId, LocaleStats>,
    pub failures: Vec<LocaleFailure>,
}

impl RunReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

struct LocaleRun {
    locale_id: LocaleId,
    stats: LocaleStats,
    sales: Vec<SalesRecord>,
    draws: Vec<HourlyDraw>,
    weather: Vec<WeatherRecord>,
}

/// Owns the locales of a run and the weather source they share.
pub struct GenerationOrchestrator {
    locales: Vec<Box<dyn LocaleGenerator>>,
    weather_source: Box<dyn WeatherSource>,
    retry_policy: RetryPolicy,
    num_threads: Option<usize>,
}

impl std::fmt::Debug for GenerationOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationOrchestrator")
            .field("locales", &self.locales)
            .field("retry_policy", &self.retry_policy)
            .field("num_threads", &self.num_threads)
            .finish_non_exhaustive()
    }
}

impl GenerationOrchestrator {
    /// Fails if a locale id repeats or a recipient belongs to more than one
    /// locale.
    pub fn new(
        locales: Vec<Box<dyn LocaleGenerator>>,
        weather_source: Box<dyn WeatherSource>,
    ) -> Result<Self, ConfigError> {
        let mut locale_ids = HashSet::new();
        let mut recipient_ids = HashSet::new();
        for locale in &locales {
            if !locale_ids.insert(locale.locale_id()) {
                return Err(ConfigError::DuplicateLocale(locale.locale_id()));
            }
            for recipient in locale.recipient_ids() {
                if !recipient_ids.insert(recipient) {
                    return Err(ConfigError::DuplicateRecipient {
                        recipient,
                        locale: locale.locale_id(),
                    });
                }
            }
        }
        Ok(Self {
            locales,
            weather_source,
            retry_policy: RetryPolicy::default(),
            num_threads: None,
        })
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    pub fn with_num_threads(mut self, num_threads: Option<usize>) -> Self {
        self.num_threads = num_threads;
        self
    }

    pub fn locales(&self) -> &[Box<dyn LocaleGenerator>] {
        &self.locales
    }

    /// Generate every locale over `range` under `seed`.
    ///
    /// Called from inside a rayon pool, locales share that pool and the
    /// configured thread count is ignored.
    pub fn run(&self, range: &TimeRange, seed: u64) -> Result<RunReport, SynthError> {
        info!(
            locales = self.locales.len(),
            seed,
            start = %range.start(),
            end = %range.end(),
            "starting generation run"
        );

        let generate_all = || -> Vec<Result<Result<LocaleRun, LocaleFailure>, InvariantViolation>> {
            self.locales
                .par_iter()
                .map(|locale| self.run_locale(locale.as_ref(), range, seed))
                .collect()
        };
        let results = if rayon::current_thread_index().is_some() {
            generate_all()
        } else {
            let mut builder = rayon::ThreadPoolBuilder::new();
            if let Some(threads) = self.num_threads {
                builder = builder.num_threads(threads);
            }
            builder.build()?.install(generate_all)
        };

        let mut dataset = UnifiedDataset::default();
        let mut locale_stats = BTreeMap::new();
        let mut failures = Vec::new();
        for result in results {
            match result? {
                Ok(run) => {
                    locale_stats.insert(run.locale_id, run.stats);
                    dataset.sales.extend(run.sales);
                    dataset.draws.extend(run.draws);
                    dataset.weather.extend(run.weather);
                }
                Err(failure) => failures.push(failure),
            }
        }
        dataset.sort();

        info!(
            records = dataset.sales.len(),
            quantity = dataset.total_quantity(),
            failed_locales = failures.len(),
            "generation run finished"
        );
        Ok(RunReport {
            seed,
            range: *range,
            dataset,
            locale_stats,
            failures,
        })
    }

    fn run_locale(
        &self,
        locale: &dyn LocaleGenerator,
        range: &TimeRange,
        seed: u64,
    ) -> Result<Result<LocaleRun, LocaleFailure>, InvariantViolation> {
        let locale_id = locale.locale_id();
        let observations = match fetch_observations(
            self.weather_source.as_ref(),
            locale.location(),
            range,
            &self.retry_policy,
        ) {
            Ok(observations) => observations,
            Err(error) => {
                warn!(locale_id = %locale_id, location = locale.location(), %error, "weather fetch failed, locale skipped");
                return Ok(Err(LocaleFailure {
                    locale_id,
                    location: locale.location().to_string(),
                    error,
                }));
            }
        };

        let indices = locale.weather_model().compute_index(&observations);
        let locale_seed = derive_seed(seed, "locale", i64::from(locale_id.0));
        let output = locale.generate(range, &indices, locale_seed)?;

        let index_by_hour: HashMap<DateTime<Utc>, f64> =
            output.draws.iter().map(|d| (d.timestamp, d.weather_index)).collect();
        let sales = output
            .assignments
            .into_iter()
            .map(|a| SalesRecord {
                weather_index: index_by_hour.get(&a.timestamp).copied().unwrap_or_default(),
                timestamp: a.timestamp,
                locale_id: a.locale_id,
                recipient_id: a.recipient_id,
                product_id: a.product_id,
                quantity: a.quantity,
            })
            .collect();

        Ok(Ok(LocaleRun {
            locale_id,
            stats: output.stats,
            sales,
            draws: output.draws,
            weather: weather_records(locale_id, range, &observations, &indices),
        }))
    }
}

fn weather_records(
    locale_id: LocaleId,
    range: &TimeRange,
    observations: &[WeatherObservation],
    indices: &[crate::weather::WeatherIndex],
) -> Vec<WeatherRecord> {
    let mut readings: HashMap<DateTime<Utc>, (f64, f64)> = HashMap::new();
    for obs in observations {
        if let (Some(t), Some(r)) = (obs.temperature, obs.rainfall) {
            if obs.is_complete() {
                readings.entry(obs.timestamp).or_insert((t, r));
            }
        }
    }
    indices
        .iter()
        .filter(|idx| range.contains(idx.timestamp))
        .filter_map(|idx| {
            readings.get(&idx.timestamp).map(|(temperature, rainfall)| WeatherRecord {
                timestamp: idx.timestamp,
                locale_id,
                temperature: *temperature,
                rainfall: *rainfall,
                weather_index: idx.value,
            })
        })
        .collect()
}
