//! Boundary to the external weather provider.
//!
//! The provider only answers windows up to a fixed span, so longer requests are
//! split. Failed requests are retried with exponential backoff; a location that
//! still fails surfaces a [`FetchError`] for that locale only.

use std::collections::HashMap;
use std::thread;
use std::time::Duration;

use tracing::{debug, warn};

use crate::calendar::{TimeRange, MAX_WEATHER_WINDOW_HOURS};
use crate::error::FetchError;

use super::WeatherObservation;

/// A provider of raw hourly weather observations.
pub trait WeatherSource: Send + Sync {
    /// Observations for `location` inside `window`. Implementations may assume
    /// the window does not exceed [`WeatherSource::max_window_hours`].
    fn fetch(
        &self,
        location: &str,
        window: &TimeRange,
    ) -> Result<Vec<WeatherObservation>, FetchError>;

    /// Longest window a single `fetch` call accepts.
    fn max_window_hours(&self) -> u32 {
        MAX_WEATHER_WINDOW_HOURS
    }
}

/// Retry schedule for weather requests.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts per request, including the first one.
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub multiplier: f64,
}

impl RetryPolicy {
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Backoff to wait after the given failed attempt (1-based).
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.max(1.0).powi(attempt.saturating_sub(1) as i32);
        self.initial_backoff.mul_f64(factor).min(self.max_backoff)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(10),
            multiplier: 2.0,
        }
    }
}

fn fetch_with_retry<S: WeatherSource + ?Sized>(
    source: &S,
    location: &str,
    window: &TimeRange,
    policy: &RetryPolicy,
) -> Result<Vec<WeatherObservation>, FetchError> {
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match source.fetch(location, window) {
            Ok(observations) => return Ok(observations),
            Err(error) if !error.is_retryable() => return Err(error),
            Err(error) if attempt >= max_attempts => {
                return Err(FetchError::Exhausted {
                    location: location.to_string(),
                    attempts: attempt,
                    last_message: error.to_string(),
                });
            }
            Err(error) => {
                let backoff = policy.backoff_for(attempt);
                warn!(
                    location,
                    attempt,
                    backoff_ms = backoff.as_millis() as u64,
                    %error,
                    "weather request failed, retrying"
                );
                if !backoff.is_zero() {
                    thread::sleep(backoff);
                }
                attempt += 1;
            }
        }
    }
}

/// Fetch every observation for `location` in `range`, splitting the range into
/// windows the provider accepts and retrying each window per `policy`.
pub fn fetch_observations<S: WeatherSource + ?Sized>(
    source: &S,
    location: &str,
    range: &TimeRange,
    policy: &RetryPolicy,
) -> Result<Vec<WeatherObservation>, FetchError> {
    let windows = range.split(source.max_window_hours());
    debug!(location, windows = windows.len(), "fetching weather observations");

    let mut observations = Vec::new();
    for window in &windows {
        let batch = fetch_with_retry(source, location, window, policy)?;
        observations.extend(batch.into_iter().filter(|obs| window.contains(obs.timestamp)));
    }
    Ok(observations)
}

/// Wraps a source so every `fetch` goes through splitting and retry.
pub struct RetryingWeatherSource<S> {
    inner: S,
    policy: RetryPolicy,
}

impl<S: WeatherSource> RetryingWeatherSource<S> {
    pub fn new(inner: S, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: WeatherSource> WeatherSource for RetryingWeatherSource<S> {
    fn fetch(
        &self,
        location: &str,
        window: &TimeRange,
    ) -> Result<Vec<WeatherObservation>, FetchError> {
        fetch_observations(&self.inner, location, window, &self.policy)
    }

    fn max_window_hours(&self) -> u32 {
        self.inner.max_window_hours()
    }
}

/// In-memory observations keyed by location name.
#[derive(Clone, Debug, Default)]
pub struct StaticWeatherSource {
    observations: HashMap<String, Vec<WeatherObservation>>,
}

impl StaticWeatherSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_location(
        mut self,
        location: impl Into<String>,
        observations: Vec<WeatherObservation>,
    ) -> Self {
        self.insert(location, observations);
        self
    }

    pub fn insert(&mut self, location: impl Into<String>, observations: Vec<WeatherObservation>) {
        self.observations
            .entry(location.into())
            .or_default()
            .extend(observations);
    }
}

impl WeatherSource for StaticWeatherSource {
    fn fetch(
        &self,
        location: &str,
        window: &TimeRange,
    ) -> Result<Vec<WeatherObservation>, FetchError> {
        let observations =
            self.observations
                .get(location)
                .ok_or_else(|| FetchError::UnknownLocation {
                    location: location.to_string(),
                })?;
        Ok(observations
            .iter()
            .filter(|obs| window.contains(obs.timestamp))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    fn ts(hour: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 9, 1, 0, 0, 0).unwrap() + ChronoDuration::hours(hour)
    }

    fn instant_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
            multiplier: 2.0,
        }
    }

    /// Fails the first `failures` calls, then serves hourly observations.
    struct FlakySource {
        failures: u32,
        calls: AtomicU32,
        windows: Mutex<Vec<TimeRange>>,
        max_hours: u32,
    }

    impl FlakySource {
        fn new(failures: u32, max_hours: u32) -> Self {
            Self {
                failures,
                calls: AtomicU32::new(0),
                windows: Mutex::new(Vec::new()),
                max_hours,
            }
        }
    }

    impl WeatherSource for FlakySource {
        fn fetch(
            &self,
            location: &str,
            window: &TimeRange,
        ) -> Result<Vec<WeatherObservation>, FetchError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                return Err(FetchError::Request {
                    location: location.to_string(),
                    message: "503".into(),
                });
            }
            self.windows.lock().unwrap().push(*window);
            Ok(window
                .hours()
                .map(|t| WeatherObservation::new(t, 20.0, 0.0))
                .collect())
        }

        fn max_window_hours(&self) -> u32 {
            self.max_hours
        }
    }

    #[test]
    fn backoff_grows_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 5,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_millis(300),
            multiplier: 2.0,
        };
        assert_eq!(policy.backoff_for(1), Duration::from_millis(100));
        assert_eq!(policy.backoff_for(2), Duration::from_millis(200));
        assert_eq!(policy.backoff_for(3), Duration::from_millis(300));
        assert_eq!(policy.backoff_for(4), Duration::from_millis(300));
    }

    #[test]
    fn transient_failures_are_retried() {
        let source = FlakySource::new(2, 440);
        let range = TimeRange::new(ts(0), ts(5)).unwrap();
        let obs = fetch_observations(&source, "Helsinki", &range, &instant_policy(3)).unwrap();
        assert_eq!(obs.len(), 5);
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn exhausted_retries_surface_error() {
        let source = FlakySource::new(10, 440);
        let range = TimeRange::new(ts(0), ts(5)).unwrap();
        let err = fetch_observations(&source, "Helsinki", &range, &instant_policy(3)).unwrap_err();
        assert_eq!(
            err,
            FetchError::Exhausted {
                location: "Helsinki".into(),
                attempts: 3,
                last_message: "weather request for `Helsinki` failed: 503".into(),
            }
        );
    }

    #[test]
    fn long_ranges_are_split_into_provider_windows() {
        let source = FlakySource::new(0, 24);
        let range = TimeRange::new(ts(0), ts(60)).unwrap();
        let obs = fetch_observations(&source, "Oulu", &range, &instant_policy(1)).unwrap();
        assert_eq!(obs.len(), 60);
        let windows = source.windows.lock().unwrap();
        assert_eq!(windows.len(), 3);
        assert!(windows
            .iter()
            .all(|w| w.end() - w.start() <= ChronoDuration::hours(24)));
    }

    #[test]
    fn retrying_wrapper_keeps_inner_window() {
        let wrapped = RetryingWeatherSource::new(FlakySource::new(1, 24), instant_policy(2));
        assert_eq!(wrapped.max_window_hours(), 24);

        let range = TimeRange::new(ts(0), ts(30)).unwrap();
        let obs = fetch_observations(&wrapped, "Oulu", &range, &RetryPolicy::no_retry()).unwrap();
        assert_eq!(obs.len(), 30);
        assert_eq!(wrapped.inner().calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn unknown_location_is_not_retried() {
        let source = StaticWeatherSource::new();
        let range = TimeRange::new(ts(0), ts(5)).unwrap();
        let err = fetch_observations(&source, "Nowhere", &range, &instant_policy(5)).unwrap_err();
        assert!(matches!(err, FetchError::UnknownLocation { .. }));
    }

    #[test]
    fn static_source_filters_by_window() {
        let source = StaticWeatherSource::new().with_location(
            "Turku",
            (0..10).map(|h| WeatherObservation::new(ts(h), 15.0, 0.0)).collect(),
        );
        let range = TimeRange::new(ts(2), ts(4)).unwrap();
        let obs = source.fetch("Turku", &range).unwrap();
        assert_eq!(obs.len(), 2);
        assert_eq!(obs[0].timestamp, ts(2));
    }
}
