use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};

use synth_core::calendar::TimeRange;
use synth_core::error::FetchError;
use synth_core::weather::{StaticWeatherSource, WeatherObservation, WeatherSource};

/// Delegates to a static source but always fails for the listed locations.
pub struct FailingLocations {
    pub inner: StaticWeatherSource,
    pub failing: HashSet<String>,
    pub calls: AtomicUsize,
}

impl FailingLocations {
    pub fn new(inner: StaticWeatherSource, failing: &[&str]) -> Self {
        Self {
            inner,
            failing: failing.iter().map(|s| s.to_string()).collect(),
            calls: AtomicUsize::new(0),
        }
    }
}

impl WeatherSource for FailingLocations {
    fn fetch(
        &self,
        location: &str,
        window: &TimeRange,
    ) -> Result<Vec<WeatherObservation>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(location) {
            return Err(FetchError::Request {
                location: location.to_string(),
                message: "service unavailable".into(),
            });
        }
        self.inner.fetch(location, window)
    }
}
