//! Weather observations from a CSV file.
//!
//! Columns: `location,timestamp,temperature,rainfall`. Timestamps are RFC 3339;
//! an empty temperature or rainfall cell is a missing reading.

use std::io::Read;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::info;

use synth_core::calendar::TimeRange;
use synth_core::error::FetchError;
use synth_core::weather::{StaticWeatherSource, WeatherObservation, WeatherSource};

use crate::error::ConfigLoadError;

#[derive(Debug, Deserialize)]
struct WeatherRow {
    location: String,
    timestamp: DateTime<Utc>,
    temperature: Option<f64>,
    rainfall: Option<f64>,
}

/// In-memory weather loaded from CSV, served like a remote provider.
#[derive(Clone, Debug, Default)]
pub struct CsvWeatherSource {
    inner: StaticWeatherSource,
    rows: usize,
}

impl CsvWeatherSource {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigLoadError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|source| ConfigLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let source = Self::from_reader(file)?;
        info!(path = %path.display(), rows = source.rows, "loaded weather observations");
        Ok(source)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, ConfigLoadError> {
        let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let mut source = Self::default();
        for row in csv_reader.deserialize() {
            let row: WeatherRow = row?;
            source.inner.insert(
                row.location,
                vec![WeatherObservation {
                    timestamp: row.timestamp,
                    temperature: row.temperature,
                    rainfall: row.rainfall,
                }],
            );
            source.rows += 1;
        }
        Ok(source)
    }

    pub fn len(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }
}

impl WeatherSource for CsvWeatherSource {
    fn fetch(
        &self,
        location: &str,
        window: &TimeRange,
    ) -> Result<Vec<WeatherObservation>, FetchError> {
        self.inner.fetch(location, window)
    }
}
