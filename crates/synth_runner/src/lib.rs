//! Loading, running and exporting synthetic sales datasets.
//!
//! This crate wraps `synth_core` with the pieces a batch job needs: a JSON
//! topology format, a CSV-backed weather source, replicate runs over many
//! seeds and writers for Parquet, CSV and JSON.
//!
//! # Quick Start
//!
//! ```no_run
//! use synth_core::calendar::TimeRange;
//! use synth_core::weather::RetryPolicy;
//! use synth_runner::{export_dataset, parse_timestamp, CsvWeatherSource, ExportFormat, TopologyConfig};
//!
//! let topology = TopologyConfig::from_path("topology.json").unwrap();
//! let weather = CsvWeatherSource::from_path("weather.csv").unwrap();
//! let orchestrator = topology
//!     .build_orchestrator(Box::new(weather), RetryPolicy::default(), None)
//!     .unwrap();
//!
//! let range = TimeRange::new(
//!     parse_timestamp("2025-09-01").unwrap(),
//!     parse_timestamp("2025-09-08").unwrap(),
//! )
//! .unwrap();
//! let report = orchestrator.run(&range, 42).unwrap();
//! export_dataset(&report.dataset, "out", ExportFormat::Parquet).unwrap();
//! ```
//!
//! # Modules
//!
//! - [`config`]: topology files
//! - [`weather_csv`]: weather observations from CSV
//! - [`runner`]: replicate runs using rayon
//! - [`metrics`]: per-run summaries
//! - [`topology`]: topology as dimension tables
//! - [`export`]: dataset and topology export

pub mod config;
pub mod error;
pub mod export;
pub mod metrics;
pub mod runner;
pub mod topology;
pub mod weather_csv;

pub use config::{parse_timestamp, TopologyConfig};
pub use error::{ConfigLoadError, ExportError};
pub use export::{
    export_dataset, export_draws, export_sales, export_summaries, export_topology, export_weather,
    ExportFormat,
};
pub use metrics::{mean_sales_by_hour, RunSummary};
pub use runner::{run_once, run_replicates, sequential_seeds};
pub use topology::TopologyTables;
pub use weather_csv::CsvWeatherSource;
