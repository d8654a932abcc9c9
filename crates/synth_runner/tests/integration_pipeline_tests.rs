use std::fmt::Write as _;
use std::path::Path;

use chrono::{Duration, TimeZone, Utc};
use tempfile::tempdir;

use synth_core::calendar::TimeRange;
use synth_core::ids::LocaleId;
use synth_core::orchestrator::GenerationOrchestrator;
use synth_core::weather::RetryPolicy;
use synth_runner::{
    export_dataset, export_summaries, export_topology, run_once, run_replicates, sequential_seeds,
    CsvWeatherSource, ExportFormat, TopologyConfig,
};

const TOPOLOGY: &str = r#"{
    "locales": [
        {
            "id": 1,
            "location": "Helsinki",
            "baseline_rate": 30.0,
            "products": [1, 2, 3],
            "recipients": [
                { "id": 10, "hours": { "start": 8, "end": 14 } },
                { "id": 11, "hours": { "start": 12, "end": 20 }, "performance_weight": 2.0 }
            ]
        },
        {
            "id": 2,
            "location": "Oulu",
            "open_hours": { "start": 10, "end": 18 },
            "baseline_rate": 12.0,
            "products": [4],
            "daytime_noise": {},
            "recipients": [{ "id": 20, "hours": { "start": 10, "end": 18 } }]
        }
    ]
}"#;

fn range() -> TimeRange {
    let start = Utc.with_ymd_and_hms(2025, 9, 1, 0, 0, 0).unwrap();
    TimeRange::new(start, start + Duration::days(3)).unwrap()
}

fn write_weather_csv(path: &Path, locations: &[(&str, f64, f64)]) {
    let mut csv = String::from("location,timestamp,temperature,rainfall\n");
    for (location, temperature, rainfall) in locations {
        for ts in range().hours() {
            writeln!(csv, "{location},{},{temperature},{rainfall}", ts.to_rfc3339()).unwrap();
        }
    }
    std::fs::write(path, csv).unwrap();
}

fn load(dir: &Path, locations: &[(&str, f64, f64)]) -> GenerationOrchestrator {
    let topology_path = dir.join("topology.json");
    let weather_path = dir.join("weather.csv");
    std::fs::write(&topology_path, TOPOLOGY).unwrap();
    write_weather_csv(&weather_path, locations);

    let topology = TopologyConfig::from_path(&topology_path).unwrap();
    let weather = CsvWeatherSource::from_path(&weather_path).unwrap();
    topology
        .build_orchestrator(Box::new(weather), RetryPolicy::no_retry(), Some(2))
        .unwrap()
}

#[test]
fn files_to_dataset_conserves_units() {
    let dir = tempdir().unwrap();
    let orchestrator = load(dir.path(), &[("Helsinki", 20.0, 0.0), ("Oulu", 12.0, 0.5)]);
    let report = orchestrator.run(&range(), 7).unwrap();

    assert!(report.is_complete());
    let accepted: u64 = report.dataset.draws.iter().map(|d| d.accepted_count).sum();
    let unassigned: u64 = report.dataset.draws.iter().map(|d| d.unassigned_count).sum();
    assert_eq!(report.dataset.total_quantity() + unassigned, accepted);
    assert!(report.dataset.total_quantity() > 0);

    // Oulu only sells product 4, Helsinki never does.
    for sale in &report.dataset.sales {
        if sale.locale_id == LocaleId(2) {
            assert_eq!(sale.product_id.0, 4);
        } else {
            assert_ne!(sale.product_id.0, 4);
        }
    }
}

#[test]
fn missing_location_fails_only_that_locale() {
    let dir = tempdir().unwrap();
    let orchestrator = load(dir.path(), &[("Helsinki", 20.0, 0.0)]);
    let report = orchestrator.run(&range(), 7).unwrap();

    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].locale_id, LocaleId(2));
    assert!(report.locale_stats.contains_key(&LocaleId(1)));
    assert!(report.dataset.sales.iter().all(|s| s.locale_id == LocaleId(1)));
}

#[test]
fn replicates_match_single_runs() {
    let dir = tempdir().unwrap();
    let orchestrator = load(dir.path(), &[("Helsinki", 18.0, 0.2), ("Oulu", 8.0, 1.0)]);
    let seeds = sequential_seeds(100, 4);

    let summaries = run_replicates(&orchestrator, &range(), &seeds, Some(2), false).unwrap();
    assert_eq!(summaries.len(), 4);
    for (summary, seed) in summaries.iter().zip(&seeds) {
        let (_, single) = run_once(&orchestrator, &range(), *seed).unwrap();
        assert_eq!(summary, &single);
    }
}

#[test]
fn exported_files_cover_every_table() {
    let dir = tempdir().unwrap();
    let orchestrator = load(dir.path(), &[("Helsinki", 20.0, 0.0), ("Oulu", 12.0, 0.5)]);
    let report = orchestrator.run(&range(), 11).unwrap();

    let out = dir.path().join("out");
    let written = export_dataset(&report.dataset, &out, ExportFormat::Csv).unwrap();
    assert_eq!(written.len(), 3);

    let sales = std::fs::read_to_string(out.join("sales.csv")).unwrap();
    assert_eq!(sales.lines().count(), report.dataset.sales.len() + 1);
    let weather = std::fs::read_to_string(out.join("weather.csv")).unwrap();
    assert_eq!(weather.lines().count(), report.dataset.weather.len() + 1);

    let summaries = run_replicates(&orchestrator, &range(), &[1, 2], None, false).unwrap();
    let summary_path = out.join("summaries.json");
    export_summaries(&summaries, &summary_path, ExportFormat::Json).unwrap();
    let parsed: Vec<serde_json::Value> =
        serde_json::from_str(&std::fs::read_to_string(summary_path).unwrap()).unwrap();
    assert_eq!(parsed[1]["seed"], 2);
}

#[test]
fn topology_tables_join_to_sales() {
    let dir = tempdir().unwrap();
    let orchestrator = load(dir.path(), &[("Helsinki", 20.0, 0.0), ("Oulu", 12.0, 0.5)]);
    let report = orchestrator.run(&range(), 3).unwrap();

    let topology = TopologyConfig::from_json(TOPOLOGY).unwrap();
    let out = dir.path().join("dims");
    let written = export_topology(&topology, &out, ExportFormat::Json).unwrap();
    assert_eq!(written.len(), 5);

    let pairs: Vec<serde_json::Value> = serde_json::from_str(
        &std::fs::read_to_string(out.join("product_locations.json")).unwrap(),
    )
    .unwrap();
    for sale in &report.dataset.sales {
        assert!(pairs.iter().any(|row| row["product_id"] == sale.product_id.0
            && row["locale_id"] == sale.locale_id.0));
    }
}
