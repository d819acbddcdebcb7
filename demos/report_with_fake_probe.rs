//! Build a usage report from a fake probe, with no filesystem access.
//!
//! Usage:
//!   cargo run --example report_with_fake_probe
//!
//! Demonstrates library-only usage: a hand-built catalog measured by a
//! [`StaticMeasurer`] instead of a real directory walk, plus an opaque
//! external figure joining the report.

use std::path::PathBuf;
use std::sync::Arc;

use storage_gauge::catalog::{Category, CategoryCatalog};
use storage_gauge::core::units::{BYTES_PER_MB, parse_size};
use storage_gauge::probe::StaticMeasurer;
use storage_gauge::report::aggregator::ExternalFigures;
use storage_gauge::report::engine::GaugeEngine;

fn category(name: &str, paths: &[&str], encloses: &[&str]) -> Category {
    Category {
        name: name.to_string(),
        paths: paths.iter().map(PathBuf::from).collect(),
        encloses: encloses.iter().map(ToString::to_string).collect(),
    }
}

fn main() {
    let catalog = CategoryCatalog::new(vec![
        category("assets", &["/srv/app/data/assets"], &[]),
        category("cache", &["/srv/app/data/tmp", "/srv/app/build"], &[]),
        category("plugins", &["/srv/app/plugins"], &[]),
        category(
            "total",
            &["/srv/app"],
            &["assets", "cache", "plugins"],
        ),
    ])
    .expect("catalog builds");

    let measurer = Arc::new(StaticMeasurer::new([
        ("/srv/app/data/assets", 320 * BYTES_PER_MB),
        ("/srv/app/data/tmp", 64 * BYTES_PER_MB),
        ("/srv/app/build", 32 * BYTES_PER_MB),
        ("/srv/app/plugins", 64 * BYTES_PER_MB),
        ("/srv/app", 600 * BYTES_PER_MB),
    ]));

    let limit = parse_size("1 GB").expect("limit parses");
    let engine = GaugeEngine::new(catalog, Some(limit), measurer, 2);

    let external: ExternalFigures = [("db", 48 * BYTES_PER_MB)].into_iter().collect();
    let report = engine.produce_report(&external).expect("report builds");

    println!("Usage at {}", report.generated_at);
    println!();
    println!("  {:<8} {:>10} {:>7}", "Label", "Size", "Limit%");
    for (label, figure) in &report.entries {
        let percent = figure
            .percent_of_limit
            .map_or_else(|| "-".to_string(), |value| format!("{value}%"));
        println!("  {:<8} {:>10} {:>7}", label, figure.formatted, percent);
    }

    let json = serde_json::to_string_pretty(&report).expect("report serializes");
    println!();
    println!("As JSON:");
    println!("{json}");
}
