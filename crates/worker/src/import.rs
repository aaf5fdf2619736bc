use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use serde::de::DeserializeOwned;

use stocksource_core::domain::prediction::{PerformancePoint, PredictionRecord};
use stocksource_core::report::model::derive_display_rows;

fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("{} is not valid JSON", path.display()))
}

/// Reads a predictions file and returns the `top` records by expected growth,
/// highest first. Every record must be renderable.
pub fn load_predictions(path: &Path, top: usize) -> anyhow::Result<Vec<PredictionRecord>> {
    let records: Vec<PredictionRecord> = read_json(path)?;
    select_top(records, top)
}

pub fn select_top(mut records: Vec<PredictionRecord>, top: usize) -> anyhow::Result<Vec<PredictionRecord>> {
    derive_display_rows(&records)?;

    let mut seen = std::collections::BTreeSet::new();
    for r in &records {
        anyhow::ensure!(
            seen.insert(r.ticker.trim().to_string()),
            "duplicate ticker: {}",
            r.ticker
        );
    }

    records.sort_by(|a, b| {
        b.expected_growth
            .total_cmp(&a.expected_growth)
            .then_with(|| a.ticker.cmp(&b.ticker))
    });
    records.truncate(top);
    Ok(records)
}

/// Reads a performance series file. Later entries win on duplicate dates;
/// the result is sorted by date.
pub fn load_performance(path: &Path) -> anyhow::Result<Vec<PerformancePoint>> {
    let points: Vec<PerformancePoint> = read_json(path)?;
    normalize_performance(points)
}

pub fn normalize_performance(points: Vec<PerformancePoint>) -> anyhow::Result<Vec<PerformancePoint>> {
    let mut by_date = BTreeMap::new();
    for p in points {
        anyhow::ensure!(
            p.percent_return.is_finite(),
            "percentReturn must be finite (date={})",
            p.date
        );
        by_date.insert(p.date, p);
    }
    Ok(by_date.into_values().collect())
}
