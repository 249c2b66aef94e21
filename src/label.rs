use chrono::NaiveDate;
use tracing::info;

use crate::models::{LabeledReading, Reading};
use crate::threshold::{PercentileLevels, ThresholdTable};

/// Joins bucket thresholds onto every reading and derives the anomaly flags.
/// Rows in buckets missing from `table` carry no thresholds and are never flagged.
pub fn apply_thresholds(readings: &[Reading], table: &ThresholdTable) -> Vec<LabeledReading> {
    readings
        .iter()
        .map(|reading| {
            let thresholds = table.get(reading.bucket());
            let warning_threshold = thresholds.map(|t| t.warning);
            let danger_threshold = thresholds.map(|t| t.danger);
            LabeledReading {
                is_warning: exceeds(reading.total_consumption, warning_threshold),
                is_danger: exceeds(reading.total_consumption, danger_threshold),
                warning_threshold,
                danger_threshold,
                reading: reading.clone(),
            }
        })
        .collect()
}

fn exceeds(value: f64, threshold: Option<f64>) -> bool {
    threshold.is_some_and(|t| value > t)
}

/// Builds the threshold table from history before `as_of` and labels the whole series.
pub fn label_series(
    readings: &[Reading],
    as_of: NaiveDate,
    levels: PercentileLevels,
) -> (ThresholdTable, Vec<LabeledReading>) {
    let table = ThresholdTable::build(readings, as_of, levels);
    if table.is_empty() {
        info!("no readings before {as_of}; every row is left unflagged");
    }
    let labeled = apply_thresholds(readings, &table);
    info!(
        rows = labeled.len(),
        buckets = table.len(),
        warnings = labeled.iter().filter(|r| r.is_warning).count(),
        dangers = labeled.iter().filter(|r| r.is_danger).count(),
        "labeled series"
    );
    (table, labeled)
}
