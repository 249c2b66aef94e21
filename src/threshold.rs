//! Per-bucket percentile thresholds estimated from history before the as-of date.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use tracing::debug;

use crate::error::{LabelerError, Result};
use crate::models::{BucketKey, Reading, Thresholds};

pub const DEFAULT_WARNING_PERCENTILE: f64 = 0.95;
/// Upper tail of a normal distribution beyond two standard deviations.
pub const DEFAULT_DANGER_PERCENTILE: f64 = 0.97725;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PercentileLevels {
    warning: f64,
    danger: f64,
}

impl PercentileLevels {
    pub fn new(warning: f64, danger: f64) -> Result<Self> {
        for (name, level) in [("warning", warning), ("danger", danger)] {
            if !(level > 0.0 && level < 1.0) {
                return Err(LabelerError::Config(format!(
                    "{name} percentile must be in (0, 1), got {level}"
                )));
            }
        }
        if danger < warning {
            return Err(LabelerError::Config(format!(
                "danger percentile {danger} is below warning percentile {warning}"
            )));
        }
        Ok(PercentileLevels { warning, danger })
    }

    pub fn warning(&self) -> f64 {
        self.warning
    }

    pub fn danger(&self) -> f64 {
        self.danger
    }
}

impl Default for PercentileLevels {
    fn default() -> Self {
        PercentileLevels {
            warning: DEFAULT_WARNING_PERCENTILE,
            danger: DEFAULT_DANGER_PERCENTILE,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ThresholdTable {
    buckets: BTreeMap<BucketKey, Thresholds>,
}

impl ThresholdTable {
    /// Estimates thresholds from readings dated strictly before `as_of`.
    pub fn build(readings: &[Reading], as_of: NaiveDate, levels: PercentileLevels) -> Self {
        let mut samples: BTreeMap<BucketKey, Vec<f64>> = BTreeMap::new();
        for reading in readings.iter().filter(|r| r.date < as_of) {
            samples
                .entry(reading.bucket())
                .or_default()
                .push(reading.total_consumption);
        }

        let buckets = samples
            .into_iter()
            .map(|(key, mut values)| {
                values.sort_by(f64::total_cmp);
                let thresholds = Thresholds {
                    warning: percentile_sorted(&values, levels.warning),
                    danger: percentile_sorted(&values, levels.danger),
                };
                (key, thresholds)
            })
            .collect::<BTreeMap<_, _>>();

        let missing = 48 - buckets.len();
        if missing > 0 {
            debug!(missing, "buckets without history before {as_of}");
        }

        ThresholdTable { buckets }
    }

    pub fn get(&self, key: BucketKey) -> Option<Thresholds> {
        self.buckets.get(&key).copied()
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (BucketKey, Thresholds)> + '_ {
        self.buckets.iter().map(|(key, t)| (*key, *t))
    }
}

/// Linear interpolation between closest ranks over ascending `sorted` values
/// (h = (n - 1) * q). `sorted` must be non-empty.
fn percentile_sorted(sorted: &[f64], q: f64) -> f64 {
    let h = (sorted.len() - 1) as f64 * q;
    let lower = h.floor() as usize;
    let upper = (lower + 1).min(sorted.len() - 1);
    let frac = h - lower as f64;
    sorted[lower] + frac * (sorted[upper] - sorted[lower])
}
