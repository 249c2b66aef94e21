use std::path::PathBuf;

use chrono::NaiveDate;

use crate::error::Result;
use crate::threshold::PercentileLevels;
use crate::window;

/// Where the hourly series comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum SeriesSource {
    Csv(PathBuf),
    Postgres,
}

/// Validated settings shared by every analysis command.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisConfig {
    pub source: SeriesSource,
    pub as_of: NaiveDate,
    pub lookback_days: i64,
    pub levels: PercentileLevels,
}

impl AnalysisConfig {
    pub fn new(
        csv: Option<PathBuf>,
        as_of: NaiveDate,
        lookback_days: i64,
        warning_percentile: f64,
        danger_percentile: f64,
    ) -> Result<Self> {
        let levels = PercentileLevels::new(warning_percentile, danger_percentile)?;
        window::window_start(as_of, lookback_days)?;
        let source = match csv {
            Some(path) => SeriesSource::Csv(path),
            None => SeriesSource::Postgres,
        };
        Ok(AnalysisConfig {
            source,
            as_of,
            lookback_days,
            levels,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LabelerError;

    fn as_of() -> NaiveDate {
        NaiveDate::from_ymd_opt(2019, 6, 1).unwrap()
    }

    #[test]
    fn csv_path_selects_csv_source() {
        let cfg = AnalysisConfig::new(Some(PathBuf::from("hourly.csv")), as_of(), 30, 0.95, 0.97725)
            .unwrap();
        assert_eq!(cfg.source, SeriesSource::Csv(PathBuf::from("hourly.csv")));
        assert_eq!(cfg.levels, PercentileLevels::default());
    }

    #[test]
    fn defaults_to_postgres() {
        let cfg = AnalysisConfig::new(None, as_of(), 7, 0.9, 0.99).unwrap();
        assert_eq!(cfg.source, SeriesSource::Postgres);
    }

    #[test]
    fn rejects_bad_lookback_and_levels() {
        let err = AnalysisConfig::new(None, as_of(), 90, 0.95, 0.97725).unwrap_err();
        assert!(matches!(err, LabelerError::Config(_)));
        assert!(AnalysisConfig::new(None, as_of(), 30, 1.5, 0.97725).is_err());
    }
}
