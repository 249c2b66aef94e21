use chrono::{Duration, NaiveDate};

use crate::error::{LabelerError, Result};
use crate::models::LabeledReading;

pub const MIN_LOOKBACK_DAYS: i64 = 1;
pub const MAX_LOOKBACK_DAYS: i64 = 60;

pub fn window_start(reference: NaiveDate, lookback_days: i64) -> Result<NaiveDate> {
    if !(MIN_LOOKBACK_DAYS..=MAX_LOOKBACK_DAYS).contains(&lookback_days) {
        return Err(LabelerError::Config(format!(
            "lookback must be between {MIN_LOOKBACK_DAYS} and {MAX_LOOKBACK_DAYS} days, got {lookback_days}"
        )));
    }
    Ok(reference - Duration::days(lookback_days))
}

/// Rows dated within `[reference - lookback_days, reference]`, both ends inclusive.
pub fn select_window(
    labeled: &[LabeledReading],
    reference: NaiveDate,
    lookback_days: i64,
) -> Result<Vec<LabeledReading>> {
    let start = window_start(reference, lookback_days)?;
    Ok(labeled
        .iter()
        .filter(|row| row.reading.date >= start && row.reading.date <= reference)
        .cloned()
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::label::apply_thresholds;
    use crate::models::Reading;
    use crate::threshold::ThresholdTable;
    use chrono::NaiveDateTime;

    fn daily_rows(first: NaiveDate, days: i64) -> Vec<LabeledReading> {
        let readings: Vec<Reading> = (0..days)
            .map(|offset| {
                let day = first + Duration::days(offset);
                let ts = NaiveDateTime::new(day, chrono::NaiveTime::MIN);
                Reading::at(ts, 10.0)
            })
            .collect();
        apply_thresholds(&readings, &ThresholdTable::default())
    }

    fn date(value: &str) -> NaiveDate {
        NaiveDate::parse_from_str(value, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn keeps_both_ends_of_range() {
        let rows = daily_rows(date("2019-03-01"), 31);
        let selected = select_window(&rows, date("2019-03-20"), 5).unwrap();
        let dates: Vec<NaiveDate> = selected.iter().map(|r| r.reading.date).collect();
        assert_eq!(dates.len(), 6);
        assert_eq!(dates.first(), Some(&date("2019-03-15")));
        assert_eq!(dates.last(), Some(&date("2019-03-20")));
    }

    #[test]
    fn output_is_a_subset_within_range() {
        let rows = daily_rows(date("2019-03-01"), 31);
        let reference = date("2019-03-10");
        let selected = select_window(&rows, reference, 30).unwrap();
        assert!(selected.len() <= rows.len());
        assert_eq!(selected.len(), 10);
        for row in &selected {
            assert!(row.reading.date >= date("2019-02-08"));
            assert!(row.reading.date <= reference);
        }
    }

    #[test]
    fn rejects_out_of_range_lookback() {
        let rows = daily_rows(date("2019-03-01"), 3);
        assert!(select_window(&rows, date("2019-03-02"), 0).is_err());
        assert!(select_window(&rows, date("2019-03-02"), 61).is_err());
        assert!(select_window(&rows, date("2019-03-02"), 60).is_ok());
    }
}
