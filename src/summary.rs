use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::models::{
    ConsumptionOverview, DailySummary, DayClass, DayDetail, HourlySummary, LabeledReading,
};

pub fn daily_totals(rows: &[LabeledReading]) -> Vec<DailySummary> {
    let mut map: BTreeMap<NaiveDate, (f64, usize, usize)> = BTreeMap::new();

    for row in rows {
        let entry = map.entry(row.reading.date).or_insert((0.0, 0, 0));
        entry.0 += row.reading.total_consumption;
        entry.1 += row.is_warning as usize;
        entry.2 += row.is_danger as usize;
    }

    map.into_iter()
        .map(|(date, (total, warnings, dangers))| DailySummary {
            date,
            total_consumption: total,
            warning_count: warnings,
            danger_count: dangers,
        })
        .collect()
}

pub fn hourly_totals(rows: &[LabeledReading]) -> Vec<HourlySummary> {
    let mut map: BTreeMap<(NaiveDate, u8), (f64, usize, usize)> = BTreeMap::new();

    for row in rows {
        let key = (row.reading.date, row.reading.hour_of_day);
        let entry = map.entry(key).or_insert((0.0, 0, 0));
        entry.0 += row.reading.total_consumption;
        entry.1 += row.is_warning as usize;
        entry.2 += row.is_danger as usize;
    }

    map.into_iter()
        .map(|((date, hour), (total, warnings, dangers))| HourlySummary {
            date,
            hour,
            total_consumption: total,
            warning_count: warnings,
            danger_count: dangers,
        })
        .collect()
}

/// Mean daily consumption per day class plus the share of flagged rows.
pub fn overview(rows: &[LabeledReading]) -> ConsumptionOverview {
    let mut per_day: BTreeMap<(DayClass, NaiveDate), f64> = BTreeMap::new();
    for row in rows {
        let class = row.reading.bucket().day_class;
        *per_day.entry((class, row.reading.date)).or_insert(0.0) += row.reading.total_consumption;
    }

    let mean_for = |class: DayClass| {
        let totals: Vec<f64> = per_day
            .iter()
            .filter(|((c, _), _)| *c == class)
            .map(|(_, total)| *total)
            .collect();
        if totals.is_empty() {
            None
        } else {
            Some(totals.iter().sum::<f64>() / totals.len() as f64)
        }
    };

    let ratio = |count: usize| {
        if rows.is_empty() {
            0.0
        } else {
            count as f64 * 100.0 / rows.len() as f64
        }
    };

    ConsumptionOverview {
        working_day_daily_mean: mean_for(DayClass::Working),
        non_working_day_daily_mean: mean_for(DayClass::NonWorking),
        warning_ratio_pct: ratio(rows.iter().filter(|r| r.is_warning).count()),
        danger_ratio_pct: ratio(rows.iter().filter(|r| r.is_danger).count()),
    }
}

pub fn day_detail(rows: &[LabeledReading], date: NaiveDate) -> DayDetail {
    let mut hours: Vec<LabeledReading> = rows
        .iter()
        .filter(|row| row.reading.date == date)
        .cloned()
        .collect();
    hours.sort_by_key(|row| row.reading.hour_of_day);
    DayDetail { date, hours }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Reading;
    use chrono::NaiveDateTime;
    use pretty_assertions::assert_eq;

    fn row(stamp: &str, value: f64, is_warning: bool, is_danger: bool) -> LabeledReading {
        let ts = NaiveDateTime::parse_from_str(stamp, "%Y-%m-%d %H:%M:%S").unwrap();
        LabeledReading {
            reading: Reading::at(ts, value),
            warning_threshold: Some(10.0),
            danger_threshold: Some(20.0),
            is_warning,
            is_danger,
        }
    }

    fn date(value: &str) -> NaiveDate {
        NaiveDate::parse_from_str(value, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn daily_counts_sum_flags() {
        let rows = vec![
            row("2019-05-06 08:00:00", 12.0, true, false),
            row("2019-05-06 09:00:00", 8.0, false, false),
            row("2019-05-07 09:00:00", 25.0, true, true),
        ];
        let daily = daily_totals(&rows);
        assert_eq!(
            daily,
            vec![
                DailySummary {
                    date: date("2019-05-06"),
                    total_consumption: 20.0,
                    warning_count: 1,
                    danger_count: 0,
                },
                DailySummary {
                    date: date("2019-05-07"),
                    total_consumption: 25.0,
                    warning_count: 1,
                    danger_count: 1,
                },
            ]
        );
    }

    #[test]
    fn hourly_groups_by_date_and_hour() {
        let rows = vec![
            row("2019-05-07 09:00:00", 25.0, true, true),
            row("2019-05-06 09:00:00", 8.0, false, false),
            row("2019-05-06 08:00:00", 12.0, true, false),
        ];
        let hourly = hourly_totals(&rows);
        let keys: Vec<(NaiveDate, u8)> = hourly.iter().map(|h| (h.date, h.hour)).collect();
        assert_eq!(
            keys,
            vec![
                (date("2019-05-06"), 8),
                (date("2019-05-06"), 9),
                (date("2019-05-07"), 9),
            ]
        );
        assert_eq!(hourly[0].warning_count, 1);
        assert_eq!(hourly[2].danger_count, 1);
    }

    #[test]
    fn overview_splits_working_and_weekend_days() {
        // 2019-05-10 is a Friday, 2019-05-11 a Saturday.
        let rows = vec![
            row("2019-05-09 08:00:00", 10.0, false, false),
            row("2019-05-09 09:00:00", 20.0, true, false),
            row("2019-05-10 08:00:00", 50.0, true, true),
            row("2019-05-11 08:00:00", 4.0, false, false),
        ];
        let summary = overview(&rows);
        assert_eq!(summary.working_day_daily_mean, Some(40.0));
        assert_eq!(summary.non_working_day_daily_mean, Some(4.0));
        assert_eq!(summary.warning_ratio_pct, 50.0);
        assert_eq!(summary.danger_ratio_pct, 25.0);
    }

    #[test]
    fn overview_of_empty_window() {
        let summary = overview(&[]);
        assert_eq!(summary.working_day_daily_mean, None);
        assert_eq!(summary.non_working_day_daily_mean, None);
        assert_eq!(summary.warning_ratio_pct, 0.0);
    }

    #[test]
    fn day_detail_orders_hours() {
        let rows = vec![
            row("2019-05-06 09:00:00", 8.0, false, false),
            row("2019-05-07 01:00:00", 3.0, false, false),
            row("2019-05-06 02:00:00", 12.0, true, false),
        ];
        let detail = day_detail(&rows, date("2019-05-06"));
        let hours: Vec<u8> = detail.hours.iter().map(|r| r.reading.hour_of_day).collect();
        assert_eq!(hours, vec![2, 9]);
        assert!(day_detail(&rows, date("2019-06-01")).hours.is_empty());
    }
}
