use std::fmt::Write;

use chrono::NaiveDate;

use crate::models::{DailySummary, LabeledReading, FLOOR_COUNT, ZONE_COUNT};
use crate::summary;
use crate::threshold::PercentileLevels;

fn format_mean(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{v:.2} kWh"),
        None => "n/a".to_string(),
    }
}

fn format_threshold(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.2}")).unwrap_or_else(|| "-".to_string())
}

/// Days with the most danger flags, then the most warning flags.
pub fn most_anomalous_days(daily: &[DailySummary], limit: usize) -> Vec<DailySummary> {
    let mut days: Vec<DailySummary> = daily
        .iter()
        .filter(|d| d.warning_count > 0)
        .cloned()
        .collect();
    days.sort_by(|a, b| {
        b.danger_count
            .cmp(&a.danger_count)
            .then(b.warning_count.cmp(&a.warning_count))
            .then(b.date.cmp(&a.date))
    });
    days.truncate(limit);
    days
}

pub fn build_report(
    as_of: NaiveDate,
    window_start: NaiveDate,
    levels: PercentileLevels,
    rows: &[LabeledReading],
) -> String {
    let overview = summary::overview(rows);
    let daily = summary::daily_totals(rows);

    let mut output = String::new();

    let _ = writeln!(output, "# Power Consumption Anomaly Report");
    let _ = writeln!(
        output,
        "Window {} to {} (thresholds from history before {}, warning p{:.3}, danger p{:.3})",
        window_start,
        as_of,
        as_of,
        levels.warning() * 100.0,
        levels.danger() * 100.0
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Overview");
    let _ = writeln!(
        output,
        "- Working-day mean daily consumption: {}",
        format_mean(overview.working_day_daily_mean)
    );
    let _ = writeln!(
        output,
        "- Non-working-day mean daily consumption: {}",
        format_mean(overview.non_working_day_daily_mean)
    );
    let _ = writeln!(output, "- Warning rate: {:.2} %", overview.warning_ratio_pct);
    let _ = writeln!(output, "- Danger rate: {:.2} %", overview.danger_ratio_pct);

    let _ = writeln!(output);
    let _ = writeln!(output, "## Daily Anomalies");

    if daily.is_empty() {
        let _ = writeln!(output, "No readings recorded for this window.");
    } else {
        let _ = writeln!(output, "| date | consumption (kWh) | warning | danger |");
        let _ = writeln!(output, "|---|---:|---:|---:|");
        for day in &daily {
            let _ = writeln!(
                output,
                "| {} | {:.2} | {} | {} |",
                day.date, day.total_consumption, day.warning_count, day.danger_count
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Most Anomalous Days");

    let worst = most_anomalous_days(&daily, 5);
    if worst.is_empty() {
        let _ = writeln!(output, "No anomalies detected in this window.");
    } else {
        for day in &worst {
            let _ = writeln!(
                output,
                "- {}: {} danger, {} warning across {:.2} kWh",
                day.date, day.danger_count, day.warning_count, day.total_consumption
            );
        }
    }

    if let Some(latest) = daily.last() {
        let detail = summary::day_detail(rows, latest.date);
        let _ = writeln!(output);
        let _ = writeln!(output, "## Hourly Detail for {}", detail.date);
        let _ = writeln!(
            output,
            "| hour | consumption | warning line | danger line | flag |"
        );
        let _ = writeln!(output, "|---:|---:|---:|---:|---|");
        for row in &detail.hours {
            let flag = if row.is_danger {
                "danger"
            } else if row.is_warning {
                "warning"
            } else {
                ""
            };
            let _ = writeln!(
                output,
                "| {} | {:.2} | {} | {} | {} |",
                row.reading.hour_of_day,
                row.reading.total_consumption,
                format_threshold(row.warning_threshold),
                format_threshold(row.danger_threshold),
                flag
            );
        }

        let _ = writeln!(output);
        let _ = writeln!(output, "### Floors and Zones");
        let floors = (0..FLOOR_COUNT)
            .map(|i| {
                let total: f64 = detail.hours.iter().map(|r| r.reading.floors[i]).sum();
                format!("F{}: {:.2}", i + 1, total)
            })
            .collect::<Vec<_>>();
        let zones = (0..ZONE_COUNT)
            .map(|i| {
                let total: f64 = detail.hours.iter().map(|r| r.reading.zones[i]).sum();
                format!("Zone{}: {:.2}", i + 1, total)
            })
            .collect::<Vec<_>>();
        let _ = writeln!(output, "- Floors: {}", floors.join(", "));
        let _ = writeln!(output, "- Zones: {}", zones.join(", "));
    }

    output
}
