use anyhow::Context;
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use sqlx::{PgPool, Row};
use tracing::info;

use crate::error::Result;
use crate::ingest::{self, RawReading};
use crate::models::{Reading, FLOOR_COUNT, ZONE_COUNT};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Deterministic hourly demo series: office-hours load on working days, a flat
/// weekend base, and a handful of spikes in the final week.
pub fn demo_series(start: NaiveDate, days: i64) -> Vec<Reading> {
    let mut readings = Vec::with_capacity((days.max(0) * 24) as usize);

    for offset in 0..days {
        let date = start + Duration::days(offset);
        for hour in 0..24u32 {
            let Some(time) = NaiveTime::from_hms_opt(hour, 0, 0) else {
                continue;
            };
            let mut reading = Reading::at(NaiveDateTime::new(date, time), 0.0);

            let base = if reading.is_working_day && (8..19).contains(&hour) {
                180.0
            } else {
                60.0
            };
            let wobble = ((offset * 7 + hour as i64 * 13) % 17) as f64;
            let spike = if offset >= days - 7 && (offset + hour as i64) % 29 == 0 {
                150.0
            } else {
                0.0
            };

            let floors: [f64; FLOOR_COUNT] =
                std::array::from_fn(|i| (base + wobble + spike) / FLOOR_COUNT as f64 + i as f64 * 0.1);
            let total: f64 = floors.iter().sum();
            reading.total_consumption = total;
            reading.floors = floors;
            reading.zones = std::array::from_fn(|_| total / ZONE_COUNT as f64);
            readings.push(reading);
        }
    }

    readings
}

async fn insert_reading(pool: &PgPool, reading: &Reading) -> Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO power_anomaly.hourly_readings
        (ts, total_consumption, date, weekday, workingday, hour, floors, zones)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ON CONFLICT (ts) DO NOTHING
        "#,
    )
    .bind(reading.timestamp)
    .bind(reading.total_consumption)
    .bind(reading.date)
    .bind(reading.weekday_index as i16)
    .bind(reading.is_working_day)
    .bind(reading.hour_of_day as i16)
    .bind(reading.floors.to_vec())
    .bind(reading.zones.to_vec())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn seed(pool: &PgPool, end: NaiveDate, days: i64) -> anyhow::Result<usize> {
    let start = end - Duration::days(days - 1);
    let mut inserted = 0usize;

    for reading in demo_series(start, days) {
        if insert_reading(pool, &reading).await? {
            inserted += 1;
        }
    }

    Ok(inserted)
}

pub async fn import_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    let readings = ingest::load_csv(csv_path)
        .with_context(|| format!("failed to read {}", csv_path.display()))?;
    let mut inserted = 0usize;

    for reading in &readings {
        if insert_reading(pool, reading).await? {
            inserted += 1;
        }
    }

    Ok(inserted)
}

fn fill<const N: usize>(values: Vec<f64>) -> [f64; N] {
    std::array::from_fn(|i| values.get(i).copied().unwrap_or(0.0))
}

pub async fn fetch_readings(pool: &PgPool) -> Result<Vec<Reading>> {
    let rows = sqlx::query(
        "SELECT ts, total_consumption, date, weekday, workingday, hour, floors, zones \
         FROM power_anomaly.hourly_readings \
         ORDER BY ts",
    )
    .fetch_all(pool)
    .await?;

    let mut raw = Vec::with_capacity(rows.len());
    for row in rows {
        let weekday: i16 = row.try_get("weekday")?;
        let hour: i16 = row.try_get("hour")?;
        raw.push(RawReading {
            timestamp: row.try_get("ts")?,
            total_consumption: row.try_get("total_consumption")?,
            date: row.try_get("date")?,
            weekday_index: u8::try_from(weekday).ok(),
            is_working_day: row.try_get("workingday")?,
            hour_of_day: u8::try_from(hour).ok(),
            floors: fill(row.try_get("floors")?),
            zones: fill(row.try_get("zones")?),
        });
    }

    let readings = ingest::validate_series(raw)?;
    info!(rows = readings.len(), "loaded hourly series from Postgres");
    Ok(readings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_series_covers_every_hour() {
        let start = NaiveDate::from_ymd_opt(2019, 3, 4).unwrap();
        let series = demo_series(start, 14);
        assert_eq!(series.len(), 14 * 24);
        assert!(series.iter().all(|r| r.total_consumption > 0.0));
        assert_eq!(series.first().map(|r| r.date), Some(start));
    }

    #[test]
    fn demo_series_is_valid_input() {
        let start = NaiveDate::from_ymd_opt(2019, 3, 4).unwrap();
        let raw = demo_series(start, 3)
            .into_iter()
            .map(|r| RawReading {
                timestamp: Some(r.timestamp),
                total_consumption: Some(r.total_consumption),
                date: Some(r.date),
                weekday_index: Some(r.weekday_index),
                is_working_day: Some(r.is_working_day),
                hour_of_day: Some(r.hour_of_day),
                floors: r.floors,
                zones: r.zones,
            })
            .collect();
        assert_eq!(ingest::validate_series(raw).unwrap().len(), 72);
    }

    #[test]
    fn fill_pads_short_arrays() {
        let floors: [f64; 3] = fill(vec![1.0]);
        assert_eq!(floors, [1.0, 0.0, 0.0]);
    }
}
