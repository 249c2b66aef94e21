//! Reads the resampler's hourly CSV into validated readings.

use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Deserializer};
use tracing::info;

use crate::error::{LabelerError, Result};
use crate::models::{Reading, FLOOR_COUNT, ZONE_COUNT};

fn deserialize_opt_timestamp<'de, D>(d: D) -> std::result::Result<Option<NaiveDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(d)?;
    match opt.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => parse_timestamp(s).map(Some).map_err(serde::de::Error::custom),
    }
}

fn deserialize_opt_flag<'de, D>(d: D) -> std::result::Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(d)?;
    match opt.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some("1") | Some("true") | Some("True") => Ok(Some(true)),
        Some("0") | Some("false") | Some("False") => Ok(Some(false)),
        Some(other) => Err(serde::de::Error::custom(format!(
            "invalid working-day flag {other:?}"
        ))),
    }
}

pub fn parse_timestamp(s: &str) -> std::result::Result<NaiveDateTime, chrono::ParseError> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S"))
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(default, alias = "ts", deserialize_with = "deserialize_opt_timestamp")]
    timestamp: Option<NaiveDateTime>,
    #[serde(default, alias = "total_kW_sum")]
    total_consumption: Option<f64>,
    #[serde(default)]
    date: Option<NaiveDate>,
    #[serde(default)]
    weekday: Option<u8>,
    #[serde(default, deserialize_with = "deserialize_opt_flag")]
    workingday: Option<bool>,
    #[serde(default)]
    hour: Option<u8>,
    #[serde(rename = "F1", default)]
    f1: Option<f64>,
    #[serde(rename = "F2", default)]
    f2: Option<f64>,
    #[serde(rename = "F3", default)]
    f3: Option<f64>,
    #[serde(rename = "F4", default)]
    f4: Option<f64>,
    #[serde(rename = "F5", default)]
    f5: Option<f64>,
    #[serde(rename = "F6", default)]
    f6: Option<f64>,
    #[serde(rename = "F7", default)]
    f7: Option<f64>,
    #[serde(rename = "Zone1", default)]
    zone1: Option<f64>,
    #[serde(rename = "Zone2", default)]
    zone2: Option<f64>,
    #[serde(rename = "Zone3", default)]
    zone3: Option<f64>,
    #[serde(rename = "Zone4", default)]
    zone4: Option<f64>,
    #[serde(rename = "Zone5", default)]
    zone5: Option<f64>,
}

/// Calendar and consumption fields as they arrive, before validation.
#[derive(Debug, Clone, Default)]
pub struct RawReading {
    pub timestamp: Option<NaiveDateTime>,
    pub total_consumption: Option<f64>,
    pub date: Option<NaiveDate>,
    pub weekday_index: Option<u8>,
    pub is_working_day: Option<bool>,
    pub hour_of_day: Option<u8>,
    pub floors: [f64; FLOOR_COUNT],
    pub zones: [f64; ZONE_COUNT],
}

impl From<CsvRow> for RawReading {
    fn from(row: CsvRow) -> Self {
        let floors = [row.f1, row.f2, row.f3, row.f4, row.f5, row.f6, row.f7]
            .map(|v| v.unwrap_or(0.0));
        let zones = [row.zone1, row.zone2, row.zone3, row.zone4, row.zone5].map(|v| v.unwrap_or(0.0));
        RawReading {
            timestamp: row.timestamp,
            total_consumption: row.total_consumption,
            date: row.date,
            weekday_index: row.weekday,
            is_working_day: row.workingday,
            hour_of_day: row.hour,
            floors,
            zones,
        }
    }
}

impl RawReading {
    /// Checks that every required field is present and agrees with the timestamp.
    pub fn validate(self, row: usize) -> Result<Reading> {
        let timestamp = self
            .timestamp
            .ok_or_else(|| LabelerError::shape(row, "missing timestamp"))?;
        let total_consumption = self
            .total_consumption
            .ok_or_else(|| LabelerError::shape(row, "missing total_consumption"))?;
        let date = self
            .date
            .ok_or_else(|| LabelerError::shape(row, "missing date"))?;
        let weekday_index = self
            .weekday_index
            .ok_or_else(|| LabelerError::shape(row, "missing weekday"))?;
        let is_working_day = self
            .is_working_day
            .ok_or_else(|| LabelerError::shape(row, "missing workingday"))?;
        let hour_of_day = self
            .hour_of_day
            .ok_or_else(|| LabelerError::shape(row, "missing hour"))?;

        if timestamp.minute() != 0 || timestamp.second() != 0 || timestamp.nanosecond() != 0 {
            return Err(LabelerError::shape(
                row,
                format!("timestamp {timestamp} is not hour-aligned"),
            ));
        }
        if !total_consumption.is_finite() || total_consumption < 0.0 {
            return Err(LabelerError::shape(
                row,
                format!("total_consumption must be a non-negative number, got {total_consumption}"),
            ));
        }
        if weekday_index > 6 {
            return Err(LabelerError::shape(row, format!("weekday {weekday_index} out of range")));
        }
        if hour_of_day > 23 {
            return Err(LabelerError::shape(row, format!("hour {hour_of_day} out of range")));
        }

        let expected = Reading::at(timestamp, total_consumption);
        if date != expected.date
            || weekday_index != expected.weekday_index
            || is_working_day != expected.is_working_day
            || hour_of_day != expected.hour_of_day
        {
            return Err(LabelerError::shape(
                row,
                format!("calendar fields disagree with timestamp {timestamp}"),
            ));
        }

        Ok(Reading {
            floors: self.floors,
            zones: self.zones,
            ..expected
        })
    }
}

/// Validates a whole series, rejecting duplicate timestamps, and returns it ordered by time.
pub fn validate_series(raw: Vec<RawReading>) -> Result<Vec<Reading>> {
    let mut seen = HashSet::with_capacity(raw.len());
    let mut readings = Vec::with_capacity(raw.len());

    for (index, row) in raw.into_iter().enumerate() {
        let reading = row.validate(index + 1)?;
        if !seen.insert(reading.timestamp) {
            return Err(LabelerError::shape(
                index + 1,
                format!("duplicate timestamp {}", reading.timestamp),
            ));
        }
        readings.push(reading);
    }

    readings.sort_by_key(|r| r.timestamp);
    Ok(readings)
}

pub fn read_csv<R: Read>(source: R) -> Result<Vec<Reading>> {
    let mut reader = csv::Reader::from_reader(source);
    let mut raw = Vec::new();

    for (index, result) in reader.deserialize::<CsvRow>().enumerate() {
        let row = result.map_err(|err| LabelerError::shape(index + 1, err.to_string()))?;
        raw.push(RawReading::from(row));
    }

    validate_series(raw)
}

pub fn load_csv(path: &Path) -> Result<Vec<Reading>> {
    let file = std::fs::File::open(path)?;
    let readings = read_csv(file)?;
    info!(rows = readings.len(), path = %path.display(), "loaded hourly series");
    Ok(readings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const HEADER: &str = "ts,total_kW_sum,F1,Zone2,date,weekday,workingday,hour\n";

    #[test]
    fn reads_resampler_output() {
        let data = format!(
            "{HEADER}2019-01-01 01:00:00,12.5,3.0,1.5,2019-01-01,1,1,1\n\
             2019-01-01 00:00:00,10.0,2.0,1.0,2019-01-01,1,1,0\n"
        );
        let readings = read_csv(data.as_bytes()).unwrap();
        assert_eq!(readings.len(), 2);
        assert_eq!(readings[0].hour_of_day, 0);
        assert_eq!(readings[1].total_consumption, 12.5);
        assert_eq!(readings[1].floors[0], 3.0);
        assert_eq!(readings[1].zones[1], 1.5);
        assert!(readings[0].is_working_day);
    }

    #[test]
    fn accepts_iso_timestamps_and_boolean_flags() {
        let data = "timestamp,total_consumption,date,weekday,workingday,hour\n\
                    2019-01-05T13:00:00,4.0,2019-01-05,5,false,13\n";
        let readings = read_csv(data.as_bytes()).unwrap();
        assert!(!readings[0].is_working_day);
        assert_eq!(readings[0].weekday_index, 5);
    }

    #[test]
    fn missing_consumption_column_is_rejected() {
        let data = "ts,date,weekday,workingday,hour\n2019-01-01 00:00:00,2019-01-01,1,1,0\n";
        let err = read_csv(data.as_bytes()).unwrap_err();
        assert!(matches!(err, LabelerError::InputShape { row: 1, .. }));
    }

    #[test]
    fn missing_calendar_field_is_rejected() {
        let data = "ts,total_kW_sum,date,weekday,workingday\n2019-01-01 00:00:00,1.0,2019-01-01,1,1\n";
        let err = read_csv(data.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("missing hour"));
    }

    #[test]
    fn inconsistent_calendar_is_rejected() {
        let data = format!("{HEADER}2019-01-05 00:00:00,1.0,0,0,2019-01-05,5,1,0\n");
        let err = read_csv(data.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("disagree"));
    }

    #[test]
    fn duplicate_and_unaligned_timestamps_are_rejected() {
        let dup = format!(
            "{HEADER}2019-01-01 00:00:00,1.0,0,0,2019-01-01,1,1,0\n\
             2019-01-01 00:00:00,2.0,0,0,2019-01-01,1,1,0\n"
        );
        let err = read_csv(dup.as_bytes()).unwrap_err();
        assert!(matches!(err, LabelerError::InputShape { row: 2, .. }));

        let unaligned = format!("{HEADER}2019-01-01 00:30:00,1.0,0,0,2019-01-01,1,1,0\n");
        assert!(read_csv(unaligned.as_bytes()).is_err());
    }

    #[test]
    fn negative_consumption_is_rejected() {
        let data = format!("{HEADER}2019-01-01 00:00:00,-1.0,0,0,2019-01-01,1,1,0\n");
        assert!(read_csv(data.as_bytes()).is_err());
    }
}
