use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use serde::Serialize;

pub const FLOOR_COUNT: usize = 7;
pub const ZONE_COUNT: usize = 5;

/// Whether a day falls on Mon–Fri or on the weekend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DayClass {
    NonWorking,
    Working,
}

impl DayClass {
    pub fn is_working(self) -> bool {
        matches!(self, DayClass::Working)
    }
}

/// Threshold lookup key: day class × hour of day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BucketKey {
    pub day_class: DayClass,
    pub hour: u8,
}

impl BucketKey {
    pub fn new(is_working_day: bool, hour: u8) -> Self {
        let day_class = if is_working_day {
            DayClass::Working
        } else {
            DayClass::NonWorking
        };
        BucketKey { day_class, hour }
    }
}

/// One hourly row of the resampled series.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub timestamp: NaiveDateTime,
    pub total_consumption: f64,
    pub date: NaiveDate,
    pub weekday_index: u8,
    pub is_working_day: bool,
    pub hour_of_day: u8,
    pub floors: [f64; FLOOR_COUNT],
    pub zones: [f64; ZONE_COUNT],
}

impl Reading {
    /// Builds a reading whose calendar fields are derived from the timestamp.
    pub fn at(timestamp: NaiveDateTime, total_consumption: f64) -> Self {
        let weekday_index = timestamp.weekday().num_days_from_monday() as u8;
        Reading {
            timestamp,
            total_consumption,
            date: timestamp.date(),
            weekday_index,
            is_working_day: weekday_index < 5,
            hour_of_day: timestamp.hour() as u8,
            floors: [0.0; FLOOR_COUNT],
            zones: [0.0; ZONE_COUNT],
        }
    }

    pub fn bucket(&self) -> BucketKey {
        BucketKey::new(self.is_working_day, self.hour_of_day)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub warning: f64,
    pub danger: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LabeledReading {
    pub reading: Reading,
    pub warning_threshold: Option<f64>,
    pub danger_threshold: Option<f64>,
    pub is_warning: bool,
    pub is_danger: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailySummary {
    pub date: NaiveDate,
    pub total_consumption: f64,
    #[serde(rename = "warning")]
    pub warning_count: usize,
    #[serde(rename = "danger")]
    pub danger_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourlySummary {
    pub date: NaiveDate,
    pub hour: u8,
    pub total_consumption: f64,
    #[serde(rename = "warning")]
    pub warning_count: usize,
    #[serde(rename = "danger")]
    pub danger_count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConsumptionOverview {
    pub working_day_daily_mean: Option<f64>,
    pub non_working_day_daily_mean: Option<f64>,
    pub warning_ratio_pct: f64,
    pub danger_ratio_pct: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DayDetail {
    pub date: NaiveDate,
    pub hours: Vec<LabeledReading>,
}
