use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::error::Result;
use crate::models::{LabeledReading, FLOOR_COUNT, ZONE_COUNT};

/// Writes the labeled series; sub-meter columns follow the fixed columns as F1..F7, Zone1..Zone5.
pub fn write_labeled<W: Write>(writer: W, rows: &[LabeledReading]) -> Result<()> {
    let mut out = csv::Writer::from_writer(writer);

    let mut header: Vec<String> = [
        "timestamp",
        "date",
        "weekday",
        "workingday",
        "hour",
        "total_consumption",
        "warning_threshold",
        "danger_threshold",
        "warning",
        "danger",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    header.extend((1..=FLOOR_COUNT).map(|i| format!("F{i}")));
    header.extend((1..=ZONE_COUNT).map(|i| format!("Zone{i}")));
    out.write_record(&header)?;

    for row in rows {
        let r = &row.reading;
        let mut record = vec![
            r.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            r.date.to_string(),
            r.weekday_index.to_string(),
            (r.is_working_day as u8).to_string(),
            r.hour_of_day.to_string(),
            r.total_consumption.to_string(),
            row.warning_threshold.map(|v| v.to_string()).unwrap_or_default(),
            row.danger_threshold.map(|v| v.to_string()).unwrap_or_default(),
            (row.is_warning as u8).to_string(),
            (row.is_danger as u8).to_string(),
        ];
        record.extend(row.reading.floors.iter().map(|v| v.to_string()));
        record.extend(row.reading.zones.iter().map(|v| v.to_string()));
        out.write_record(&record)?;
    }

    out.flush()?;
    Ok(())
}

/// Serializes any summary rows with a header derived from their field names.
pub fn write_rows<W: Write, T: Serialize>(writer: W, rows: &[T]) -> Result<()> {
    let mut out = csv::Writer::from_writer(writer);
    for row in rows {
        out.serialize(row)?;
    }
    out.flush()?;
    Ok(())
}

pub fn write_file<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let file = std::fs::File::create(path)?;
    write_rows(file, rows)
}
