//! CSV collaborator: ingestion of raw readings and export of the annotated
//! table. The core owns no file format; this module only honors the
//! `Date` / `Energy_Usage_kWh` contract the caller feeds it.

use crate::domain::errors::PipelineError;
use crate::domain::types::{AnnotatedRow, Reading};
use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use std::io;
use tracing::debug;

const DATE_COLUMN: &str = "Date";
const USAGE_COLUMN: &str = "Energy_Usage_kWh";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Parses readings from CSV. Requires `Date` and `Energy_Usage_kWh` columns;
/// anything else is ignored. Every row is validated here, before any derived
/// computation sees it.
pub fn read_readings<R: io::Read>(reader: R) -> Result<Vec<Reading>, PipelineError> {
    let mut rdr = csv::Reader::from_reader(reader);
    let headers = rdr
        .headers()
        .map_err(|e| PipelineError::validation(format!("unreadable CSV header: {e}")))?
        .clone();
    let date_idx = headers
        .iter()
        .position(|h| h == DATE_COLUMN)
        .ok_or_else(|| {
            PipelineError::validation(format!("CSV is missing required column {DATE_COLUMN}"))
        })?;
    let usage_idx = headers
        .iter()
        .position(|h| h == USAGE_COLUMN)
        .ok_or_else(|| {
            PipelineError::validation(format!("CSV is missing required column {USAGE_COLUMN}"))
        })?;

    let mut readings = Vec::new();
    for (i, record) in rdr.records().enumerate() {
        // 1-based file line, counting the header, so messages match what a
        // user sees in an editor.
        let line = i + 2;
        let record = record.map_err(|e| {
            PipelineError::validation(format!("bad CSV record at line {line}: {e}"))
        })?;
        let raw_date = record.get(date_idx).ok_or_else(|| {
            PipelineError::validation(format!("line {line} has no {DATE_COLUMN} field"))
        })?;
        let raw_usage = record.get(usage_idx).ok_or_else(|| {
            PipelineError::validation(format!("line {line} has no {USAGE_COLUMN} field"))
        })?;

        let timestamp = parse_timestamp(raw_date).map_err(|reason| {
            PipelineError::validation(format!("unparsable date at line {line}: {reason}"))
        })?;
        let usage_kwh: f64 = raw_usage.trim().parse().map_err(|_| {
            PipelineError::validation(format!(
                "non-numeric usage at line {line}: {raw_usage:?}"
            ))
        })?;
        if !usage_kwh.is_finite() || usage_kwh < 0.0 {
            return Err(PipelineError::validation(format!(
                "usage must be a non-negative number, got {usage_kwh} at line {line}"
            )));
        }
        readings.push(Reading {
            timestamp,
            usage_kwh,
        });
    }
    debug!("parsed {} readings from CSV", readings.len());
    Ok(readings)
}

/// Writes the annotated table with the columns the caller displays and
/// re-exports. `PredictedUsage` is blank outside the test partition.
pub fn write_annotated<W: io::Write>(writer: W, rows: &[AnnotatedRow]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record([
        DATE_COLUMN,
        USAGE_COLUMN,
        "RollingMean",
        "Recommendation",
        "Anomaly",
        "PredictedUsage",
    ])
    .context("failed to write CSV header")?;

    for row in rows {
        wtr.write_record([
            row.feature.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            row.feature.usage_kwh.to_string(),
            row.feature.rolling_mean.to_string(),
            row.recommendation.to_string(),
            row.anomaly.to_string(),
            row.predicted_usage.map(|p| p.to_string()).unwrap_or_default(),
        ])
        .context("failed to write CSV row")?;
    }
    wtr.flush().context("failed to flush CSV output")?;
    Ok(())
}

fn parse_timestamp(raw: &str) -> Result<NaiveDateTime, String> {
    let raw = raw.trim();
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S"))
        .or_else(|_| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d").map(|d| d.and_time(NaiveTime::MIN))
        })
        .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_required_columns_and_ignores_extras() {
        let csv = "Site,Date,Energy_Usage_kWh\n\
                   A,2024-01-01T08:00:00,42.5\n\
                   A,2024-01-02 09:30:00,50\n\
                   A,2024-01-03,0\n";
        let readings = read_readings(csv.as_bytes()).unwrap();
        assert_eq!(readings.len(), 3);
        assert_eq!(readings[0].usage_kwh, 42.5);
        assert_eq!(readings[1].timestamp.format("%H:%M").to_string(), "09:30");
        assert_eq!(readings[2].timestamp.format("%H:%M").to_string(), "00:00");
    }

    #[test]
    fn test_missing_usage_column_rejected() {
        let csv = "Date,Power\n2024-01-01,10\n";
        let err = read_readings(csv.as_bytes()).unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("Energy_Usage_kWh"));
    }

    #[test]
    fn test_missing_date_column_rejected() {
        let csv = "Timestamp,Energy_Usage_kWh\n2024-01-01,10\n";
        let err = read_readings(csv.as_bytes()).unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("Date"));
    }

    #[test]
    fn test_non_numeric_usage_rejected() {
        let csv = "Date,Energy_Usage_kWh\n2024-01-01,lots\n";
        let err = read_readings(csv.as_bytes()).unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("non-numeric"));
    }

    #[test]
    fn test_negative_usage_rejected() {
        let csv = "Date,Energy_Usage_kWh\n2024-01-01,-3\n";
        let err = read_readings(csv.as_bytes()).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_errors_report_one_based_file_lines() {
        // The header is line 1; the first bad record below sits on line 3.
        let csv = "Date,Energy_Usage_kWh\n\
                   2024-01-01,10\n\
                   2024-01-02,not-a-number\n";
        let err = read_readings(csv.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("line 3"), "got: {err}");
    }

    #[test]
    fn test_unparsable_date_rejected() {
        let csv = "Date,Energy_Usage_kWh\nnext tuesday,10\n";
        let err = read_readings(csv.as_bytes()).unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("unparsable date"));
    }
}
