//! Feature derivation: calendar features and trailing rolling mean.

use crate::domain::errors::PipelineError;
use crate::domain::types::{FeatureRow, Reading};
use chrono::{Datelike, Timelike};
use statrs::statistics::{Data, Distribution};
use tracing::debug;

/// Converts raw readings into the feature table every model consumes.
///
/// Input is stably sorted by ascending timestamp first (ties keep input
/// order), so the rolling window and everything downstream operate on a
/// well-defined order regardless of how the CSV arrived.
pub fn derive_features(
    readings: &[Reading],
    window_size: usize,
) -> Result<Vec<FeatureRow>, PipelineError> {
    if readings.is_empty() {
        return Err(PipelineError::validation(
            "dataset is empty: at least one reading is required",
        ));
    }
    if window_size == 0 {
        return Err(PipelineError::validation("window_size must be at least 1"));
    }
    for (i, reading) in readings.iter().enumerate() {
        if !reading.usage_kwh.is_finite() {
            return Err(PipelineError::validation(format!(
                "usage must be a finite number, got {} at row {i}",
                reading.usage_kwh
            )));
        }
        if reading.usage_kwh < 0.0 {
            return Err(PipelineError::validation(format!(
                "usage must be non-negative, got {} at row {i}",
                reading.usage_kwh
            )));
        }
    }

    let mut sorted: Vec<Reading> = readings.to_vec();
    sorted.sort_by_key(|r| r.timestamp);

    let usage: Vec<f64> = sorted.iter().map(|r| r.usage_kwh).collect();
    let means = rolling_means(&usage, window_size);
    debug!("derived features for {} rows (window={})", sorted.len(), window_size);

    Ok(sorted
        .iter()
        .zip(means)
        .map(|(reading, rolling_mean)| FeatureRow {
            timestamp: reading.timestamp,
            usage_kwh: reading.usage_kwh,
            hour: reading.timestamp.hour(),
            day_of_week: reading.timestamp.weekday().num_days_from_monday(),
            is_weekend: reading.timestamp.weekday().num_days_from_monday() >= 5,
            rolling_mean,
        })
        .collect())
}

/// Trailing rolling mean with backward fill: rows before the first fully
/// windowed position copy that position's value. A series shorter than the
/// window gets the mean of everything it has.
fn rolling_means(usage: &[f64], window: usize) -> Vec<f64> {
    let n = usage.len();
    if n < window {
        let mean = Data::new(usage.to_vec()).mean().unwrap_or(0.0);
        return vec![mean; n];
    }
    let mut out = Vec::with_capacity(n);
    for i in (window - 1)..n {
        let data = Data::new(usage[i + 1 - window..=i].to_vec());
        out.push(data.mean().unwrap_or(0.0));
    }
    let mut means = vec![out[0]; window - 1];
    means.append(&mut out);
    means
}
