//! Per-record operational recommendation.

use crate::domain::types::Recommendation;

pub const DEFAULT_THRESHOLD_KWH: f64 = 100.0;

/// Pure threshold rule: usage strictly above the threshold earns the
/// turn-off recommendation, the boundary itself does not.
pub fn recommend(usage_kwh: f64, threshold: f64) -> Recommendation {
    if usage_kwh > threshold {
        Recommendation::TurnOffIdleMachines
    } else {
        Recommendation::AllGood
    }
}
