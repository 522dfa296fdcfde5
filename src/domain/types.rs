use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One raw input record: a timestamp and the metered usage for that interval.
/// Immutable once parsed; validation happens at ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub timestamp: NaiveDateTime,
    pub usage_kwh: f64,
}

/// A Reading enriched with its calendar features and trailing rolling mean.
///
/// Rows are always sorted by ascending timestamp before any model consumes
/// them; that order is the contract for rolling-window and train/test
/// semantics downstream.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    pub timestamp: NaiveDateTime,
    pub usage_kwh: f64,
    /// Hour of day, 0-23.
    pub hour: u32,
    /// 0 = Monday .. 6 = Sunday.
    pub day_of_week: u32,
    pub is_weekend: bool,
    pub rolling_mean: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnomalyLabel {
    Normal,
    Anomaly,
}

impl fmt::Display for AnomalyLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnomalyLabel::Normal => write!(f, "Normal"),
            AnomalyLabel::Anomaly => write!(f, "Anomaly"),
        }
    }
}

impl FromStr for AnomalyLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Normal" => Ok(AnomalyLabel::Normal),
            "Anomaly" => Ok(AnomalyLabel::Anomaly),
            _ => Err(format!("unknown anomaly label: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recommendation {
    TurnOffIdleMachines,
    AllGood,
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Recommendation::TurnOffIdleMachines => write!(f, "Turn off idle machines"),
            Recommendation::AllGood => write!(f, "All good"),
        }
    }
}

impl FromStr for Recommendation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Turn off idle machines" => Ok(Recommendation::TurnOffIdleMachines),
            "All good" => Ok(Recommendation::AllGood),
            _ => Err(format!("unknown recommendation: {s}")),
        }
    }
}

/// Terminal per-row artifact of one pipeline run. Never mutated afterward.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotatedRow {
    pub feature: FeatureRow,
    pub anomaly: AnomalyLabel,
    pub recommendation: Recommendation,
    /// Set only when the row fell into the forecast test partition.
    pub predicted_usage: Option<f64>,
}

/// Accuracy summary for one pipeline run, computed from the held-out
/// test partition and the anomaly labeling pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetrics {
    pub mean_absolute_error: f64,
    pub r_squared: f64,
    pub anomaly_count: usize,
    /// The contamination setting the run was labeled under.
    pub contamination_rate: f64,
}
