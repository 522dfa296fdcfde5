//! Pipeline configuration.
//!
//! Tunables load from environment variables with script-era defaults; the CLI
//! overrides individual values from its flags. Range validation lives here so
//! the orchestrator can reject a bad configuration before any model is fit.

use crate::application::recommend::DEFAULT_THRESHOLD_KWH;
use crate::domain::errors::PipelineError;
use anyhow::{Context, Result};
use std::env;

/// Tunable parameters for one pipeline invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Expected fraction of anomalous points, hard bound (0, 0.5).
    pub contamination: f64,
    /// Held-out fraction for forecast evaluation, bound (0, 1).
    pub test_fraction: f64,
    /// Usage above this many kWh triggers the turn-off recommendation.
    pub recommendation_threshold: f64,
    /// Trailing window length for the rolling mean.
    pub rolling_window: usize,
    /// Seed shared by the anomaly detector and the demand predictor.
    pub random_seed: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            contamination: 0.05,
            test_fraction: 0.2,
            recommendation_threshold: DEFAULT_THRESHOLD_KWH,
            rolling_window: 3,
            random_seed: 42,
        }
    }
}

impl PipelineConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            contamination: read_f64("CONTAMINATION_RATE", defaults.contamination)?,
            test_fraction: read_f64("TEST_FRACTION", defaults.test_fraction)?,
            recommendation_threshold: read_f64(
                "RECOMMENDATION_THRESHOLD_KWH",
                defaults.recommendation_threshold,
            )?,
            rolling_window: read_usize("ROLLING_WINDOW", defaults.rolling_window)?,
            random_seed: read_u64("RANDOM_SEED", defaults.random_seed)?,
        })
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        if !(self.contamination > 0.0 && self.contamination < 0.5) {
            return Err(PipelineError::validation(format!(
                "contamination must be in (0, 0.5), got {}",
                self.contamination
            )));
        }
        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            return Err(PipelineError::validation(format!(
                "test_fraction must be in (0, 1), got {}",
                self.test_fraction
            )));
        }
        if !self.recommendation_threshold.is_finite() || self.recommendation_threshold < 0.0 {
            return Err(PipelineError::validation(format!(
                "recommendation_threshold must be a non-negative number, got {}",
                self.recommendation_threshold
            )));
        }
        if self.rolling_window == 0 {
            return Err(PipelineError::validation(
                "rolling_window must be at least 1",
            ));
        }
        Ok(())
    }
}

fn read_f64(key: &str, default: f64) -> Result<f64> {
    match env::var(key) {
        Ok(raw) => raw
            .parse::<f64>()
            .with_context(|| format!("invalid value for {key}: {raw}")),
        Err(_) => Ok(default),
    }
}

fn read_usize(key: &str, default: usize) -> Result<usize> {
    match env::var(key) {
        Ok(raw) => raw
            .parse::<usize>()
            .with_context(|| format!("invalid value for {key}: {raw}")),
        Err(_) => Ok(default),
    }
}

fn read_u64(key: &str, default: u64) -> Result<u64> {
    match env::var(key) {
        Ok(raw) => raw
            .parse::<u64>()
            .with_context(|| format!("invalid value for {key}: {raw}")),
        Err(_) => Ok(default),
    }
}
