use thiserror::Error;

/// Errors surfaced by the analytics pipeline.
///
/// Every stage failure aborts the whole invocation; the caller re-runs with
/// corrected input or configuration. Nothing here is fatal to the process.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Malformed input or out-of-range configuration, rejected before any
    /// model is fit.
    #[error("validation failed: {reason}")]
    Validation { reason: String },

    /// Numerical failure inside a model fit or prediction.
    #[error("model fitting failed in {stage}: {reason}")]
    ModelFitting { stage: &'static str, reason: String },
}

impl PipelineError {
    pub fn validation(reason: impl Into<String>) -> Self {
        PipelineError::Validation {
            reason: reason.into(),
        }
    }

    pub fn model_fitting(stage: &'static str, reason: impl Into<String>) -> Self {
        PipelineError::ModelFitting {
            stage,
            reason: reason.into(),
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, PipelineError::Validation { .. })
    }
}
