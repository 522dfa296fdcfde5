//! Pipeline orchestration.
//!
//! One invocation is atomic: validate the configuration, derive features,
//! fan out the independent analysis stages, and merge everything into the
//! annotated table. Any stage error aborts the run with no partial output.

use crate::application::anomaly::AnomalyDetector;
use crate::application::features::derive_features;
use crate::application::forecast::DemandPredictor;
use crate::application::recommend::recommend;
use crate::config::PipelineConfig;
use crate::domain::errors::PipelineError;
use crate::domain::types::{AnnotatedRow, AnomalyLabel, ModelMetrics, Reading};
use tracing::info;

pub struct AnalyticsPipeline {
    config: PipelineConfig,
}

/// Everything one invocation produces.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub rows: Vec<AnnotatedRow>,
    pub metrics: ModelMetrics,
}

impl AnalyticsPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn run(&self, readings: &[Reading]) -> Result<PipelineOutput, PipelineError> {
        self.config.validate()?;

        let features = derive_features(readings, self.config.rolling_window)?;
        info!("derived features for {} readings", features.len());

        let detector = AnomalyDetector::new(self.config.contamination, self.config.random_seed);
        let predictor = DemandPredictor::new(self.config.test_fraction, self.config.random_seed);

        // The anomaly and forecast stages share nothing but the feature table.
        let (labels, forecast) = rayon::join(
            || detector.label(&features),
            || predictor.fit_evaluate(&features),
        );
        let labels = labels?;
        let forecast = forecast?;

        let anomaly_count = labels
            .iter()
            .filter(|l| **l == AnomalyLabel::Anomaly)
            .count();
        let metrics = ModelMetrics {
            mean_absolute_error: forecast.mean_absolute_error,
            r_squared: forecast.r_squared,
            anomaly_count,
            contamination_rate: self.config.contamination,
        };

        let threshold = self.config.recommendation_threshold;
        let rows: Vec<AnnotatedRow> = features
            .into_iter()
            .zip(labels)
            .zip(forecast.predictions)
            .map(|((feature, anomaly), predicted_usage)| AnnotatedRow {
                recommendation: recommend(feature.usage_kwh, threshold),
                anomaly,
                predicted_usage,
                feature,
            })
            .collect();

        info!(
            "pipeline complete: {} rows, {} anomalies, MAE={:.2} kWh, R²={:.2}",
            rows.len(),
            metrics.anomaly_count,
            metrics.mean_absolute_error,
            metrics.r_squared
        );
        Ok(PipelineOutput { rows, metrics })
    }
}
