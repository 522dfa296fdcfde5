//! Short-horizon demand prediction from calendar features.
//!
//! Supervised task, so unlike the anomaly pass it holds out a random test
//! partition: a seeded shuffle picks `test_fraction` of the rows, a random
//! forest fits on the rest, and MAE / R² come from the held-out rows only.

use crate::domain::errors::PipelineError;
use crate::domain::types::FeatureRow;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use smartcore::ensemble::random_forest_regressor::{
    RandomForestRegressor, RandomForestRegressorParameters,
};
use smartcore::linalg::basic::matrix::DenseMatrix;
use tracing::debug;

const N_TREES: usize = 100;
const N_FEATURES: usize = 3;
const MIN_ROWS: usize = 5;
const STAGE: &str = "demand predictor";

#[derive(Debug, Clone)]
pub struct DemandPredictor {
    test_fraction: f64,
    random_seed: u64,
}

/// Forecast output for one run. `predictions` is aligned with the input rows;
/// entries are `Some` only for rows that fell into the test partition.
#[derive(Debug, Clone, PartialEq)]
pub struct DemandForecast {
    pub predictions: Vec<Option<f64>>,
    pub mean_absolute_error: f64,
    pub r_squared: f64,
}

impl DemandPredictor {
    pub fn new(test_fraction: f64, random_seed: u64) -> Self {
        Self {
            test_fraction,
            random_seed,
        }
    }

    pub fn fit_evaluate(&self, rows: &[FeatureRow]) -> Result<DemandForecast, PipelineError> {
        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            return Err(PipelineError::validation(format!(
                "test_fraction must be in (0, 1), got {}",
                self.test_fraction
            )));
        }
        if rows.len() < MIN_ROWS {
            return Err(PipelineError::validation(format!(
                "demand prediction needs at least {MIN_ROWS} rows, got {}",
                rows.len()
            )));
        }

        let n = rows.len();
        let mut indices: Vec<usize> = (0..n).collect();
        let mut rng = StdRng::seed_from_u64(self.random_seed);
        indices.shuffle(&mut rng);
        let n_test = ((n as f64 * self.test_fraction).ceil() as usize).clamp(1, n - 1);
        let (test_idx, train_idx) = indices.split_at(n_test);

        let x_train: Vec<Vec<f64>> = train_idx.iter().map(|&i| feature_vector(&rows[i])).collect();
        let y_train: Vec<f64> = train_idx.iter().map(|&i| rows[i].usage_kwh).collect();
        let x_test: Vec<Vec<f64>> = test_idx.iter().map(|&i| feature_vector(&rows[i])).collect();
        let y_test: Vec<f64> = test_idx.iter().map(|&i| rows[i].usage_kwh).collect();

        debug!(
            "fitting random forest on {} rows, evaluating on {}",
            train_idx.len(),
            test_idx.len()
        );

        let x_train_m = DenseMatrix::from_2d_vec(&x_train)
            .map_err(|e| PipelineError::model_fitting(STAGE, e.to_string()))?;
        // All features are candidates at every split; with only three
        // columns, subsampling them leaves the trees unable to split.
        let params = RandomForestRegressorParameters::default()
            .with_n_trees(N_TREES)
            .with_m(N_FEATURES)
            .with_seed(self.random_seed);
        let model = RandomForestRegressor::fit(&x_train_m, &y_train, params)
            .map_err(|e| PipelineError::model_fitting(STAGE, e.to_string()))?;

        let x_test_m = DenseMatrix::from_2d_vec(&x_test)
            .map_err(|e| PipelineError::model_fitting(STAGE, e.to_string()))?;
        let predicted: Vec<f64> = model
            .predict(&x_test_m)
            .map_err(|e| PipelineError::model_fitting(STAGE, e.to_string()))?;

        let m = predicted.len() as f64;
        let mae = predicted
            .iter()
            .zip(y_test.iter())
            .map(|(p, t)| (p - t).abs())
            .sum::<f64>()
            / m;
        let sq_err: f64 = predicted
            .iter()
            .zip(y_test.iter())
            .map(|(p, t)| (p - t).powi(2))
            .sum();
        let mean_y = y_test.iter().sum::<f64>() / m;
        let var_y = y_test.iter().map(|t| (t - mean_y).powi(2)).sum::<f64>() / m;
        let r_squared = if var_y > 0.0 {
            1.0 - (sq_err / m) / var_y
        } else {
            0.0
        };

        let mut predictions = vec![None; n];
        for (k, &i) in test_idx.iter().enumerate() {
            predictions[i] = Some(predicted[k]);
        }

        Ok(DemandForecast {
            predictions,
            mean_absolute_error: mae,
            r_squared,
        })
    }
}

fn feature_vector(row: &FeatureRow) -> Vec<f64> {
    vec![
        row.day_of_week as f64,
        row.hour as f64,
        if row.is_weekend { 1.0 } else { 0.0 },
    ]
}
