//! Unsupervised anomaly labeling over `(usage_kWh, hour)`.
//!
//! Isolation forest: points are isolated by recursive random partitioning of
//! feature space; the fewer splits a point needs, the more anomalous it is.
//! Scoring runs over the whole series (no held-out split) since the task is
//! unsupervised. The contamination setting picks the score threshold, with
//! ties broken by ascending row index so labeling is fully deterministic
//! under a fixed seed.

use crate::domain::errors::PipelineError;
use crate::domain::types::{AnomalyLabel, FeatureRow};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::cmp::Ordering;
use tracing::debug;

const N_TREES: usize = 100;
const MAX_SUBSAMPLE: usize = 256;
const MIN_ROWS: usize = 2;
const EULER_MASCHERONI: f64 = 0.577_215_664_901_532_9;

#[derive(Debug, Clone)]
pub struct AnomalyDetector {
    contamination: f64,
    random_seed: u64,
}

enum Node {
    Internal {
        feature: usize,
        split: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
    Leaf {
        size: usize,
    },
}

impl AnomalyDetector {
    pub fn new(contamination: f64, random_seed: u64) -> Self {
        Self {
            contamination,
            random_seed,
        }
    }

    /// Labels every row Normal or Anomaly. The top `round(contamination * n)`
    /// scores are flagged.
    pub fn label(&self, rows: &[FeatureRow]) -> Result<Vec<AnomalyLabel>, PipelineError> {
        if !(self.contamination > 0.0 && self.contamination < 0.5) {
            return Err(PipelineError::validation(format!(
                "contamination must be in (0, 0.5), got {}",
                self.contamination
            )));
        }
        if rows.len() < MIN_ROWS {
            return Err(PipelineError::validation(format!(
                "anomaly detection needs at least {MIN_ROWS} rows, got {}",
                rows.len()
            )));
        }

        let points: Vec<[f64; 2]> = rows
            .iter()
            .map(|r| [r.usage_kwh, r.hour as f64])
            .collect();
        let scores = self.score(&points);

        let n = rows.len();
        let quota = (self.contamination * n as f64).round() as usize;
        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| {
            scores[b]
                .partial_cmp(&scores[a])
                .unwrap_or(Ordering::Equal)
                .then(a.cmp(&b))
        });

        let mut labels = vec![AnomalyLabel::Normal; n];
        for &idx in order.iter().take(quota) {
            labels[idx] = AnomalyLabel::Anomaly;
        }
        debug!(
            "isolation forest flagged {quota} of {n} rows (contamination={})",
            self.contamination
        );
        Ok(labels)
    }

    /// Anomaly score per point in [0, 1]; higher is more anomalous.
    fn score(&self, points: &[[f64; 2]]) -> Vec<f64> {
        let n = points.len();
        let subsample = n.min(MAX_SUBSAMPLE);
        let height_limit = (subsample as f64).log2().ceil().max(1.0) as usize;
        let mut rng = StdRng::seed_from_u64(self.random_seed);

        let mut path_sums = vec![0.0; n];
        for _ in 0..N_TREES {
            let sample = rand::seq::index::sample(&mut rng, n, subsample).into_vec();
            let tree = build_tree(points, sample, 0, height_limit, &mut rng);
            for (i, point) in points.iter().enumerate() {
                path_sums[i] += path_length(&tree, point, 0);
            }
        }

        let normalizer = average_path_length(subsample);
        path_sums
            .iter()
            .map(|sum| {
                let mean_path = sum / N_TREES as f64;
                2.0_f64.powf(-mean_path / normalizer)
            })
            .collect()
    }
}

fn build_tree(
    points: &[[f64; 2]],
    indices: Vec<usize>,
    depth: usize,
    height_limit: usize,
    rng: &mut StdRng,
) -> Node {
    if depth >= height_limit || indices.len() <= 1 {
        return Node::Leaf {
            size: indices.len(),
        };
    }

    // Only features with spread in this partition are splittable.
    let mut candidates = Vec::with_capacity(2);
    for feature in 0..2 {
        let (min, max) = indices.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &i| {
            let v = points[i][feature];
            (lo.min(v), hi.max(v))
        });
        if min < max {
            candidates.push((feature, min, max));
        }
    }
    if candidates.is_empty() {
        return Node::Leaf {
            size: indices.len(),
        };
    }

    let (feature, min, max) = candidates[rng.random_range(0..candidates.len())];
    let split = rng.random_range(min..max);
    let (left_idx, right_idx): (Vec<usize>, Vec<usize>) =
        indices.into_iter().partition(|&i| points[i][feature] < split);

    Node::Internal {
        feature,
        split,
        left: Box::new(build_tree(points, left_idx, depth + 1, height_limit, rng)),
        right: Box::new(build_tree(points, right_idx, depth + 1, height_limit, rng)),
    }
}

fn path_length(node: &Node, point: &[f64; 2], depth: usize) -> f64 {
    match node {
        Node::Leaf { size } => depth as f64 + average_path_length(*size),
        Node::Internal {
            feature,
            split,
            left,
            right,
        } => {
            if point[*feature] < *split {
                path_length(left, point, depth + 1)
            } else {
                path_length(right, point, depth + 1)
            }
        }
    }
}

/// Expected path length of an unsuccessful BST search over `n` points,
/// the standard isolation-forest normalizer c(n).
fn average_path_length(n: usize) -> f64 {
    if n <= 1 {
        return 0.0;
    }
    let n = n as f64;
    2.0 * ((n - 1.0).ln() + EULER_MASCHERONI) - 2.0 * (n - 1.0) / n
}
