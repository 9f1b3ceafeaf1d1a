//! Isolation Forest anomaly detection

use crate::anomaly::{AnomalyDetector, NORMAL, OUTLIER};
use crate::config::validate_contamination;
use crate::error::{KolosalError, Result};
use ndarray::{Array1, Array2};
use rand::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::debug;

const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// Isolation Tree node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum IsolationTree {
    /// Internal node with split
    Internal {
        /// Feature index for split
        feature: usize,
        /// Split threshold
        threshold: f64,
        /// Left subtree (values < threshold)
        left: Box<IsolationTree>,
        /// Right subtree (values >= threshold)
        right: Box<IsolationTree>,
    },
    /// External (leaf) node
    External {
        /// Number of samples in this node
        size: usize,
    },
}

impl IsolationTree {
    /// Build an isolation tree over the rows in `indices`
    pub fn build(
        x: &Array2<f64>,
        indices: &[usize],
        height: usize,
        max_height: usize,
        rng: &mut impl Rng,
    ) -> Self {
        let n_samples = indices.len();

        if height >= max_height || n_samples <= 1 {
            return IsolationTree::External { size: n_samples };
        }

        let feature = rng.gen_range(0..x.ncols());

        let (min_val, max_val) = indices
            .iter()
            .map(|&i| x[[i, feature]])
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));

        // Constant or unbounded on this feature: nothing left to isolate along it
        if !min_val.is_finite() || !max_val.is_finite() || max_val - min_val < 1e-10 {
            return IsolationTree::External { size: n_samples };
        }

        let threshold = if (max_val - min_val).is_finite() {
            rng.gen_range(min_val..max_val)
        } else {
            // Span exceeds f64::MAX; interpolate between the bounds instead
            let u: f64 = rng.gen();
            min_val * (1.0 - u) + max_val * u
        };

        let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| x[[i, feature]] < threshold);

        if left_indices.is_empty() || right_indices.is_empty() {
            return IsolationTree::External { size: n_samples };
        }

        let left = Box::new(Self::build(x, &left_indices, height + 1, max_height, rng));
        let right = Box::new(Self::build(x, &right_indices, height + 1, max_height, rng));

        IsolationTree::Internal {
            feature,
            threshold,
            left,
            right,
        }
    }

    /// Compute path length for a sample
    pub fn path_length(&self, sample: &[f64], current_height: usize) -> f64 {
        match self {
            IsolationTree::External { size } => current_height as f64 + Self::c(*size),
            IsolationTree::Internal {
                feature,
                threshold,
                left,
                right,
            } => {
                if sample[*feature] < *threshold {
                    left.path_length(sample, current_height + 1)
                } else {
                    right.path_length(sample, current_height + 1)
                }
            }
        }
    }

    /// Average path length of an unsuccessful BST search over `n` points:
    /// c(n) = 2 * H(n-1) - 2(n-1)/n, with H(i) ~ ln(i) + gamma
    fn c(n: usize) -> f64 {
        match n {
            0 | 1 => 0.0,
            2 => 1.0,
            _ => {
                let n_f = n as f64;
                2.0 * ((n_f - 1.0).ln() + EULER_GAMMA) - 2.0 * (n_f - 1.0) / n_f
            }
        }
    }
}

/// Isolation Forest anomaly detector
///
/// `fit_predict` labels exactly `round(contamination * n)` rows as outliers:
/// rows are ranked by score, ties broken by row index. `predict` on other
/// data compares scores against the lowest outlier score seen during fit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IsolationForest {
    /// Number of trees
    n_estimators: usize,
    /// Maximum samples per tree
    max_samples: usize,
    /// Expected proportion of outliers, in (0, 1)
    contamination: f64,
    /// Random seed
    seed: Option<u64>,
    /// Fitted trees
    trees: Option<Vec<IsolationTree>>,
    /// Decision threshold
    threshold: Option<f64>,
    /// Number of samples used per tree
    n_samples: Option<usize>,
}

impl IsolationForest {
    /// Create new Isolation Forest
    pub fn new() -> Self {
        Self {
            n_estimators: 100,
            max_samples: 256,
            contamination: 0.1,
            seed: None,
            trees: None,
            threshold: None,
            n_samples: None,
        }
    }

    /// Set number of trees
    pub fn with_n_estimators(mut self, n: usize) -> Self {
        self.n_estimators = n.max(1);
        self
    }

    /// Set maximum samples per tree
    pub fn with_max_samples(mut self, n: usize) -> Self {
        self.max_samples = n.max(1);
        self
    }

    /// Set contamination ratio; checked on fit
    pub fn with_contamination(mut self, c: f64) -> Self {
        self.contamination = c;
        self
    }

    /// Set random seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn contamination(&self) -> f64 {
        self.contamination
    }

    pub fn is_fitted(&self) -> bool {
        self.trees.is_some()
    }

    /// Number of rows `fit_predict` labels as outliers for `n_rows` rows
    pub fn n_outliers(&self, n_rows: usize) -> usize {
        ((self.contamination * n_rows as f64).round() as usize).min(n_rows)
    }

    /// Compute anomaly score for samples
    /// Score is between 0 and 1, higher means more anomalous
    fn compute_scores(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let trees = self.trees.as_ref().ok_or_else(|| {
            KolosalError::StateError("isolation forest is not fitted".to_string())
        })?;

        let c_n = IsolationTree::c(self.n_samples.unwrap_or(self.max_samples));
        if c_n <= 0.0 {
            // A single training row cannot be isolated from anything
            return Ok(Array1::from_elem(x.nrows(), 0.5));
        }

        let scores: Vec<f64> = x
            .rows()
            .into_iter()
            .map(|row| {
                let sample: Vec<f64> = row.iter().copied().collect();

                let avg_path_length: f64 = trees
                    .iter()
                    .map(|tree| tree.path_length(&sample, 0))
                    .sum::<f64>()
                    / trees.len() as f64;

                // s(x, n) = 2^(-E[h(x)] / c(n))
                2.0_f64.powf(-avg_path_length / c_n)
            })
            .collect();

        Ok(Array1::from_vec(scores))
    }

    /// Grow the forest and return the training scores
    fn grow(&mut self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let n_samples = x.nrows();
        if n_samples == 0 {
            return Err(KolosalError::EmptyInputError(
                "outlier scorer received zero rows".to_string(),
            ));
        }
        if x.ncols() == 0 {
            return Err(KolosalError::EmptyInputError(
                "outlier scorer received zero columns".to_string(),
            ));
        }
        validate_contamination(self.contamination)?;

        let samples_per_tree = self.max_samples.min(n_samples);
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let max_height = (samples_per_tree as f64).log2().ceil() as usize;

        let trees: Vec<IsolationTree> = (0..self.n_estimators)
            .map(|_| {
                let indices =
                    rand::seq::index::sample(&mut rng, n_samples, samples_per_tree).into_vec();
                IsolationTree::build(x, &indices, 0, max_height, &mut rng)
            })
            .collect();

        debug!(
            trees = trees.len(),
            samples_per_tree, max_height, "grew isolation forest"
        );

        self.trees = Some(trees);
        self.n_samples = Some(samples_per_tree);
        self.compute_scores(x)
    }

    /// Row indices ordered from most to least anomalous
    fn rank(scores: &Array1<f64>) -> Vec<usize> {
        let mut order: Vec<usize> = (0..scores.len()).collect();
        order.sort_by(|&a, &b| {
            scores[b]
                .partial_cmp(&scores[a])
                .unwrap_or(Ordering::Equal)
                .then(a.cmp(&b))
        });
        order
    }

    /// Fit, then label the top-ranked rows; returns labels and training scores
    fn fit_ranked(&mut self, x: &Array2<f64>) -> Result<(Array1<i32>, Array1<f64>)> {
        let scores = self.grow(x)?;
        let n_outliers = self.n_outliers(x.nrows());
        let order = Self::rank(&scores);

        let mut labels = Array1::from_elem(x.nrows(), NORMAL);
        for &row in &order[..n_outliers] {
            labels[row] = OUTLIER;
        }

        self.threshold = Some(match n_outliers {
            0 => f64::INFINITY,
            n => scores[order[n - 1]],
        });

        Ok((labels, scores))
    }
}

impl Default for IsolationForest {
    fn default() -> Self {
        Self::new()
    }
}

impl AnomalyDetector for IsolationForest {
    fn fit(&mut self, x: &Array2<f64>) -> Result<()> {
        self.fit_ranked(x).map(|_| ())
    }

    fn score_samples(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.compute_scores(x)
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<i32>> {
        let threshold = self.threshold.ok_or_else(|| {
            KolosalError::StateError("isolation forest is not fitted".to_string())
        })?;
        let scores = self.score_samples(x)?;

        Ok(scores.mapv(|s| if s >= threshold { OUTLIER } else { NORMAL }))
    }

    fn fit_predict(&mut self, x: &Array2<f64>) -> Result<Array1<i32>> {
        self.fit_ranked(x).map(|(labels, _)| labels)
    }

    fn threshold(&self) -> f64 {
        self.threshold.unwrap_or(0.5)
    }
}
