//! Anomaly detection module
//!
//! Unsupervised outlier scoring over a feature matrix. Labels follow the
//! usual convention: `1` for normal rows, `-1` for outliers.

mod isolation_forest;

pub use isolation_forest::{IsolationForest, IsolationTree};

use crate::error::Result;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Label of a normal row
pub const NORMAL: i32 = 1;
/// Label of an outlier row
pub const OUTLIER: i32 = -1;

/// Anomaly detection result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnomalyResult {
    /// Anomaly scores (higher = more anomalous)
    pub scores: Array1<f64>,
    /// Binary labels (-1 = anomaly, 1 = normal)
    pub labels: Array1<i32>,
    /// Threshold used for classification
    pub threshold: f64,
    /// Number of anomalies detected
    pub n_anomalies: usize,
}

/// Trait for anomaly detectors
pub trait AnomalyDetector: Send + Sync {
    /// Fit the detector on training data
    fn fit(&mut self, x: &Array2<f64>) -> Result<()>;

    /// Compute anomaly scores for new data
    fn score_samples(&self, x: &Array2<f64>) -> Result<Array1<f64>>;

    /// Predict labels (-1 = anomaly, 1 = normal)
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<i32>>;

    /// Fit and predict in one step
    fn fit_predict(&mut self, x: &Array2<f64>) -> Result<Array1<i32>> {
        self.fit(x)?;
        self.predict(x)
    }

    /// Get detection results with scores and labels
    fn detect(&self, x: &Array2<f64>) -> Result<AnomalyResult> {
        let scores = self.score_samples(x)?;
        let labels = self.predict(x)?;
        let threshold = self.threshold();
        let n_anomalies = labels.iter().filter(|&&l| l == OUTLIER).count();

        Ok(AnomalyResult {
            scores,
            labels,
            threshold,
            n_anomalies,
        })
    }

    /// Get the decision threshold
    fn threshold(&self) -> f64;
}

/// Row indices labeled as outliers, ascending
pub fn outlier_rows(labels: &Array1<i32>) -> Vec<usize> {
    labels
        .iter()
        .enumerate()
        .filter(|(_, &l)| l == OUTLIER)
        .map(|(i, _)| i)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_outlier_rows_keeps_original_indices() {
        let labels = array![1, -1, 1, 1, -1, -1];
        assert_eq!(outlier_rows(&labels), vec![1, 4, 5]);
    }
}
