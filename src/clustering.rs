//! K-Means clustering of outlier rows
//!
//! Unsupervised: takes X only. `fit_predict` assigns every row a cluster id
//! in `[0, k)`; ids carry no meaning beyond grouping and are only stable
//! across fits for a fixed seed.

use crate::error::{KolosalError, Result};
use ndarray::{Array1, Array2, ArrayView1};
use rand::RngCore;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// K-Means clustering with k-means++ initialization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KMeans {
    pub n_clusters: usize,
    pub max_iter: usize,
    pub tol: f64,
    pub random_state: u64,
    /// Fitted cluster centroids (n_clusters × n_features)
    centroids: Option<Array2<f64>>,
    /// Sum of squared distances to nearest centroid (inertia)
    inertia: Option<f64>,
    /// Iterations used by the last fit
    n_iter: usize,
}

impl Default for KMeans {
    fn default() -> Self {
        Self::new(4)
    }
}

impl KMeans {
    pub fn new(n_clusters: usize) -> Self {
        Self {
            n_clusters,
            max_iter: 300,
            tol: 1e-4,
            random_state: 42,
            centroids: None,
            inertia: None,
            n_iter: 0,
        }
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    /// K-means++ initialization: pick centroids spread apart
    fn kmeans_pp_init(x: &Array2<f64>, k: usize, rng: &mut ChaCha8Rng) -> Array2<f64> {
        let n_samples = x.nrows();
        let mut centroids = Array2::zeros((k, x.ncols()));

        let first = (rng.next_u64() as usize) % n_samples;
        centroids.row_mut(0).assign(&x.row(first));

        for c in 1..k {
            // Squared distance to the nearest centroid chosen so far
            let dists: Vec<f64> = x
                .rows()
                .into_iter()
                .map(|row| {
                    (0..c)
                        .map(|j| Self::euclidean_sq(&row, &centroids.row(j)))
                        .fold(f64::MAX, f64::min)
                })
                .collect();

            let total: f64 = dists.iter().sum();
            if total <= 0.0 {
                let idx = (rng.next_u64() as usize) % n_samples;
                centroids.row_mut(c).assign(&x.row(idx));
                continue;
            }

            // Weighted random selection proportional to D²
            let r = (rng.next_u64() as f64 / u64::MAX as f64) * total;
            let mut cumulative = 0.0;
            let mut chosen = n_samples - 1;
            for (i, &d) in dists.iter().enumerate() {
                cumulative += d;
                if d > 0.0 && cumulative >= r {
                    chosen = i;
                    break;
                }
            }
            centroids.row_mut(c).assign(&x.row(chosen));
        }

        centroids
    }

    fn euclidean_sq(a: &ArrayView1<f64>, b: &ArrayView1<f64>) -> f64 {
        a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum()
    }

    fn nearest(row: &ArrayView1<f64>, centroids: &Array2<f64>) -> usize {
        let mut best_c = 0;
        let mut best_dist = f64::MAX;
        for (c, centroid) in centroids.rows().into_iter().enumerate() {
            let d = Self::euclidean_sq(row, &centroid);
            if d < best_dist {
                best_dist = d;
                best_c = c;
            }
        }
        best_c
    }

    fn assign(x: &Array2<f64>, centroids: &Array2<f64>) -> Array1<usize> {
        x.rows()
            .into_iter()
            .map(|row| Self::nearest(&row, centroids))
            .collect()
    }

    /// Fit the model and return one cluster id per row
    pub fn fit_predict(&mut self, x: &Array2<f64>) -> Result<Array1<usize>> {
        let n_samples = x.nrows();
        if self.n_clusters == 0 {
            return Err(KolosalError::ConfigError(
                "n_clusters must be at least 1".to_string(),
            ));
        }
        if n_samples < self.n_clusters {
            return Err(KolosalError::ConfigError(format!(
                "cannot form {} clusters from {} rows",
                self.n_clusters, n_samples
            )));
        }

        let mut rng = ChaCha8Rng::seed_from_u64(self.random_state);
        let mut centroids = Self::kmeans_pp_init(x, self.n_clusters, &mut rng);
        let mut labels = Self::assign(x, &centroids);
        let mut n_iter = 0;

        for _ in 0..self.max_iter {
            n_iter += 1;

            // Update step: recompute centroids; an empty cluster keeps its centroid
            let mut sums = Array2::<f64>::zeros(centroids.dim());
            let mut counts = vec![0usize; self.n_clusters];
            for (row, &c) in x.rows().into_iter().zip(labels.iter()) {
                counts[c] += 1;
                let mut acc = sums.row_mut(c);
                acc += &row;
            }

            let mut new_centroids = centroids.clone();
            for (c, &count) in counts.iter().enumerate() {
                if count > 0 {
                    new_centroids
                        .row_mut(c)
                        .assign(&sums.row(c).mapv(|v| v / count as f64));
                }
            }

            let shift: f64 = centroids
                .iter()
                .zip(new_centroids.iter())
                .map(|(a, b)| (a - b).powi(2))
                .sum::<f64>()
                .sqrt();
            centroids = new_centroids;

            // Assignment step
            let new_labels = Self::assign(x, &centroids);
            let changed = new_labels
                .iter()
                .zip(labels.iter())
                .filter(|(a, b)| a != b)
                .count();
            labels = new_labels;

            if changed == 0 || shift < self.tol {
                break;
            }
        }

        let inertia: f64 = x
            .rows()
            .into_iter()
            .zip(labels.iter())
            .map(|(row, &c)| Self::euclidean_sq(&row, &centroids.row(c)))
            .sum();

        let empty = (0..self.n_clusters)
            .filter(|c| !labels.iter().any(|l| l == c))
            .count();
        if empty > 0 {
            warn!(empty, k = self.n_clusters, "k-means converged with empty clusters");
        }
        debug!(rows = n_samples, k = self.n_clusters, n_iter, inertia, "fitted k-means");

        self.centroids = Some(centroids);
        self.inertia = Some(inertia);
        self.n_iter = n_iter;
        Ok(labels)
    }

    /// Assign new rows to the nearest fitted centroid
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<usize>> {
        let centroids = self.centroids.as_ref().ok_or_else(|| {
            KolosalError::StateError("k-means is not fitted".to_string())
        })?;
        Ok(Self::assign(x, centroids))
    }

    /// Get cluster centroids
    pub fn centroids(&self) -> Option<&Array2<f64>> {
        self.centroids.as_ref()
    }

    pub fn inertia(&self) -> Option<f64> {
        self.inertia
    }

    pub fn n_iter(&self) -> usize {
        self.n_iter
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_kmeans_basic() {
        // Two clear clusters
        let x = array![
            [1.0, 1.0], [1.5, 1.5], [1.2, 1.3],
            [8.0, 8.0], [8.5, 8.5], [8.2, 8.3],
        ];
        let mut model = KMeans::new(2);
        let labels = model.fit_predict(&x).unwrap();
        assert_eq!(labels.len(), 6);
        assert_eq!(labels[0], labels[1]);
        assert_eq!(labels[0], labels[2]);
        assert_eq!(labels[3], labels[4]);
        assert_eq!(labels[3], labels[5]);
        assert_ne!(labels[0], labels[3]);
    }

    #[test]
    fn test_kmeans_predict() {
        let x = array![
            [0.0, 0.0], [0.5, 0.5],
            [10.0, 10.0], [10.5, 10.5],
        ];
        let mut model = KMeans::new(2);
        model.fit_predict(&x).unwrap();

        let new_x = array![[0.1, 0.1], [10.1, 10.1]];
        let labels = model.predict(&new_x).unwrap();
        assert_ne!(labels[0], labels[1]);
    }

    #[test]
    fn test_kmeans_inertia() {
        let x = array![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [10.0, 10.0]];
        let mut model = KMeans::new(2);
        model.fit_predict(&x).unwrap();
        assert!(model.inertia().unwrap() > 0.0);
    }

    #[test]
    fn test_more_clusters_than_rows() {
        let x = array![[0.0], [1.0], [2.0]];
        let mut model = KMeans::new(5);
        assert!(matches!(model.fit_predict(&x), Err(KolosalError::ConfigError(_))));
        assert!(model.centroids().is_none());
    }

    #[test]
    fn test_zero_clusters() {
        let x = array![[0.0], [1.0]];
        assert!(matches!(
            KMeans::new(0).fit_predict(&x),
            Err(KolosalError::ConfigError(_))
        ));
    }

    #[test]
    fn test_identical_rows_allow_empty_clusters() {
        let x = Array2::from_elem((3, 2), 10.0);
        let mut model = KMeans::new(2);
        let labels = model.fit_predict(&x).unwrap();
        assert!(labels.iter().all(|&l| l < 2));
        assert_eq!(model.inertia(), Some(0.0));
    }

    #[test]
    fn test_same_seed_same_labels() {
        let x = array![[0.0, 1.0], [0.2, 0.8], [5.0, 5.0], [5.1, 4.9], [9.0, 0.0], [8.8, 0.3]];
        let a = KMeans::new(3).with_random_state(11).fit_predict(&x).unwrap();
        let b = KMeans::new(3).with_random_state(11).fit_predict(&x).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_predict_before_fit() {
        let model = KMeans::new(2);
        assert!(matches!(
            model.predict(&array![[1.0]]),
            Err(KolosalError::StateError(_))
        ));
    }
}
