//! End-to-end outlier pipeline
//!
//! Stages are distinct types, each consuming the previous one:
//!
//! ```text
//! OutlierPipeline --encode--> Encoded --score--> Scored --cluster--> Clustered --report--> OutlierReport
//! ```
//!
//! A stage cannot be skipped or revisited. Every run owns its own encoder and
//! models, so independent runs never share fitted state.

use crate::anomaly::{outlier_rows, AnomalyDetector, IsolationForest};
use crate::clustering::KMeans;
use crate::config::PipelineConfig;
use crate::error::Result;
use crate::preprocessing::{EncoderConfig, FeatureEncoder, FeatureMatrix};
use crate::report::{self, ClusteredRow, OutlierReport};
use crate::table::Table;
use ndarray::{Array1, Axis};
use rayon::prelude::*;
use std::time::Instant;
use tracing::{debug, info};

/// Unfit pipeline holding a validated configuration
#[derive(Debug, Clone)]
pub struct OutlierPipeline {
    config: PipelineConfig,
}

impl OutlierPipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Fit the feature encoder on `table` and encode it
    pub fn encode(self, table: &Table) -> Result<Encoded<'_>> {
        let start = Instant::now();
        let mut encoder = FeatureEncoder::with_config(
            EncoderConfig::new()
                .with_max_categories(self.config.max_categories)
                .with_normalize_numeric(self.config.normalize_numeric),
        );
        let matrix = encoder.fit_transform(table, &self.config.feature_fields)?;
        debug!(
            rows = matrix.nrows(),
            columns = matrix.ncols(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "encoded table"
        );

        Ok(Encoded {
            config: self.config,
            table,
            encoder,
            matrix,
        })
    }

    /// Run every stage on `table`
    pub fn run(self, table: &Table) -> Result<OutlierReport> {
        Ok(self.encode(table)?.score()?.cluster()?.report())
    }
}

/// Table encoded into a feature matrix
#[derive(Debug)]
pub struct Encoded<'t> {
    config: PipelineConfig,
    table: &'t Table,
    encoder: FeatureEncoder,
    matrix: FeatureMatrix,
}

impl<'t> Encoded<'t> {
    pub fn matrix(&self) -> &FeatureMatrix {
        &self.matrix
    }

    pub fn encoder(&self) -> &FeatureEncoder {
        &self.encoder
    }

    /// Fit the isolation forest and label every row
    pub fn score(self) -> Result<Scored<'t>> {
        let mut forest = IsolationForest::new()
            .with_n_estimators(self.config.n_estimators)
            .with_max_samples(self.config.max_samples)
            .with_contamination(self.config.contamination)
            .with_seed(self.config.random_state);
        let labels = forest.fit_predict(&self.matrix)?;
        let outliers = outlier_rows(&labels);

        info!(
            rows = self.matrix.nrows(),
            outliers = outliers.len(),
            contamination = self.config.contamination,
            "scored rows"
        );

        Ok(Scored {
            encoded: self,
            forest,
            labels,
            outliers,
        })
    }
}

/// Rows labeled normal (`1`) or outlier (`-1`)
#[derive(Debug)]
pub struct Scored<'t> {
    encoded: Encoded<'t>,
    forest: IsolationForest,
    labels: Array1<i32>,
    outliers: Vec<usize>,
}

impl<'t> Scored<'t> {
    /// One label per table row
    pub fn labels(&self) -> &Array1<i32> {
        &self.labels
    }

    /// Source row indices of the outliers, ascending
    pub fn outlier_rows(&self) -> &[usize] {
        &self.outliers
    }

    pub fn forest(&self) -> &IsolationForest {
        &self.forest
    }

    pub fn encoder(&self) -> &FeatureEncoder {
        &self.encoded.encoder
    }

    /// Cluster the outlier rows of the matrix
    pub fn cluster(self) -> Result<Clustered<'t>> {
        let config = &self.encoded.config;
        let subset = self.encoded.matrix.select(Axis(0), &self.outliers);
        let mut kmeans = KMeans::new(config.num_clusters).with_random_state(config.random_state);
        let ids = kmeans.fit_predict(&subset)?;

        // subset row j is source row outliers[j]
        let assignments = self.outliers.iter().copied().zip(ids.iter().copied()).collect();

        Ok(Clustered {
            scored: self,
            kmeans,
            assignments,
        })
    }
}

/// Outlier rows with their cluster ids
#[derive(Debug)]
pub struct Clustered<'t> {
    scored: Scored<'t>,
    kmeans: KMeans,
    assignments: Vec<(usize, usize)>,
}

impl<'t> Clustered<'t> {
    /// `(source row index, cluster id)` pairs, ascending by row index
    pub fn assignments(&self) -> &[(usize, usize)] {
        &self.assignments
    }

    pub fn kmeans(&self) -> &KMeans {
        &self.kmeans
    }

    /// Group the clustered outliers into the final report
    pub fn report(self) -> OutlierReport {
        let encoded = &self.scored.encoded;
        let config = &encoded.config;

        let rows: Vec<ClusteredRow<'_>> = self
            .assignments
            .iter()
            .filter_map(|&(row_index, cluster_id)| {
                encoded.table.get(row_index).map(|record| ClusteredRow {
                    row_index,
                    cluster_id,
                    record,
                })
            })
            .collect();
        let groups = report::build(&rows, config.sample_size);

        for group in &groups {
            info!(cluster = group.cluster_id, observations = group.count, "outlier cluster");
        }

        OutlierReport {
            n_rows: encoded.table.len(),
            n_outliers: self.scored.outliers.len(),
            contamination: config.contamination,
            num_clusters: config.num_clusters,
            feature_names: encoded.encoder.feature_names().to_vec(),
            groups,
        }
    }
}

/// Run one independent pipeline per table, in parallel.
///
/// Results are in input order; a failing table does not affect the others.
pub fn run_batch(config: &PipelineConfig, tables: &[Table]) -> Vec<Result<OutlierReport>> {
    tables
        .par_iter()
        .map(|table| OutlierPipeline::new(config.clone())?.run(table))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anomaly::{NORMAL, OUTLIER};
    use crate::error::KolosalError;
    use crate::table::Record;

    fn blobs() -> Table {
        (0..10)
            .map(|i| {
                let v = if i < 7 { 0 } else { 10 };
                Record::new().with("x", v).with("y", v).with("id", i as i64)
            })
            .collect()
    }

    fn config() -> PipelineConfig {
        PipelineConfig::new()
            .with_feature_fields(["x", "y"])
            .with_contamination(0.3)
            .with_num_clusters(2)
            .with_sample_size(2)
    }

    #[test]
    fn test_stages_in_order() {
        let table = blobs();
        let encoded = OutlierPipeline::new(config()).unwrap().encode(&table).unwrap();
        assert_eq!(encoded.matrix().dim(), (10, 2));

        let scored = encoded.score().unwrap();
        assert_eq!(scored.outlier_rows(), &[7, 8, 9]);
        assert_eq!(scored.labels()[0], NORMAL);
        assert_eq!(scored.labels()[9], OUTLIER);

        let clustered = scored.cluster().unwrap();
        let rows: Vec<usize> = clustered.assignments().iter().map(|&(r, _)| r).collect();
        assert_eq!(rows, vec![7, 8, 9]);
        assert!(clustered.assignments().iter().all(|&(_, c)| c < 2));

        let report = clustered.report();
        assert_eq!(report.n_rows, 10);
        assert_eq!(report.n_outliers, 3);
        assert_eq!(report.outlier_rows(), vec![7, 8, 9]);
        assert!(report.groups.iter().all(|g| g.sample_rows.len() <= 2));
    }

    #[test]
    fn test_invalid_config_rejected_up_front() {
        let err = OutlierPipeline::new(config().with_contamination(1.0)).unwrap_err();
        assert!(matches!(err, KolosalError::ConfigError(_)));
    }

    #[test]
    fn test_too_few_outliers_for_k() {
        let err = OutlierPipeline::new(config().with_num_clusters(5))
            .unwrap()
            .run(&blobs())
            .unwrap_err();
        assert!(matches!(err, KolosalError::ConfigError(_)));
    }

    #[test]
    fn test_run_batch_isolates_failures() {
        let bad: Table = vec![Record::new().with("x", 1)].into_iter().collect();
        let results = run_batch(&config(), &[blobs(), bad, blobs()]);
        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(KolosalError::SchemaError { .. })));
        assert_eq!(results[0].as_ref().unwrap(), results[2].as_ref().unwrap());
    }
}
