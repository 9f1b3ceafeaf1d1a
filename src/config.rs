//! Pipeline configuration

use crate::error::{KolosalError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Configuration for one outlier pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Raw fields that feed the encoder, in column order
    pub feature_fields: Vec<String>,

    /// Expected fraction of anomalous rows, in the open interval (0, 1)
    pub contamination: f64,

    /// Number of clusters used to group the outliers
    pub num_clusters: usize,

    /// Rows shown per cluster in the report
    pub sample_size: usize,

    /// Number of isolation trees
    pub n_estimators: usize,

    /// Rows drawn (without replacement) per isolation tree
    pub max_samples: usize,

    /// Text fields with more distinct values than this are treated as free text
    pub max_categories: usize,

    /// Min-max normalize numeric fields with fit-time bounds
    pub normalize_numeric: bool,

    /// Seed shared by the isolation forest and k-means
    pub random_state: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            feature_fields: Vec::new(),
            contamination: 0.1,
            num_clusters: 4,
            sample_size: 5,
            n_estimators: 100,
            max_samples: 256,
            max_categories: 20,
            normalize_numeric: false,
            random_state: 42,
        }
    }
}

impl PipelineConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_feature_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.feature_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_contamination(mut self, contamination: f64) -> Self {
        self.contamination = contamination;
        self
    }

    pub fn with_num_clusters(mut self, k: usize) -> Self {
        self.num_clusters = k;
        self
    }

    pub fn with_sample_size(mut self, n: usize) -> Self {
        self.sample_size = n;
        self
    }

    pub fn with_n_estimators(mut self, n: usize) -> Self {
        self.n_estimators = n;
        self
    }

    pub fn with_max_samples(mut self, n: usize) -> Self {
        self.max_samples = n;
        self
    }

    pub fn with_max_categories(mut self, n: usize) -> Self {
        self.max_categories = n;
        self
    }

    pub fn with_normalize_numeric(mut self, normalize: bool) -> Self {
        self.normalize_numeric = normalize;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    /// Check every option against its valid range
    pub fn validate(&self) -> Result<()> {
        validate_feature_fields(&self.feature_fields)?;
        validate_contamination(self.contamination)?;
        if self.num_clusters == 0 {
            return Err(KolosalError::ConfigError(
                "num_clusters must be at least 1".to_string(),
            ));
        }
        if self.sample_size == 0 {
            return Err(KolosalError::ConfigError(
                "sample_size must be at least 1".to_string(),
            ));
        }
        if self.n_estimators == 0 || self.max_samples == 0 {
            return Err(KolosalError::ConfigError(
                "n_estimators and max_samples must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Save the configuration as pretty JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load and validate a configuration from JSON
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }
}

pub(crate) fn validate_feature_fields(fields: &[String]) -> Result<()> {
    if fields.is_empty() {
        return Err(KolosalError::ConfigError(
            "feature_fields must name at least one field".to_string(),
        ));
    }
    let mut seen = HashSet::with_capacity(fields.len());
    for field in fields {
        if !seen.insert(field.as_str()) {
            return Err(KolosalError::ConfigError(format!(
                "feature field `{field}` is listed twice"
            )));
        }
    }
    Ok(())
}

pub(crate) fn validate_contamination(contamination: f64) -> Result<()> {
    if contamination > 0.0 && contamination < 1.0 {
        Ok(())
    } else {
        Err(KolosalError::ConfigError(format!(
            "contamination must be in (0, 1), got {contamination}"
        )))
    }
}
