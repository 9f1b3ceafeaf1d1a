//! Kolosal Outliers - anomaly triage for structured network logs
//!
//! Rows of a DNS query log go through a fixed pipeline:
//! encode the declared fields into a numeric matrix, score every row with an
//! isolation forest under a contamination budget, cluster the outliers with
//! k-means and report each cluster with a few representative rows.
//!
//! # Modules
//!
//! - [`table`] - Raw records and tables, polars `DataFrame` conversion
//! - [`preprocessing`] - Schema checks and feature encoding
//! - [`anomaly`] - Isolation Forest outlier scoring
//! - [`clustering`] - K-Means grouping of outliers
//! - [`report`] - Per-cluster summaries
//! - [`pipeline`] - Staged end-to-end runs, parallel batch runs
//! - [`dns`] - DNS log feature set and derived fields
//!
//! # Example
//!
//! ```
//! use kolosal_outliers::prelude::*;
//!
//! let table: Table = (0..10)
//!     .map(|i| {
//!         let proto = if i < 7 { "udp" } else { "tcp" };
//!         Record::new().with("proto", proto).with("Z", 0)
//!     })
//!     .collect();
//!
//! let config = PipelineConfig::new()
//!     .with_feature_fields(["proto", "Z"])
//!     .with_contamination(0.3)
//!     .with_num_clusters(1);
//!
//! let report = OutlierPipeline::new(config)?.run(&table)?;
//! assert_eq!(report.n_outliers, 3);
//! # Ok::<(), kolosal_outliers::KolosalError>(())
//! ```

// Core error handling
pub mod error;
pub mod config;

// Data
pub mod table;
pub mod preprocessing;

// Models
pub mod anomaly;
pub mod clustering;

// Output
pub mod report;
pub mod pipeline;

// Log formats
pub mod dns;

pub use error::{KolosalError, Result};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{KolosalError, Result, SchemaProblem};

    // Configuration
    pub use crate::config::PipelineConfig;

    // Data
    pub use crate::table::{FieldKind, Record, Table, Value};

    // Encoding
    pub use crate::preprocessing::{EncoderConfig, FeatureEncoder, FeatureMatrix, Schema};

    // Models
    pub use crate::anomaly::{AnomalyDetector, IsolationForest, NORMAL, OUTLIER};
    pub use crate::clustering::KMeans;

    // Pipeline and report
    pub use crate::pipeline::{run_batch, OutlierPipeline};
    pub use crate::report::{OutlierGroup, OutlierReport};

    // DNS
    pub use crate::dns::{add_query_length, DNS_FEATURE_FIELDS};
}
