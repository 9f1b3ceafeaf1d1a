//! Outlier report: clustered outlier rows grouped for triage

use crate::table::Record;
use serde::Serialize;
use std::collections::BTreeMap;

/// One outlier row with its cluster, still aligned to the source table
#[derive(Debug, Clone, Copy)]
pub struct ClusteredRow<'a> {
    /// Index of the row in the source table
    pub row_index: usize,
    pub cluster_id: usize,
    pub record: &'a Record,
}

/// Outlier rows sharing a cluster id
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutlierGroup {
    pub cluster_id: usize,
    pub count: usize,
    /// Source row indices of every member, ascending
    pub members: Vec<usize>,
    /// First members in source row order, at most `sample_size` of them
    pub sample_rows: Vec<Record>,
}

/// Result of one pipeline run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutlierReport {
    /// Rows in the input table
    pub n_rows: usize,
    /// Rows labeled outlier
    pub n_outliers: usize,
    pub contamination: f64,
    pub num_clusters: usize,
    /// Encoded column names, in matrix order
    pub feature_names: Vec<String>,
    /// Groups in ascending cluster id order
    pub groups: Vec<OutlierGroup>,
}

impl OutlierReport {
    pub fn group(&self, cluster_id: usize) -> Option<&OutlierGroup> {
        self.groups.iter().find(|g| g.cluster_id == cluster_id)
    }

    /// Every reported row index, ascending
    pub fn outlier_rows(&self) -> Vec<usize> {
        let mut rows: Vec<usize> = self.groups.iter().flat_map(|g| g.members.iter().copied()).collect();
        rows.sort_unstable();
        rows
    }
}

/// Group clustered rows by cluster id.
///
/// Groups come back in ascending cluster id order. Members and samples are
/// in source row order regardless of the order of `rows`.
pub fn build(rows: &[ClusteredRow<'_>], sample_size: usize) -> Vec<OutlierGroup> {
    let mut ordered: Vec<&ClusteredRow<'_>> = rows.iter().collect();
    ordered.sort_by_key(|r| r.row_index);

    let mut groups: BTreeMap<usize, OutlierGroup> = BTreeMap::new();
    for row in ordered {
        let group = groups.entry(row.cluster_id).or_insert_with(|| OutlierGroup {
            cluster_id: row.cluster_id,
            count: 0,
            members: Vec::new(),
            sample_rows: Vec::new(),
        });
        group.count += 1;
        group.members.push(row.row_index);
        if group.sample_rows.len() < sample_size {
            group.sample_rows.push(row.record.clone());
        }
    }

    groups.into_values().collect()
}
