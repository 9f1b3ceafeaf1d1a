//! DNS query logs
//!
//! Field names follow the Zeek (Bro) `dns.log` columns.

use crate::config::PipelineConfig;
use crate::error::{KolosalError, Result};
use crate::table::{FieldKind, Record, Table, Value};
use crate::preprocessing::text_features::char_length;

/// Derived field holding the length of `query`
pub const QUERY_LENGTH: &str = "query_length";

/// Feature fields used for DNS outlier triage
pub const DNS_FEATURE_FIELDS: [&str; 8] = [
    "Z",
    "rejected",
    "proto",
    "query",
    "qclass_name",
    "qtype_name",
    "rcode_name",
    QUERY_LENGTH,
];

impl PipelineConfig {
    /// Defaults for DNS logs: 35% contamination, 4 clusters, 5 sample rows
    pub fn dns() -> Self {
        PipelineConfig::new()
            .with_feature_fields(DNS_FEATURE_FIELDS)
            .with_contamination(0.35)
            .with_num_clusters(4)
            .with_sample_size(5)
    }
}

/// Append `query_length`, the character count of the `query` field.
///
/// `row` is the record's position in its table, reported on error.
pub fn with_query_length(mut record: Record, row: usize) -> Result<Record> {
    let length = match record.get("query") {
        Some(Value::Text(query)) => char_length(query) as i64,
        Some(other) => {
            return Err(KolosalError::type_mismatch("query", row, FieldKind::Text, other.kind()))
        }
        None => return Err(KolosalError::missing_field("query", row)),
    };
    record.insert(QUERY_LENGTH, length);
    Ok(record)
}

/// Add `query_length` to every record
pub fn add_query_length(table: Table) -> Result<Table> {
    let mut row = 0usize;
    table.map_records(|record| {
        let result = with_query_length(record, row);
        row += 1;
        result
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SchemaProblem;

    #[test]
    fn test_dns_config() {
        let config = PipelineConfig::dns();
        assert_eq!(config.feature_fields.len(), 8);
        assert_eq!(config.feature_fields.last().map(String::as_str), Some(QUERY_LENGTH));
        assert_eq!(config.contamination, 0.35);
        assert_eq!(config.num_clusters, 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_query_length() {
        let record = with_query_length(Record::new().with("query", "www.example.com"), 0).unwrap();
        assert_eq!(record.get(QUERY_LENGTH), Some(&Value::Integer(15)));
    }

    #[test]
    fn test_add_query_length_reports_row() {
        let table = Table::new(vec![
            Record::new().with("query", "a.com"),
            Record::new().with("query", "b.com"),
            Record::new().with("qtype_name", "A"),
        ]);
        match add_query_length(table).unwrap_err() {
            KolosalError::SchemaError { field, problem } => {
                assert_eq!(field, "query");
                assert_eq!(problem, SchemaProblem::Missing { row: 2 });
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_non_text_query() {
        let err = with_query_length(Record::new().with("query", 5), 7).unwrap_err();
        match err {
            KolosalError::SchemaError { field, problem } => {
                assert_eq!(field, "query");
                assert_eq!(
                    problem,
                    SchemaProblem::TypeMismatch {
                        row: 7,
                        expected: FieldKind::Text,
                        found: FieldKind::Numeric,
                    }
                );
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_single_record_reports_given_row() {
        let err = with_query_length(Record::new().with("qtype_name", "A"), 42).unwrap_err();
        assert!(matches!(
            err,
            KolosalError::SchemaError { problem: SchemaProblem::Missing { row: 42 }, .. }
        ));
    }
}
