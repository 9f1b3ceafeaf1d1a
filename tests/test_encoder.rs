//! Integration test: DataFrame input through the feature encoder

use kolosal_outliers::prelude::{FeatureEncoder, FieldKind, KolosalError, SchemaProblem, Table};
use kolosal_outliers::preprocessing::UNKNOWN_CATEGORY;
use polars::prelude::*;

fn fields(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

fn sample_df() -> DataFrame {
    df!(
        "Z" => &[0i64, 0, 1, 0, 0, 0],
        "rejected" => &[false, false, true, false, false, false],
        "proto" => &["udp", "udp", "tcp", "udp", "udp", "udp"],
        "qtype_name" => &["A", "AAAA", "TXT", "A", "A", "MX"],
        "ttl" => &[60.0, 300.0, 5.0, 60.0, 86400.0, 3600.0],
    )
    .unwrap()
}

#[test]
fn test_encoder_fit_transform_from_dataframe() {
    let table = Table::try_from(&sample_df()).unwrap();
    let mut encoder = FeatureEncoder::new();

    let x = encoder
        .fit_transform(&table, &fields(&["Z", "rejected", "proto", "qtype_name", "ttl"]))
        .unwrap();

    assert_eq!(x.nrows(), 6, "row count should be preserved");
    // Z, rejected, proto x3, qtype x5, ttl
    assert_eq!(x.ncols(), 11);
    assert_eq!(encoder.n_features(), Some(11));
    assert_eq!(x[[2, 0]], 1.0);
    assert_eq!(x[[2, 1]], 1.0);
    assert_eq!(x[[4, 10]], 86400.0);
}

#[test]
fn test_encoder_width_is_stable_across_calls() {
    let table = Table::try_from(&sample_df()).unwrap();
    let mut encoder = FeatureEncoder::new();
    let feature_fields = fields(&["proto", "qtype_name"]);
    let fitted = encoder.fit_transform(&table, &feature_fields).unwrap();

    let later = df!(
        "proto" => &["icmp", "udp"],
        "qtype_name" => &["SRV", "A"],
    )
    .unwrap();
    let x = encoder.transform(&Table::try_from(&later).unwrap()).unwrap();

    assert_eq!(x.ncols(), fitted.ncols());
    assert_eq!(x.nrows(), 2);

    let names = encoder.feature_names();
    let proto_unknown = names
        .iter()
        .position(|n| *n == format!("proto={UNKNOWN_CATEGORY}"))
        .unwrap();
    let qtype_unknown = names
        .iter()
        .position(|n| *n == format!("qtype_name={UNKNOWN_CATEGORY}"))
        .unwrap();

    // Unseen values land in the unknown buckets and nowhere else
    assert_eq!(x.row(0).sum(), 2.0);
    assert_eq!(x[[0, proto_unknown]], 1.0);
    assert_eq!(x[[0, qtype_unknown]], 1.0);
    // Known values never touch the unknown buckets
    assert_eq!(x[[1, proto_unknown]], 0.0);
    assert_eq!(x[[1, qtype_unknown]], 0.0);
}

#[test]
fn test_same_record_encodes_identically() {
    let table = Table::try_from(&sample_df()).unwrap();
    let mut encoder = FeatureEncoder::new();
    encoder
        .fit_transform(&table, &fields(&["Z", "proto", "qtype_name", "ttl"]))
        .unwrap();

    // Rows 0 and 3 are the same record
    let x = encoder.transform(&table).unwrap();
    assert_eq!(x.row(0), x.row(3));
}

#[test]
fn test_type_drift_between_fit_and_transform() {
    let table = Table::try_from(&sample_df()).unwrap();
    let mut encoder = FeatureEncoder::new();
    encoder.fit_transform(&table, &fields(&["Z"])).unwrap();

    let drifted = df!("Z" => &["zero"]).unwrap();
    let err = encoder.transform(&Table::try_from(&drifted).unwrap()).unwrap_err();
    assert!(matches!(
        err,
        KolosalError::SchemaError {
            problem: SchemaProblem::TypeMismatch {
                expected: FieldKind::Numeric,
                found: FieldKind::Text,
                ..
            },
            ..
        }
    ));
}

#[test]
fn test_null_cell_is_missing_field() {
    let df = df!(
        "proto" => &[Some("udp"), None, Some("tcp")],
    )
    .unwrap();
    let table = Table::try_from(&df).unwrap();
    let mut encoder = FeatureEncoder::new();

    let err = encoder.fit_transform(&table, &fields(&["proto"])).unwrap_err();
    match err {
        KolosalError::SchemaError { field, problem } => {
            assert_eq!(field, "proto");
            assert_eq!(problem, SchemaProblem::Missing { row: 1 });
        }
        other => panic!("expected schema error, got {other}"),
    }
}
