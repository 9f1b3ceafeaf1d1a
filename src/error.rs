//! Error types for the outlier pipeline

use crate::table::FieldKind;
use std::fmt;
use thiserror::Error;

/// What went wrong with a declared feature field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaProblem {
    /// The record at `row` has no value for the field
    Missing { row: usize },
    /// The record at `row` carries a value of a different kind than the schema
    TypeMismatch {
        row: usize,
        expected: FieldKind,
        found: FieldKind,
    },
}

impl fmt::Display for SchemaProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaProblem::Missing { row } => write!(f, "is missing from row {row}"),
            SchemaProblem::TypeMismatch { row, expected, found } => write!(
                f,
                "has kind {found:?} in row {row}, expected {expected:?}"
            ),
        }
    }
}

#[derive(Error, Debug)]
pub enum KolosalError {
    #[error("Schema error: field `{field}` {problem}")]
    SchemaError { field: String, problem: SchemaProblem },

    #[error("State error: {0}")]
    StateError(String),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Empty input: {0}")]
    EmptyInputError(String),

    #[error("Data error: {0}")]
    DataError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl KolosalError {
    pub(crate) fn missing_field(field: &str, row: usize) -> Self {
        KolosalError::SchemaError {
            field: field.to_string(),
            problem: SchemaProblem::Missing { row },
        }
    }

    pub(crate) fn type_mismatch(field: &str, row: usize, expected: FieldKind, found: FieldKind) -> Self {
        KolosalError::SchemaError {
            field: field.to_string(),
            problem: SchemaProblem::TypeMismatch { row, expected, found },
        }
    }
}

pub type Result<T> = std::result::Result<T, KolosalError>;
