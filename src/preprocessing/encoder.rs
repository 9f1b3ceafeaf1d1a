//! Feature encoder: raw records to a fixed-width numeric matrix
//!
//! The encoder learns one [`FieldEncoding`] per feature field on
//! [`FeatureEncoder::fit_transform`] and replays it on later
//! [`FeatureEncoder::transform`] calls:
//!
//! - numeric fields pass through as `f64` (optionally min-max normalized
//!   with fit-time bounds); `NaN` and infinities are rejected
//! - boolean fields become `0.0` / `1.0`
//! - low-cardinality text fields are one-hot encoded over the sorted fit-time
//!   vocabulary, plus a trailing `<unknown>` column
//! - high-cardinality text fields become `[length, entropy]`
//!
//! A category never seen during fit sets the field's `<unknown>` column and
//! nothing else. That is a fallback, not an error.

use super::schema::Schema;
use super::text_features::{char_entropy, char_length};
use crate::config::validate_feature_fields;
use crate::error::{KolosalError, Result};
use crate::table::{FieldKind, Record, Table, Value};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// Numeric matrix with one row per table record
pub type FeatureMatrix = Array2<f64>;

/// Column label used for the unseen-category bucket
pub const UNKNOWN_CATEGORY: &str = "<unknown>";

/// Encoder options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncoderConfig {
    /// Text fields with at most this many distinct values are one-hot encoded
    pub max_categories: usize,
    /// Min-max normalize numeric fields
    pub normalize_numeric: bool,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            max_categories: 20,
            normalize_numeric: false,
        }
    }
}

impl EncoderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_categories(mut self, n: usize) -> Self {
        self.max_categories = n;
        self
    }

    pub fn with_normalize_numeric(mut self, normalize: bool) -> Self {
        self.normalize_numeric = normalize;
        self
    }
}

/// Fit-time min and max of a numeric field
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MinMax {
    pub min: f64,
    pub max: f64,
}

impl MinMax {
    fn scale(&self, value: f64) -> f64 {
        let range = self.max - self.min;
        if range.abs() < f64::EPSILON {
            0.0
        } else {
            (value - self.min) / range
        }
    }
}

/// Learned encoding of a single field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldEncoding {
    /// One column; `bounds` set when normalizing
    Numeric { bounds: Option<MinMax> },
    /// One column, 0 or 1
    Boolean,
    /// One column per category (sorted) plus the unknown bucket
    OneHot { categories: Vec<String> },
    /// Two columns: length and entropy
    TextStats,
}

impl FieldEncoding {
    pub fn width(&self) -> usize {
        match self {
            FieldEncoding::Numeric { .. } | FieldEncoding::Boolean => 1,
            FieldEncoding::OneHot { categories } => categories.len() + 1,
            FieldEncoding::TextStats => 2,
        }
    }

    fn column_names(&self, field: &str) -> Vec<String> {
        match self {
            FieldEncoding::Numeric { .. } | FieldEncoding::Boolean => vec![field.to_string()],
            FieldEncoding::OneHot { categories } => categories
                .iter()
                .map(|c| format!("{field}={c}"))
                .chain(std::iter::once(format!("{field}={UNKNOWN_CATEGORY}")))
                .collect(),
            FieldEncoding::TextStats => vec![format!("{field}.length"), format!("{field}.entropy")],
        }
    }

    /// Kind of value this encoding accepts
    pub fn kind(&self) -> FieldKind {
        match self {
            FieldEncoding::Numeric { .. } => FieldKind::Numeric,
            FieldEncoding::Boolean => FieldKind::Boolean,
            FieldEncoding::OneHot { .. } | FieldEncoding::TextStats => FieldKind::Text,
        }
    }

    /// Append the columns of `field` at `row` to `out`.
    /// Returns `false` when a one-hot value fell into the unknown bucket.
    fn encode_into(&self, field: &str, row: usize, value: &Value, out: &mut Vec<f64>) -> Result<bool> {
        match (self, value) {
            (FieldEncoding::Numeric { bounds }, Value::Integer(i)) => {
                out.push(bounds.map_or(*i as f64, |b| b.scale(*i as f64)));
                Ok(true)
            }
            (FieldEncoding::Numeric { bounds }, Value::Float(x)) => {
                if !x.is_finite() {
                    return Err(KolosalError::DataError(format!(
                        "field `{field}` has non-finite value {x} in row {row}"
                    )));
                }
                out.push(bounds.map_or(*x, |b| b.scale(*x)));
                Ok(true)
            }
            (FieldEncoding::Boolean, Value::Boolean(b)) => {
                out.push(if *b { 1.0 } else { 0.0 });
                Ok(true)
            }
            (FieldEncoding::OneHot { categories }, Value::Text(s)) => {
                let start = out.len();
                out.resize(start + categories.len() + 1, 0.0);
                let hit = categories.binary_search_by(|c| c.as_str().cmp(s)).ok();
                match hit {
                    Some(idx) => out[start + idx] = 1.0,
                    None => out[start + categories.len()] = 1.0,
                }
                Ok(hit.is_some())
            }
            (FieldEncoding::TextStats, Value::Text(s)) => {
                out.push(char_length(s));
                out.push(char_entropy(s));
                Ok(true)
            }
            (encoding, other) => Err(KolosalError::type_mismatch(
                field,
                row,
                encoding.kind(),
                other.kind(),
            )),
        }
    }
}

/// Everything learned by a fit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedEncoding {
    schema: Schema,
    encodings: Vec<(String, FieldEncoding)>,
    feature_names: Vec<String>,
}

impl FittedEncoding {
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn encodings(&self) -> &[(String, FieldEncoding)] {
        &self.encodings
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }
}

/// Converts tables of raw records into feature matrices
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeatureEncoder {
    config: EncoderConfig,
    fitted: Option<FittedEncoding>,
}

impl FeatureEncoder {
    /// Create an unfitted encoder with default options
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: EncoderConfig) -> Self {
        Self {
            config,
            fitted: None,
        }
    }

    /// Learn the encoding of `feature_fields` from `table` and encode it.
    ///
    /// Refitting discards any previous encoding.
    pub fn fit_transform(&mut self, table: &Table, feature_fields: &[String]) -> Result<FeatureMatrix> {
        validate_feature_fields(feature_fields)?;
        if table.is_empty() {
            return Err(KolosalError::EmptyInputError(
                "feature encoder received zero rows".to_string(),
            ));
        }

        let schema = Schema::infer(table, feature_fields)?;
        let encodings: Vec<(String, FieldEncoding)> = schema
            .fields()
            .iter()
            .map(|(name, kind)| (name.clone(), self.learn_field(table, name, *kind)))
            .collect();

        let feature_names = encodings
            .iter()
            .flat_map(|(name, enc)| enc.column_names(name))
            .collect::<Vec<_>>();

        debug!(
            rows = table.len(),
            fields = encodings.len(),
            columns = feature_names.len(),
            "fitted feature encoder"
        );

        self.fitted = Some(FittedEncoding {
            schema,
            encodings,
            feature_names,
        });
        self.transform(table)
    }

    /// Encode `table` with the encoding learned by the last fit
    pub fn transform(&self, table: &Table) -> Result<FeatureMatrix> {
        let fitted = self.fitted.as_ref().ok_or_else(|| {
            KolosalError::StateError("transform called before fit_transform".to_string())
        })?;
        if table.is_empty() {
            return Err(KolosalError::EmptyInputError(
                "feature encoder received zero rows".to_string(),
            ));
        }
        fitted.schema.validate(table)?;

        let width = fitted.n_features();
        let mut data = Vec::with_capacity(table.len() * width);
        let mut unseen = vec![0usize; fitted.encodings.len()];

        for (row, record) in table.iter().enumerate() {
            for (slot, (name, encoding)) in fitted.encodings.iter().enumerate() {
                let value = field(record, name, row)?;
                if !encoding.encode_into(name, row, value, &mut data)? {
                    unseen[slot] += 1;
                }
            }
        }

        for ((name, _), count) in fitted.encodings.iter().zip(&unseen) {
            if *count > 0 {
                warn!(field = %name, rows = count, "unseen categories mapped to the unknown bucket");
            }
        }

        Array2::from_shape_vec((table.len(), width), data)
            .map_err(|e| KolosalError::DataError(e.to_string()))
    }

    pub fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }

    pub fn fitted(&self) -> Option<&FittedEncoding> {
        self.fitted.as_ref()
    }

    /// Output column count, `None` before fit
    pub fn n_features(&self) -> Option<usize> {
        self.fitted.as_ref().map(FittedEncoding::n_features)
    }

    /// Output column names, empty before fit
    pub fn feature_names(&self) -> &[String] {
        self.fitted
            .as_ref()
            .map(FittedEncoding::feature_names)
            .unwrap_or_default()
    }

    fn learn_field(&self, table: &Table, name: &str, kind: FieldKind) -> FieldEncoding {
        match kind {
            FieldKind::Numeric => {
                let bounds = self.config.normalize_numeric.then(|| {
                    table
                        .iter()
                        .filter_map(|r| r.get(name).and_then(Value::as_f64))
                        .fold(
                            MinMax {
                                min: f64::INFINITY,
                                max: f64::NEG_INFINITY,
                            },
                            |acc, x| MinMax {
                                min: acc.min.min(x),
                                max: acc.max.max(x),
                            },
                        )
                });
                FieldEncoding::Numeric { bounds }
            }
            FieldKind::Boolean => FieldEncoding::Boolean,
            FieldKind::Text => {
                let distinct: BTreeSet<&str> = table
                    .iter()
                    .filter_map(|r| r.get(name).and_then(Value::as_str))
                    .collect();
                if distinct.len() <= self.config.max_categories {
                    debug!(field = name, categories = distinct.len(), "one-hot encoding");
                    FieldEncoding::OneHot {
                        categories: distinct.into_iter().map(str::to_string).collect(),
                    }
                } else {
                    debug!(field = name, distinct = distinct.len(), "free-text statistics");
                    FieldEncoding::TextStats
                }
            }
        }
    }
}

fn field<'r>(record: &'r Record, name: &str, row: usize) -> Result<&'r Value> {
    record
        .get(name)
        .ok_or_else(|| KolosalError::missing_field(name, row))
}
