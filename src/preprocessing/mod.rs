//! Feature encoding
//!
//! Turns a [`Table`](crate::table::Table) of heterogeneous raw records into a
//! fixed-width numeric matrix:
//! - Schema inference and validation of declared feature fields
//! - Numeric pass-through or min-max normalization
//! - One-hot encoding with an explicit unknown bucket
//! - Length/entropy statistics for free-text fields

mod encoder;
mod schema;
pub mod text_features;

pub use encoder::{
    EncoderConfig, FeatureEncoder, FeatureMatrix, FieldEncoding, FittedEncoding, MinMax,
    UNKNOWN_CATEGORY,
};
pub use schema::Schema;
