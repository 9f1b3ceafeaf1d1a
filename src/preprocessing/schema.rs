//! Declared field kinds, inferred at fit time and checked on every row

use crate::error::{KolosalError, Result};
use crate::table::{FieldKind, Table};
use serde::{Deserialize, Serialize};

/// Ordered feature fields with the kind each must carry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    fields: Vec<(String, FieldKind)>,
}

impl Schema {
    /// Build a schema from explicit `(field, kind)` pairs
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = (S, FieldKind)>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(|(n, k)| (n.into(), k)).collect(),
        }
    }

    /// Take each field's kind from the first record, then check the whole table
    pub fn infer(table: &Table, feature_fields: &[String]) -> Result<Self> {
        let first = table.get(0).ok_or_else(|| {
            KolosalError::EmptyInputError("cannot infer a schema from zero rows".to_string())
        })?;

        let fields = feature_fields
            .iter()
            .map(|name| {
                first
                    .get(name)
                    .map(|value| (name.clone(), value.kind()))
                    .ok_or_else(|| KolosalError::missing_field(name, 0))
            })
            .collect::<Result<Vec<_>>>()?;

        let schema = Self { fields };
        schema.validate(table)?;
        Ok(schema)
    }

    /// Every record must carry every field with the declared kind
    pub fn validate(&self, table: &Table) -> Result<()> {
        for (row, record) in table.iter().enumerate() {
            for (name, expected) in &self.fields {
                let value = record
                    .get(name)
                    .ok_or_else(|| KolosalError::missing_field(name, row))?;
                let found = value.kind();
                if found != *expected {
                    return Err(KolosalError::type_mismatch(name, row, *expected, found));
                }
            }
        }
        Ok(())
    }

    pub fn fields(&self) -> &[(String, FieldKind)] {
        &self.fields
    }

    pub fn kind_of(&self, name: &str) -> Option<FieldKind> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, k)| *k)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
