//! Polars `DataFrame` to [`Table`] conversion

use super::{Record, Table, Value};
use crate::error::{KolosalError, Result};
use polars::prelude::*;

impl Value {
    /// Convert a polars cell; nulls come back as `None` and leave the field absent
    fn from_any_value(value: &AnyValue<'_>, column: &str) -> Result<Option<Self>> {
        let converted = match value {
            AnyValue::Null => return Ok(None),
            AnyValue::Boolean(b) => Value::Boolean(*b),
            AnyValue::String(s) => Value::Text((*s).to_string()),
            AnyValue::StringOwned(s) => Value::Text(s.to_string()),
            AnyValue::Int32(v) => Value::Integer(i64::from(*v)),
            AnyValue::Int64(v) => Value::Integer(*v),
            AnyValue::UInt32(v) => Value::Integer(i64::from(*v)),
            AnyValue::UInt64(v) => Value::Integer(i64::try_from(*v).map_err(|_| {
                KolosalError::DataError(format!("column `{column}`: value {v} overflows i64"))
            })?),
            AnyValue::Float32(v) => Value::Float(f64::from(*v)),
            AnyValue::Float64(v) => Value::Float(*v),
            other => {
                return Err(KolosalError::DataError(format!(
                    "column `{column}`: unsupported dtype {}",
                    other.dtype()
                )))
            }
        };
        Ok(Some(converted))
    }
}

impl TryFrom<&DataFrame> for Table {
    type Error = KolosalError;

    fn try_from(df: &DataFrame) -> Result<Self> {
        let columns = df.get_columns();
        let mut records = vec![Record::with_capacity(columns.len()); df.height()];

        for column in columns {
            let name = column.name().to_string();
            let series = column.as_materialized_series();
            for (row, record) in records.iter_mut().enumerate() {
                let cell = series
                    .get(row)
                    .map_err(|e| KolosalError::DataError(e.to_string()))?;
                if let Some(value) = Value::from_any_value(&cell, &name)? {
                    record.insert(name.clone(), value);
                }
            }
        }

        Ok(Table::new(records))
    }
}
