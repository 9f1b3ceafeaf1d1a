//! Raw log rows
//!
//! A [`Table`] is the materialized output of a row source: an ordered
//! sequence of [`Record`]s, each an insertion-ordered mapping from field
//! name to a tagged [`Value`]. Row `i` of every derived matrix refers to
//! record `i` of the table.

mod dataframe;

use crate::error::Result;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Kind of a raw field value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldKind {
    Numeric,
    Boolean,
    Text,
}

/// A raw field value as read from a log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Boolean(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl Value {
    pub fn kind(&self) -> FieldKind {
        match self {
            Value::Boolean(_) => FieldKind::Boolean,
            Value::Integer(_) | Value::Float(_) => FieldKind::Numeric,
            Value::Text(_) => FieldKind::Text,
        }
    }

    /// Numeric view of the value, `None` for text
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::Integer(i) => Some(*i as f64),
            Value::Float(x) => Some(*x),
            Value::Text(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Text(s) => f.write_str(s),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

/// One log event: field name to raw value, in insertion order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: Vec<(String, Value)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(n: usize) -> Self {
        Self {
            fields: Vec::with_capacity(n),
        }
    }

    /// Builder-style insert
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Insert or replace a field. A replaced field keeps its position.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (name, value) in iter {
            record.insert(name, value);
        }
        record
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Materialized rows of one log, in read order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Table {
    records: Vec<Record>,
}

impl Table {
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }

    /// Drain a fallible row source, stopping at the first error
    pub fn try_from_rows<I>(rows: I) -> Result<Self>
    where
        I: IntoIterator<Item = Result<Record>>,
    {
        let records = rows.into_iter().collect::<Result<Vec<_>>>()?;
        Ok(Self { records })
    }

    pub fn push(&mut self, record: Record) {
        self.records.push(record);
    }

    pub fn get(&self, row: usize) -> Option<&Record> {
        self.records.get(row)
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Apply `f` to every record, e.g. to add derived fields
    pub fn map_records<F>(self, f: F) -> Result<Self>
    where
        F: FnMut(Record) -> Result<Record>,
    {
        let records = self.records.into_iter().map(f).collect::<Result<Vec<_>>>()?;
        Ok(Self { records })
    }
}

impl FromIterator<Record> for Table {
    fn from_iter<I: IntoIterator<Item = Record>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Table {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::KolosalError;

    #[test]
    fn test_record_preserves_insertion_order() {
        let record = Record::new()
            .with("query", "example.com")
            .with("Z", 0)
            .with("rejected", false);
        let names: Vec<&str> = record.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["query", "Z", "rejected"]);
    }

    #[test]
    fn test_record_insert_replaces_in_place() {
        let mut record = Record::new().with("a", 1).with("b", 2);
        record.insert("a", "x");
        assert_eq!(record.len(), 2);
        assert_eq!(record.get("a"), Some(&Value::Text("x".into())));
        assert_eq!(record.iter().next().map(|(n, _)| n), Some("a"));
    }

    #[test]
    fn test_value_kinds() {
        assert_eq!(Value::from(3).kind(), FieldKind::Numeric);
        assert_eq!(Value::from(3.5).kind(), FieldKind::Numeric);
        assert_eq!(Value::from(true).kind(), FieldKind::Boolean);
        assert_eq!(Value::from("udp").kind(), FieldKind::Text);
        assert_eq!(Value::from(true).as_f64(), Some(1.0));
        assert_eq!(Value::from("udp").as_f64(), None);
    }

    #[test]
    fn test_record_serializes_as_ordered_object() {
        let record = Record::new().with("proto", "udp").with("Z", 1).with("rejected", true);
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"proto":"udp","Z":1,"rejected":true}"#);
    }

    #[test]
    fn test_try_from_rows_stops_at_error() {
        let rows = vec![
            Ok(Record::new().with("a", 1)),
            Err(KolosalError::DataError("bad line".into())),
            Ok(Record::new().with("a", 2)),
        ];
        assert!(matches!(Table::try_from_rows(rows), Err(KolosalError::DataError(_))));
    }

    #[test]
    fn test_table_from_iterator() {
        let table: Table = (0..4).map(|i| Record::new().with("i", i)).collect();
        assert_eq!(table.len(), 4);
        assert_eq!(table.get(2).and_then(|r| r.get("i")), Some(&Value::Integer(2)));
    }
}
