//! Story identifiers, item records and the tabular form of a batch of items.

use std::io::Cursor;

use polars::prelude::{
    AnyValue, DataFrame, JsonFormat, JsonReader, PolarsError, PolarsResult, SerReader,
};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// Upper bound on the number of story identifiers kept per run
pub const MAX_STORY_IDS: usize = 100;

/// Ordered, bounded list of story identifiers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentifierList(Vec<u64>);

impl IdentifierList {
    /// Keep the first `MAX_STORY_IDS` identifiers from `ids`, in order
    pub fn from_source(mut ids: Vec<u64>) -> Self {
        ids.truncate(MAX_STORY_IDS);
        Self(ids)
    }

    pub fn as_slice(&self) -> &[u64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = u64> + '_ {
        self.0.iter().copied()
    }
}

/// One item as returned by the API: field name to arbitrary JSON value
pub type ItemRecord = Map<String, Value>;

/// A batch of item records as a data frame, one row per record
///
/// Columns are the union of the records' fields in first-seen order. A
/// field a record does not carry (or carries as `null`) is a null cell.
#[derive(Debug, Clone)]
pub struct ItemTable {
    frame: DataFrame,
}

impl ItemTable {
    /// Build a table from records, one row per record in input order
    ///
    /// A batch in which no record carries any field has no columns and
    /// therefore no rows.
    pub fn from_records(records: Vec<ItemRecord>) -> PolarsResult<Self> {
        if records.iter().all(|r| r.is_empty()) {
            return Ok(Self::default());
        }

        let mut lines = Vec::new();
        for record in records {
            serde_json::to_writer(&mut lines, &Value::Object(record))
                .map_err(|e| PolarsError::ComputeError(e.to_string().into()))?;
            lines.push(b'\n');
        }

        let frame = JsonReader::new(Cursor::new(lines))
            .with_json_format(JsonFormat::JsonLines)
            .infer_schema_len(None)
            .finish()?;

        Ok(Self { frame })
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn columns(&self) -> Vec<String> {
        self.frame
            .get_column_names()
            .into_iter()
            .map(|name| name.to_string())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.frame.height()
    }

    pub fn is_empty(&self) -> bool {
        self.frame.height() == 0
    }

    /// Cells of one column, one per row. Empty if the column is unknown.
    pub fn column(&self, name: &str) -> Vec<Option<Value>> {
        match self.frame.column(name) {
            Ok(column) => (0..column.len())
                .map(|i| column.get(i).ok().and_then(|v| cell_value(&v)))
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    /// Rows as JSON cells aligned with `columns()`
    pub fn rows(&self) -> impl Iterator<Item = Vec<Option<Value>>> + '_ {
        let columns = self.frame.get_columns();
        (0..self.len()).map(move |i| {
            columns
                .iter()
                .map(|c| c.get(i).ok().and_then(|v| cell_value(&v)))
                .collect()
        })
    }

    /// The first `n` rows
    pub fn head(&self, n: usize) -> Self {
        Self {
            frame: self.frame.head(Some(n)),
        }
    }

    /// Rows as records carrying every column, nulls included
    pub fn records(&self) -> Vec<ItemRecord> {
        let columns = self.columns();
        self.rows()
            .map(|row| {
                columns
                    .iter()
                    .cloned()
                    .zip(row.into_iter().map(|cell| cell.unwrap_or(Value::Null)))
                    .collect()
            })
            .collect()
    }
}

impl Default for ItemTable {
    fn default() -> Self {
        Self {
            frame: DataFrame::empty(),
        }
    }
}

impl PartialEq for ItemTable {
    fn eq(&self, other: &Self) -> bool {
        self.frame.equals_missing(&other.frame)
    }
}

// Persisted as an array of row objects
impl Serialize for ItemTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.records().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ItemTable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let records = Vec::<ItemRecord>::deserialize(deserializer)?;
        Self::from_records(records).map_err(serde::de::Error::custom)
    }
}

/// A cell as JSON; `None` for null
fn cell_value(value: &AnyValue) -> Option<Value> {
    match value {
        AnyValue::Null => None,
        other => Some(to_json(other)),
    }
}

fn to_json(value: &AnyValue) -> Value {
    match value {
        AnyValue::Null => Value::Null,
        AnyValue::Boolean(b) => Value::Bool(*b),
        AnyValue::Int32(v) => Value::from(*v),
        AnyValue::Int64(v) => Value::from(*v),
        AnyValue::UInt32(v) => Value::from(*v),
        AnyValue::UInt64(v) => Value::from(*v),
        AnyValue::Float32(v) => Value::from(f64::from(*v)),
        AnyValue::Float64(v) => Value::from(*v),
        AnyValue::String(s) => Value::String(s.to_string()),
        AnyValue::StringOwned(s) => Value::String(s.to_string()),
        AnyValue::List(series) => Value::Array(
            (0..series.len())
                .map(|i| series.get(i).map(|v| to_json(&v)).unwrap_or(Value::Null))
                .collect(),
        ),
        other => Value::String(other.to_string()),
    }
}
