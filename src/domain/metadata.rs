//! Metadata attached to asset materializations.
//!
//! Mirrors what a step reports about its output: counts, previews,
//! embedded charts. Values are kept in insertion order.

use serde::{Deserialize, Serialize};

/// A single metadata value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum MetadataValue {
    /// Integer value (e.g. a record count)
    Int(i64),

    /// Plain text
    Text(String),

    /// Markdown to be rendered by a viewer
    Markdown(String),
}

impl MetadataValue {
    /// Wrap a Markdown string
    pub fn md(content: impl Into<String>) -> Self {
        Self::Markdown(content.into())
    }

    /// Short, single-line rendering for terminal output
    pub fn summary(&self) -> String {
        match self {
            MetadataValue::Int(v) => v.to_string(),
            MetadataValue::Text(s) => s.clone(),
            MetadataValue::Markdown(s) => {
                let first = s.lines().next().unwrap_or_default();
                if first.len() > 60 || s.lines().count() > 1 {
                    format!("<markdown, {} bytes>", s.len())
                } else {
                    first.to_string()
                }
            }
        }
    }
}

impl From<i64> for MetadataValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<usize> for MetadataValue {
    fn from(v: usize) -> Self {
        Self::Int(v as i64)
    }
}

impl From<&str> for MetadataValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

/// Ordered key/value metadata for one materialization
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetadataMap(Vec<(String, MetadataValue)>);

impl MetadataMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a value, keeping the original position on replace
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<MetadataValue>) {
        let key = key.into();
        let value = value.into();
        if let Some(slot) = self.0.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value;
        } else {
            self.0.push((key, value));
        }
    }

    pub fn get(&self, key: &str) -> Option<&MetadataValue> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Merge another map into this one
    pub fn extend(&mut self, other: MetadataMap) {
        for (k, v) in other.0 {
            self.insert(k, v);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MetadataValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<MetadataValue>> FromIterator<(K, V)> for MetadataMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}
