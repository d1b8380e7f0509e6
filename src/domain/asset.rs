//! Asset keys and the values they materialize to.

use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use super::items::{IdentifierList, ItemTable};
use super::words::WordCountMap;

/// The assets of the Hacker News pipeline, in dependency order
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum AssetKey {
    /// Identifiers of the current top stories
    TopstoryIds,

    /// One row per top story
    Topstories,

    /// Most frequent words across story titles
    MostFrequentWords,
}

impl AssetKey {
    /// All assets, upstream first
    pub const ALL: [AssetKey; 3] = [
        AssetKey::TopstoryIds,
        AssetKey::Topstories,
        AssetKey::MostFrequentWords,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AssetKey::TopstoryIds => "topstory_ids",
            AssetKey::Topstories => "topstories",
            AssetKey::MostFrequentWords => "most_frequent_words",
        }
    }

    /// The asset this one reads from, if any
    pub fn upstream(&self) -> Option<AssetKey> {
        match self {
            AssetKey::TopstoryIds => None,
            AssetKey::Topstories => Some(AssetKey::TopstoryIds),
            AssetKey::MostFrequentWords => Some(AssetKey::Topstories),
        }
    }
}

impl fmt::Display for AssetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssetKey {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AssetKey::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| anyhow::anyhow!("Unknown asset '{}'", s))
    }
}

/// A materialized asset value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "asset", content = "value")]
pub enum AssetValue {
    TopstoryIds(IdentifierList),
    Topstories(ItemTable),
    MostFrequentWords(WordCountMap),
}

impl AssetValue {
    pub fn key(&self) -> AssetKey {
        match self {
            AssetValue::TopstoryIds(_) => AssetKey::TopstoryIds,
            AssetValue::Topstories(_) => AssetKey::Topstories,
            AssetValue::MostFrequentWords(_) => AssetKey::MostFrequentWords,
        }
    }

    pub fn into_ids(self) -> anyhow::Result<IdentifierList> {
        match self {
            AssetValue::TopstoryIds(ids) => Ok(ids),
            other => anyhow::bail!("Expected topstory_ids, found {}", other.key()),
        }
    }

    pub fn into_table(self) -> anyhow::Result<ItemTable> {
        match self {
            AssetValue::Topstories(table) => Ok(table),
            other => anyhow::bail!("Expected topstories, found {}", other.key()),
        }
    }

    pub fn into_words(self) -> anyhow::Result<WordCountMap> {
        match self {
            AssetValue::MostFrequentWords(words) => Ok(words),
            other => anyhow::bail!("Expected most_frequent_words, found {}", other.key()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_key_round_trip_names() {
        for key in AssetKey::ALL {
            assert_eq!(key.as_str().parse::<AssetKey>().unwrap(), key);
        }
        assert!("bogus".parse::<AssetKey>().is_err());
    }

    #[test]
    fn test_upstream_chain() {
        assert_eq!(AssetKey::TopstoryIds.upstream(), None);
        assert_eq!(
            AssetKey::MostFrequentWords.upstream(),
            Some(AssetKey::Topstories)
        );
    }

    #[test]
    fn test_value_serialization_carries_key() {
        let value = AssetValue::TopstoryIds(IdentifierList::from_source(vec![1, 2, 3]));
        let json = serde_json::to_string(&value).unwrap();
        assert!(json.contains("\"topstory_ids\""));

        let parsed: AssetValue = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.key(), AssetKey::TopstoryIds);
        assert_eq!(parsed.into_ids().unwrap().len(), 3);
    }

    #[test]
    fn test_wrong_conversion_fails() {
        let value = AssetValue::MostFrequentWords(WordCountMap::new());
        assert!(value.into_table().is_err());
    }
}
