//! The three assets of the Hacker News pipeline.
//!
//! ```text
//! topstory_ids → topstories → most_frequent_words
//! ```
//!
//! Each asset is a plain async (or sync) function of its upstream value.
//! Metadata about the output is reported through an [`AssetContext`].

pub mod most_frequent_words;
pub mod topstories;
pub mod topstory_ids;

use uuid::Uuid;

use crate::domain::{AssetKey, MetadataMap};

pub use most_frequent_words::{count_words, most_frequent_words, tokenize, CHART_TITLE, STOPWORDS};
pub use topstories::{topstories, PROGRESS_EVERY};
pub use topstory_ids::topstory_ids;

/// Per-materialization context handed to an asset
#[derive(Debug, Clone)]
pub struct AssetContext {
    /// Run this materialization belongs to
    pub run_id: Uuid,

    /// Asset being materialized
    pub asset: AssetKey,

    metadata: MetadataMap,
}

impl AssetContext {
    pub fn new(run_id: Uuid, asset: AssetKey) -> Self {
        Self {
            run_id,
            asset,
            metadata: MetadataMap::new(),
        }
    }

    /// Attach metadata to the output being produced
    pub fn add_output_metadata(&mut self, metadata: MetadataMap) {
        self.metadata.extend(metadata);
    }

    pub fn metadata(&self) -> &MetadataMap {
        &self.metadata
    }

    pub fn into_metadata(self) -> MetadataMap {
        self.metadata
    }
}
