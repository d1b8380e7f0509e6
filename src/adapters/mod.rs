//! Adapter interfaces for external systems.
//!
//! Adapters hide the remote API behind a trait so the assets can be driven
//! by the real Hacker News client or by an in-memory source.

pub mod hackernews;

use async_trait::async_trait;

use crate::domain::ItemRecord;

// Re-export the Hacker News adapter
pub use hackernews::{FetchError, HackerNewsClient};

/// A source of top stories
#[async_trait]
pub trait StorySource: Send + Sync {
    /// Human-readable adapter name
    fn name(&self) -> &str;

    /// Identifiers of the current top stories, in ranking order
    async fn top_story_ids(&self) -> Result<Vec<u64>, FetchError>;

    /// One item by id
    async fn item(&self, id: u64) -> Result<ItemRecord, FetchError>;
}
