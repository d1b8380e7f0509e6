//! `topstory_ids`: identifiers of the current top stories.

use tracing::debug;

use crate::adapters::{FetchError, StorySource};
use crate::domain::IdentifierList;

/// Fetch the top story ids and keep at most the first 100
pub async fn topstory_ids(source: &dyn StorySource) -> Result<IdentifierList, FetchError> {
    let ids = source.top_story_ids().await?;
    debug!(received = ids.len(), adapter = source.name(), "Fetched top story ids");
    Ok(IdentifierList::from_source(ids))
}
