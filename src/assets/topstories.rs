//! `topstories`: one row per top story.

use anyhow::{Context, Result};
use futures::{stream, StreamExt};
use tracing::info;

use crate::adapters::StorySource;
use crate::domain::{IdentifierList, ItemTable, MetadataMap, MetadataValue};
use crate::render::table_preview;

use super::AssetContext;

/// Emit a progress line after this many items
pub const PROGRESS_EVERY: usize = 20;

/// Rows shown in the `preview` metadata
pub const PREVIEW_ROWS: usize = 5;

/// Fetch every item in `ids` and tabulate them in id order
///
/// At most `concurrency` requests are in flight; results are collected in
/// the order of `ids` regardless. The first failed request aborts the
/// collection; its `FetchError` is returned unwrapped.
pub async fn topstories(
    ctx: &mut AssetContext,
    source: &dyn StorySource,
    ids: &IdentifierList,
    concurrency: usize,
) -> Result<ItemTable> {
    let mut results = Vec::with_capacity(ids.len());

    let mut items = stream::iter(ids.iter())
        .map(|id| source.item(id))
        .buffered(concurrency.max(1));

    while let Some(item) = items.next().await {
        results.push(item?);

        if results.len() % PROGRESS_EVERY == 0 {
            info!("Got {} items so far.", results.len());
        }
    }

    let table = ItemTable::from_records(results).context("Failed to tabulate items")?;

    let mut metadata = MetadataMap::new();
    metadata.insert("num_records", table.len());
    metadata.insert("preview", MetadataValue::md(table_preview(&table, PREVIEW_ROWS)));
    ctx.add_output_metadata(metadata);

    Ok(table)
}
