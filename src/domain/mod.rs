//! Domain types for the hnpipe orchestrator.
//!
//! This module contains the core data structures:
//! - Events: Immutable records of state changes
//! - Run: Job execution state
//! - Asset: Asset keys and materialized values
//! - Items / Words: The data flowing between assets

pub mod asset;
pub mod events;
pub mod items;
pub mod metadata;
pub mod run;
pub mod words;

// Re-export commonly used types
pub use asset::{AssetKey, AssetValue};
pub use events::{Event, EventType, StepStatus};
pub use items::{IdentifierList, ItemRecord, ItemTable, MAX_STORY_IDS};
pub use metadata::{MetadataMap, MetadataValue};
pub use run::{Run, RunState, RunTrigger};
pub use words::{WordCount, WordCountMap, TOP_WORDS};
