//! hnpipe - Hacker News top stories pipeline
//!
//! Fetches the current top stories from the public Hacker News API,
//! collects their records into a table, and computes the most frequent
//! words across story titles, hourly or on demand.
//!
//! # Architecture
//!
//! The pipeline is a chain of three assets:
//! `topstory_ids` -> `topstories` -> `most_frequent_words`.
//! Every run is event sourced:
//! - All state changes are recorded as immutable events
//! - Current state is derived by replaying events
//! - Failed runs can be resumed from the last materialized asset
//!
//! # Modules
//!
//! - `adapters`: The Hacker News HTTP client
//! - `assets`: The three asset functions
//! - `core`: Orchestration (EventStore, AssetStore, Warehouse, Scheduler)
//! - `domain`: Data structures (Event, Run, asset values)
//! - `render`: Markdown previews and the word chart
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Materialize all assets once
//! hnpipe materialize
//!
//! # Run hourly
//! hnpipe schedule
//!
//! # Check run status
//! hnpipe status <run-id>
//!
//! # Resume a failed run
//! hnpipe resume <run-id>
//! ```

pub mod adapters;
pub mod assets;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod render;

// Re-export main types at crate root for convenience
pub use config::Settings;
pub use core::{Job, Orchestrator, ScheduleDefinition};
pub use domain::{AssetKey, AssetValue, Event, EventType, Run, RunState, RunTrigger};
