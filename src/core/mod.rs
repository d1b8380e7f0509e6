//! Core orchestration logic.
//!
//! This module contains:
//! - EventStore: Append-only run log
//! - AssetStore: Latest value of each asset
//! - Warehouse: SQLite copy of tabular assets
//! - Definitions: The job and its schedule
//! - Orchestrator: Main execution engine
//! - Scheduler: Cron loop driving the orchestrator

pub mod asset_store;
pub mod definitions;
pub mod event_store;
pub mod orchestrator;
pub mod scheduler;
pub mod warehouse;

// Re-export commonly used types
pub use asset_store::AssetStore;
pub use definitions::{Definitions, Job, ScheduleDefinition, JOB_NAME, SCHEDULE_NAME};
pub use event_store::{generate_idempotency_key, hash_input, EventStore};
pub use orchestrator::{Orchestrator, TOPSTORIES_TABLE};
pub use scheduler::Scheduler;
pub use warehouse::Warehouse;
