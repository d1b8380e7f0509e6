//! Run state and reconstruction from events.
//!
//! A Run represents a single execution of a job.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::asset::AssetKey;
use super::events::{Event, EventType, StepStatus};
use super::metadata::{MetadataMap, MetadataValue};

/// Metadata keys written on the `RunStarted` event
pub const RUN_JOB_KEY: &str = "job";
pub const RUN_TRIGGER_KEY: &str = "trigger";
pub const RUN_SELECTION_KEY: &str = "selection";

/// What caused a run to start
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum RunTrigger {
    /// Started from the command line
    Manual,

    /// Started by a schedule tick
    Schedule { name: String },
}

impl fmt::Display for RunTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunTrigger::Manual => f.write_str("manual"),
            RunTrigger::Schedule { name } => write!(f, "schedule:{}", name),
        }
    }
}

impl RunTrigger {
    fn parse(s: &str) -> Self {
        match s.strip_prefix("schedule:") {
            Some(name) => RunTrigger::Schedule {
                name: name.to_string(),
            },
            None => RunTrigger::Manual,
        }
    }
}

/// A job execution run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    /// Unique identifier for this run
    pub id: Uuid,

    /// Name of the job being executed
    pub job_name: String,

    /// What started the run
    pub trigger: RunTrigger,

    /// Assets selected for this run, upstream first
    pub selection: Vec<AssetKey>,

    /// Current state of the run
    pub state: RunState,

    /// When the run started
    pub started_at: DateTime<Utc>,

    /// When the run completed (if applicable)
    pub completed_at: Option<DateTime<Utc>>,

    /// Number of assets materialized so far
    pub current_step: usize,

    /// Status of each asset (asset name -> status)
    pub step_statuses: HashMap<String, StepStatus>,

    /// Metadata reported by each materialized asset
    pub metadata: HashMap<String, MetadataMap>,
}

impl Run {
    /// Create a new run for a job
    pub fn new(id: Uuid, job_name: String, trigger: RunTrigger, selection: Vec<AssetKey>) -> Self {
        Self {
            id,
            job_name,
            trigger,
            selection,
            state: RunState::Running,
            started_at: Utc::now(),
            completed_at: None,
            current_step: 0,
            step_statuses: HashMap::new(),
            metadata: HashMap::new(),
        }
    }

    /// Metadata to record on the `RunStarted` event so the run can be rebuilt
    pub fn start_metadata(&self) -> MetadataMap {
        let selection: Vec<&str> = self.selection.iter().map(|k| k.as_str()).collect();
        let mut metadata = MetadataMap::new();
        metadata.insert(RUN_JOB_KEY, self.job_name.clone());
        metadata.insert(RUN_TRIGGER_KEY, self.trigger.to_string());
        metadata.insert(RUN_SELECTION_KEY, selection.join(","));
        metadata
    }

    /// Reconstruct run state from a sequence of events
    pub fn from_events(events: &[Event]) -> Option<Self> {
        let first_event = events.first()?;

        let mut run = Self::new(
            first_event.run_id,
            String::new(),
            RunTrigger::Manual,
            Vec::new(),
        );
        run.started_at = first_event.timestamp;

        for event in events {
            run.apply_event(event);
        }

        Some(run)
    }

    /// Apply a single event to update run state
    pub fn apply_event(&mut self, event: &Event) {
        match event.event_type {
            EventType::RunStarted => {
                self.state = RunState::Running;
                self.started_at = event.timestamp;
                self.completed_at = None;
                if let Some(MetadataValue::Text(job)) = event.metadata.get(RUN_JOB_KEY) {
                    self.job_name = job.clone();
                }
                if let Some(MetadataValue::Text(trigger)) = event.metadata.get(RUN_TRIGGER_KEY) {
                    self.trigger = RunTrigger::parse(trigger);
                }
                if let Some(MetadataValue::Text(selection)) = event.metadata.get(RUN_SELECTION_KEY)
                {
                    self.selection = selection
                        .split(',')
                        .filter_map(|s| s.parse().ok())
                        .collect();
                }
            }
            EventType::RunCompleted => {
                self.state = RunState::Completed;
                self.completed_at = Some(event.timestamp);
            }
            EventType::RunFailed => {
                self.state = RunState::Failed {
                    error: event.error.clone().unwrap_or_default(),
                };
                self.completed_at = Some(event.timestamp);
            }
            EventType::StepStarted => {
                if let Some(ref step_id) = event.step_id {
                    self.step_statuses
                        .insert(step_id.clone(), StepStatus::Running);
                }
            }
            EventType::StepCompleted => {
                if let Some(ref step_id) = event.step_id {
                    self.step_statuses
                        .insert(step_id.clone(), StepStatus::Completed);
                    self.metadata
                        .insert(step_id.clone(), event.metadata.clone());
                    self.current_step += 1;
                }
            }
            EventType::StepFailed => {
                if let Some(ref step_id) = event.step_id {
                    self.step_statuses
                        .insert(step_id.clone(), StepStatus::Failed);
                }
            }
            EventType::StepSkipped => {
                if let Some(ref step_id) = event.step_id {
                    self.step_statuses
                        .insert(step_id.clone(), StepStatus::Skipped);
                }
            }
        }
    }

    /// Check if a specific asset was materialized in this run
    pub fn is_step_completed(&self, step_name: &str) -> bool {
        self.step_statuses
            .get(step_name)
            .map(|s| *s == StepStatus::Completed)
            .unwrap_or(false)
    }
}

/// State of a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum RunState {
    /// Currently executing
    Running,

    /// Completed successfully
    Completed,

    /// Failed with error
    Failed { error: String },
}

impl Default for RunState {
    fn default() -> Self {
        Self::Running
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::Running => f.write_str("running"),
            RunState::Completed => f.write_str("completed"),
            RunState::Failed { .. } => f.write_str("failed"),
        }
    }
}
