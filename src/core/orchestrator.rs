//! Main orchestrator for job execution.
//!
//! Materializes the selected assets in order, logging every state change
//! to the run's event log and persisting each value to asset storage.
//! There are no retries: the first failing asset fails the run.

use std::collections::HashMap;
use std::time::Instant;

use anyhow::{Context, Result};
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

use crate::adapters::{HackerNewsClient, StorySource};
use crate::assets::{self, AssetContext};
use crate::config::Settings;
use crate::domain::{
    AssetKey, AssetValue, Event, EventType, MetadataMap, Run, RunState, RunTrigger, StepStatus,
};

use super::asset_store::AssetStore;
use super::definitions::Job;
use super::event_store::{generate_idempotency_key, EventStore};
use super::warehouse::Warehouse;

/// Table name used for `topstories` in the analytical store
pub const TOPSTORIES_TABLE: &str = "topstories";

/// Main job orchestrator
pub struct Orchestrator {
    settings: Settings,

    /// Remote story source
    source: Box<dyn StorySource>,

    /// Latest value of each asset
    asset_store: AssetStore,

    /// Analytical copy of tabular assets
    warehouse: Warehouse,
}

impl Orchestrator {
    /// Create an orchestrator reading from the Hacker News API
    pub fn new(settings: Settings) -> Result<Self> {
        let client = HackerNewsClient::from_settings(&settings.api)
            .context("Failed to create Hacker News client")?;
        Ok(Self::with_source(settings, Box::new(client)))
    }

    /// Create an orchestrator reading from `source`
    pub fn with_source(settings: Settings, source: Box<dyn StorySource>) -> Self {
        let asset_store = AssetStore::new(settings.storage_dir());
        let warehouse = Warehouse::new(settings.database.clone());
        Self {
            settings,
            source,
            asset_store,
            warehouse,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn warehouse(&self) -> &Warehouse {
        &self.warehouse
    }

    /// Execute a job as a new run
    #[instrument(skip(self, job, trigger), fields(job = %job.name, trigger = %trigger))]
    pub async fn run_job(&self, job: &Job, trigger: RunTrigger) -> Result<Run> {
        job.validate()?;

        let run_id = Uuid::new_v4();
        info!(%run_id, "Starting run");

        let store = EventStore::open(&self.settings.runs_dir(), run_id).await?;
        let mut run = Run::new(run_id, job.name.clone(), trigger, job.selection.clone());

        let start_event = Event::new(
            run_id,
            None,
            EventType::RunStarted,
            format!("{}:start", run_id),
            format!("Job '{}' started", job.name),
            StepStatus::Running,
        )
        .with_metadata(run.start_metadata());
        store.append(&start_event).await?;
        run.apply_event(&start_event);

        self.execute(&store, &mut run).await
    }

    /// Re-execute a failed run, skipping assets it already materialized
    #[instrument(skip(self))]
    pub async fn resume_run(&self, run_id: Uuid) -> Result<Run> {
        let runs_dir = self.settings.runs_dir();
        if !runs_dir.join(run_id.to_string()).exists() {
            anyhow::bail!("Run {} not found", run_id);
        }

        let store = EventStore::open(&runs_dir, run_id).await?;
        let events = store.replay().await?;

        let mut run = Run::from_events(&events)
            .with_context(|| format!("No events found for run {}", run_id))?;

        if run.state == RunState::Completed {
            anyhow::bail!("Run {} already completed", run_id);
        }
        if run.selection.is_empty() {
            anyhow::bail!("Run {} has no recorded asset selection", run_id);
        }

        info!(completed = run.current_step, "Resuming run");

        let resume_event = Event::new(
            run_id,
            None,
            EventType::RunStarted,
            format!("{}:resume:{}", run_id, events.len()),
            format!("Job '{}' resumed", run.job_name),
            StepStatus::Running,
        )
        .with_metadata(run.start_metadata());
        store.append(&resume_event).await?;
        run.apply_event(&resume_event);

        self.execute(&store, &mut run).await
    }

    /// Materialize every selected asset of `run` in order
    async fn execute(&self, store: &EventStore, run: &mut Run) -> Result<Run> {
        let mut outputs: HashMap<AssetKey, AssetValue> = HashMap::new();

        for asset in run.selection.clone() {
            let upstream = match self.resolve_upstream(asset, &outputs).await {
                Ok(upstream) => upstream,
                Err(e) => return self.handle_run_failure(store, run, e).await,
            };

            let input = match upstream {
                Some(ref value) => {
                    serde_json::to_string(value).context("Failed to serialize upstream value")?
                }
                None => String::new(),
            };
            let idem_key = generate_idempotency_key(run.id, asset.as_str(), &input);

            // Already materialized in an earlier attempt of this run
            if store.is_step_completed(&idem_key).await? {
                if let Some(value) = store.load_artifact(asset).await? {
                    info!(%asset, "Asset already materialized in this run, skipping");
                    let skipped = Event::new(
                        run.id,
                        Some(asset.to_string()),
                        EventType::StepSkipped,
                        format!("{}:skipped", idem_key),
                        format!("Asset '{}' already materialized", asset),
                        StepStatus::Skipped,
                    );
                    store.append(&skipped).await?;
                    run.apply_event(&skipped);
                    outputs.insert(asset, value);
                    continue;
                }
            }

            match self
                .execute_step(store, run, asset, upstream, idem_key)
                .await
            {
                Ok(value) => {
                    outputs.insert(asset, value);
                }
                Err(e) => {
                    return self.handle_run_failure(store, run, e).await;
                }
            }
        }

        self.complete_run(store, run).await
    }

    /// Materialize one asset and record the outcome
    async fn execute_step(
        &self,
        store: &EventStore,
        run: &mut Run,
        asset: AssetKey,
        upstream: Option<AssetValue>,
        idem_key: String,
    ) -> Result<AssetValue> {
        let step_start = Instant::now();

        let start_event = Event::new(
            run.id,
            Some(asset.to_string()),
            EventType::StepStarted,
            idem_key.clone(),
            format!("Materializing '{}'", asset),
            StepStatus::Running,
        );
        store.append(&start_event).await?;
        run.apply_event(&start_event);

        let result = self.materialize(run.id, asset, upstream).await;
        let duration_ms = step_start.elapsed().as_millis() as u64;

        match result {
            Ok((value, metadata)) => {
                store.store_artifact(&value).await?;

                let summary: Vec<String> = metadata
                    .iter()
                    .map(|(k, v)| format!("{}={}", k, v.summary()))
                    .collect();
                info!(%asset, duration_ms, metadata = %summary.join(" "), "Asset materialized");

                let complete_event = Event::new(
                    run.id,
                    Some(asset.to_string()),
                    EventType::StepCompleted,
                    idem_key,
                    format!("Materialized '{}' in {}ms", asset, duration_ms),
                    StepStatus::Completed,
                )
                .with_duration(duration_ms)
                .with_metadata(metadata);
                store.append(&complete_event).await?;
                run.apply_event(&complete_event);

                Ok(value)
            }
            Err(e) => {
                let fail_event = Event::new(
                    run.id,
                    Some(asset.to_string()),
                    EventType::StepFailed,
                    idem_key,
                    format!("Asset '{}' failed: {}", asset, e),
                    StepStatus::Failed,
                )
                .with_duration(duration_ms)
                .with_error(format!("{:#}", e));
                store.append(&fail_event).await?;
                run.apply_event(&fail_event);

                error!(%asset, error = %format!("{:#}", e), "Asset failed");
                Err(e)
            }
        }
    }

    /// Run the asset function and persist its value
    async fn materialize(
        &self,
        run_id: Uuid,
        asset: AssetKey,
        upstream: Option<AssetValue>,
    ) -> Result<(AssetValue, MetadataMap)> {
        let mut ctx = AssetContext::new(run_id, asset);

        let value = match asset {
            AssetKey::TopstoryIds => {
                let ids = assets::topstory_ids(self.source.as_ref()).await?;
                AssetValue::TopstoryIds(ids)
            }
            AssetKey::Topstories => {
                let ids = required(asset, upstream)?.into_ids()?;
                let table = assets::topstories(
                    &mut ctx,
                    self.source.as_ref(),
                    &ids,
                    self.settings.api.fetch_concurrency,
                )
                .await?;

                let warehouse = self.warehouse.clone();
                let rows = table.clone();
                let written = tokio::task::spawn_blocking(move || {
                    warehouse.replace_table(TOPSTORIES_TABLE, &rows)
                })
                .await
                .context("Warehouse write task failed")??;
                debug!(rows = written, table = TOPSTORIES_TABLE, "Wrote analytical table");

                AssetValue::Topstories(table)
            }
            AssetKey::MostFrequentWords => {
                let table = required(asset, upstream)?.into_table()?;
                let words = assets::most_frequent_words(&mut ctx, &table)?;
                AssetValue::MostFrequentWords(words)
            }
        };

        self.asset_store.save(&value).await?;

        Ok((value, ctx.into_metadata()))
    }

    /// Upstream value of `asset`: from this run if produced here, else from storage
    async fn resolve_upstream(
        &self,
        asset: AssetKey,
        outputs: &HashMap<AssetKey, AssetValue>,
    ) -> Result<Option<AssetValue>> {
        let Some(upstream) = asset.upstream() else {
            return Ok(None);
        };

        if let Some(value) = outputs.get(&upstream) {
            return Ok(Some(value.clone()));
        }

        let stored = self.asset_store.load(upstream).await?.with_context(|| {
            format!(
                "Asset '{}' depends on '{}', which has never been materialized",
                asset, upstream
            )
        })?;
        debug!(%asset, %upstream, "Loaded upstream value from storage");
        Ok(Some(stored))
    }

    /// Handle a run failure
    async fn handle_run_failure(
        &self,
        store: &EventStore,
        run: &mut Run,
        error: anyhow::Error,
    ) -> Result<Run> {
        let error_msg = format!("{:#}", error);
        error!(%error_msg, "Run failed");

        let event = Event::new(
            run.id,
            None,
            EventType::RunFailed,
            format!("{}:complete", run.id),
            format!("Run failed: {}", error_msg),
            StepStatus::Failed,
        )
        .with_error(error_msg);
        store.append(&event).await?;
        run.apply_event(&event);

        Ok(run.clone())
    }

    /// Complete a successful run
    async fn complete_run(&self, store: &EventStore, run: &mut Run) -> Result<Run> {
        info!(run_id = %run.id, "Run completed successfully");

        let event = Event::new(
            run.id,
            None,
            EventType::RunCompleted,
            format!("{}:complete", run.id),
            format!("Job '{}' completed", run.job_name),
            StepStatus::Completed,
        );
        store.append(&event).await?;
        run.apply_event(&event);

        Ok(run.clone())
    }

    /// Get status of a run by ID
    pub async fn get_run_status(&self, run_id: Uuid) -> Result<Run> {
        let runs_dir = self.settings.runs_dir();
        if !runs_dir.join(run_id.to_string()).exists() {
            anyhow::bail!("Run {} not found", run_id);
        }

        let store = EventStore::open(&runs_dir, run_id).await?;
        let events = store.replay().await?;

        Run::from_events(&events).with_context(|| format!("Run {} has no events", run_id))
    }

    /// Assets whose values were stored under `run_id`
    pub async fn run_artifacts(&self, run_id: Uuid) -> Result<Vec<String>> {
        let runs_dir = self.settings.runs_dir();
        if !runs_dir.join(run_id.to_string()).exists() {
            anyhow::bail!("Run {} not found", run_id);
        }

        EventStore::open(&runs_dir, run_id).await?.list_artifacts().await
    }

    /// List recent runs, most recent first
    pub async fn list_runs(&self, limit: usize) -> Result<Vec<Run>> {
        let run_ids = EventStore::list_runs(&self.settings.runs_dir()).await?;
        let mut runs = Vec::new();

        for run_id in run_ids {
            if let Ok(run) = self.get_run_status(run_id).await {
                runs.push(run);
            }
        }

        runs.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        runs.truncate(limit);

        Ok(runs)
    }

    /// Latest stored value of an asset
    pub async fn latest_value(&self, asset: AssetKey) -> Result<Option<AssetValue>> {
        self.asset_store.load(asset).await
    }
}

fn required(asset: AssetKey, upstream: Option<AssetValue>) -> Result<AssetValue> {
    upstream.with_context(|| format!("Asset '{}' was not given its upstream value", asset))
}
