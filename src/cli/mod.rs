//! Command-line interface for hnpipe.
//!
//! Provides commands for materializing the pipeline, running its schedule,
//! checking status, listing runs, resuming failed runs, and inspecting
//! stored asset values.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use uuid::Uuid;

use crate::config::{self, Settings};
use crate::core::{Definitions, Job, Orchestrator, Scheduler, TOPSTORIES_TABLE};
use crate::domain::{AssetKey, AssetValue, Run, RunState, RunTrigger};
use crate::render::table_preview;

/// Rows shown by `show topstories`
const SHOW_ROWS: usize = 10;

/// hnpipe - Hacker News top stories pipeline
#[derive(Parser, Debug)]
#[command(name = "hnpipe")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Materialize the job once
    Materialize {
        /// Only materialize these assets (upstream values are read from storage)
        #[arg(short, long, value_enum, num_args = 1..)]
        select: Vec<AssetKey>,
    },

    /// Run the job on its cron schedule
    Schedule {
        /// Exit after the first scheduled run
        #[arg(long)]
        once: bool,
    },

    /// Check the status of a run
    Status {
        /// Run ID (UUID)
        run_id: String,
    },

    /// List recent runs
    Runs {
        /// Maximum number of runs to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// Resume a failed run
    Resume {
        /// Run ID to resume
        run_id: String,
    },

    /// Show the latest stored value of an asset
    Show {
        #[arg(value_enum)]
        asset: AssetKey,
    },

    /// Show resolved configuration (debug)
    Config,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        let settings = config::load_settings()?;

        match self.command {
            Commands::Materialize { select } => materialize(settings, &select).await,
            Commands::Schedule { once } => schedule(settings, once).await,
            Commands::Status { run_id } => show_status(settings, &run_id).await,
            Commands::Runs { limit } => list_runs(settings, limit).await,
            Commands::Resume { run_id } => resume_run(settings, &run_id).await,
            Commands::Show { asset } => show_asset(settings, asset).await,
            Commands::Config => show_config(&settings),
        }
    }
}

/// Run the job (or a subset of it) once
async fn materialize(settings: Settings, select: &[AssetKey]) -> Result<()> {
    let defs = Definitions::from_settings(settings)?;
    let job = if select.is_empty() {
        defs.job
    } else {
        Job::with_selection(defs.job.name, select)?
    };

    let orchestrator = Orchestrator::new(defs.settings)?;
    let run = orchestrator.run_job(&job, RunTrigger::Manual).await?;

    report(&orchestrator, &run, "completed successfully").await
}

/// Run the schedule loop until Ctrl+C
async fn schedule(settings: Settings, once: bool) -> Result<()> {
    let defs = Definitions::from_settings(settings)?;
    let orchestrator = Orchestrator::new(defs.settings.clone())?;

    eprintln!(
        "Schedule '{}' ({}) running job '{}'",
        defs.schedule.name, defs.schedule.cron, defs.job.name
    );
    eprintln!("    Press Ctrl+C to stop");

    let scheduler = Scheduler::new(&orchestrator, &defs.job, &defs.schedule);
    let started = scheduler
        .run(once, async {
            tokio::signal::ctrl_c().await.ok();
        })
        .await?;

    eprintln!("Scheduled runs started: {}", started);
    Ok(())
}

/// Show the status of a run
async fn show_status(settings: Settings, run_id_str: &str) -> Result<()> {
    let run_id = parse_run_id(run_id_str)?;

    let orchestrator = Orchestrator::new(settings)?;
    let run = orchestrator.get_run_status(run_id).await?;

    println!("Run ID: {}", run.id);
    println!("Job: {}", run.job_name);
    println!("Trigger: {}", run.trigger);
    println!("State: {}", run.state);
    if let RunState::Failed { ref error } = run.state {
        println!("Error: {}", error);
    }
    println!("Started: {}", run.started_at);
    if let Some(completed) = run.completed_at {
        println!("Completed: {}", completed);
    }
    println!("Assets materialized: {}", run.current_step);
    println!("\nAsset statuses:");
    for asset in &run.selection {
        let status = run
            .step_statuses
            .get(asset.as_str())
            .map(|s| format!("{:?}", s))
            .unwrap_or_else(|| "Pending".to_string());
        println!("  {}: {}", asset, status);

        if let Some(metadata) = run.metadata.get(asset.as_str()) {
            for (key, value) in metadata.iter() {
                println!("    {}: {}", key, value.summary());
            }
        }
    }

    let artifacts = orchestrator.run_artifacts(run_id).await?;
    if !artifacts.is_empty() {
        println!("\nArtifacts: {}", artifacts.join(", "));
    }

    Ok(())
}

/// List recent runs
async fn list_runs(settings: Settings, limit: usize) -> Result<()> {
    let orchestrator = Orchestrator::new(settings)?;
    let runs = orchestrator.list_runs(limit).await?;

    if runs.is_empty() {
        println!("No runs found");
        return Ok(());
    }

    println!(
        "{:<38} {:<16} {:<26} {:<10} {}",
        "RUN ID", "JOB", "TRIGGER", "STATE", "STARTED"
    );
    println!("{}", "-".repeat(110));

    for run in runs {
        println!(
            "{:<38} {:<16} {:<26} {:<10} {}",
            run.id,
            run.job_name,
            run.trigger.to_string(),
            run.state.to_string(),
            run.started_at.format("%Y-%m-%d %H:%M:%S")
        );
    }

    Ok(())
}

/// Resume a failed run
async fn resume_run(settings: Settings, run_id_str: &str) -> Result<()> {
    let run_id = parse_run_id(run_id_str)?;

    let orchestrator = Orchestrator::new(settings)?;
    let run = orchestrator.resume_run(run_id).await?;

    report(&orchestrator, &run, "resumed and completed successfully").await
}

/// Print the outcome of a run; exits with status 1 if it failed
async fn report(orchestrator: &Orchestrator, run: &Run, success: &str) -> Result<()> {
    match &run.state {
        RunState::Completed => {
            if run.selection.contains(&AssetKey::MostFrequentWords) {
                if let Some(value) = orchestrator.latest_value(AssetKey::MostFrequentWords).await? {
                    print_value(&value);
                }
            }
            eprintln!("\n[Run {} {}]", run.id, success);
        }
        RunState::Failed { error } => {
            eprintln!("\n[Run {} failed: {}]", run.id, error);
            std::process::exit(1);
        }
        RunState::Running => {
            eprintln!("\n[Run {} in state: {}]", run.id, run.state);
        }
    }

    Ok(())
}

/// Print the latest value of an asset
async fn show_asset(settings: Settings, asset: AssetKey) -> Result<()> {
    let orchestrator = Orchestrator::new(settings)?;

    match orchestrator.latest_value(asset).await? {
        Some(value) => {
            print_value(&value);
            if asset == AssetKey::Topstories {
                if let Some(rows) = orchestrator.warehouse().row_count(TOPSTORIES_TABLE)? {
                    println!(
                        "\nAnalytical table '{}': {} rows in {}",
                        TOPSTORIES_TABLE,
                        rows,
                        orchestrator.warehouse().path().display()
                    );
                }
            }
        }
        None => println!(
            "Asset '{}' has not been materialized. Use 'hnpipe materialize' first.",
            asset
        ),
    }

    Ok(())
}

fn print_value(value: &AssetValue) {
    match value {
        AssetValue::TopstoryIds(ids) => {
            for id in ids.iter() {
                println!("{}", id);
            }
            println!("\nTotal: {} ids", ids.len());
        }
        AssetValue::Topstories(table) => {
            println!("{}", table_preview(table, SHOW_ROWS));
            println!("\nTotal: {} rows", table.len());
        }
        AssetValue::MostFrequentWords(words) => {
            println!("{:<24} {:>6}", "WORD", "COUNT");
            println!("{}", "-".repeat(31));
            for entry in words.entries() {
                println!("{:<24} {:>6}", entry.word, entry.count);
            }
        }
    }
}

fn show_config(settings: &Settings) -> Result<()> {
    println!("hnpipe configuration");
    println!();
    println!(
        "Config file: {}",
        settings
            .config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - using defaults)".to_string())
    );
    println!();
    println!("Paths:");
    println!("  Home:      {}", settings.home.display());
    println!("  Storage:   {}", settings.storage_dir().display());
    println!("  Runs:      {}", settings.runs_dir().display());
    println!("  Database:  {}", settings.database.display());
    println!();
    println!("Hacker News API:");
    println!("  Base URL:          {}", settings.api.base_url);
    println!("  Timeout:           {}s", settings.api.timeout_seconds);
    println!("  Fetch concurrency: {}", settings.api.fetch_concurrency);
    println!();
    println!("Schedule:");
    println!("  Cron: {}", settings.schedule_cron);
    println!();
    println!("Resources:");
    println!("  datagen.num_days: {}", settings.datagen.num_days);

    Ok(())
}

fn parse_run_id(run_id_str: &str) -> Result<Uuid> {
    Uuid::parse_str(run_id_str).with_context(|| format!("Invalid run ID: {}", run_id_str))
}
