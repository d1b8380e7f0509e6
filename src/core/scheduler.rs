//! Cron-driven schedule loop.
//!
//! Sleeps until the next tick of the schedule, starts one run of the job,
//! and repeats. Runs never overlap: a tick that passes while a run is still
//! executing is dropped.

use std::future::Future;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use crate::domain::{RunState, RunTrigger};

use super::definitions::{Job, ScheduleDefinition};
use super::orchestrator::Orchestrator;

pub struct Scheduler<'a> {
    orchestrator: &'a Orchestrator,
    job: &'a Job,
    schedule: &'a ScheduleDefinition,
}

impl<'a> Scheduler<'a> {
    pub fn new(orchestrator: &'a Orchestrator, job: &'a Job, schedule: &'a ScheduleDefinition) -> Self {
        Self {
            orchestrator,
            job,
            schedule,
        }
    }

    /// Run the loop until `shutdown` resolves, or after the first tick if
    /// `once` is set. Returns the number of runs started.
    pub async fn run<F>(&self, once: bool, shutdown: F) -> Result<usize>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut started = 0;

        loop {
            let now = Utc::now();
            let next = self.schedule.next_tick_after(now).with_context(|| {
                format!("Schedule '{}' has no upcoming ticks", self.schedule.name)
            })?;

            info!(schedule = %self.schedule.name, next_tick = %next, "Waiting for next tick");

            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!("Stopping schedule");
                    break;
                }
                _ = tokio::time::sleep(delay_until(now, next)) => {}
            }

            started += 1;
            let trigger = RunTrigger::Schedule {
                name: self.schedule.name.clone(),
            };

            match self.orchestrator.run_job(self.job, trigger).await {
                Ok(run) => match run.state {
                    RunState::Failed { ref error } => {
                        warn!(run_id = %run.id, %error, "Scheduled run failed");
                    }
                    _ => info!(run_id = %run.id, "Scheduled run finished"),
                },
                Err(e) => error!(error = %format!("{:#}", e), "Scheduled run could not be recorded"),
            }

            if once {
                break;
            }
        }

        Ok(started)
    }
}

/// Time left from `now` until `tick`; zero if the tick has passed
pub fn delay_until(now: DateTime<Utc>, tick: DateTime<Utc>) -> Duration {
    (tick - now).to_std().unwrap_or(Duration::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::core::definitions::{JOB_NAME, SCHEDULE_NAME};
    use chrono::TimeZone;
    use tempfile::TempDir;

    #[test]
    fn test_delay_until() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 10, 15, 0).unwrap();
        let tick = Utc.with_ymd_and_hms(2024, 3, 1, 11, 0, 0).unwrap();
        assert_eq!(delay_until(now, tick), Duration::from_secs(45 * 60));
        assert_eq!(delay_until(tick, now), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_shutdown_before_first_tick() {
        let temp = TempDir::new().unwrap();
        let orchestrator = Orchestrator::new(Settings::rooted_at(temp.path())).unwrap();
        let job = Job::all_assets(JOB_NAME);
        let schedule = ScheduleDefinition::new(SCHEDULE_NAME, JOB_NAME, "0 * * * *").unwrap();

        let scheduler = Scheduler::new(&orchestrator, &job, &schedule);
        let started = scheduler.run(false, async {}).await.unwrap();

        assert_eq!(started, 0);
        assert!(!temp.path().join("data").join("runs").exists());
    }
}
