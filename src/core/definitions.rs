//! Job and schedule definitions.
//!
//! The pipeline has a single job selecting all three assets and a single
//! schedule that triggers it at the top of every hour.

use std::collections::BTreeSet;
use std::str::FromStr;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use cron::Schedule;

use crate::config::Settings;
use crate::domain::AssetKey;

pub const JOB_NAME: &str = "hackernews_job";
pub const SCHEDULE_NAME: &str = "hackernews_schedule";

/// A named selection of assets, executed upstream first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub name: String,
    pub selection: Vec<AssetKey>,
}

impl Job {
    /// A job selecting every asset
    pub fn all_assets(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            selection: AssetKey::ALL.to_vec(),
        }
    }

    /// A job selecting `assets`, deduplicated and ordered upstream first
    pub fn with_selection(name: impl Into<String>, assets: &[AssetKey]) -> Result<Self> {
        let mut selection = assets.to_vec();
        selection.sort();
        selection.dedup();

        let job = Self {
            name: name.into(),
            selection,
        };
        job.validate()?;
        Ok(job)
    }

    /// Validate the job definition
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            anyhow::bail!("Job name cannot be empty");
        }

        if self.selection.is_empty() {
            anyhow::bail!("Job '{}' must select at least one asset", self.name);
        }

        if self.selection.windows(2).any(|w| w[0] >= w[1]) {
            anyhow::bail!(
                "Job '{}' must list each asset once, upstream first",
                self.name
            );
        }

        Ok(())
    }
}

/// A cron schedule bound to a job
#[derive(Debug, Clone)]
pub struct ScheduleDefinition {
    pub name: String,
    pub job_name: String,
    /// The expression as configured
    pub cron: String,
    schedule: Schedule,
}

impl ScheduleDefinition {
    /// Parse `cron` (five fields: minute hour day-of-month month day-of-week)
    ///
    /// Five-field day-of-week numbers follow crontab (0 or 7 = Sunday).
    /// Six- and seven-field expressions with leading seconds are passed to
    /// the `cron` crate as is, so their day-of-week numbering is 1 = Sunday.
    pub fn new(name: impl Into<String>, job_name: impl Into<String>, cron: &str) -> Result<Self> {
        let fields: Vec<&str> = cron.split_whitespace().collect();
        let expression = match fields.as_slice() {
            [minute, hour, day, month, weekday] => format!(
                "0 {} {} {} {} {}",
                minute,
                hour,
                day,
                month,
                translate_weekdays(weekday)
                    .with_context(|| format!("Invalid cron expression '{}'", cron))?
            ),
            [_, _, _, _, _, _] | [_, _, _, _, _, _, _] => fields.join(" "),
            other => anyhow::bail!(
                "Cron expression '{}' has {} fields, expected 5",
                cron,
                other.len()
            ),
        };

        let schedule = Schedule::from_str(&expression)
            .with_context(|| format!("Invalid cron expression '{}'", cron))?;

        Ok(Self {
            name: name.into(),
            job_name: job_name.into(),
            cron: cron.to_string(),
            schedule,
        })
    }

    /// First tick strictly after `after`
    pub fn next_tick_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.schedule.after(&after).next()
    }
}

/// Map a crontab day-of-week field (0-7, Sunday = 0 or 7) to the `cron`
/// crate's numbering (1-7, Sunday = 1)
///
/// Named days and `*` mean the same in both and pass through.
fn translate_weekdays(field: &str) -> Result<String> {
    if field == "*" || field == "?" || field.chars().any(|c| c.is_ascii_alphabetic()) {
        return Ok(field.to_string());
    }

    let number = |text: &str| -> Result<u32> {
        let day: u32 = text
            .parse()
            .with_context(|| format!("Invalid day of week '{}'", text))?;
        if day > 7 {
            anyhow::bail!("Day of week {} is out of range 0-7", day);
        }
        Ok(day)
    };

    let mut days = BTreeSet::new();
    for part in field.split(',') {
        let (range, step) = match part.split_once('/') {
            Some((range, step)) => (range, Some(step)),
            None => (part, None),
        };
        let step = match step {
            Some(step) => step
                .parse::<usize>()
                .ok()
                .filter(|s| *s > 0)
                .with_context(|| format!("Invalid step in '{}'", part))?,
            None => 1,
        };

        let (start, end) = match range.split_once('-') {
            _ if range == "*" => (0, 6),
            Some((start, end)) => (number(start)?, number(end)?),
            None if step > 1 => {
                let start = number(range)?;
                (start, start.max(6))
            }
            None => {
                let day = number(range)?;
                (day, day)
            }
        };
        if start > end {
            anyhow::bail!("Day-of-week range '{}' runs backwards", range);
        }

        days.extend((start..=end).step_by(step).map(|day| day % 7 + 1));
    }

    Ok(days
        .into_iter()
        .map(|day| day.to_string())
        .collect::<Vec<_>>()
        .join(","))
}

/// Everything needed to run the pipeline, assembled once at startup
#[derive(Debug, Clone)]
pub struct Definitions {
    pub job: Job,
    pub schedule: ScheduleDefinition,
    pub settings: Settings,
}

impl Definitions {
    pub fn from_settings(settings: Settings) -> Result<Self> {
        let schedule = ScheduleDefinition::new(SCHEDULE_NAME, JOB_NAME, &settings.schedule_cron)?;
        Ok(Self {
            job: Job::all_assets(JOB_NAME),
            schedule,
            settings,
        })
    }
}
