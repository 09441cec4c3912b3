//! Periodic progress sweep
//!
//! Re-applies hybrid progress to every ongoing project so elapsed-time progress
//! keeps moving without user interaction. Each project is loaded, updated and
//! saved on its own; one failure never aborts the batch.

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use uuid::Uuid;

use crate::db;
use crate::domain::progress::apply_hybrid_progress;
use crate::domain::{Project, ProjectStatus};

/// Outcome of one sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub scanned: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub missing: usize,
    pub failed: usize,
}

/// What happened to one project during a sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepOutcome {
    Updated,
    Unchanged,
    /// Deleted while the sweep was running
    Missing,
}

impl SweepOutcome {
    /// Outcome of writing a refreshed project back
    pub fn after_save(saved: bool) -> Self {
        if saved {
            Self::Updated
        } else {
            Self::Missing
        }
    }
}

impl SweepReport {
    pub fn record(&mut self, outcome: SweepOutcome) {
        match outcome {
            SweepOutcome::Updated => self.updated += 1,
            SweepOutcome::Unchanged => self.unchanged += 1,
            SweepOutcome::Missing => self.missing += 1,
        }
    }
}

/// Project, floor and task progress in tree order
fn progress_snapshot(project: &Project) -> Vec<i32> {
    let mut values = vec![project.progress];
    for floor in &project.floors {
        values.push(floor.progress);
        values.extend(floor.tasks.iter().map(|t| t.progress));
    }
    values
}

/// Recompute progress for one project; returns whether any value moved
pub fn refresh_project(project: &mut Project, now: DateTime<Utc>) -> bool {
    let before = progress_snapshot(project);
    apply_hybrid_progress(project, now);

    let changed = progress_snapshot(project) != before;
    if changed {
        project.updated_at = now;
    }
    changed
}

/// Whether a loaded project should be written back by the sweep
fn needs_save(project: &mut Project, now: DateTime<Utc>) -> bool {
    project.status == ProjectStatus::Ongoing && refresh_project(project, now)
}

async fn sweep_one(pool: &PgPool, id: Uuid, now: DateTime<Utc>) -> Result<SweepOutcome> {
    let Some(mut project) = db::projects::fetch(pool, id).await? else {
        return Ok(SweepOutcome::Missing);
    };

    if !needs_save(&mut project, now) {
        return Ok(SweepOutcome::Unchanged);
    }

    let outcome = SweepOutcome::after_save(db::projects::save(pool, &project).await?);
    if outcome == SweepOutcome::Updated {
        tracing::info!(project_id = %id, progress = project.progress, "Project progress refreshed");
    }
    Ok(outcome)
}

/// Run a single sweep over all ongoing projects
pub async fn run_sweep(pool: &PgPool, now: DateTime<Utc>) -> Result<SweepReport> {
    let ids = db::projects::ids_with_status(pool, ProjectStatus::Ongoing).await?;
    let mut report = SweepReport {
        scanned: ids.len(),
        ..SweepReport::default()
    };

    for id in ids {
        match sweep_one(pool, id, now).await {
            Ok(outcome) => report.record(outcome),
            Err(e) => {
                tracing::error!(project_id = %id, error = ?e, "Failed to refresh project progress");
                report.failed += 1;
            }
        }
    }

    tracing::info!(
        scanned = report.scanned,
        updated = report.updated,
        unchanged = report.unchanged,
        missing = report.missing,
        failed = report.failed,
        "Progress sweep finished"
    );

    Ok(report)
}

/// Spawn the background sweep loop
pub fn spawn_progress_sweep(
    pool: PgPool,
    interval_hours: u64,
    run_on_startup: bool,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = interval(Duration::from_secs(interval_hours.max(1) * 3600));
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        // The first tick completes immediately
        if !run_on_startup {
            timer.tick().await;
        }

        loop {
            timer.tick().await;

            if let Err(e) = run_sweep(&pool, Utc::now()).await {
                tracing::error!(error = ?e, "Progress sweep failed");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::projects::{CreateProjectRequest, Timeline, TimelineUnit};
    use chrono::Duration as ChronoDuration;

    fn ongoing_project(now: DateTime<Utc>) -> Project {
        let req = CreateProjectRequest {
            name: "Riverside Duplex".to_string(),
            contractor: "contractor-1".to_string(),
            owner: "owner-1".to_string(),
            num_floors: 2,
            template_id: None,
            timeline: Timeline {
                duration: 10,
                unit: TimelineUnit::Weeks,
            },
            location: "Cebu".to_string(),
            total_area: 120.0,
            avg_floor_height: 3.0,
            room_count: 4,
            foundation_depth: 1.5,
            project_image: None,
        };
        let mut project = Project::new(req, now).unwrap();
        project.status = ProjectStatus::Ongoing;
        project.is_automatic_progress = true;
        project
    }

    #[test]
    fn refresh_moves_progress_and_touches_timestamp() {
        let start = Utc::now() - ChronoDuration::days(35);
        let now = start + ChronoDuration::days(35);
        let mut project = ongoing_project(start);

        assert!(refresh_project(&mut project, now));
        assert_eq!(project.progress, 50);
        assert_eq!(project.updated_at, now);
    }

    #[test]
    fn second_refresh_at_same_instant_is_a_no_op() {
        let start = Utc::now() - ChronoDuration::days(14);
        let now = start + ChronoDuration::days(14);
        let mut project = ongoing_project(start);

        refresh_project(&mut project, now);
        let stamped = project.updated_at;

        assert!(!refresh_project(&mut project, now));
        assert_eq!(project.updated_at, stamped);
    }

    #[test]
    fn projects_no_longer_ongoing_are_not_saved() {
        let start = Utc::now() - ChronoDuration::days(35);
        let now = start + ChronoDuration::days(35);
        let mut project = ongoing_project(start);
        project.status = ProjectStatus::Postponed;

        assert!(!needs_save(&mut project, now));
        assert_eq!(project.progress, 0);

        project.status = ProjectStatus::Ongoing;
        assert!(needs_save(&mut project, now));
    }

    #[test]
    fn project_deleted_before_save_is_not_counted_as_updated() {
        let mut report = SweepReport::default();
        report.record(SweepOutcome::after_save(false));
        report.record(SweepOutcome::after_save(true));
        report.record(SweepOutcome::Unchanged);

        assert_eq!(
            report,
            SweepReport {
                scanned: 0,
                updated: 1,
                unchanged: 1,
                missing: 1,
                failed: 0,
            }
        );
    }
}
