//! Hybrid progress propagation
//!
//! Project progress is derived from elapsed time against the planned timeline
//! (stretched by postponements) and pushed down to floors and then tasks by
//! complexity weight. Floors and tasks flagged manual keep their own values.
//!
//! Every function takes `now` explicitly; callers pass the request time.

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use super::projects::{whole_percent, Floor, Project, ProjectStatus, Task};

const SECONDS_PER_DAY: i64 = 86_400;

#[derive(Debug, Error, PartialEq)]
pub enum ProgressError {
    #[error("Cannot move project from {from} to '{to}'")]
    InvalidStatusTransition { from: ProjectStatus, to: String },

    #[error("Floor {0} not found")]
    FloorNotFound(Uuid),

    #[error("Floor {0} is already in automatic mode")]
    FloorAlreadyAutomatic(Uuid),

    #[error("Progress must be between 0 and 100, got {0}")]
    InvalidProgress(f64),
}

/// Whole days between two instants, rounded down
fn whole_days(from: DateTime<Utc>, to: DateTime<Utc>) -> i64 {
    (to - from).num_seconds().div_euclid(SECONDS_PER_DAY)
}

/// Total days lost to postponements.
///
/// A postponement without a matching resume keeps accruing until `now`.
pub fn cumulative_delay_days(project: &Project, now: DateTime<Utc>) -> i64 {
    project
        .postponed_dates
        .iter()
        .enumerate()
        .map(|(i, postponed)| {
            let resumed = project.resumed_dates.get(i).copied().unwrap_or(now);
            whole_days(*postponed, resumed).max(0)
        })
        .sum()
}

/// Time-based completion percentage (0..=100).
///
/// Manual projects report 0.
pub fn compute_progress(project: &Project, now: DateTime<Utc>) -> i32 {
    if !project.is_automatic_progress {
        return 0;
    }

    let timeline_days = project.timeline.days();
    let delay = cumulative_delay_days(project, now);
    let adjusted_days = timeline_days + delay;
    let elapsed = whole_days(project.reference_date, now).max(0);

    let progress = if adjusted_days <= 0 {
        100
    } else {
        let ratio = elapsed as f64 / adjusted_days as f64;
        (ratio * 100.0).min(100.0).round() as i32
    };

    tracing::debug!(
        project_id = %project.id,
        reference_date = %project.reference_date,
        days_elapsed = elapsed,
        timeline_days,
        cumulative_delay = delay,
        adjusted_timeline_days = adjusted_days,
        progress,
        "Calculated project progress"
    );

    progress
}

/// Node that receives a weighted share of its parent's progress
pub trait Weighted {
    fn is_manual(&self) -> bool;
    fn complexity_weight(&self) -> f64;

    /// Weight used for allocation; unusable weights count as 1
    fn effective_weight(&self) -> f64 {
        let weight = self.complexity_weight();
        if weight.is_finite() && weight > 0.0 {
            weight
        } else {
            1.0
        }
    }
}

impl Weighted for Floor {
    fn is_manual(&self) -> bool {
        self.is_manual
    }

    fn complexity_weight(&self) -> f64 {
        self.complexity_weight
    }
}

impl Weighted for Task {
    fn is_manual(&self) -> bool {
        self.is_manual
    }

    fn complexity_weight(&self) -> f64 {
        self.complexity_weight
    }
}

/// Split `pool` across the automatic siblings by weight.
///
/// The result is aligned with `items`: manual entries get `None` and their
/// weight stays out of the denominator.
pub fn distribute<T: Weighted>(pool: i32, items: &[T]) -> Vec<Option<i32>> {
    let total_weight: f64 = items
        .iter()
        .filter(|item| !item.is_manual())
        .map(Weighted::effective_weight)
        .sum();

    items
        .iter()
        .map(|item| {
            if item.is_manual() || total_weight <= 0.0 {
                return None;
            }
            let share = f64::from(pool) * item.effective_weight() / total_weight;
            Some((share.round() as i32).min(100))
        })
        .collect()
}

pub fn distribute_floor_progress(total_progress: i32, floors: &[Floor]) -> Vec<Option<i32>> {
    distribute(total_progress, floors)
}

pub fn distribute_task_progress(floor_progress: i32, tasks: &[Task]) -> Vec<Option<i32>> {
    distribute(floor_progress, tasks)
}

/// Recompute project progress and push it down the floor/task tree.
///
/// Manual floors keep their value but their automatic tasks still share it.
/// Finished projects are left at their final values.
pub fn apply_hybrid_progress(project: &mut Project, now: DateTime<Utc>) {
    if project.status == ProjectStatus::Finished {
        return;
    }

    let total = compute_progress(project, now);
    project.progress = total;

    let floor_shares = distribute_floor_progress(total, &project.floors);
    for (floor, share) in project.floors.iter_mut().zip(floor_shares) {
        if let Some(progress) = share {
            floor.progress = progress;
        }

        let task_shares = distribute_task_progress(floor.progress, &floor.tasks);
        for (task, share) in floor.tasks.iter_mut().zip(task_shares) {
            if let Some(progress) = share {
                task.progress = progress;
            }
        }
    }
}

fn finish(project: &mut Project, now: DateTime<Utc>) {
    project.end_date = Some(now);
    project.progress = 100;
    for floor in &mut project.floors {
        floor.progress = 100;
        floor.is_manual = false;
        for task in &mut floor.tasks {
            task.progress = 100;
            task.is_manual = false;
        }
    }
}

/// Move a project through its lifecycle.
///
/// `not_started -> ongoing <-> postponed`, and `ongoing | postponed -> finished`.
/// Finishing is terminal.
pub fn transition_status(
    project: &mut Project,
    to: ProjectStatus,
    now: DateTime<Utc>,
) -> Result<(), ProgressError> {
    use ProjectStatus::*;

    match (project.status, to) {
        (NotStarted, Ongoing) => {
            project.start_date = now;
            project.reference_date = now;
        }
        (Postponed, Ongoing) => {
            project.resumed_dates.push(now);
            project.reference_date = now;
        }
        (Ongoing, Postponed) => {
            project.postponed_dates.push(now);
        }
        (Ongoing | Postponed, Finished) => finish(project, now),
        (from, to) => {
            return Err(ProgressError::InvalidStatusTransition {
                from,
                to: to.to_string(),
            })
        }
    }

    tracing::info!(
        project_id = %project.id,
        from = %project.status,
        to = %to,
        "Project status changed"
    );
    project.status = to;
    Ok(())
}

/// Same as `transition_status` for a status name taken from a request
pub fn transition_status_named(
    project: &mut Project,
    to: &str,
    now: DateTime<Utc>,
) -> Result<(), ProgressError> {
    let status = to
        .parse::<ProjectStatus>()
        .map_err(|_| ProgressError::InvalidStatusTransition {
            from: project.status,
            to: to.to_string(),
        })?;
    transition_status(project, status, now)
}

/// Switch between automatic and manual progress.
///
/// Automatic restarts the elapsed-time anchor and releases every override;
/// manual freezes every floor and task at its current value.
pub fn set_progress_mode(project: &mut Project, automatic: bool, now: DateTime<Utc>) {
    project.is_automatic_progress = automatic;
    if automatic {
        project.reference_date = now;
    }

    let manual = !automatic;
    for floor in &mut project.floors {
        floor.is_manual = manual;
        for task in &mut floor.tasks {
            task.is_manual = manual;
        }
    }
}

/// Set a floor's progress by hand.
///
/// Once no floor is manual any more, the elapsed-time anchor restarts at `now`.
pub fn set_floor_progress(
    project: &mut Project,
    floor_id: Uuid,
    progress: f64,
    is_manual: bool,
    now: DateTime<Utc>,
) -> Result<(), ProgressError> {
    let value = whole_percent(progress).map_err(|_| ProgressError::InvalidProgress(progress))?;
    let floor = project
        .floor_mut(floor_id)
        .ok_or(ProgressError::FloorNotFound(floor_id))?;

    floor.progress = value;
    floor.is_manual = is_manual;

    if !project.floors.iter().any(|f| f.is_manual) {
        project.reference_date = now;
    }
    Ok(())
}

/// Hand a manual floor back to automatic allocation
pub fn reset_floor_to_automatic(
    project: &mut Project,
    floor_id: Uuid,
    now: DateTime<Utc>,
) -> Result<(), ProgressError> {
    let floor = project
        .floor_mut(floor_id)
        .ok_or(ProgressError::FloorNotFound(floor_id))?;

    if !floor.is_manual {
        return Err(ProgressError::FloorAlreadyAutomatic(floor_id));
    }

    floor.is_manual = false;
    project.reference_date = now;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::projects::{CreateProjectRequest, Timeline, TimelineUnit};
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn project(num_floors: u32, duration: u32, unit: TimelineUnit) -> Project {
        let req = CreateProjectRequest {
            name: "Hillside residence".to_string(),
            contractor: "builder".to_string(),
            owner: "client".to_string(),
            num_floors,
            template_id: None,
            timeline: Timeline { duration, unit },
            location: "Metro".to_string(),
            total_area: 150.0,
            avg_floor_height: 3.0,
            room_count: 5,
            foundation_depth: 1.5,
            project_image: None,
        };
        let mut p = Project::new(req, now()).unwrap();
        p.is_automatic_progress = true;
        p.status = ProjectStatus::Ongoing;
        p
    }

    fn task(name: &str, weight: f64) -> Task {
        Task {
            id: Uuid::new_v4(),
            name: name.to_string(),
            progress: 0,
            is_manual: false,
            complexity_weight: weight,
        }
    }

    #[test]
    fn halfway_through_the_timeline_is_fifty_percent() {
        let mut p = project(1, 30, TimelineUnit::Months);
        p.reference_date = now() - Duration::days(450);

        assert_eq!(compute_progress(&p, now()), 50);
    }

    #[test]
    fn progress_caps_at_one_hundred() {
        let mut p = project(1, 2, TimelineUnit::Weeks);
        p.reference_date = now() - Duration::days(60);

        assert_eq!(compute_progress(&p, now()), 100);
    }

    #[test]
    fn empty_timeline_counts_as_complete() {
        let mut p = project(2, 1, TimelineUnit::Weeks);
        p.timeline.duration = 0;
        p.reference_date = now();

        assert_eq!(compute_progress(&p, now()), 100);

        apply_hybrid_progress(&mut p, now());
        let floors: Vec<_> = p.floors.iter().map(|f| f.progress).collect();
        assert_eq!(p.progress, 100);
        assert_eq!(floors, [67, 33]);
    }

    #[test]
    fn partial_days_do_not_count() {
        let mut p = project(1, 10, TimelineUnit::Weeks);
        p.reference_date = now() - Duration::hours(47);

        // 1 whole day of 70
        assert_eq!(compute_progress(&p, now()), 1);
    }

    #[test]
    fn manual_projects_report_zero() {
        let mut p = project(1, 1, TimelineUnit::Months);
        p.reference_date = now() - Duration::days(15);
        p.is_automatic_progress = false;

        assert_eq!(compute_progress(&p, now()), 0);
    }

    #[test]
    fn postponements_stretch_the_timeline() {
        let mut p = project(1, 10, TimelineUnit::Weeks);
        p.reference_date = now() - Duration::days(40);
        p.postponed_dates = vec![now() - Duration::days(35), now() - Duration::days(10)];
        p.resumed_dates = vec![now() - Duration::days(30)];

        // closed: 5 days, still open: 10 days
        assert_eq!(cumulative_delay_days(&p, now()), 15);
        // 40 / (70 + 15)
        assert_eq!(compute_progress(&p, now()), 47);
    }

    #[test]
    fn reference_date_in_the_future_counts_as_no_time() {
        let mut p = project(1, 1, TimelineUnit::Months);
        p.reference_date = now() + Duration::days(3);

        assert_eq!(compute_progress(&p, now()), 0);
    }

    #[test]
    fn equal_weights_share_evenly() {
        let mut p = project(4, 1, TimelineUnit::Months);
        for floor in &mut p.floors {
            floor.complexity_weight = 1.0;
        }

        let shares: Vec<i32> = distribute_floor_progress(60, &p.floors)
            .into_iter()
            .map(|s| s.unwrap())
            .collect();

        assert_eq!(shares, [15, 15, 15, 15]);
    }

    #[test]
    fn uneven_split_stays_within_rounding() {
        let mut p = project(3, 1, TimelineUnit::Months);
        for floor in &mut p.floors {
            floor.complexity_weight = 1.0;
        }

        let shares: Vec<i32> = distribute_floor_progress(50, &p.floors)
            .into_iter()
            .map(|s| s.unwrap())
            .collect();

        let max = *shares.iter().max().unwrap();
        let min = *shares.iter().min().unwrap();
        assert!(max - min <= 1);
        assert!((shares.iter().sum::<i32>() - 50).abs() <= shares.len() as i32);
    }

    #[test]
    fn manual_floors_are_excluded_from_the_weight_pool() {
        let mut p = project(3, 1, TimelineUnit::Months);
        // weights 3, 2, 1
        p.floors[0].is_manual = true;

        let shares = distribute_floor_progress(30, &p.floors);

        assert_eq!(shares, vec![None, Some(20), Some(10)]);
    }

    #[test]
    fn non_positive_weights_count_as_one() {
        let tasks = vec![task("a", 0.0), task("b", -4.0), task("c", f64::NAN)];

        let shares = distribute_task_progress(30, &tasks);

        assert_eq!(shares, vec![Some(10), Some(10), Some(10)]);
    }

    #[test]
    fn hybrid_progress_flows_down_and_spares_manual_nodes() {
        let mut p = project(2, 10, TimelineUnit::Weeks);
        p.reference_date = now() - Duration::days(35);
        // weights 2, 1
        p.floors[0].tasks = vec![task("frame", 3.0), task("wire", 1.0)];
        p.floors[1].is_manual = true;
        p.floors[1].progress = 80;
        p.floors[1].tasks = vec![task("paint", 1.0), {
            let mut t = task("tile", 1.0);
            t.is_manual = true;
            t.progress = 5;
            t
        }];

        apply_hybrid_progress(&mut p, now());

        assert_eq!(p.progress, 50);
        // floor 1 takes the whole automatic pool
        assert_eq!(p.floors[0].progress, 50);
        assert_eq!(p.floors[0].tasks[0].progress, 38);
        assert_eq!(p.floors[0].tasks[1].progress, 13);
        assert_eq!(p.floors[1].progress, 80);
        assert_eq!(p.floors[1].tasks[0].progress, 80);
        assert_eq!(p.floors[1].tasks[1].progress, 5);
    }

    #[test]
    fn hybrid_progress_is_stable_for_a_fixed_now() {
        let mut p = project(3, 6, TimelineUnit::Months);
        p.reference_date = now() - Duration::days(77);

        apply_hybrid_progress(&mut p, now());
        let first: Vec<i32> = p.floors.iter().map(|f| f.progress).collect();
        apply_hybrid_progress(&mut p, now());
        let second: Vec<i32> = p.floors.iter().map(|f| f.progress).collect();

        assert_eq!(first, second);
    }

    #[test]
    fn finished_projects_are_not_recomputed() {
        let mut p = project(2, 1, TimelineUnit::Months);
        transition_status(&mut p, ProjectStatus::Finished, now()).unwrap();

        apply_hybrid_progress(&mut p, now() + Duration::days(1));

        assert_eq!(p.progress, 100);
        assert!(p.floors.iter().all(|f| f.progress == 100 && !f.is_manual));
        assert_eq!(p.end_date, Some(now()));
    }

    #[test]
    fn lifecycle_updates_dates() {
        let mut p = project(1, 1, TimelineUnit::Months);
        p.status = ProjectStatus::NotStarted;
        let start = now() + Duration::days(1);
        let pause = now() + Duration::days(5);
        let resume = now() + Duration::days(9);

        transition_status(&mut p, ProjectStatus::Ongoing, start).unwrap();
        assert_eq!(p.start_date, start);
        assert_eq!(p.reference_date, start);

        transition_status(&mut p, ProjectStatus::Postponed, pause).unwrap();
        assert_eq!(p.postponed_dates, vec![pause]);
        assert_eq!(p.reference_date, start);

        transition_status(&mut p, ProjectStatus::Ongoing, resume).unwrap();
        assert_eq!(p.resumed_dates, vec![resume]);
        assert_eq!(p.reference_date, resume);
        assert_eq!(p.status, ProjectStatus::Ongoing);
    }

    #[test]
    fn transitions_outside_the_lifecycle_are_rejected() {
        let mut p = project(1, 1, TimelineUnit::Months);
        p.status = ProjectStatus::NotStarted;

        assert_eq!(
            transition_status(&mut p, ProjectStatus::Postponed, now()),
            Err(ProgressError::InvalidStatusTransition {
                from: ProjectStatus::NotStarted,
                to: "postponed".to_string(),
            })
        );

        p.status = ProjectStatus::Finished;
        assert!(transition_status(&mut p, ProjectStatus::Ongoing, now()).is_err());

        p.status = ProjectStatus::Ongoing;
        assert_eq!(
            transition_status_named(&mut p, "archived", now()),
            Err(ProgressError::InvalidStatusTransition {
                from: ProjectStatus::Ongoing,
                to: "archived".to_string(),
            })
        );
        assert_eq!(p.status, ProjectStatus::Ongoing);
    }

    #[test]
    fn switching_modes_sets_or_clears_every_override() {
        let mut p = project(2, 1, TimelineUnit::Months);
        p.floors[0].tasks = vec![task("frame", 1.0)];
        p.floors[0].progress = 35;

        set_progress_mode(&mut p, false, now());
        assert!(!p.is_automatic_progress);
        assert!(p.floors.iter().all(|f| f.is_manual));
        assert!(p.floors[0].tasks[0].is_manual);

        apply_hybrid_progress(&mut p, now());
        assert_eq!(p.progress, 0);
        assert_eq!(p.floors[0].progress, 35);

        let later = now() + Duration::days(2);
        set_progress_mode(&mut p, true, later);
        assert!(p.is_automatic_progress);
        assert_eq!(p.reference_date, later);
        assert!(p.floors.iter().all(|f| !f.is_manual));
        assert!(!p.floors[0].tasks[0].is_manual);
    }

    #[test]
    fn floor_overrides_restart_the_anchor_when_all_are_automatic() {
        let mut p = project(2, 1, TimelineUnit::Months);
        let first = p.floors[0].id;
        let anchor = p.reference_date;

        set_floor_progress(&mut p, first, 42.6, true, now() + Duration::days(1)).unwrap();
        assert_eq!(p.floors[0].progress, 43);
        assert!(p.floors[0].is_manual);
        assert_eq!(p.reference_date, anchor);

        let later = now() + Duration::days(2);
        reset_floor_to_automatic(&mut p, first, later).unwrap();
        assert!(!p.floors[0].is_manual);
        assert_eq!(p.reference_date, later);

        assert_eq!(
            reset_floor_to_automatic(&mut p, first, later),
            Err(ProgressError::FloorAlreadyAutomatic(first))
        );
        assert_eq!(
            set_floor_progress(&mut p, first, 101.0, true, later),
            Err(ProgressError::InvalidProgress(101.0))
        );
    }
}
