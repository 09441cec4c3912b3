use buildplan_backend::domain::progress::{
    apply_hybrid_progress, compute_progress, cumulative_delay_days, set_floor_progress,
    set_progress_mode, transition_status, ProgressError,
};
use buildplan_backend::domain::projects::{
    CreateProjectRequest, FloorInput, TaskInput, Timeline, TimelineUnit, UpdateProjectRequest,
};
use buildplan_backend::domain::{Project, ProjectStatus};
use chrono::{DateTime, Duration, TimeZone, Utc};

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 15, 8, 0, 0).unwrap()
}

fn new_project(num_floors: u32, timeline: Timeline) -> Project {
    let req = CreateProjectRequest {
        name: "Mabini Street Townhouse".to_string(),
        contractor: "contractor@example.com".to_string(),
        owner: "owner@example.com".to_string(),
        num_floors,
        template_id: None,
        timeline,
        location: "Iloilo".to_string(),
        total_area: 180.0,
        avg_floor_height: 3.0,
        room_count: 5,
        foundation_depth: 1.5,
        project_image: None,
    };
    Project::new(req, t0()).unwrap()
}

fn months(duration: u32) -> Timeline {
    Timeline {
        duration,
        unit: TimelineUnit::Months,
    }
}

fn automatic_ongoing(num_floors: u32, timeline: Timeline) -> Project {
    let mut project = new_project(num_floors, timeline);
    transition_status(&mut project, ProjectStatus::Ongoing, t0()).unwrap();
    set_progress_mode(&mut project, true, t0());
    project
}

#[test]
fn halfway_through_a_thirty_month_timeline() {
    let mut project = automatic_ongoing(1, months(30));
    let now = t0() + Duration::days(450);

    apply_hybrid_progress(&mut project, now);

    assert_eq!(project.progress, 50);
    assert_eq!(project.floors[0].progress, 50);
}

#[test]
fn postponement_stretches_the_timeline() {
    let mut project = automatic_ongoing(1, months(10));

    transition_status(&mut project, ProjectStatus::Postponed, t0() + Duration::days(100))
        .unwrap();
    let resumed_at = t0() + Duration::days(160);
    transition_status(&mut project, ProjectStatus::Ongoing, resumed_at).unwrap();

    let now = resumed_at + Duration::days(72);
    assert_eq!(cumulative_delay_days(&project, now), 60);

    // 72 days since resume over 300 + 60 days
    assert_eq!(compute_progress(&project, now), 20);
}

#[test]
fn open_postponement_keeps_accruing() {
    let mut project = automatic_ongoing(1, months(1));
    transition_status(&mut project, ProjectStatus::Postponed, t0() + Duration::days(10))
        .unwrap();

    assert_eq!(cumulative_delay_days(&project, t0() + Duration::days(25)), 15);
    assert_eq!(cumulative_delay_days(&project, t0() + Duration::days(40)), 30);
}

#[test]
fn manual_floors_and_tasks_are_frozen() {
    let mut project = automatic_ongoing(3, months(12));
    let frozen = project.floors[1].id;
    set_floor_progress(&mut project, frozen, 85.4, true, t0()).unwrap();

    let floor_ids: Vec<_> = project.floors.iter().map(|f| f.id).collect();
    project
        .apply_update(UpdateProjectRequest {
            floors: Some(
                floor_ids
                    .iter()
                    .map(|id| FloorInput {
                        id: Some(*id),
                        name: None,
                        progress: None,
                        is_manual: None,
                        complexity_weight: None,
                        tasks: Some(vec![
                            TaskInput {
                                id: None,
                                name: Some("Slab".to_string()),
                                progress: Some(40.0),
                                is_manual: Some(true),
                                complexity_weight: None,
                            },
                            TaskInput {
                                id: None,
                                name: Some("Walls".to_string()),
                                progress: None,
                                is_manual: None,
                                complexity_weight: None,
                            },
                        ]),
                    })
                    .collect(),
            ),
            ..UpdateProjectRequest::default()
        })
        .unwrap();

    for days in [30, 180, 400] {
        apply_hybrid_progress(&mut project, t0() + Duration::days(days));

        assert_eq!(project.floors[1].progress, 85);
        assert!(project.floors[1].is_manual);
        for floor in &project.floors {
            assert_eq!(floor.tasks[0].progress, 40);
        }
    }
}

#[test]
fn equal_weights_share_progress_evenly() {
    let mut project = automatic_ongoing(4, months(10));
    for floor in &mut project.floors {
        floor.complexity_weight = 1.0;
    }

    for days in [0, 37, 120, 299] {
        apply_hybrid_progress(&mut project, t0() + Duration::days(days));

        let shares: Vec<i32> = project.floors.iter().map(|f| f.progress).collect();
        let max = shares.iter().copied().max().unwrap();
        let min = shares.iter().copied().min().unwrap();
        assert!(max - min <= 1, "{shares:?}");

        let sum: i32 = shares.iter().sum();
        assert!((sum - project.progress).abs() <= shares.len() as i32, "{shares:?}");
    }
}

#[test]
fn finishing_is_terminal() {
    let mut project = automatic_ongoing(2, months(6));
    let end = t0() + Duration::days(20);
    transition_status(&mut project, ProjectStatus::Finished, end).unwrap();

    assert_eq!(project.progress, 100);
    assert_eq!(project.end_date, Some(end));
    assert!(project.floors.iter().all(|f| f.progress == 100 && !f.is_manual));

    apply_hybrid_progress(&mut project, end + Duration::days(1));
    assert_eq!(project.progress, 100);

    let err = transition_status(&mut project, ProjectStatus::Ongoing, end).unwrap_err();
    assert!(matches!(
        err,
        ProgressError::InvalidStatusTransition {
            from: ProjectStatus::Finished,
            ..
        }
    ));
}

#[test]
fn switching_to_manual_reports_zero_but_keeps_floor_values() {
    let mut project = automatic_ongoing(2, months(4));
    apply_hybrid_progress(&mut project, t0() + Duration::days(60));
    let before: Vec<i32> = project.floors.iter().map(|f| f.progress).collect();

    set_progress_mode(&mut project, false, t0() + Duration::days(60));
    apply_hybrid_progress(&mut project, t0() + Duration::days(90));

    assert_eq!(project.progress, 0);
    let after: Vec<i32> = project.floors.iter().map(|f| f.progress).collect();
    assert_eq!(before, after);
}
