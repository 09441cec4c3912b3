//! Project domain types
//!
//! A project owns its floors and each floor owns its tasks. Progress on all
//! three levels is maintained by `domain::progress`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

use super::bom::GeneratedBom;

/// Upper bound on floors per project
pub const MAX_FLOORS: usize = 200;

/// Upper bound on tasks per floor
pub const MAX_TASKS_PER_FLOOR: usize = 500;

#[derive(Debug, Error, PartialEq)]
pub enum ProjectError {
    #[error("Unknown project status '{0}'")]
    UnknownStatus(String),

    #[error("'{0}' must be greater than zero")]
    InvalidDimension(&'static str),

    #[error("Complexity weight must be greater than zero, got {0}")]
    InvalidWeight(f64),

    #[error("Progress must be between 0 and 100, got {0}")]
    InvalidProgress(f64),

    #[error("Timeline duration must be at least 1")]
    InvalidTimeline,

    #[error("'{field}' allows at most {max} entries")]
    TooMany { field: &'static str, max: usize },
}


/// Project status enum
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    #[default]
    NotStarted,
    Ongoing,
    Postponed,
    Finished,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::NotStarted => "not_started",
            ProjectStatus::Ongoing => "ongoing",
            ProjectStatus::Postponed => "postponed",
            ProjectStatus::Finished => "finished",
        }
    }
}

impl std::fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ProjectStatus {
    type Err = ProjectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace([' ', '-'], "_").as_str() {
            "not_started" => Ok(Self::NotStarted),
            "ongoing" => Ok(Self::Ongoing),
            "postponed" => Ok(Self::Postponed),
            "finished" => Ok(Self::Finished),
            _ => Err(ProjectError::UnknownStatus(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TimelineUnit {
    Weeks,
    #[default]
    Months,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Timeline {
    pub duration: u32,
    #[serde(default)]
    pub unit: TimelineUnit,
}

impl Timeline {
    /// Planned length in days (weeks of 7, months of 30)
    pub fn days(&self) -> i64 {
        let per_unit = match self.unit {
            TimelineUnit::Weeks => 7,
            TimelineUnit::Months => 30,
        };
        i64::from(self.duration) * per_unit
    }
}

fn default_weight() -> f64 {
    1.0
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub progress: i32,
    #[serde(default)]
    pub is_manual: bool,
    #[serde(default = "default_weight")]
    pub complexity_weight: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Floor {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub progress: i32,
    #[serde(default)]
    pub is_manual: bool,
    #[serde(default = "default_weight")]
    pub complexity_weight: f64,
    #[serde(default)]
    pub tasks: Vec<Task>,
}

impl Floor {
    pub fn new(name: impl Into<String>, complexity_weight: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            progress: 0,
            is_manual: false,
            complexity_weight,
            tasks: Vec::new(),
        }
    }
}

/// Project entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub contractor: String,
    pub owner: String,
    pub template_id: Option<Uuid>,
    pub location: String,
    pub total_area: f64,
    pub avg_floor_height: f64,
    pub room_count: u32,
    pub foundation_depth: f64,
    pub project_image: Option<String>,
    pub timeline: Timeline,
    pub status: ProjectStatus,
    pub start_date: DateTime<Utc>,
    /// Anchor for elapsed-time progress
    pub reference_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub postponed_dates: Vec<DateTime<Utc>>,
    /// Index-aligned with `postponed_dates`; a missing entry is an open postponement
    pub resumed_dates: Vec<DateTime<Utc>>,
    pub is_automatic_progress: bool,
    pub progress: i32,
    pub floors: Vec<Floor>,
    pub bom: Option<GeneratedBom>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    /// New not-started project in manual mode with one floor per level.
    ///
    /// Lower floors carry more weight: floor 1 of N weighs N, the top floor weighs 1.
    pub fn new(req: CreateProjectRequest, now: DateTime<Utc>) -> Result<Self, ProjectError> {
        req.validate()?;

        let floors = (0..req.num_floors)
            .map(|index| {
                Floor::new(
                    format!("FLOOR {}", index + 1),
                    f64::from(req.num_floors - index),
                )
            })
            .collect();

        Ok(Self {
            id: Uuid::new_v4(),
            name: req.name,
            contractor: req.contractor,
            owner: req.owner,
            template_id: req.template_id,
            location: req.location,
            total_area: req.total_area,
            avg_floor_height: req.avg_floor_height,
            room_count: req.room_count,
            foundation_depth: req.foundation_depth,
            project_image: req.project_image,
            timeline: req.timeline,
            status: ProjectStatus::NotStarted,
            start_date: now,
            reference_date: now,
            end_date: None,
            postponed_dates: Vec::new(),
            resumed_dates: Vec::new(),
            is_automatic_progress: false,
            progress: 0,
            floors,
            bom: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn floor_mut(&mut self, floor_id: Uuid) -> Option<&mut Floor> {
        self.floors.iter_mut().find(|f| f.id == floor_id)
    }

    /// Apply a partial update; a floor list replaces the floor structure
    pub fn apply_update(&mut self, req: UpdateProjectRequest) -> Result<(), ProjectError> {
        if let Some(area) = req.total_area {
            ensure_positive("total_area", area)?;
            self.total_area = area;
        }
        if let Some(height) = req.avg_floor_height {
            ensure_positive("avg_floor_height", height)?;
            self.avg_floor_height = height;
        }
        if let Some(rooms) = req.room_count {
            ensure_positive("room_count", f64::from(rooms))?;
            self.room_count = rooms;
        }
        if let Some(depth) = req.foundation_depth {
            ensure_positive("foundation_depth", depth)?;
            self.foundation_depth = depth;
        }
        if let Some(timeline) = req.timeline {
            if timeline.duration == 0 {
                return Err(ProjectError::InvalidTimeline);
            }
            self.timeline = timeline;
        }
        if let Some(name) = req.name {
            self.name = name;
        }
        if let Some(owner) = req.owner {
            self.owner = owner;
        }
        if let Some(template_id) = req.template_id {
            self.template_id = Some(template_id);
        }
        if let Some(location) = req.location {
            self.location = location;
        }
        if let Some(image) = req.project_image {
            self.project_image = Some(image);
        }
        if let Some(floors) = req.floors {
            self.merge_floors(floors)?;
        }
        Ok(())
    }

    /// Rebuild the floor list in request order.
    ///
    /// Inputs naming an existing floor update it in place, inputs without a known id
    /// create a floor, and existing floors the request does not mention are dropped.
    pub fn merge_floors(&mut self, inputs: Vec<FloorInput>) -> Result<(), ProjectError> {
        ensure_at_most("floors", inputs.len(), MAX_FLOORS)?;

        let mut existing = self.floors.clone();
        let mut merged = Vec::with_capacity(inputs.len());

        for (index, input) in inputs.into_iter().enumerate() {
            let found = input
                .id
                .and_then(|id| existing.iter().position(|f| f.id == id))
                .map(|pos| existing.swap_remove(pos));

            let floor = match found {
                Some(mut floor) => {
                    input.apply_to(&mut floor)?;
                    floor
                }
                None => {
                    let mut floor = Floor::new(
                        input
                            .name
                            .clone()
                            .unwrap_or_else(|| format!("FLOOR {}", index + 1)),
                        1.0,
                    );
                    input.apply_to(&mut floor)?;
                    floor
                }
            };
            merged.push(floor);
        }

        self.floors = merged;
        Ok(())
    }
}

fn ensure_positive(field: &'static str, value: f64) -> Result<(), ProjectError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ProjectError::InvalidDimension(field))
    }
}

fn ensure_at_most(field: &'static str, count: usize, max: usize) -> Result<(), ProjectError> {
    if count > max {
        Err(ProjectError::TooMany { field, max })
    } else {
        Ok(())
    }
}

/// Validate a 0..=100 progress value and round it to a whole percent
pub fn whole_percent(value: f64) -> Result<i32, ProjectError> {
    if value.is_finite() && (0.0..=100.0).contains(&value) {
        Ok(value.round() as i32)
    } else {
        Err(ProjectError::InvalidProgress(value))
    }
}

fn checked_weight(value: f64) -> Result<f64, ProjectError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(ProjectError::InvalidWeight(value))
    }
}

/// Request DTO for creating a project
#[derive(Debug, Clone, Deserialize)]
pub struct CreateProjectRequest {
    pub name: String,
    pub contractor: String,
    pub owner: String,
    pub num_floors: u32,
    #[serde(default)]
    pub template_id: Option<Uuid>,
    pub timeline: Timeline,
    pub location: String,
    pub total_area: f64,
    pub avg_floor_height: f64,
    pub room_count: u32,
    pub foundation_depth: f64,
    #[serde(default)]
    pub project_image: Option<String>,
}

impl CreateProjectRequest {
    pub fn validate(&self) -> Result<(), ProjectError> {
        ensure_positive("num_floors", f64::from(self.num_floors))?;
        ensure_at_most("num_floors", self.num_floors as usize, MAX_FLOORS)?;
        ensure_positive("total_area", self.total_area)?;
        ensure_positive("avg_floor_height", self.avg_floor_height)?;
        ensure_positive("room_count", f64::from(self.room_count))?;
        ensure_positive("foundation_depth", self.foundation_depth)?;
        if self.timeline.duration == 0 {
            return Err(ProjectError::InvalidTimeline);
        }
        Ok(())
    }
}

/// Task entry of a floor update
#[derive(Debug, Clone, Deserialize)]
pub struct TaskInput {
    #[serde(default)]
    pub id: Option<Uuid>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub progress: Option<f64>,
    #[serde(default)]
    pub is_manual: Option<bool>,
    #[serde(default)]
    pub complexity_weight: Option<f64>,
}

impl TaskInput {
    fn apply_to(&self, task: &mut Task) -> Result<(), ProjectError> {
        if let Some(name) = &self.name {
            task.name = name.clone();
        }
        if let Some(progress) = self.progress {
            task.progress = whole_percent(progress)?;
        }
        if let Some(is_manual) = self.is_manual {
            task.is_manual = is_manual;
        }
        if let Some(weight) = self.complexity_weight {
            task.complexity_weight = checked_weight(weight)?;
        }
        Ok(())
    }
}

/// Floor entry of a project update
#[derive(Debug, Clone, Deserialize)]
pub struct FloorInput {
    #[serde(default)]
    pub id: Option<Uuid>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub progress: Option<f64>,
    #[serde(default)]
    pub is_manual: Option<bool>,
    #[serde(default)]
    pub complexity_weight: Option<f64>,
    #[serde(default)]
    pub tasks: Option<Vec<TaskInput>>,
}

impl FloorInput {
    fn apply_to(&self, floor: &mut Floor) -> Result<(), ProjectError> {
        if let Some(name) = &self.name {
            floor.name = name.clone();
        }
        if let Some(progress) = self.progress {
            floor.progress = whole_percent(progress)?;
        }
        if let Some(is_manual) = self.is_manual {
            floor.is_manual = is_manual;
        }
        if let Some(weight) = self.complexity_weight {
            floor.complexity_weight = checked_weight(weight)?;
        }
        if let Some(inputs) = &self.tasks {
            ensure_at_most("tasks", inputs.len(), MAX_TASKS_PER_FLOOR)?;
            let mut existing = std::mem::take(&mut floor.tasks);
            let mut merged = Vec::with_capacity(inputs.len());
            for input in inputs {
                let mut task = input
                    .id
                    .and_then(|id| existing.iter().position(|t| t.id == id))
                    .map(|pos| existing.swap_remove(pos))
                    .unwrap_or_else(|| Task {
                        id: Uuid::new_v4(),
                        name: String::new(),
                        progress: 0,
                        is_manual: false,
                        complexity_weight: 1.0,
                    });
                input.apply_to(&mut task)?;
                merged.push(task);
            }
            floor.tasks = merged;
        }
        Ok(())
    }
}

/// Request DTO for updating a project
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProjectRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub template_id: Option<Uuid>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub total_area: Option<f64>,
    #[serde(default)]
    pub avg_floor_height: Option<f64>,
    #[serde(default)]
    pub room_count: Option<u32>,
    #[serde(default)]
    pub foundation_depth: Option<f64>,
    #[serde(default)]
    pub timeline: Option<Timeline>,
    #[serde(default)]
    pub project_image: Option<String>,
    #[serde(default)]
    pub floors: Option<Vec<FloorInput>>,
}

/// Request DTO for a manual floor progress update
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateFloorProgressRequest {
    pub progress: f64,
    #[serde(default)]
    pub is_manual: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProgressModeRequest {
    pub is_automatic: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AttachBomRequest {
    pub bom: GeneratedBom,
}
