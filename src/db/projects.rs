//! Project document store
//!
//! Floors, timeline and the attached BOM are JSONB columns; every mutation
//! rewrites the whole document in one `UPDATE` (last write wins).

use chrono::{DateTime, Utc};
use sqlx::{types::Json, PgPool};
use uuid::Uuid;

use super::decode_error;
use crate::domain::bom::GeneratedBom;
use crate::domain::projects::{Floor, Project, ProjectStatus, Timeline};

/// Database row for projects
#[derive(Debug, sqlx::FromRow)]
struct ProjectRow {
    id: Uuid,
    name: String,
    contractor: String,
    owner: String,
    template_id: Option<Uuid>,
    location: String,
    total_area: f64,
    avg_floor_height: f64,
    room_count: i32,
    foundation_depth: f64,
    project_image: Option<String>,
    timeline: Json<Timeline>,
    status: String,
    start_date: DateTime<Utc>,
    reference_date: DateTime<Utc>,
    end_date: Option<DateTime<Utc>>,
    postponed_dates: Vec<DateTime<Utc>>,
    resumed_dates: Vec<DateTime<Utc>>,
    is_automatic_progress: bool,
    progress: i32,
    floors: Json<Vec<Floor>>,
    bom: Option<Json<GeneratedBom>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProjectRow> for Project {
    type Error = sqlx::Error;

    fn try_from(row: ProjectRow) -> Result<Self, Self::Error> {
        let status: ProjectStatus = row.status.parse().map_err(|e| decode_error("status", e))?;
        let room_count = u32::try_from(row.room_count).map_err(|e| decode_error("room_count", e))?;

        Ok(Self {
            id: row.id,
            name: row.name,
            contractor: row.contractor,
            owner: row.owner,
            template_id: row.template_id,
            location: row.location,
            total_area: row.total_area,
            avg_floor_height: row.avg_floor_height,
            room_count,
            foundation_depth: row.foundation_depth,
            project_image: row.project_image,
            timeline: row.timeline.0,
            status,
            start_date: row.start_date,
            reference_date: row.reference_date,
            end_date: row.end_date,
            postponed_dates: row.postponed_dates,
            resumed_dates: row.resumed_dates,
            is_automatic_progress: row.is_automatic_progress,
            progress: row.progress,
            floors: row.floors.0,
            bom: row.bom.map(|json| json.0),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const COLUMNS: &str = r#"
    id, name, contractor, owner, template_id, location, total_area, avg_floor_height,
    room_count, foundation_depth, project_image, timeline, status, start_date,
    reference_date, end_date, postponed_dates, resumed_dates, is_automatic_progress,
    progress, floors, bom, created_at, updated_at
"#;

/// Which projects a listing covers
#[derive(Debug, Clone, Default)]
pub enum ProjectFilter {
    #[default]
    All,
    Contractor(String),
    Owner(String),
}

impl ProjectFilter {
    fn binds(&self) -> (Option<&str>, Option<&str>) {
        match self {
            Self::All => (None, None),
            Self::Contractor(c) => (Some(c.as_str()), None),
            Self::Owner(o) => (None, Some(o.as_str())),
        }
    }
}

pub async fn insert(pool: &PgPool, project: &Project) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO projects (
            id, name, contractor, owner, template_id, location, total_area, avg_floor_height,
            room_count, foundation_depth, project_image, timeline, status, start_date,
            reference_date, end_date, postponed_dates, resumed_dates, is_automatic_progress,
            progress, floors, bom, created_at, updated_at
        )
        VALUES (
            $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14,
            $15, $16, $17, $18, $19, $20, $21, $22, $23, $24
        )
        "#,
    )
    .bind(project.id)
    .bind(&project.name)
    .bind(&project.contractor)
    .bind(&project.owner)
    .bind(project.template_id)
    .bind(&project.location)
    .bind(project.total_area)
    .bind(project.avg_floor_height)
    .bind(room_count_column(project.room_count))
    .bind(project.foundation_depth)
    .bind(&project.project_image)
    .bind(Json(&project.timeline))
    .bind(project.status.as_str())
    .bind(project.start_date)
    .bind(project.reference_date)
    .bind(project.end_date)
    .bind(&project.postponed_dates)
    .bind(&project.resumed_dates)
    .bind(project.is_automatic_progress)
    .bind(project.progress)
    .bind(Json(&project.floors))
    .bind(project.bom.as_ref().map(Json))
    .bind(project.created_at)
    .bind(project.updated_at)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn fetch(pool: &PgPool, id: Uuid) -> Result<Option<Project>, sqlx::Error> {
    let query = format!("SELECT {COLUMNS} FROM projects WHERE id = $1");
    sqlx::query_as::<_, ProjectRow>(&query)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .map(Project::try_from)
        .transpose()
}

/// Page of projects, newest first, with the total count for the filter
pub async fn list(
    pool: &PgPool,
    filter: &ProjectFilter,
    limit: u32,
    offset: u32,
) -> Result<(Vec<Project>, u64), sqlx::Error> {
    let (contractor, owner) = filter.binds();

    let query = format!(
        r#"
        SELECT {COLUMNS} FROM projects
        WHERE ($1::text IS NULL OR contractor = $1)
          AND ($2::text IS NULL OR owner = $2)
        ORDER BY created_at DESC
        LIMIT $3 OFFSET $4
        "#
    );
    let rows = sqlx::query_as::<_, ProjectRow>(&query)
        .bind(contractor)
        .bind(owner)
        .bind(i64::from(limit))
        .bind(i64::from(offset))
        .fetch_all(pool)
        .await?;

    let total: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM projects
        WHERE ($1::text IS NULL OR contractor = $1)
          AND ($2::text IS NULL OR owner = $2)
        "#,
    )
    .bind(contractor)
    .bind(owner)
    .fetch_one(pool)
    .await?;

    let projects = rows
        .into_iter()
        .map(Project::try_from)
        .collect::<Result<Vec<_>, _>>()?;

    Ok((projects, total.max(0) as u64))
}

/// Ids of every project currently in the given status
pub async fn ids_with_status(
    pool: &PgPool,
    status: ProjectStatus,
) -> Result<Vec<Uuid>, sqlx::Error> {
    sqlx::query_scalar("SELECT id FROM projects WHERE status = $1 ORDER BY created_at")
        .bind(status.as_str())
        .fetch_all(pool)
        .await
}

/// Overwrite the stored document; returns false if the project no longer exists
pub async fn save(pool: &PgPool, project: &Project) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE projects SET
            name = $2, owner = $3, template_id = $4, location = $5, total_area = $6,
            avg_floor_height = $7, room_count = $8, foundation_depth = $9, project_image = $10,
            timeline = $11, status = $12, start_date = $13, reference_date = $14, end_date = $15,
            postponed_dates = $16, resumed_dates = $17, is_automatic_progress = $18,
            progress = $19, floors = $20, bom = $21, updated_at = $22
        WHERE id = $1
        "#,
    )
    .bind(project.id)
    .bind(&project.name)
    .bind(&project.owner)
    .bind(project.template_id)
    .bind(&project.location)
    .bind(project.total_area)
    .bind(project.avg_floor_height)
    .bind(room_count_column(project.room_count))
    .bind(project.foundation_depth)
    .bind(&project.project_image)
    .bind(Json(&project.timeline))
    .bind(project.status.as_str())
    .bind(project.start_date)
    .bind(project.reference_date)
    .bind(project.end_date)
    .bind(&project.postponed_dates)
    .bind(&project.resumed_dates)
    .bind(project.is_automatic_progress)
    .bind(project.progress)
    .bind(Json(&project.floors))
    .bind(project.bom.as_ref().map(Json))
    .bind(project.updated_at)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM projects WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

fn room_count_column(room_count: u32) -> i32 {
    i32::try_from(room_count).unwrap_or(i32::MAX)
}
