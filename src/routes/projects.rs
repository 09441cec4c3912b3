//! Project routes
//!
//! Every mutation loads the project document, changes it in memory, re-runs
//! hybrid progress and writes the whole document back.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::api::{Created, DataResponse, MessageResponse, Paginated, PaginationParams};
use crate::app::AppState;
use crate::auth::RequireAuth;
use crate::db;
use crate::db::projects::ProjectFilter;
use crate::domain::progress::{
    apply_hybrid_progress, reset_floor_to_automatic, set_floor_progress, set_progress_mode,
    transition_status, transition_status_named, ProgressError,
};
use crate::domain::projects::{
    AttachBomRequest, CreateProjectRequest, ProgressModeRequest, UpdateFloorProgressRequest,
    UpdateProjectRequest, UpdateStatusRequest,
};
use crate::domain::{Project, ProjectStatus};
use crate::error::{ApiError, ApiResult};

/// Listing filter; `contractor` wins when both are given
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectListQuery {
    pub contractor: Option<String>,
    pub owner: Option<String>,
}

impl From<ProjectListQuery> for ProjectFilter {
    fn from(query: ProjectListQuery) -> Self {
        match (query.contractor, query.owner) {
            (Some(contractor), _) => ProjectFilter::Contractor(contractor),
            (None, Some(owner)) => ProjectFilter::Owner(owner),
            (None, None) => ProjectFilter::All,
        }
    }
}

fn not_found(project_id: Uuid) -> ApiError {
    ApiError::not_found(format!("Project {} not found", project_id))
}

/// Load, change, propagate and save one project
async fn mutate<F>(state: &AppState, project_id: Uuid, change: F) -> ApiResult<Project>
where
    F: FnOnce(&mut Project, DateTime<Utc>) -> ApiResult<()>,
{
    let mut project = db::projects::fetch(&state.db, project_id)
        .await?
        .ok_or_else(|| not_found(project_id))?;

    let now = Utc::now();
    change(&mut project, now)?;
    apply_hybrid_progress(&mut project, now);
    project.updated_at = now;

    if !db::projects::save(&state.db, &project).await? {
        return Err(not_found(project_id));
    }
    Ok(project)
}

/// Status change guarded on the current status, so `start` cannot resume
/// and `resume` cannot start
fn transition_from(
    project: &mut Project,
    expected: ProjectStatus,
    to: ProjectStatus,
    now: DateTime<Utc>,
) -> Result<(), ProgressError> {
    if project.status != expected {
        return Err(ProgressError::InvalidStatusTransition {
            from: project.status,
            to: to.to_string(),
        });
    }
    transition_status(project, to, now)
}

/// POST /projects
pub async fn create_project(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateProjectRequest>,
) -> ApiResult<Created<DataResponse<Project>>> {
    if let Some(template_id) = req.template_id {
        if state.cache.template(&state.db, template_id).await?.is_none() {
            return Err(ApiError::not_found(format!("Template {} not found", template_id)));
        }
    }

    let project = Project::new(req, Utc::now())?;
    db::projects::insert(&state.db, &project).await?;

    tracing::info!(
        user_id = %auth.user_id,
        project_id = %project.id,
        project_name = %project.name,
        floors = project.floors.len(),
        "Project created"
    );

    Ok(Created(DataResponse::new(project)))
}

/// GET /projects?contractor=..|owner=..
pub async fn list_projects(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Query(pagination): Query<PaginationParams>,
    Query(query): Query<ProjectListQuery>,
) -> ApiResult<Paginated<Project>> {
    let filter = ProjectFilter::from(query);
    tracing::debug!(
        user_id = %auth.user_id,
        filter = ?filter,
        page = pagination.page(),
        per_page = pagination.per_page(),
        "Listing projects"
    );

    let (projects, total) =
        db::projects::list(&state.db, &filter, pagination.limit(), pagination.offset()).await?;

    Ok(Paginated::new(projects, &pagination, total))
}

/// GET /projects/:project_id
pub async fn get_project(
    _auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<Uuid>,
) -> ApiResult<DataResponse<Project>> {
    let project = db::projects::fetch(&state.db, project_id)
        .await?
        .ok_or_else(|| not_found(project_id))?;

    Ok(DataResponse::new(project))
}

/// PATCH /projects/:project_id
///
/// A `floors` list replaces the floor structure: floors are matched by id,
/// unknown ids become new floors and floors left out are removed.
pub async fn update_project(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<Uuid>,
    Json(req): Json<UpdateProjectRequest>,
) -> ApiResult<DataResponse<Project>> {
    let project = mutate(&state, project_id, |project, _now| {
        project.apply_update(req)?;
        Ok(())
    })
    .await?;

    tracing::info!(user_id = %auth.user_id, project_id = %project_id, "Project updated");
    Ok(DataResponse::new(project))
}

/// DELETE /projects/:project_id
pub async fn delete_project(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<Uuid>,
) -> ApiResult<MessageResponse> {
    if !db::projects::delete(&state.db, project_id).await? {
        return Err(not_found(project_id));
    }

    tracing::info!(user_id = %auth.user_id, project_id = %project_id, "Project deleted");
    Ok(MessageResponse::with_code(
        format!("Project {} deleted", project_id),
        "PROJECT_DELETED",
    ))
}

/// PATCH /projects/:project_id/status
pub async fn update_status(
    _auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<Uuid>,
    Json(req): Json<UpdateStatusRequest>,
) -> ApiResult<DataResponse<Project>> {
    let project = mutate(&state, project_id, |project, now| {
        transition_status_named(project, &req.status, now)?;
        Ok(())
    })
    .await?;

    Ok(DataResponse::new(project))
}

/// PATCH /projects/:project_id/start
pub async fn start_project(
    _auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<Uuid>,
) -> ApiResult<DataResponse<Project>> {
    let project = mutate(&state, project_id, |project, now| {
        transition_from(project, ProjectStatus::NotStarted, ProjectStatus::Ongoing, now)?;
        Ok(())
    })
    .await?;

    Ok(DataResponse::new(project))
}

/// PATCH /projects/:project_id/postpone
pub async fn postpone_project(
    _auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<Uuid>,
) -> ApiResult<DataResponse<Project>> {
    let project = mutate(&state, project_id, |project, now| {
        transition_from(project, ProjectStatus::Ongoing, ProjectStatus::Postponed, now)?;
        Ok(())
    })
    .await?;

    Ok(DataResponse::new(project))
}

/// PATCH /projects/:project_id/resume
pub async fn resume_project(
    _auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<Uuid>,
) -> ApiResult<DataResponse<Project>> {
    let project = mutate(&state, project_id, |project, now| {
        transition_from(project, ProjectStatus::Postponed, ProjectStatus::Ongoing, now)?;
        Ok(())
    })
    .await?;

    Ok(DataResponse::new(project))
}

/// PATCH /projects/:project_id/end
pub async fn end_project(
    _auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<Uuid>,
) -> ApiResult<DataResponse<Project>> {
    let project = mutate(&state, project_id, |project, now| {
        transition_status(project, ProjectStatus::Finished, now)?;
        Ok(())
    })
    .await?;

    Ok(DataResponse::new(project))
}

/// PATCH /projects/:project_id/progress-mode
pub async fn set_mode(
    _auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<Uuid>,
    Json(req): Json<ProgressModeRequest>,
) -> ApiResult<DataResponse<Project>> {
    let project = mutate(&state, project_id, |project, now| {
        set_progress_mode(project, req.is_automatic, now);
        Ok(())
    })
    .await?;

    tracing::info!(
        project_id = %project_id,
        automatic = req.is_automatic,
        "Progress mode changed"
    );
    Ok(DataResponse::new(project))
}

/// POST /projects/:project_id/boms
pub async fn attach_bom(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<Uuid>,
    Json(req): Json<AttachBomRequest>,
) -> ApiResult<DataResponse<Project>> {
    req.bom.validate()?;

    let project = mutate(&state, project_id, |project, _now| {
        project.bom = Some(req.bom);
        Ok(())
    })
    .await?;

    tracing::info!(user_id = %auth.user_id, project_id = %project_id, "BOM attached to project");
    Ok(DataResponse::new(project))
}

/// PATCH /projects/:project_id/floors/:floor_id
pub async fn update_floor_progress(
    _auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path((project_id, floor_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<UpdateFloorProgressRequest>,
) -> ApiResult<DataResponse<Project>> {
    let project = mutate(&state, project_id, |project, now| {
        set_floor_progress(project, floor_id, req.progress, req.is_manual, now)?;
        Ok(())
    })
    .await?;

    Ok(DataResponse::new(project))
}

/// POST /projects/:project_id/floors/:floor_id/reset
pub async fn reset_floor(
    _auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path((project_id, floor_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<DataResponse<Project>> {
    let project = mutate(&state, project_id, |project, now| {
        reset_floor_to_automatic(project, floor_id, now)?;
        Ok(())
    })
    .await?;

    Ok(DataResponse::new(project))
}
