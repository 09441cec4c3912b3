//! Location routes
//!
//! Markup zones applied to generated BOM costs.

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::api::{Created, DataResponse, NoContent};
use crate::app::AppState;
use crate::auth::{context::BOM_AUTHORS, RequireAuth};
use crate::db;
use crate::domain::locations::{
    is_valid_markup, CreateLocationRequest, Location, UpdateLocationRequest,
};
use crate::error::{ApiError, ApiResult};

fn checked_name(name: &str) -> ApiResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ApiError::bad_request("Location name is required"));
    }
    Ok(name.to_string())
}

fn checked_markup(markup: f64) -> ApiResult<f64> {
    if !is_valid_markup(markup) {
        return Err(ApiError::bad_request(
            "Markup must be zero or a positive percentage",
        ));
    }
    Ok(markup)
}

fn duplicate_or(err: sqlx::Error, name: &str) -> ApiError {
    if db::locations::is_unique_violation(&err) {
        ApiError::conflict(format!("Location '{}' already exists", name))
    } else {
        err.into()
    }
}

/// GET /locations
pub async fn list_locations(
    _auth: RequireAuth,
    State(state): State<Arc<AppState>>,
) -> ApiResult<DataResponse<Vec<Location>>> {
    Ok(DataResponse::new(db::locations::list(&state.db).await?))
}

/// GET /locations/:location_id
pub async fn get_location(
    _auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(location_id): Path<Uuid>,
) -> ApiResult<DataResponse<Location>> {
    let location = db::locations::fetch(&state.db, location_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Location {} not found", location_id)))?;

    Ok(DataResponse::new(location))
}

/// POST /locations
pub async fn create_location(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateLocationRequest>,
) -> ApiResult<Created<DataResponse<Location>>> {
    auth.require_any_role(BOM_AUTHORS)?;

    let now = Utc::now();
    let location = Location {
        id: Uuid::new_v4(),
        name: checked_name(&req.name)?,
        markup: checked_markup(req.markup)?,
        created_at: now,
        updated_at: now,
    };

    db::locations::insert(&state.db, &location)
        .await
        .map_err(|e| duplicate_or(e, &location.name))?;

    tracing::info!(location = %location.name, markup = location.markup, "Location created");
    Ok(Created(DataResponse::new(location)))
}

/// PATCH /locations/:location_id
pub async fn update_location(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(location_id): Path<Uuid>,
    Json(req): Json<UpdateLocationRequest>,
) -> ApiResult<DataResponse<Location>> {
    auth.require_any_role(BOM_AUTHORS)?;

    let mut location = db::locations::fetch(&state.db, location_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Location {} not found", location_id)))?;
    let previous_name = location.name.clone();

    if let Some(name) = req.name {
        location.name = checked_name(&name)?;
    }
    if let Some(markup) = req.markup {
        location.markup = checked_markup(markup)?;
    }
    location.updated_at = Utc::now();

    let saved = db::locations::save(&state.db, &location)
        .await
        .map_err(|e| duplicate_or(e, &location.name))?;
    if !saved {
        return Err(ApiError::not_found(format!("Location {} not found", location_id)));
    }
    state
        .cache
        .invalidate_locations(&[previous_name.as_str(), location.name.as_str()])
        .await;

    tracing::info!(location_id = %location_id, "Location updated");
    Ok(DataResponse::new(location))
}

/// DELETE /locations/:location_id
pub async fn delete_location(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(location_id): Path<Uuid>,
) -> ApiResult<NoContent> {
    auth.require_any_role(BOM_AUTHORS)?;

    let name = db::locations::delete(&state.db, location_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Location {} not found", location_id)))?;
    state.cache.invalidate_locations(&[name.as_str()]).await;

    tracing::info!(location_id = %location_id, "Location deleted");
    Ok(NoContent)
}
