//! Material catalogue routes

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::api::{Created, DataResponse, NoContent, Paginated, PaginationParams};
use crate::app::AppState;
use crate::auth::{context::BOM_AUTHORS, RequireAuth};
use crate::db;
use crate::domain::materials::{CreateMaterialRequest, Material, UpdateMaterialRequest};
use crate::domain::templates::is_known_unit;
use crate::error::{ApiError, ApiResult};

fn validate_fields(description: &str, unit: &str, cost: f64) -> ApiResult<()> {
    if description.trim().is_empty() {
        return Err(ApiError::bad_request("Material description is required"));
    }
    if !is_known_unit(unit) {
        return Err(ApiError::bad_request(format!("Unknown unit '{}'", unit)));
    }
    if !(cost.is_finite() && cost >= 0.0) {
        return Err(ApiError::bad_request("Cost must be zero or a positive number"));
    }
    Ok(())
}

/// GET /materials
pub async fn list_materials(
    _auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Query(pagination): Query<PaginationParams>,
) -> ApiResult<Paginated<Material>> {
    let (materials, total) =
        db::materials::list(&state.db, pagination.limit(), pagination.offset()).await?;

    Ok(Paginated::new(materials, &pagination, total))
}

/// GET /materials/:material_id
pub async fn get_material(
    _auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(material_id): Path<Uuid>,
) -> ApiResult<DataResponse<Material>> {
    let material = db::materials::fetch(&state.db, material_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Material {} not found", material_id)))?;

    Ok(DataResponse::new(material))
}

/// POST /materials
pub async fn create_material(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateMaterialRequest>,
) -> ApiResult<Created<DataResponse<Material>>> {
    auth.require_any_role(BOM_AUTHORS)?;
    validate_fields(&req.description, &req.unit, req.cost)?;

    let now = Utc::now();
    let material = Material {
        id: Uuid::new_v4(),
        description: req.description.trim().to_string(),
        unit: req.unit.trim().to_string(),
        cost: req.cost,
        created_at: now,
        updated_at: now,
    };

    db::materials::insert(&state.db, &material).await?;

    tracing::info!(material_id = %material.id, description = %material.description, "Material created");
    Ok(Created(DataResponse::new(material)))
}

/// PATCH /materials/:material_id
///
/// Template lines copy description, unit and cost when added, so existing
/// templates keep their prices.
pub async fn update_material(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(material_id): Path<Uuid>,
    Json(req): Json<UpdateMaterialRequest>,
) -> ApiResult<DataResponse<Material>> {
    auth.require_any_role(BOM_AUTHORS)?;

    let mut material = db::materials::fetch(&state.db, material_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Material {} not found", material_id)))?;

    if let Some(description) = req.description {
        material.description = description.trim().to_string();
    }
    if let Some(unit) = req.unit {
        material.unit = unit.trim().to_string();
    }
    if let Some(cost) = req.cost {
        material.cost = cost;
    }
    validate_fields(&material.description, &material.unit, material.cost)?;
    material.updated_at = Utc::now();

    db::materials::save(&state.db, &material).await?;

    tracing::info!(material_id = %material_id, "Material updated");
    Ok(DataResponse::new(material))
}

/// DELETE /materials/:material_id
pub async fn delete_material(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(material_id): Path<Uuid>,
) -> ApiResult<NoContent> {
    auth.require_any_role(BOM_AUTHORS)?;

    if !db::materials::delete(&state.db, material_id).await? {
        return Err(ApiError::not_found(format!("Material {} not found", material_id)));
    }

    tracing::info!(material_id = %material_id, "Material deleted");
    Ok(NoContent)
}
