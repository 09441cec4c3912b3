//! Template routes
//!
//! Reference BOM management. Mutations require a BOM author role and always
//! work on the stored document, never the cached copy.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::api::{Created, DataResponse, MessageResponse, Paginated, PaginationParams};
use crate::app::AppState;
use crate::auth::{context::BOM_AUTHORS, RequireAuth, Role};
use crate::db;
use crate::domain::templates::{
    AddMaterialRequest, CreateTemplateRequest, NewMaterial, Template, TemplateBom,
    TemplateMaterial, UpdateTemplateRequest,
};
use crate::error::{ApiError, ApiResult};

async fn load_for_update(state: &AppState, template_id: Uuid) -> ApiResult<Template> {
    db::templates::fetch(&state.db, template_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Template {} not found", template_id)))
}

async fn store(state: &AppState, template: &mut Template) -> ApiResult<()> {
    template.updated_at = Utc::now();
    if !db::templates::save(&state.db, template).await? {
        return Err(ApiError::not_found(format!("Template {} not found", template.id)));
    }
    state.cache.invalidate_template(template.id).await;
    Ok(())
}

/// GET /templates
pub async fn list_templates(
    _auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Query(pagination): Query<PaginationParams>,
) -> ApiResult<Paginated<Template>> {
    let (templates, total) =
        db::templates::list(&state.db, pagination.limit(), pagination.offset()).await?;

    Ok(Paginated::new(templates, &pagination, total))
}

/// POST /templates
///
/// The stored title carries the tier, e.g. "Bungalow - Standard", and every
/// standard category starts out empty.
pub async fn create_template(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateTemplateRequest>,
) -> ApiResult<Created<DataResponse<Template>>> {
    auth.require_any_role(BOM_AUTHORS)?;

    if req.title.trim().is_empty() {
        return Err(ApiError::bad_request("Template title is required"));
    }
    req.reference.validate()?;

    let now = Utc::now();
    let template = Template {
        id: Uuid::new_v4(),
        title: req.display_title(),
        kind: req.kind,
        tier: req.tier,
        bom: TemplateBom::with_standard_categories(req.reference),
        created_by: Some(auth.user_id),
        created_at: now,
        updated_at: now,
    };

    db::templates::insert(&state.db, &template).await?;

    tracing::info!(
        user_id = %auth.user_id,
        template_id = %template.id,
        title = %template.title,
        "Template created"
    );

    Ok(Created(DataResponse::new(template)))
}

/// GET /templates/:template_id
pub async fn get_template(
    _auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(template_id): Path<Uuid>,
) -> ApiResult<DataResponse<Template>> {
    let template = state
        .cache
        .template(&state.db, template_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Template {} not found", template_id)))?;

    Ok(DataResponse::new(template))
}

/// PATCH /templates/:template_id
pub async fn update_template(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(template_id): Path<Uuid>,
    Json(req): Json<UpdateTemplateRequest>,
) -> ApiResult<DataResponse<Template>> {
    auth.require_any_role(BOM_AUTHORS)?;

    let mut template = load_for_update(&state, template_id).await?;

    if req.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
        return Err(ApiError::bad_request("Template title is required"));
    }
    if req.title.is_some() || req.tier.is_some() {
        template.retitle(req.title.as_deref(), req.tier);
    }
    if let Some(reference) = req.reference {
        reference.validate()?;
        template.bom.reference = reference;
    }

    store(&state, &mut template).await?;

    tracing::info!(user_id = %auth.user_id, template_id = %template_id, "Template updated");
    Ok(DataResponse::new(template))
}

/// DELETE /templates/:template_id
///
/// Only the creator may delete a template; admins may delete any.
pub async fn delete_template(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(template_id): Path<Uuid>,
) -> ApiResult<MessageResponse> {
    let template = load_for_update(&state, template_id).await?;

    let is_creator = template.created_by == Some(auth.user_id);
    if !is_creator && auth.role != Role::Admin {
        return Err(ApiError::forbidden("Only the template creator can delete it"));
    }

    db::templates::delete(&state.db, template_id).await?;
    state.cache.invalidate_template(template_id).await;

    tracing::info!(user_id = %auth.user_id, template_id = %template_id, "Template deleted");
    Ok(MessageResponse::with_code(
        format!("Template '{}' deleted", template.title),
        "TEMPLATE_DELETED",
    ))
}

/// POST /templates/:template_id/categories/:category/materials
pub async fn add_material(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path((template_id, category)): Path<(Uuid, String)>,
    Json(req): Json<AddMaterialRequest>,
) -> ApiResult<Created<DataResponse<TemplateMaterial>>> {
    auth.require_any_role(BOM_AUTHORS)?;

    let catalogue = match req.material_id {
        Some(material_id) => Some(
            db::materials::fetch(&state.db, material_id)
                .await?
                .ok_or_else(|| ApiError::not_found(format!("Material {} not found", material_id)))?,
        ),
        None => None,
    };

    let mut template = load_for_update(&state, template_id).await?;
    let input = NewMaterial::resolve(req, catalogue.as_ref())?;
    let material = template.bom.add_material(&category, input)?.clone();

    store(&state, &mut template).await?;

    tracing::info!(
        template_id = %template_id,
        category = %category,
        item = %material.item,
        "Material added to template"
    );

    Ok(Created(DataResponse::new(material)))
}

/// DELETE /templates/:template_id/categories/:category/materials/:description
pub async fn remove_material(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path((template_id, category, description)): Path<(Uuid, String, String)>,
) -> ApiResult<DataResponse<TemplateMaterial>> {
    auth.require_any_role(BOM_AUTHORS)?;

    let mut template = load_for_update(&state, template_id).await?;
    let removed = template.bom.remove_material(&category, &description)?;

    store(&state, &mut template).await?;

    tracing::info!(
        template_id = %template_id,
        category = %category,
        description = %removed.description,
        "Material removed from template"
    );

    Ok(DataResponse::new(removed))
}
