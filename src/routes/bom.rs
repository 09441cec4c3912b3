//! BOM generation route

use axum::{extract::State, Json};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::api::DataResponse;
use crate::app::AppState;
use crate::auth::{context::BOM_AUTHORS, RequireAuth};
use crate::domain::bom::{self, BomError, BomParams, GeneratedBom};
use crate::error::ApiResult;

/// Request DTO for generating a BOM
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateBomRequest {
    pub template_id: Uuid,
    #[serde(flatten)]
    pub params: BomParams,
    #[serde(default)]
    pub location_name: Option<String>,
}

impl GenerateBomRequest {
    /// Location to price against; a blank name means none
    fn location_name(&self) -> Option<&str> {
        self.location_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }
}

/// POST /bom/generate
///
/// Scales the template to the requested building. Nothing is stored; the
/// result is attached to a project through `POST /projects/:id/boms`.
pub async fn generate_bom(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Json(req): Json<GenerateBomRequest>,
) -> ApiResult<DataResponse<GeneratedBom>> {
    auth.require_any_role(BOM_AUTHORS)?;

    let template = state
        .cache
        .template(&state.db, req.template_id)
        .await?
        .ok_or(BomError::TemplateNotFound(req.template_id))?;

    let location = match req.location_name() {
        Some(name) => Some(
            state
                .cache
                .location_by_name(&state.db, name)
                .await?
                .ok_or_else(|| BomError::LocationNotFound(name.to_string()))?,
        ),
        None => None,
    };

    let generated = bom::generate(&template.bom, &req.params, location.as_ref())?;

    tracing::info!(
        user_id = %auth.user_id,
        template_id = %req.template_id,
        location = ?req.location_name(),
        total_project_cost = generated.marked_up_costs.total_project_cost,
        "BOM generated"
    );

    Ok(DataResponse::new(generated))
}
