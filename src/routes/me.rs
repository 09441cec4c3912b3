use axum::Json;
use serde::Serialize;
use uuid::Uuid;

use crate::auth::{context::BOM_AUTHORS, RequireAuth, Role};

#[derive(Serialize)]
pub struct MeResponse {
    pub user_id: Uuid,
    pub username: Option<String>,
    pub role: Role,
    pub can_author_boms: bool,
}

/// Get current authenticated user info
pub async fn get_me(auth: RequireAuth) -> Json<MeResponse> {
    Json(MeResponse {
        user_id: auth.user_id,
        username: auth.username.clone(),
        role: auth.role,
        can_author_boms: auth.has_any_role(BOM_AUTHORS),
    })
}
