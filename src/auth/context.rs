use super::{Claims, Role};
use crate::error::ApiError;
use uuid::Uuid;

/// Roles allowed to manage templates and generate BOMs
pub const BOM_AUTHORS: &[Role] = &[Role::Admin, Role::DesignEngineer];

/// Authenticated user context extracted from JWT
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// User ID (from JWT sub claim)
    pub user_id: Uuid,

    pub username: Option<String>,

    pub role: Role,
}

impl AuthContext {
    pub fn from_claims(claims: &Claims) -> Result<Self, &'static str> {
        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| "Invalid user ID in token")?;

        Ok(Self {
            user_id,
            username: claims.username.clone(),
            role: claims.role,
        })
    }

    pub fn has_any_role(&self, roles: &[Role]) -> bool {
        roles.contains(&self.role)
    }

    /// Reject the request unless the caller holds one of `roles`
    pub fn require_any_role(&self, roles: &[Role]) -> Result<(), ApiError> {
        if self.has_any_role(roles) {
            return Ok(());
        }

        tracing::warn!(user_id = %self.user_id, role = %self.role, "Role not permitted");
        Err(ApiError::forbidden(format!(
            "Role '{}' is not allowed to perform this action",
            self.role
        )))
    }
}
