//! HS256 bearer token verification

use anyhow::{Context, Result};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use std::sync::Arc;

use super::Claims;

/// Verifies API tokens signed with the shared `JWT_SECRET`
#[derive(Clone)]
pub struct JwtVerifier {
    key: Arc<DecodingKey>,
    validation: Validation,
}

impl JwtVerifier {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            key: Arc::new(DecodingKey::from_secret(secret.as_bytes())),
            validation,
        }
    }

    /// Verify a JWT token and return the claims
    pub fn verify_token(&self, token: &str) -> Result<Claims> {
        let token_data =
            decode::<Claims>(token, &self.key, &self.validation).context("JWT validation failed")?;

        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &str = "test-secret";

    fn token(secret: &str, role: &str, exp_offset: i64) -> String {
        let now = chrono::Utc::now().timestamp();
        let claims = serde_json::json!({
            "sub": "7d3f4c1e-8f4e-4d0a-9a55-3f2f2b1c0d9e",
            "username": "mara",
            "role": role,
            "iat": now,
            "exp": now + exp_offset,
        });
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn accepts_valid_token_and_role_alias() {
        let verifier = JwtVerifier::new(SECRET);
        let claims = verifier
            .verify_token(&token(SECRET, "designEngineer", 3600))
            .unwrap();

        assert_eq!(claims.role, Role::DesignEngineer);
        assert_eq!(claims.username.as_deref(), Some("mara"));
    }

    #[test]
    fn rejects_wrong_secret() {
        let verifier = JwtVerifier::new(SECRET);
        assert!(verifier
            .verify_token(&token("other-secret", "admin", 3600))
            .is_err());
    }

    #[test]
    fn rejects_expired_token() {
        let verifier = JwtVerifier::new(SECRET);
        assert!(verifier.verify_token(&token(SECRET, "admin", -3600)).is_err());
    }

    #[test]
    fn rejects_unknown_role() {
        let verifier = JwtVerifier::new(SECRET);
        assert!(verifier.verify_token(&token(SECRET, "root", 3600)).is_err());
    }
}
