use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use super::{AuthContext, JwtVerifier};
use crate::error::ErrorResponse;

/// Extractor that requires authentication
/// Use this in route handlers to require a valid JWT
///
/// Example:
/// ```ignore
/// async fn protected_route(auth: RequireAuth) -> impl IntoResponse {
///     format!("Hello, user {}", auth.user_id)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct RequireAuth(pub AuthContext);

impl std::ops::Deref for RequireAuth {
    type Target = AuthContext;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[derive(Debug)]
pub enum AuthError {
    MissingToken,
    InvalidFormat,
    InvalidToken(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let message = match &self {
            AuthError::MissingToken => "Missing authorization token",
            AuthError::InvalidFormat => "Invalid authorization format",
            AuthError::InvalidToken(_) => "Invalid or expired token",
        };

        let body = ErrorResponse {
            code: "UNAUTHORIZED".to_string(),
            message: message.to_string(),
            request_id: None,
        };

        (StatusCode::UNAUTHORIZED, Json(body)).into_response()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
    JwtVerifier: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        // Extract Authorization header
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or(AuthError::MissingToken)?
            .to_str()
            .map_err(|_| AuthError::InvalidFormat)?;

        // Parse Bearer token
        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(AuthError::InvalidFormat)?
            .trim();

        if token.is_empty() {
            return Err(AuthError::MissingToken);
        }

        let verifier = JwtVerifier::from_ref(state);
        let claims = verifier.verify_token(token).map_err(|e| {
            tracing::warn!(error = %e, "JWT verification failed");
            AuthError::InvalidToken(e.to_string())
        })?;

        let context = AuthContext::from_claims(&claims).map_err(|e| {
            tracing::warn!(error = %e, "Failed to build auth context");
            AuthError::InvalidToken(e.to_string())
        })?;

        Ok(RequireAuth(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use axum::http::Request;
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &str = "extractor-secret";

    fn parts_with(header: Option<String>) -> Parts {
        let mut builder = Request::builder().uri("/projects");
        if let Some(value) = header {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    fn bearer(role: &str) -> String {
        let exp = chrono::Utc::now().timestamp() + 600;
        let claims = serde_json::json!({
            "sub": "0b6f5d1c-2f51-4c8e-9a0e-5d7b9b2b6a11",
            "role": role,
            "exp": exp,
        });
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();
        format!("Bearer {token}")
    }

    #[tokio::test]
    async fn extracts_context_from_bearer_token() {
        let verifier = JwtVerifier::new(SECRET);
        let mut parts = parts_with(Some(bearer("admin")));

        let auth = RequireAuth::from_request_parts(&mut parts, &verifier)
            .await
            .unwrap();

        assert_eq!(auth.role, Role::Admin);
        assert_eq!(auth.user_id.to_string(), "0b6f5d1c-2f51-4c8e-9a0e-5d7b9b2b6a11");
    }

    #[tokio::test]
    async fn missing_or_malformed_header_is_rejected() {
        let verifier = JwtVerifier::new(SECRET);

        let mut parts = parts_with(None);
        let err = RequireAuth::from_request_parts(&mut parts, &verifier)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::MissingToken));

        let mut parts = parts_with(Some("Token abc".to_string()));
        let err = RequireAuth::from_request_parts(&mut parts, &verifier)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidFormat));
    }
}
