use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::app::AppState;
use crate::db;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub services: ServiceHealth,
}

#[derive(Serialize)]
pub struct ServiceHealth {
    pub database: String,
    pub redis: String,
}

/// Postgres is critical; losing Redis only degrades lookups
fn overall_status(db_ok: bool, redis_ok: bool) -> (&'static str, StatusCode) {
    match (db_ok, redis_ok) {
        (true, true) => ("healthy", StatusCode::OK),
        (true, false) => ("degraded", StatusCode::OK),
        (false, _) => ("unhealthy", StatusCode::SERVICE_UNAVAILABLE),
    }
}

fn label(ok: bool) -> String {
    if ok { "ok" } else { "error" }.to_string()
}

/// Health check endpoint - public
pub async fn health_check(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<HealthResponse>) {
    let (db_ok, redis_result) = tokio::join!(
        db::health_check(&state.db),
        state.cache.health_check(),
    );
    let redis_ok = redis_result.is_ok();

    let (status, status_code) = overall_status(db_ok, redis_ok);

    (
        status_code,
        Json(HealthResponse {
            status: status.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            services: ServiceHealth {
                database: label(db_ok),
                redis: label(redis_ok),
            },
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redis_outage_only_degrades() {
        assert_eq!(overall_status(true, false), ("degraded", StatusCode::OK));
        assert_eq!(
            overall_status(false, true),
            ("unhealthy", StatusCode::SERVICE_UNAVAILABLE)
        );
        assert_eq!(overall_status(true, true).0, "healthy");
    }
}
