//! Health probe handlers.
//!
//! Three probe endpoints:
//! - `/live`: process liveness only (no dependency checks)
//! - `/ready`: database-aware readiness for orchestrators
//! - `/health`: database-aware status with a JSON payload

use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tokio::time::{Duration, timeout};
use tracing::{Instrument, debug, info_span, warn};
use utoipa::ToSchema;

const HEALTH_DB_TIMEOUT_SECONDS: u64 = 2;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct Health {
    name: String,
    version: String,
    database: String,
}

#[utoipa::path(
    get,
    path = "/live",
    responses(
        (status = 200, description = "Process is alive")
    ),
    tag = "health",
)]
/// Report process liveness without checking external dependencies.
pub async fn live() -> impl IntoResponse {
    StatusCode::OK
}

#[utoipa::path(
    get,
    path = "/ready",
    responses(
        (status = 200, description = "Service is ready to receive traffic"),
        (status = 503, description = "Service dependencies are not ready")
    ),
    tag = "health",
)]
/// Report readiness based on database connectivity.
pub async fn ready(pool: Extension<PgPool>) -> impl IntoResponse {
    if database_healthy(&pool).await {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Database connection is healthy", body = Health),
        (status = 503, description = "Database connection is unhealthy", body = Health)
    ),
    tag = "health",
)]
/// Detailed health check with the database probe result in the body.
pub async fn health(pool: Extension<PgPool>) -> impl IntoResponse {
    let db_healthy = database_healthy(&pool).await;

    let health = Health {
        name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: if db_healthy {
            "ok".to_string()
        } else {
            "error".to_string()
        },
    };

    let status = if db_healthy {
        debug!("health probe ok");
        StatusCode::OK
    } else {
        warn!("health probe failed: database unreachable");
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(health))
}

async fn database_healthy(pool: &PgPool) -> bool {
    let query = "SELECT 1";
    let span = info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let probe = sqlx::query_scalar::<_, i32>(query)
        .fetch_one(pool)
        .instrument(span);

    matches!(
        timeout(Duration::from_secs(HEALTH_DB_TIMEOUT_SECONDS), probe).await,
        Ok(Ok(1))
    )
}

#[cfg(test)]
mod tests {
    use super::{Health, live};
    use anyhow::Result;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;

    #[tokio::test]
    async fn live_is_always_ok() {
        let response = live().await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn health_payload_serializes() -> Result<()> {
        let health = Health {
            name: "finsight-auth".to_string(),
            version: "0.1.0".to_string(),
            database: "ok".to_string(),
        };
        let value = serde_json::to_value(&health)?;
        assert_eq!(
            value.get("database").and_then(serde_json::Value::as_str),
            Some("ok")
        );
        Ok(())
    }
}
