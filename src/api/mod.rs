//! HTTP surface: router assembly, middleware stack, and server startup.

use crate::api::handlers::auth::{gate, state::AuthState};
use anyhow::{Context, Result};
use axum::{
    Extension, Router,
    body::Body,
    http::{
        HeaderName, HeaderValue, Method, Request,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    middleware,
};
use sqlx::{PgPool, postgres::PgPoolOptions};
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{Span, debug_span, info};
use ulid::Ulid;

pub mod email;
pub mod handlers;
// OpenAPI router wiring and route registration live in openapi.rs.
mod openapi;

pub use openapi::openapi;

/// Assemble the application router with the full middleware stack.
///
/// The authentication gate is the innermost layer so the `Extension`s it
/// reads are already attached when it runs.
#[must_use]
pub fn app(pool: PgPool, state: Arc<AuthState>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .allow_origin(Any);

    let (router, _openapi) = openapi::api_router().split_for_parts();

    router.layer(
        ServiceBuilder::new()
            .layer(SetRequestHeaderLayer::if_not_present(
                HeaderName::from_static("x-request-id"),
                |_req: &Request<Body>| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
            ))
            .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                "x-request-id",
            )))
            .layer(TraceLayer::new_for_http().make_span_with(make_span))
            .layer(cors)
            .layer(Extension(state))
            .layer(Extension(pool))
            .layer(middleware::from_fn(gate::authentication_gate)),
    )
}

/// Connect to the database and serve the API.
///
/// # Errors
///
/// Returns an error if the database is unreachable or the listener fails.
pub async fn new(port: u16, dsn: String, state: Arc<AuthState>) -> Result<()> {
    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
        .connect(&dsn)
        .await
        .context("Failed to connect to database")?;

    let app = app(pool, state);

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{port}");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("Gracefully shutdown");
}

fn make_span(request: &Request<Body>) -> Span {
    let path = request.uri().path();
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");

    debug_span!("http-request", path, request_id)
}

#[cfg(test)]
mod tests {
    use super::app;
    use crate::api::email::LogMailer;
    use crate::api::handlers::auth::otp::RngOtpGenerator;
    use crate::api::handlers::auth::state::{AuthConfig, AuthState};
    use crate::api::handlers::auth::token::TokenService;
    use anyhow::Result;
    use axum::http::{Request, StatusCode};
    use secrecy::SecretString;
    use sqlx::postgres::PgPoolOptions;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn auth_state() -> Result<Arc<AuthState>> {
        let secret = SecretString::from("0123456789abcdef0123456789abcdef".to_string());
        let tokens = TokenService::new(&secret, 10)?;
        Ok(Arc::new(AuthState::new(
            AuthConfig::new(),
            tokens,
            Arc::new(LogMailer),
            Arc::new(RngOtpGenerator),
        )))
    }

    #[tokio::test]
    async fn live_probe_needs_no_database() -> Result<()> {
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        let app = app(pool, auth_state()?);
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/live")
                    .body(axum::body::Body::empty())?,
            )
            .await?;
        assert_eq!(response.status(), StatusCode::OK);
        Ok(())
    }

    #[tokio::test]
    async fn unknown_routes_are_not_found() -> Result<()> {
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        let app = app(pool, auth_state()?);
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/nope")
                    .body(axum::body::Body::empty())?,
            )
            .await?;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        Ok(())
    }
}
