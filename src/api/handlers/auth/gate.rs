//! Per-request authentication gate.
//!
//! The gate resolves a candidate token into a request-scoped identity and
//! nothing more: it never rejects a request. Allowlisted paths and pre-flight
//! requests skip straight through; everything else proceeds anonymously
//! unless a presented token resolves. Route-level policy downstream decides
//! what an absent identity means.

use axum::{
    extract::{Extension, Request},
    http::Method,
    middleware::Next,
    response::Response,
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use super::state::{AuthConfig, AuthState};
use super::storage;
use super::utils::{extract_bearer_token, extract_cookie_token};

/// Identity attached to the request once a token resolves.
#[derive(Clone, Debug)]
pub struct CurrentUser {
    pub id: Uuid,
    pub email: String,
    pub role: String,
    pub verified: bool,
}

/// Resolve the inbound token (header first, cookie second) to an identity
/// and attach it to the request extensions. Always dispatches downstream.
pub async fn authentication_gate(
    Extension(pool): Extension<PgPool>,
    Extension(state): Extension<Arc<AuthState>>,
    mut request: Request,
    next: Next,
) -> Response {
    if request.method() == Method::OPTIONS
        || is_public_path(state.config(), request.uri().path())
    {
        return next.run(request).await;
    }

    let headers = request.headers();
    let token = extract_bearer_token(headers)
        .or_else(|| extract_cookie_token(headers, state.config().cookie_name()));

    let Some(token) = token else {
        return next.run(request).await;
    };

    if request.extensions().get::<CurrentUser>().is_none() {
        match resolve_identity(&pool, &state, &token).await {
            Ok(Some(user)) => {
                request.extensions_mut().insert(user);
            }
            Ok(None) => {
                debug!(path = %request.uri().path(), "token did not resolve to an identity");
            }
            Err(err) => {
                // Lookup failures degrade to anonymous; the gate never aborts.
                warn!(path = %request.uri().path(), "failed to authenticate request: {err}");
            }
        }
    }

    next.run(request).await
}

async fn resolve_identity(
    pool: &PgPool,
    state: &AuthState,
    token: &str,
) -> anyhow::Result<Option<CurrentUser>> {
    let Some(subject) = state.tokens().extract_subject(token) else {
        return Ok(None);
    };
    let Some(user) = storage::find_by_email(pool, &subject).await? else {
        return Ok(None);
    };
    if !state.tokens().validate(token, &user.email) {
        return Ok(None);
    }
    Ok(Some(CurrentUser {
        id: user.id,
        email: user.email,
        role: user.role,
        verified: user.verified,
    }))
}

/// Match against the allowlist: exact or prefix, with and without the
/// configured routing prefix.
pub(crate) fn is_public_path(config: &AuthConfig, path: &str) -> bool {
    let base = normalize_base_path(config.base_path());
    for public in config.public_paths() {
        if path == public || path.starts_with(&format!("{public}/")) {
            return true;
        }
        if !base.is_empty() {
            let prefixed = format!("{base}{public}");
            if path == prefixed || path.starts_with(&format!("{prefixed}/")) {
                return true;
            }
        }
    }
    false
}

fn normalize_base_path(base: &str) -> String {
    let trimmed = base.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    let trimmed = trimmed.trim_end_matches('/');
    if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}
