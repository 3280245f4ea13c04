//! Account registration.

use axum::{
    Json,
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{error, warn};

use super::error::AuthError;
use super::state::AuthState;
use super::storage::{self, RegisterOutcome};
use super::types::{ErrorResponse, RegisterRequest, RegisterResponse};
use super::utils::{hash_password, normalize_email, valid_email};

/// Create a new identity record.
///
/// Uniqueness is decided by the database constraint at insert time, so of two
/// concurrent registrations with the same email exactly one succeeds. The
/// welcome email is fire-and-log: a delivery failure never fails the
/// registration.
#[utoipa::path(
    post,
    path = "/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = RegisterResponse),
        (status = 400, description = "Invalid email or weak password", body = ErrorResponse),
        (status = 409, description = "Email already registered", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn register(
    pool: Extension<PgPool>,
    state: Extension<Arc<AuthState>>,
    payload: Option<Json<RegisterRequest>>,
) -> impl IntoResponse {
    let request: RegisterRequest = match payload {
        Some(Json(payload)) => payload,
        None => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::new("Missing payload")),
            )
                .into_response();
        }
    };

    let email = normalize_email(&request.email);
    if !valid_email(&email) {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("Invalid email")),
        )
            .into_response();
    }

    let min_len = state.config().min_password_len();
    if request.password.len() < min_len {
        return AuthError::WeakPassword(min_len).into_response();
    }

    // Fast pre-check for a friendlier error; the unique constraint in
    // insert_user stays authoritative for concurrent registrations.
    match storage::exists_by_email(&pool, &email).await {
        Ok(true) => return AuthError::DuplicateEmail.into_response(),
        Ok(false) => {}
        Err(err) => {
            error!("Failed to check email existence: {err:#}");
            return AuthError::Internal(err).into_response();
        }
    }

    let password_hash = match hash_password(&request.password) {
        Ok(hash) => hash,
        Err(err) => return AuthError::Internal(err).into_response(),
    };

    let full_name = request
        .full_name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty());

    match storage::insert_user(&pool, &email, full_name, &password_hash).await {
        Ok(RegisterOutcome::Created(user)) => {
            let name = user.full_name.as_deref().unwrap_or(&user.email);
            if let Err(err) = state.mailer().send_welcome(&user.email, name) {
                warn!(email = %user.email, "failed to send welcome email: {err}");
            }
            let body = RegisterResponse {
                id: user.id.to_string(),
                email: user.email.clone(),
            };
            (StatusCode::CREATED, Json(body)).into_response()
        }
        Ok(RegisterOutcome::Conflict) => AuthError::DuplicateEmail.into_response(),
        Err(err) => {
            error!("Failed to register user: {err:#}");
            AuthError::Internal(err).into_response()
        }
    }
}
