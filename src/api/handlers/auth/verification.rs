//! Email verification endpoints: issue and consume VERIFY codes.

use axum::{
    Json,
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::PgPool;
use std::sync::Arc;

use super::otp::{self, OtpPurpose};
use super::state::AuthState;
use super::types::{ErrorResponse, OkResponse, SendOtpRequest, VerifyOtpRequest};
use super::utils::normalize_email;

/// Send a verification code to the account email.
///
/// Idempotent for verified accounts: no code is generated and no mail is
/// sent, but the call still succeeds.
#[utoipa::path(
    post,
    path = "/send-otp",
    request_body = SendOtpRequest,
    responses(
        (status = 200, description = "Code sent (or account already verified)", body = OkResponse),
        (status = 400, description = "Unknown account or missing email", body = ErrorResponse),
        (status = 500, description = "Notification dispatch failed", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn send_otp(
    pool: Extension<PgPool>,
    state: Extension<Arc<AuthState>>,
    payload: Option<Json<SendOtpRequest>>,
) -> impl IntoResponse {
    let request: SendOtpRequest = match payload {
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
    if email.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("email is required")),
        )
            .into_response();
    }

    match otp::issue(&pool, &state, &email, OtpPurpose::Verify).await {
        Ok(_) => (StatusCode::OK, Json(OkResponse::new())).into_response(),
        Err(err) => err.into_response(),
    }
}

/// Consume a verification code; on success the account becomes verified.
#[utoipa::path(
    post,
    path = "/verify-otp",
    request_body = VerifyOtpRequest,
    responses(
        (status = 200, description = "Account verified", body = OkResponse),
        (status = 400, description = "Invalid or expired code", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn verify_otp(
    pool: Extension<PgPool>,
    payload: Option<Json<VerifyOtpRequest>>,
) -> impl IntoResponse {
    let request: VerifyOtpRequest = match payload {
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
    let code = request.otp.trim();
    if email.is_empty() || code.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("email and otp are required")),
        )
            .into_response();
    }

    match otp::consume_verify(&pool, &email, code).await {
        Ok(()) => (StatusCode::OK, Json(OkResponse::new())).into_response(),
        Err(err) => err.into_response(),
    }
}
