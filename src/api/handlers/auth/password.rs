//! Password reset endpoints: issue and consume RESET codes.

use axum::{
    Json,
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::PgPool;
use std::sync::Arc;

use super::error::AuthError;
use super::otp::{self, OtpPurpose};
use super::state::AuthState;
use super::types::{ErrorResponse, OkResponse, ResetPasswordRequest, SendOtpRequest};
use super::utils::{hash_password, normalize_email};

/// Send a password-reset code to the account email.
#[utoipa::path(
    post,
    path = "/send-reset-otp",
    request_body = SendOtpRequest,
    responses(
        (status = 200, description = "Code sent", body = OkResponse),
        (status = 400, description = "Unknown account or missing email", body = ErrorResponse),
        (status = 500, description = "Notification dispatch failed", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn send_reset_otp(
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

    match otp::issue(&pool, &state, &email, OtpPurpose::Reset).await {
        Ok(_) => (StatusCode::OK, Json(OkResponse::new())).into_response(),
        Err(err) => err.into_response(),
    }
}

/// Set a new password, gated on a valid RESET code.
///
/// The password policy runs before any OTP state is touched, so a weak
/// password never consumes a still-valid code.
#[utoipa::path(
    post,
    path = "/reset-password",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password updated", body = OkResponse),
        (status = 400, description = "Weak password, invalid or expired code", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn reset_password(
    pool: Extension<PgPool>,
    state: Extension<Arc<AuthState>>,
    payload: Option<Json<ResetPasswordRequest>>,
) -> impl IntoResponse {
    let request: ResetPasswordRequest = match payload {
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
    if email.is_empty() || code.is_empty() || request.new_password.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("email, otp and newPassword are required")),
        )
            .into_response();
    }

    let min_len = state.config().min_password_len();
    if request.new_password.len() < min_len {
        return AuthError::WeakPassword(min_len).into_response();
    }

    let password_hash = match hash_password(&request.new_password) {
        Ok(hash) => hash,
        Err(err) => return AuthError::Internal(err).into_response(),
    };

    match otp::consume_reset(&pool, &email, code, &password_hash).await {
        Ok(()) => (StatusCode::OK, Json(OkResponse::new())).into_response(),
        Err(err) => err.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::{reset_password, send_reset_otp};
    use crate::api::email::LogMailer;
    use crate::api::handlers::auth::otp::RngOtpGenerator;
    use crate::api::handlers::auth::state::{AuthConfig, AuthState};
    use crate::api::handlers::auth::token::TokenService;
    use crate::api::handlers::auth::types::{ResetPasswordRequest, SendOtpRequest};
    use anyhow::Result;
    use axum::Json;
    use axum::extract::Extension;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use secrecy::SecretString;
    use sqlx::postgres::PgPoolOptions;
    use std::sync::Arc;

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
    async fn send_reset_otp_missing_payload() -> Result<()> {
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        let response = send_reset_otp(Extension(pool), Extension(auth_state()?), None)
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn reset_password_blank_fields() -> Result<()> {
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        let response = reset_password(
            Extension(pool),
            Extension(auth_state()?),
            Some(Json(ResetPasswordRequest {
                email: "user@example.com".to_string(),
                otp: String::new(),
                new_password: "newpass123".to_string(),
            })),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn weak_password_is_rejected_before_otp_state() -> Result<()> {
        // The lazy pool has no backing database: reaching OTP state would
        // error with 500, so the 400 here proves the policy check runs first.
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        let response = reset_password(
            Extension(pool),
            Extension(auth_state()?),
            Some(Json(ResetPasswordRequest {
                email: "user@example.com".to_string(),
                otp: "482913".to_string(),
                new_password: "short".to_string(),
            })),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }
}
