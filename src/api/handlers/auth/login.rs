//! Login and logout: password verification, token issuance, cookie delivery.

use axum::{
    Json,
    extract::Extension,
    http::{
        HeaderMap, HeaderValue, StatusCode,
        header::{InvalidHeaderValue, SET_COOKIE},
    },
    response::IntoResponse,
};
use chrono::Utc;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{error, info, warn};

use super::error::AuthError;
use super::state::{AuthConfig, AuthState};
use super::storage;
use super::types::{ErrorResponse, LoginRequest, LoginResponse, OkResponse};
use super::utils::{normalize_email, verify_password};

/// Authenticate with email and password.
///
/// On success the signed token is returned both in the body and as an
/// `HttpOnly` cookie whose max-age equals the token validity window. Bad
/// credentials and lock states share one opaque body; only the status code
/// differs.
#[utoipa::path(
    post,
    path = "/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Authenticated", body = LoginResponse),
        (status = 400, description = "Missing fields", body = ErrorResponse),
        (status = 401, description = "Authentication failed", body = ErrorResponse),
        (status = 403, description = "Account disabled or locked", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn login(
    pool: Extension<PgPool>,
    state: Extension<Arc<AuthState>>,
    payload: Option<Json<LoginRequest>>,
) -> impl IntoResponse {
    let request: LoginRequest = match payload {
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
    if email.is_empty() || request.password.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("email and password are required")),
        )
            .into_response();
    }

    let user = match storage::find_by_email(&pool, &email).await {
        Ok(Some(user)) => user,
        // Unknown accounts and wrong passwords are indistinguishable to the
        // caller.
        Ok(None) => return AuthError::InvalidCredentials.into_response(),
        Err(err) => {
            error!("Failed to lookup user for login: {err:#}");
            return AuthError::Internal(err).into_response();
        }
    };

    if !user.enabled {
        return AuthError::AccountDisabled.into_response();
    }
    if user.locked(Utc::now()) {
        return AuthError::AccountLocked.into_response();
    }

    if !verify_password(&request.password, &user.password_hash) {
        let config = state.config();
        if let Err(err) = storage::record_login_failure(
            &pool,
            &user.email,
            config.max_failed_logins(),
            config.lockout_seconds(),
        )
        .await
        {
            warn!(email = %user.email, "failed to record login failure: {err}");
        }
        return AuthError::InvalidCredentials.into_response();
    }

    if let Err(err) = storage::record_login_success(&pool, user.id).await {
        warn!(email = %user.email, "failed to record login success: {err}");
    }

    let token = match state.tokens().issue(&user.email) {
        Ok(token) => token,
        Err(err) => return AuthError::Internal(err).into_response(),
    };

    let mut headers = HeaderMap::new();
    match session_cookie(state.config(), &token) {
        Ok(cookie) => {
            headers.insert(SET_COOKIE, cookie);
        }
        Err(err) => {
            error!("Failed to build session cookie: {err}");
            return AuthError::Internal(err.into()).into_response();
        }
    }

    info!(email = %user.email, "login succeeded");
    let body = LoginResponse {
        email: user.email,
        token,
    };
    (StatusCode::OK, headers, Json(body)).into_response()
}

/// Clear the session cookie. Stateless: the token itself stays
/// cryptographically valid until its natural expiry.
#[utoipa::path(
    post,
    path = "/logout",
    responses(
        (status = 200, description = "Cookie cleared", body = OkResponse)
    ),
    tag = "auth"
)]
pub async fn logout(state: Extension<Arc<AuthState>>) -> impl IntoResponse {
    let mut headers = HeaderMap::new();
    if let Ok(cookie) = clear_session_cookie(state.config()) {
        headers.insert(SET_COOKIE, cookie);
    }
    (
        StatusCode::OK,
        headers,
        Json(OkResponse::with_message("Logged out")),
    )
        .into_response()
}

/// Session cookie carrying the bearer token, scoped and `HttpOnly`.
pub(super) fn session_cookie(
    config: &AuthConfig,
    token: &str,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let name = config.cookie_name();
    let path = config.cookie_path();
    let max_age = config.token_validity_seconds();
    let mut cookie =
        format!("{name}={token}; Path={path}; HttpOnly; SameSite=Strict; Max-Age={max_age}");
    if config.cookie_secure() {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

pub(super) fn clear_session_cookie(
    config: &AuthConfig,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let name = config.cookie_name();
    let path = config.cookie_path();
    let mut cookie = format!("{name}=; Path={path}; HttpOnly; SameSite=Strict; Max-Age=0");
    if config.cookie_secure() {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

#[cfg(test)]
mod tests {
    use super::{clear_session_cookie, login, session_cookie};
    use crate::api::email::LogMailer;
    use crate::api::handlers::auth::otp::RngOtpGenerator;
    use crate::api::handlers::auth::state::{AuthConfig, AuthState};
    use crate::api::handlers::auth::token::TokenService;
    use crate::api::handlers::auth::types::LoginRequest;
    use anyhow::{Context, Result};
    use axum::Json;
    use axum::extract::Extension;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use secrecy::SecretString;
    use sqlx::postgres::PgPoolOptions;
    use std::sync::Arc;

    fn auth_state(config: AuthConfig) -> Result<Arc<AuthState>> {
        let secret = SecretString::from("0123456789abcdef0123456789abcdef".to_string());
        let tokens = TokenService::new(&secret, 10)?;
        Ok(Arc::new(AuthState::new(
            config,
            tokens,
            Arc::new(LogMailer),
            Arc::new(RngOtpGenerator),
        )))
    }

    #[test]
    fn session_cookie_carries_the_expected_attributes() -> Result<()> {
        let config = AuthConfig::new().with_token_validity_hours(10);
        let cookie = session_cookie(&config, "tok")?;
        let value = cookie.to_str().context("cookie should be ascii")?;
        assert!(value.starts_with("jwt=tok;"));
        assert!(value.contains("HttpOnly"));
        assert!(value.contains("SameSite=Strict"));
        assert!(value.contains("Path=/"));
        assert!(value.contains("Max-Age=36000"));
        assert!(!value.contains("Secure"));
        Ok(())
    }

    #[test]
    fn secure_flag_follows_configuration() -> Result<()> {
        let config = AuthConfig::new().with_cookie_secure(true);
        let cookie = session_cookie(&config, "tok")?;
        assert!(cookie.to_str().context("ascii")?.contains("; Secure"));
        Ok(())
    }

    #[test]
    fn clear_cookie_overwrites_with_zero_max_age() -> Result<()> {
        let config = AuthConfig::new();
        let cookie = clear_session_cookie(&config)?;
        let value = cookie.to_str().context("ascii")?;
        assert!(value.starts_with("jwt=;"));
        assert!(value.contains("Max-Age=0"));
        Ok(())
    }

    #[tokio::test]
    async fn login_missing_payload() -> Result<()> {
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        let response = login(Extension(pool), Extension(auth_state(AuthConfig::new())?), None)
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn login_blank_fields() -> Result<()> {
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        let response = login(
            Extension(pool),
            Extension(auth_state(AuthConfig::new())?),
            Some(Json(LoginRequest {
                email: "  ".to_string(),
                password: "pw".to_string(),
            })),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }
}
