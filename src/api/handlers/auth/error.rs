//! Domain error taxonomy for the credential and token lifecycle.
//!
//! Validation failures carry their own message back to the caller.
//! Credential and lock failures intentionally share one opaque message so the
//! response body never reveals which check rejected the login; the status
//! code still distinguishes 401 from 403 for clients.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use super::types::ErrorResponse;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("User not found")]
    NotFound,
    #[error("Invalid OTP")]
    InvalidCode,
    #[error("OTP expired")]
    Expired,
    #[error("Authentication failed")]
    InvalidCredentials,
    #[error("Authentication failed")]
    AccountLocked,
    #[error("Authentication failed")]
    AccountDisabled,
    #[error("Password must be at least {0} characters long")]
    WeakPassword(usize),
    #[error("Email already registered")]
    DuplicateEmail,
    #[error("Failed to send notification")]
    Notification(#[source] anyhow::Error),
    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl AuthError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound | Self::InvalidCode | Self::Expired | Self::WeakPassword(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::AccountLocked | Self::AccountDisabled => StatusCode::FORBIDDEN,
            Self::DuplicateEmail => StatusCode::CONFLICT,
            Self::Notification(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match &self {
            Self::Notification(err) => error!("Notification dispatch failed: {err}"),
            Self::Internal(err) => error!("Internal error: {err:#}"),
            _ => {}
        }
        let body = ErrorResponse::new(&self.to_string());
        (self.status(), Json(body)).into_response()
    }
}
