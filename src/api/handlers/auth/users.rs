//! Profile endpoints for the authenticated identity.
//!
//! These routes sit behind the gate and demonstrate the layering: the gate
//! only resolves identity, while the 401 for anonymous callers is decided
//! here, at the route policy level.

use axum::{
    Json,
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::PgPool;
use tracing::error;

use super::error::AuthError;
use super::gate::CurrentUser;
use super::storage::{self, UserRecord};
use super::types::{ErrorResponse, ProfilePatch, ProfileResponse};

fn profile_response(user: &UserRecord) -> ProfileResponse {
    ProfileResponse {
        id: user.id.to_string(),
        email: user.email.clone(),
        full_name: user.full_name.clone(),
        role: user.role.clone(),
        verified: user.verified,
    }
}

fn unauthenticated() -> axum::response::Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorResponse::new("Authentication required")),
    )
        .into_response()
}

/// Profile of the authenticated identity.
#[utoipa::path(
    get,
    path = "/me",
    responses(
        (status = 200, description = "Authenticated profile", body = ProfileResponse),
        (status = 401, description = "No authenticated identity", body = ErrorResponse)
    ),
    tag = "users"
)]
pub async fn me(
    pool: Extension<PgPool>,
    current_user: Option<Extension<CurrentUser>>,
) -> impl IntoResponse {
    let Some(Extension(current_user)) = current_user else {
        return unauthenticated();
    };

    match storage::find_by_id(&pool, current_user.id).await {
        Ok(Some(user)) => (StatusCode::OK, Json(profile_response(&user))).into_response(),
        Ok(None) => AuthError::NotFound.into_response(),
        Err(err) => {
            error!("Failed to load profile: {err:#}");
            AuthError::Internal(err).into_response()
        }
    }
}

/// Apply a typed patch to the authenticated profile. Only fields present in
/// the body are written.
#[utoipa::path(
    patch,
    path = "/me",
    request_body = ProfilePatch,
    responses(
        (status = 200, description = "Updated profile", body = ProfileResponse),
        (status = 400, description = "Empty patch", body = ErrorResponse),
        (status = 401, description = "No authenticated identity", body = ErrorResponse)
    ),
    tag = "users"
)]
pub async fn update_me(
    pool: Extension<PgPool>,
    current_user: Option<Extension<CurrentUser>>,
    payload: Option<Json<ProfilePatch>>,
) -> impl IntoResponse {
    let Some(Extension(current_user)) = current_user else {
        return unauthenticated();
    };

    let patch: ProfilePatch = match payload {
        Some(Json(payload)) => payload,
        None => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::new("Missing payload")),
            )
                .into_response();
        }
    };

    if patch.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("Nothing to update")),
        )
            .into_response();
    }

    match storage::apply_profile_patch(&pool, current_user.id, &patch).await {
        Ok(Some(user)) => (StatusCode::OK, Json(profile_response(&user))).into_response(),
        Ok(None) => AuthError::NotFound.into_response(),
        Err(err) => {
            error!("Failed to patch profile: {err:#}");
            AuthError::Internal(err).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{me, update_me};
    use crate::api::handlers::auth::gate::CurrentUser;
    use crate::api::handlers::auth::types::ProfilePatch;
    use anyhow::Result;
    use axum::Json;
    use axum::extract::Extension;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use sqlx::postgres::PgPoolOptions;
    use uuid::Uuid;

    #[tokio::test]
    async fn me_requires_an_identity() -> Result<()> {
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        let response = me(Extension(pool), None).await.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        Ok(())
    }

    #[tokio::test]
    async fn update_me_requires_an_identity() -> Result<()> {
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        let response = update_me(Extension(pool), None, None).await.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        Ok(())
    }

    #[tokio::test]
    async fn update_me_rejects_an_empty_patch() -> Result<()> {
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        let user = CurrentUser {
            id: Uuid::nil(),
            email: "user@example.com".to_string(),
            role: "user".to_string(),
            verified: true,
        };
        let response = update_me(
            Extension(pool),
            Some(Extension(user)),
            Some(Json(ProfilePatch::default())),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }
}
