//! Request/response types for auth endpoints.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct RegisterResponse {
    pub id: String,
    pub email: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginResponse {
    pub email: String,
    pub token: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct SendOtpRequest {
    pub email: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct VerifyOtpRequest {
    pub email: String,
    pub otp: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ResetPasswordRequest {
    pub email: String,
    pub otp: String,
    #[serde(rename = "newPassword")]
    pub new_password: String,
}

/// Typed patch for profile updates: only fields present in the request body
/// are applied, everything else is left untouched.
#[derive(ToSchema, Serialize, Deserialize, Debug, Default)]
pub struct ProfilePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferences: Option<serde_json::Value>,
}

impl ProfilePatch {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.full_name.is_none() && self.avatar_url.is_none() && self.preferences.is_none()
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ProfileResponse {
    pub id: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    pub role: String,
    pub verified: bool,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct OkResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl OkResponse {
    #[must_use]
    pub fn new() -> Self {
        Self {
            success: true,
            message: None,
        }
    }

    #[must_use]
    pub fn with_message(message: &str) -> Self {
        Self {
            success: true,
            message: Some(message.to_string()),
        }
    }
}

impl Default for OkResponse {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ErrorResponse {
    pub error: bool,
    pub message: String,
}

impl ErrorResponse {
    #[must_use]
    pub fn new(message: &str) -> Self {
        Self {
            error: true,
            message: message.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Context, Result};

    #[test]
    fn reset_password_request_uses_camel_case_password() -> Result<()> {
        let request: ResetPasswordRequest = serde_json::from_value(serde_json::json!({
            "email": "user@example.com",
            "otp": "482913",
            "newPassword": "newpass123",
        }))?;
        assert_eq!(request.new_password, "newpass123");

        let value = serde_json::to_value(&request)?;
        assert!(value.get("newPassword").is_some());
        assert!(value.get("new_password").is_none());
        Ok(())
    }

    #[test]
    fn profile_patch_absent_fields_stay_none() -> Result<()> {
        let patch: ProfilePatch = serde_json::from_value(serde_json::json!({
            "avatar_url": "https://cdn.finsight.dev/a.png",
        }))?;
        assert!(patch.full_name.is_none());
        assert_eq!(
            patch.avatar_url.as_deref(),
            Some("https://cdn.finsight.dev/a.png")
        );
        assert!(patch.preferences.is_none());
        assert!(!patch.is_empty());

        let empty: ProfilePatch = serde_json::from_value(serde_json::json!({}))?;
        assert!(empty.is_empty());
        Ok(())
    }

    #[test]
    fn ok_response_omits_absent_message() -> Result<()> {
        let value = serde_json::to_value(OkResponse::new())?;
        assert!(value.get("message").is_none());

        let value = serde_json::to_value(OkResponse::with_message("Logged out"))?;
        let message = value
            .get("message")
            .and_then(serde_json::Value::as_str)
            .context("missing message")?;
        assert_eq!(message, "Logged out");
        Ok(())
    }

    #[test]
    fn error_response_round_trips() -> Result<()> {
        let value = serde_json::to_value(ErrorResponse::new("Invalid OTP"))?;
        let decoded: ErrorResponse = serde_json::from_value(value)?;
        assert!(decoded.error);
        assert_eq!(decoded.message, "Invalid OTP");
        Ok(())
    }
}
