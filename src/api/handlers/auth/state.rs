//! Shared auth state and configuration.

use std::sync::Arc;

use crate::api::email::Mailer;

use super::{otp::OtpGenerator, token::TokenService};

const DEFAULT_TOKEN_VALIDITY_HOURS: i64 = 10;
const DEFAULT_VERIFY_OTP_TTL_SECONDS: i64 = 24 * 60 * 60;
const DEFAULT_RESET_OTP_TTL_SECONDS: i64 = 15 * 60;
const DEFAULT_MIN_PASSWORD_LEN: usize = 8;
const DEFAULT_MAX_FAILED_LOGINS: i32 = 5;
const DEFAULT_LOCKOUT_SECONDS: i64 = 15 * 60;
const DEFAULT_COOKIE_NAME: &str = "jwt";

/// Routes reachable without a token, matched exactly or as a path prefix.
const DEFAULT_PUBLIC_PATHS: [&str; 10] = [
    "/login",
    "/register",
    "/send-otp",
    "/verify-otp",
    "/send-reset-otp",
    "/reset-password",
    "/logout",
    "/live",
    "/ready",
    "/health",
];

#[derive(Clone, Debug)]
pub struct AuthConfig {
    cookie_name: String,
    cookie_path: String,
    cookie_secure: bool,
    base_path: String,
    public_paths: Vec<String>,
    token_validity_hours: i64,
    verify_otp_ttl_seconds: i64,
    reset_otp_ttl_seconds: i64,
    min_password_len: usize,
    max_failed_logins: i32,
    lockout_seconds: i64,
}

impl AuthConfig {
    #[must_use]
    pub fn new() -> Self {
        Self {
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
            cookie_path: "/".to_string(),
            cookie_secure: false,
            base_path: String::new(),
            public_paths: DEFAULT_PUBLIC_PATHS
                .iter()
                .map(ToString::to_string)
                .collect(),
            token_validity_hours: DEFAULT_TOKEN_VALIDITY_HOURS,
            verify_otp_ttl_seconds: DEFAULT_VERIFY_OTP_TTL_SECONDS,
            reset_otp_ttl_seconds: DEFAULT_RESET_OTP_TTL_SECONDS,
            min_password_len: DEFAULT_MIN_PASSWORD_LEN,
            max_failed_logins: DEFAULT_MAX_FAILED_LOGINS,
            lockout_seconds: DEFAULT_LOCKOUT_SECONDS,
        }
    }

    #[must_use]
    pub fn with_cookie_name(mut self, name: String) -> Self {
        self.cookie_name = name;
        self
    }

    #[must_use]
    pub fn with_cookie_path(mut self, path: String) -> Self {
        self.cookie_path = path;
        self
    }

    #[must_use]
    pub fn with_cookie_secure(mut self, secure: bool) -> Self {
        self.cookie_secure = secure;
        self
    }

    #[must_use]
    pub fn with_base_path(mut self, base_path: String) -> Self {
        self.base_path = base_path;
        self
    }

    #[must_use]
    pub fn with_public_paths(mut self, paths: Vec<String>) -> Self {
        self.public_paths = paths;
        self
    }

    #[must_use]
    pub fn with_token_validity_hours(mut self, hours: i64) -> Self {
        self.token_validity_hours = hours;
        self
    }

    #[must_use]
    pub fn with_verify_otp_ttl_seconds(mut self, seconds: i64) -> Self {
        self.verify_otp_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_reset_otp_ttl_seconds(mut self, seconds: i64) -> Self {
        self.reset_otp_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_max_failed_logins(mut self, attempts: i32) -> Self {
        self.max_failed_logins = attempts;
        self
    }

    #[must_use]
    pub fn with_lockout_seconds(mut self, seconds: i64) -> Self {
        self.lockout_seconds = seconds;
        self
    }

    #[must_use]
    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    #[must_use]
    pub fn cookie_path(&self) -> &str {
        &self.cookie_path
    }

    #[must_use]
    pub fn cookie_secure(&self) -> bool {
        self.cookie_secure
    }

    #[must_use]
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    #[must_use]
    pub fn public_paths(&self) -> &[String] {
        &self.public_paths
    }

    #[must_use]
    pub fn token_validity_seconds(&self) -> i64 {
        self.token_validity_hours * 3600
    }

    #[must_use]
    pub fn verify_otp_ttl_seconds(&self) -> i64 {
        self.verify_otp_ttl_seconds
    }

    #[must_use]
    pub fn reset_otp_ttl_seconds(&self) -> i64 {
        self.reset_otp_ttl_seconds
    }

    #[must_use]
    pub fn min_password_len(&self) -> usize {
        self.min_password_len
    }

    #[must_use]
    pub fn max_failed_logins(&self) -> i32 {
        self.max_failed_logins
    }

    #[must_use]
    pub fn lockout_seconds(&self) -> i64 {
        self.lockout_seconds
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self::new()
    }
}

pub struct AuthState {
    config: AuthConfig,
    tokens: TokenService,
    mailer: Arc<dyn Mailer>,
    otp: Arc<dyn OtpGenerator>,
}

impl AuthState {
    pub fn new(
        config: AuthConfig,
        tokens: TokenService,
        mailer: Arc<dyn Mailer>,
        otp: Arc<dyn OtpGenerator>,
    ) -> Self {
        Self {
            config,
            tokens,
            mailer,
            otp,
        }
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    #[must_use]
    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    pub(crate) fn mailer(&self) -> &dyn Mailer {
        self.mailer.as_ref()
    }

    pub(crate) fn otp(&self) -> &dyn OtpGenerator {
        self.otp.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::AuthConfig;

    #[test]
    fn auth_config_defaults_and_overrides() {
        let config = AuthConfig::new();

        assert_eq!(config.cookie_name(), "jwt");
        assert_eq!(config.cookie_path(), "/");
        assert!(!config.cookie_secure());
        assert_eq!(config.base_path(), "");
        assert_eq!(config.token_validity_seconds(), 10 * 3600);
        assert_eq!(
            config.verify_otp_ttl_seconds(),
            super::DEFAULT_VERIFY_OTP_TTL_SECONDS
        );
        assert_eq!(
            config.reset_otp_ttl_seconds(),
            super::DEFAULT_RESET_OTP_TTL_SECONDS
        );
        assert_eq!(config.min_password_len(), 8);
        assert_eq!(config.max_failed_logins(), 5);
        assert_eq!(config.lockout_seconds(), 15 * 60);

        let config = config
            .with_cookie_name("finsight_session".to_string())
            .with_cookie_secure(true)
            .with_base_path("/auth".to_string())
            .with_token_validity_hours(2)
            .with_verify_otp_ttl_seconds(120)
            .with_reset_otp_ttl_seconds(60)
            .with_max_failed_logins(3)
            .with_lockout_seconds(30);

        assert_eq!(config.cookie_name(), "finsight_session");
        assert!(config.cookie_secure());
        assert_eq!(config.base_path(), "/auth");
        assert_eq!(config.token_validity_seconds(), 7200);
        assert_eq!(config.verify_otp_ttl_seconds(), 120);
        assert_eq!(config.reset_otp_ttl_seconds(), 60);
        assert_eq!(config.max_failed_logins(), 3);
        assert_eq!(config.lockout_seconds(), 30);
    }

    #[test]
    fn default_public_paths_cover_the_login_surface() {
        let config = AuthConfig::new();
        for path in ["/login", "/register", "/reset-password", "/health"] {
            assert!(config.public_paths().iter().any(|p| p == path), "{path}");
        }
    }
}
