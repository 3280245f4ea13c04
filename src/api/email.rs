//! Outbound notification abstractions.
//!
//! OTP issuance and registration hand codes to a [`Mailer`]; the trait
//! decides how to deliver (SMTP, provider API, etc.). Delivery transport is
//! owned by the platform's notification service, so the default here is
//! [`LogMailer`], which logs and returns `Ok(())` for local development.

use anyhow::Result;
use tracing::info;

/// Email delivery abstraction used by the OTP and registration flows.
pub trait Mailer: Send + Sync {
    /// Deliver an account-verification code or return an error.
    fn send_verification_code(&self, email: &str, code: &str) -> Result<()>;

    /// Deliver a password-reset code or return an error.
    fn send_reset_code(&self, email: &str, code: &str) -> Result<()>;

    /// Deliver the post-registration welcome message. Callers treat failures
    /// as log-and-continue.
    fn send_welcome(&self, email: &str, name: &str) -> Result<()>;
}

/// Local dev sender that logs the payload instead of sending real email.
#[derive(Clone, Debug)]
pub struct LogMailer;

impl Mailer for LogMailer {
    fn send_verification_code(&self, email: &str, code: &str) -> Result<()> {
        info!(to_email = %email, code = %code, "verification code send stub");
        Ok(())
    }

    fn send_reset_code(&self, email: &str, code: &str) -> Result<()> {
        info!(to_email = %email, code = %code, "reset code send stub");
        Ok(())
    }

    fn send_welcome(&self, email: &str, name: &str) -> Result<()> {
        info!(to_email = %email, name = %name, "welcome email send stub");
        Ok(())
    }
}
