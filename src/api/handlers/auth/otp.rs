//! One-time passcode lifecycle.
//!
//! Codes are six decimal digits, uniform over `100000..=999999`, issued for
//! one of two independent purposes. Each purpose has its own TTL and its own
//! column pair on the identity record; issuing replaces any pending code of
//! the same purpose. Consumption is delegated to conditional updates in
//! [`super::storage`], so a still-valid code can be consumed exactly once no
//! matter how many requests race for it.

use rand::{Rng, rngs::OsRng};
use sqlx::PgPool;
use tracing::{info, warn};

use super::error::AuthError;
use super::state::{AuthConfig, AuthState};
use super::storage::{self, ConsumeOutcome};

const OTP_MIN: u32 = 100_000;
const OTP_MAX: u32 = 999_999;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OtpPurpose {
    Verify,
    Reset,
}

impl OtpPurpose {
    pub(super) fn ttl_seconds(self, config: &AuthConfig) -> i64 {
        match self {
            Self::Verify => config.verify_otp_ttl_seconds(),
            Self::Reset => config.reset_otp_ttl_seconds(),
        }
    }
}

/// Source of fresh codes. Injected so tests can supply a fixed sequence.
pub trait OtpGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// Default generator backed by the OS entropy source.
#[derive(Clone, Debug)]
pub struct RngOtpGenerator;

impl OtpGenerator for RngOtpGenerator {
    fn generate(&self) -> String {
        OsRng.gen_range(OTP_MIN..=OTP_MAX).to_string()
    }
}

#[derive(Debug, PartialEq, Eq)]
pub(super) enum IssueOutcome {
    Sent,
    AlreadyVerified,
}

/// Generate, store, and send a code for the given purpose.
///
/// Issuing a VERIFY code for an already-verified account is a no-op: no code
/// is generated and no mail goes out. A notification failure is surfaced to
/// the caller, but the stored code stays valid; issuance is not rolled back.
pub(super) async fn issue(
    pool: &PgPool,
    state: &AuthState,
    email: &str,
    purpose: OtpPurpose,
) -> Result<IssueOutcome, AuthError> {
    let Some(user) = storage::find_by_email(pool, email).await? else {
        return Err(AuthError::NotFound);
    };

    if purpose == OtpPurpose::Verify && user.verified {
        info!(email = %user.email, "account already verified; skipping OTP issue");
        return Ok(IssueOutcome::AlreadyVerified);
    }

    let code = state.otp().generate();
    let ttl_seconds = purpose.ttl_seconds(state.config());
    storage::store_otp(pool, user.id, purpose, &code, ttl_seconds).await?;

    let send_result = match purpose {
        OtpPurpose::Verify => state.mailer().send_verification_code(&user.email, &code),
        OtpPurpose::Reset => state.mailer().send_reset_code(&user.email, &code),
    };
    if let Err(err) = send_result {
        warn!(email = %user.email, "failed to send {purpose:?} code: {err}");
        return Err(AuthError::Notification(err));
    }

    info!(email = %user.email, "{purpose:?} OTP sent");
    Ok(IssueOutcome::Sent)
}

/// Consume a VERIFY code: on success the account becomes verified and the
/// pending pair is cleared in the same statement.
pub(super) async fn consume_verify(
    pool: &PgPool,
    email: &str,
    code: &str,
) -> Result<(), AuthError> {
    match storage::consume_verify_otp(pool, email, code).await? {
        ConsumeOutcome::Consumed => Ok(()),
        ConsumeOutcome::NotFound => Err(AuthError::NotFound),
        ConsumeOutcome::Expired => Err(AuthError::Expired),
        ConsumeOutcome::NoMatch => Err(AuthError::InvalidCode),
    }
}

/// Consume a RESET code and install the new password hash atomically with the
/// clear.
pub(super) async fn consume_reset(
    pool: &PgPool,
    email: &str,
    code: &str,
    new_password_hash: &str,
) -> Result<(), AuthError> {
    match storage::consume_reset_otp(pool, email, code, new_password_hash).await? {
        ConsumeOutcome::Consumed => Ok(()),
        ConsumeOutcome::NotFound => Err(AuthError::NotFound),
        ConsumeOutcome::Expired => Err(AuthError::Expired),
        ConsumeOutcome::NoMatch => Err(AuthError::InvalidCode),
    }
}
