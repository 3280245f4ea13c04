//! Database operations for identity records.
//!
//! Every mutation that consumes a one-time code or counts a login failure is
//! a single conditional UPDATE keyed on the current column values. Postgres
//! serializes row updates, so of two requests racing to consume the same
//! still-valid code exactly one sees its WHERE clause match.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Row};
use tracing::Instrument;
use uuid::Uuid;

use super::otp::OtpPurpose;
use super::types::ProfilePatch;
use super::utils::is_unique_violation;

const USER_COLUMNS: &str = "id, email, full_name, password_hash, role, verified, enabled, \
     verify_otp, verify_otp_expires_at, reset_otp, reset_otp_expires_at, \
     failed_login_attempts, locked_until, last_login_at, avatar_url, preferences, \
     created_at, updated_at";

/// One durable identity record, as stored.
#[derive(Debug, Clone, FromRow)]
pub struct UserRecord {
    pub id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
    pub password_hash: String,
    pub role: String,
    pub verified: bool,
    pub enabled: bool,
    pub verify_otp: Option<String>,
    pub verify_otp_expires_at: Option<DateTime<Utc>>,
    pub reset_otp: Option<String>,
    pub reset_otp_expires_at: Option<DateTime<Utc>>,
    pub failed_login_attempts: i32,
    pub locked_until: Option<DateTime<Utc>>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub avatar_url: Option<String>,
    pub preferences: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserRecord {
    /// True while a lockout window is still open.
    #[must_use]
    pub fn locked(&self, now: DateTime<Utc>) -> bool {
        self.locked_until.is_some_and(|until| until > now)
    }
}

/// Outcome when attempting to create a new identity.
#[derive(Debug)]
pub(super) enum RegisterOutcome {
    Created(Box<UserRecord>),
    Conflict,
}

/// Outcome of a conditional OTP consume.
#[derive(Debug, PartialEq, Eq)]
pub(super) enum ConsumeOutcome {
    Consumed,
    NoMatch,
    Expired,
    NotFound,
}

pub(super) async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<UserRecord>> {
    let query = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = %query
    );
    sqlx::query_as::<_, UserRecord>(&query)
        .bind(email)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup user by email")
}

pub(super) async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<UserRecord>> {
    let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = %query
    );
    sqlx::query_as::<_, UserRecord>(&query)
        .bind(id)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup user by id")
}

pub(super) async fn exists_by_email(pool: &PgPool, email: &str) -> Result<bool> {
    let query = "SELECT 1 AS present FROM users WHERE email = $1 LIMIT 1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(email)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to check email existence")?;
    Ok(row.is_some())
}

/// Insert a new identity. Uniqueness is enforced by the database constraint,
/// not a prior read, so two concurrent registrations with the same email
/// resolve to exactly one `Created`.
pub(super) async fn insert_user(
    pool: &PgPool,
    email: &str,
    full_name: Option<&str>,
    password_hash: &str,
) -> Result<RegisterOutcome> {
    let query = format!(
        "INSERT INTO users (email, full_name, password_hash) VALUES ($1, $2, $3) \
         RETURNING {USER_COLUMNS}"
    );
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = %query
    );
    let row = sqlx::query_as::<_, UserRecord>(&query)
        .bind(email)
        .bind(full_name)
        .bind(password_hash)
        .fetch_one(pool)
        .instrument(span)
        .await;

    match row {
        Ok(user) => Ok(RegisterOutcome::Created(Box::new(user))),
        Err(err) if is_unique_violation(&err) => Ok(RegisterOutcome::Conflict),
        Err(err) => Err(err).context("failed to insert user"),
    }
}

/// Store a fresh code for the purpose, replacing any pending one. Expiry is
/// computed server-side so a single clock decides all TTL comparisons.
pub(super) async fn store_otp(
    pool: &PgPool,
    user_id: Uuid,
    purpose: OtpPurpose,
    code: &str,
    ttl_seconds: i64,
) -> Result<()> {
    let query = match purpose {
        OtpPurpose::Verify => {
            "UPDATE users SET verify_otp = $2, \
             verify_otp_expires_at = NOW() + ($3 * INTERVAL '1 second'), \
             updated_at = NOW() WHERE id = $1"
        }
        OtpPurpose::Reset => {
            "UPDATE users SET reset_otp = $2, \
             reset_otp_expires_at = NOW() + ($3 * INTERVAL '1 second'), \
             updated_at = NOW() WHERE id = $1"
        }
    };
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(user_id)
        .bind(code)
        .bind(ttl_seconds)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to store OTP")?;
    Ok(())
}

/// Consume a VERIFY code. The success path is one conditional UPDATE that
/// marks the account verified and clears the pair; losing racers fall through
/// to the diagnosis below.
pub(super) async fn consume_verify_otp(
    pool: &PgPool,
    email: &str,
    code: &str,
) -> Result<ConsumeOutcome> {
    let query = "UPDATE users SET verified = TRUE, verify_otp = NULL, \
         verify_otp_expires_at = NULL, updated_at = NOW() \
         WHERE email = $1 AND verify_otp = $2 AND verify_otp_expires_at > NOW() \
         RETURNING id";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(email)
        .bind(code)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to consume verify OTP")?;

    if row.is_some() {
        return Ok(ConsumeOutcome::Consumed);
    }

    diagnose_failed_consume(pool, email, code, OtpPurpose::Verify).await
}

/// Consume a RESET code and install the new password hash in the same
/// statement; lockout state resets with the password.
pub(super) async fn consume_reset_otp(
    pool: &PgPool,
    email: &str,
    code: &str,
    new_password_hash: &str,
) -> Result<ConsumeOutcome> {
    let query = "UPDATE users SET password_hash = $3, reset_otp = NULL, \
         reset_otp_expires_at = NULL, failed_login_attempts = 0, locked_until = NULL, \
         updated_at = NOW() \
         WHERE email = $1 AND reset_otp = $2 AND reset_otp_expires_at > NOW() \
         RETURNING id";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(email)
        .bind(code)
        .bind(new_password_hash)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to consume reset OTP")?;

    if row.is_some() {
        return Ok(ConsumeOutcome::Consumed);
    }

    diagnose_failed_consume(pool, email, code, OtpPurpose::Reset).await
}

/// Classify a consume whose conditional UPDATE matched nothing, clearing the
/// pair when the code was right but stale so the same value cannot be retried
/// forever.
async fn diagnose_failed_consume(
    pool: &PgPool,
    email: &str,
    code: &str,
    purpose: OtpPurpose,
) -> Result<ConsumeOutcome> {
    let (select, clear) = match purpose {
        OtpPurpose::Verify => (
            "SELECT verify_otp AS otp FROM users WHERE email = $1",
            "UPDATE users SET verify_otp = NULL, verify_otp_expires_at = NULL, \
             updated_at = NOW() WHERE email = $1 AND verify_otp = $2",
        ),
        OtpPurpose::Reset => (
            "SELECT reset_otp AS otp FROM users WHERE email = $1",
            "UPDATE users SET reset_otp = NULL, reset_otp_expires_at = NULL, \
             updated_at = NOW() WHERE email = $1 AND reset_otp = $2",
        ),
    };

    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = select
    );
    let row = sqlx::query(select)
        .bind(email)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to inspect pending OTP")?;

    let Some(row) = row else {
        return Ok(ConsumeOutcome::NotFound);
    };

    let stored: Option<String> = row.get("otp");
    if stored.as_deref() != Some(code) {
        return Ok(ConsumeOutcome::NoMatch);
    }

    // Right code, but the conditional consume refused it: the pair is stale.
    // Clear it (conditionally, in case a concurrent issue already replaced
    // it) and report the expiry.
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = clear
    );
    sqlx::query(clear)
        .bind(email)
        .bind(code)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to clear expired OTP")?;

    Ok(ConsumeOutcome::Expired)
}

/// Count a failed password attempt; crossing the threshold opens a lockout
/// window. Increment and comparison happen in one statement so concurrent
/// failures cannot lose updates.
pub(super) async fn record_login_failure(
    pool: &PgPool,
    email: &str,
    max_attempts: i32,
    lockout_seconds: i64,
) -> Result<()> {
    let query = "UPDATE users SET failed_login_attempts = failed_login_attempts + 1, \
         locked_until = CASE WHEN failed_login_attempts + 1 >= $2 \
             THEN NOW() + ($3 * INTERVAL '1 second') ELSE locked_until END, \
         updated_at = NOW() \
         WHERE email = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(email)
        .bind(max_attempts)
        .bind(lockout_seconds)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to record login failure")?;
    Ok(())
}

pub(super) async fn record_login_success(pool: &PgPool, id: Uuid) -> Result<()> {
    let query = "UPDATE users SET failed_login_attempts = 0, locked_until = NULL, \
         last_login_at = NOW(), updated_at = NOW() WHERE id = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(id)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to record login success")?;
    Ok(())
}

/// Apply only the fields present in the patch; absent fields keep their
/// stored values.
pub(super) async fn apply_profile_patch(
    pool: &PgPool,
    id: Uuid,
    patch: &ProfilePatch,
) -> Result<Option<UserRecord>> {
    let query = format!(
        "UPDATE users SET full_name = COALESCE($2, full_name), \
         avatar_url = COALESCE($3, avatar_url), \
         preferences = COALESCE($4, preferences), \
         updated_at = NOW() WHERE id = $1 RETURNING {USER_COLUMNS}"
    );
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = %query
    );
    sqlx::query_as::<_, UserRecord>(&query)
        .bind(id)
        .bind(patch.full_name.as_deref())
        .bind(patch.avatar_url.as_deref())
        .bind(patch.preferences.as_ref())
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to apply profile patch")
}
