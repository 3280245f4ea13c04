//! Signed bearer tokens binding an identity to an expiry.
//!
//! Tokens are HS256 `JWTs` whose subject is the account email. The signing
//! key is derived once at startup: the operator secret is used as raw bytes
//! when long enough, otherwise its base64 decoding is tried; a key below the
//! HMAC-SHA256 security margin aborts startup.
//!
//! Decode helpers verify the signature but tolerate an elapsed expiry, so the
//! authentication gate can resolve a subject first and reject staleness
//! second. No parse or signature failure escapes this module: malformed
//! tokens collapse to `None`/`false`.

use anyhow::{Context, Result};
use base64::{Engine, engine::general_purpose::STANDARD};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Minimum key material for HMAC-SHA256.
pub const MIN_KEY_BYTES: usize = 32;

#[derive(Debug, Error)]
pub enum KeyError {
    #[error("signing secret is not configured")]
    NotConfigured,
    #[error(
        "signing secret too short: {raw} raw bytes, {decoded} base64-decoded bytes (need at least {MIN_KEY_BYTES})"
    )]
    TooShort { raw: usize, decoded: usize },
    #[error("signing secret too short ({raw} bytes) and not valid base64")]
    NotBase64 { raw: usize },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

/// Issues and validates HS256 bearer tokens.
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validity: Duration,
}

impl TokenService {
    /// Derive the signing key from the operator secret and fix the validity
    /// window.
    ///
    /// # Errors
    ///
    /// Returns a [`KeyError`] when neither the raw secret nor its base64
    /// decoding provides enough key material. Callers must treat this as
    /// fatal configuration and refuse to start.
    pub fn new(secret: &SecretString, validity_hours: i64) -> Result<Self, KeyError> {
        let key_bytes = derive_key_bytes(secret.expose_secret())?;
        Ok(Self {
            encoding: EncodingKey::from_secret(&key_bytes),
            decoding: DecodingKey::from_secret(&key_bytes),
            validity: Duration::hours(validity_hours),
        })
    }

    #[must_use]
    pub fn validity_seconds(&self) -> i64 {
        self.validity.num_seconds()
    }

    /// Sign a token for the given account email.
    ///
    /// # Errors
    ///
    /// Returns an error if claim serialization or signing fails.
    pub fn issue(&self, email: &str) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: email.to_string(),
            iat: now.timestamp(),
            exp: (now + self.validity).timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding).context("failed to sign token")
    }

    /// True only when the signature verifies, the subject matches the
    /// expected identity, and the token has not expired.
    #[must_use]
    pub fn validate(&self, token: &str, expected_email: &str) -> bool {
        match self.decode_claims(token) {
            Some(claims) => claims.sub == expected_email && !expired(&claims),
            None => false,
        }
    }

    /// Subject of a well-signed token, expired or not. `None` for anything
    /// malformed or forged.
    #[must_use]
    pub fn extract_subject(&self, token: &str) -> Option<String> {
        self.decode_claims(token).map(|claims| claims.sub)
    }

    /// Expiry instant of a well-signed token. `None` for anything malformed
    /// or forged.
    #[must_use]
    pub fn extract_expiry(&self, token: &str) -> Option<DateTime<Utc>> {
        self.decode_claims(token)
            .and_then(|claims| DateTime::from_timestamp(claims.exp, 0))
    }

    fn decode_claims(&self, token: &str) -> Option<Claims> {
        // Expiry is checked by callers so subjects of stale tokens stay
        // readable; the signature check is never skipped.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .ok()
    }
}

fn expired(claims: &Claims) -> bool {
    match DateTime::from_timestamp(claims.exp, 0) {
        Some(expiry) => expiry < Utc::now(),
        None => true,
    }
}

fn derive_key_bytes(secret: &str) -> Result<Vec<u8>, KeyError> {
    if secret.trim().is_empty() {
        return Err(KeyError::NotConfigured);
    }

    let raw = secret.as_bytes();
    if raw.len() >= MIN_KEY_BYTES {
        return Ok(raw.to_vec());
    }

    // Short raw secrets may be base64 for compact distribution; use the
    // decoded bytes when they are long enough.
    match STANDARD.decode(secret) {
        Ok(decoded) if decoded.len() >= MIN_KEY_BYTES => Ok(decoded),
        Ok(decoded) => Err(KeyError::TooShort {
            raw: raw.len(),
            decoded: decoded.len(),
        }),
        Err(_) => Err(KeyError::NotBase64 { raw: raw.len() }),
    }
}
