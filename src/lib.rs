//! # FinSight Auth (Credential & Token Lifecycle)
//!
//! `finsight-auth` authenticates end users of the FinSight personal-finance
//! platform and brokers short-lived proofs of identity between its services.
//!
//! ## One-time passcodes
//!
//! Six-digit numeric codes back two independent flows: email verification and
//! password reset. Each purpose has its own TTL and its own column pair on the
//! identity record; a code is single-use and is cleared either by a successful
//! consume or by the first consume attempt after expiry.
//!
//! ## Bearer tokens
//!
//! Logins mint HS256-signed tokens whose subject is the account email. The
//! signing key comes from operator configuration: raw secret bytes when long
//! enough, otherwise their base64 decoding, otherwise startup fails before the
//! listener binds.
//!
//! ## Request authentication
//!
//! A per-request gate resolves `Authorization: Bearer` headers (or the session
//! cookie) into a request-scoped identity. The gate never rejects a request
//! itself: unauthenticated traffic flows through anonymously and route-level
//! policy decides what an absent identity means.
//!
//! ## Storage
//!
//! All mutable state lives in `PostgreSQL` (see `db/sql/`). OTP consumption
//! and password updates are conditional single-statement UPDATEs, so two
//! concurrent requests presenting the same still-valid code cannot both
//! succeed.

pub mod api;
pub mod cli;
