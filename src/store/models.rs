//! Data models for broker storage

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique user identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub u64);

/// Unique sign-in session identifier; also the bearer value carried in the
/// client's session cookie
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

/// A user account
///
/// Owned by the (out-of-scope) registration flow; the OTP core only ever
/// reads these.
#[derive(Debug, Clone)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub name: Option<String>,
    pub verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A pending-or-completed sign-in attempt
#[derive(Debug, Clone)]
pub struct OtpSession {
    pub id: SessionId,
    pub user_id: UserId,
    /// Current passcode; blank once the session is signed in and never
    /// compared again after that
    pub token: String,
    pub signed_in: bool,
    /// Wrong-code submissions so far; the session is deleted when this
    /// reaches the ceiling
    pub attempt_count: u32,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    /// Drives resend throttling
    pub updated_at: DateTime<Utc>,
}

/// An ancillary named counter, independent of auth; exists to exercise the
/// retry wrapper against an operation with a visible side effect
#[derive(Debug, Clone)]
pub struct Counter {
    pub id: String,
    pub count: i64,
}
