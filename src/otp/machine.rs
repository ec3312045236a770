//! OTP session state machine
//!
//! `NoSession -> PendingVerification -> SignedIn`, with deletion returning
//! the client to `NoSession`. Every transition takes the request instant
//! resolved once by the handler, runs its guards in order, and performs at
//! most one write after all guards pass. A `Failed` store outcome surfaces
//! as [`AuthError::Storage`] without further mutation.

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use super::code::{generate_code, is_valid_shape};
use crate::email::EmailSender;
use crate::error::AuthError;
use crate::store::{
    Backend, Faults, OtpSession, Outcome, ResilientStore, SessionId, StoreError, User,
};

/// How long an issued code stays valid
pub const CODE_TTL_MS: i64 = 15 * 60 * 1000;
/// Lifetime of a signed-in (remembered) session
pub const SIGNED_IN_TTL_MS: i64 = 6 * 30 * 24 * 60 * 60 * 1000;
/// Minimum wait between consecutive resends
pub const RESEND_COOLDOWN_MS: i64 = 30 * 1000;
/// Wrong-code ceiling; reaching it deletes the session
pub const MAX_ATTEMPTS: u32 = 3;

#[derive(Debug)]
pub enum StartOutcome {
    /// A pending session was created and the code dispatched
    Created(OtpSession),
    /// No account for this email; the handler renders the same generic
    /// response as `Created` so account existence is not revealed
    UnknownEmail,
}

#[derive(Debug)]
pub enum AwaitOutcome {
    Pending { email: String },
    AlreadySignedIn,
}

#[derive(Debug)]
pub enum VerifyOutcome {
    SignedIn(OtpSession),
    /// Wrong code, ceiling not yet reached; the session survives
    InvalidCode { attempts_left: u32 },
}

fn is_valid_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && !domain.is_empty() && !email.contains(char::is_whitespace)
        }
        None => false,
    }
}

fn require_valid_email(email: &str) -> Result<(), AuthError> {
    if is_valid_email(email) {
        Ok(())
    } else {
        Err(AuthError::Validation("Invalid email address".to_string()))
    }
}

/// Session validity is strict: the session is live only while
/// `now < expires_at`.
fn is_expired(session: &OtpSession, now: DateTime<Utc>) -> bool {
    !(now < session.expires_at)
}

/// Deletes the session, then returns `err`. A failed delete is logged and
/// swallowed; the caller's error already forces the client back to start.
async fn delete_and_fail<B: Backend>(
    store: &ResilientStore<B>,
    session_id: &SessionId,
    err: AuthError,
) -> AuthError {
    if let Outcome::Failed(e) = store.delete_session(session_id, Faults::NONE).await {
        tracing::warn!("failed to delete invalidated session: {}", e);
    }
    err
}

/// Resolves the session's owner and checks the resubmitted email against
/// it. Any mismatch or missing owner deletes the session: the cookie no
/// longer matches what the user thinks they are signing in to.
async fn resolve_owner<B: Backend>(
    store: &ResilientStore<B>,
    session: &OtpSession,
    email: &str,
) -> Result<User, AuthError> {
    let user = match store.find_user(session.user_id, Faults::NONE).await {
        Outcome::Found(user) => user,
        Outcome::NotFound => {
            return Err(delete_and_fail(store, &session.id, AuthError::Flow).await)
        }
        Outcome::Failed(err) => return Err(AuthError::Storage(err)),
    };

    if user.email != email.to_lowercase() {
        return Err(delete_and_fail(store, &session.id, AuthError::Flow).await);
    }

    Ok(user)
}

/// `NoSession -> PendingVerification`
///
/// Looks up the user, creates a pending session with a fresh code and a
/// 15-minute expiry, and dispatches the code. Delivery failure deletes the
/// session so no undeliverable session lingers.
pub async fn start<B: Backend, E: EmailSender>(
    store: &ResilientStore<B>,
    sender: &E,
    now: DateTime<Utc>,
    email: &str,
) -> Result<StartOutcome, AuthError> {
    require_valid_email(email)?;

    let user = match store.find_user_by_email(email, Faults::NONE).await {
        Outcome::Found(user) => user,
        Outcome::NotFound => return Ok(StartOutcome::UnknownEmail),
        Outcome::Failed(err) => return Err(AuthError::Storage(err)),
    };

    let code = generate_code();
    let session = OtpSession {
        id: SessionId(Uuid::new_v4().to_string()),
        user_id: user.id,
        token: code.clone(),
        signed_in: false,
        attempt_count: 0,
        expires_at: now + Duration::milliseconds(CODE_TTL_MS),
        created_at: now,
        updated_at: now,
    };

    let session = match store.create_session(session, Faults::NONE).await {
        Outcome::Found(session) => session,
        // Creates always yield a value; treat anything else as degradation
        Outcome::NotFound => return Err(AuthError::Storage(StoreError("create returned no row".to_string()))),
        Outcome::Failed(err) => return Err(AuthError::Storage(err)),
    };

    if let Err(reason) = sender.send_code(&user.email, &code) {
        return Err(delete_and_fail(store, &session.id, AuthError::Delivery(reason)).await);
    }

    tracing::info!(user_id = user.id.0, "sign-in started");
    Ok(StartOutcome::Created(session))
}

/// Idempotent read of where the flow stands
pub async fn status<B: Backend>(
    store: &ResilientStore<B>,
    now: DateTime<Utc>,
    session_id: Option<&SessionId>,
) -> Result<AwaitOutcome, AuthError> {
    let session_id = session_id.ok_or(AuthError::Flow)?;

    let session = match store.find_session(session_id, Faults::NONE).await {
        Outcome::Found(session) => session,
        Outcome::NotFound => return Err(AuthError::Flow),
        Outcome::Failed(err) => return Err(AuthError::Storage(err)),
    };

    if is_expired(&session, now) {
        return Err(delete_and_fail(store, &session.id, AuthError::Expired).await);
    }

    if session.signed_in {
        return Ok(AwaitOutcome::AlreadySignedIn);
    }

    let email = match store.find_user(session.user_id, Faults::NONE).await {
        Outcome::Found(user) => user.email,
        Outcome::NotFound => {
            return Err(delete_and_fail(store, &session.id, AuthError::Flow).await)
        }
        Outcome::Failed(err) => return Err(AuthError::Storage(err)),
    };

    Ok(AwaitOutcome::Pending { email })
}

/// `PendingVerification -> SignedIn`, or stay pending, or delete
///
/// Guard order: session exists, not expired, owner resolvable, email
/// matches owner. Only then is the code compared.
pub async fn verify<B: Backend>(
    store: &ResilientStore<B>,
    now: DateTime<Utc>,
    session_id: Option<&SessionId>,
    email: &str,
    code: &str,
) -> Result<VerifyOutcome, AuthError> {
    require_valid_email(email)?;
    if !is_valid_shape(code) {
        return Err(AuthError::Validation("Code must be six digits".to_string()));
    }

    let session_id = session_id.ok_or(AuthError::Flow)?;

    let mut session = match store.find_session(session_id, Faults::NONE).await {
        Outcome::Found(session) => session,
        Outcome::NotFound => return Err(AuthError::Flow),
        Outcome::Failed(err) => return Err(AuthError::Storage(err)),
    };

    if is_expired(&session, now) {
        return Err(delete_and_fail(store, &session.id, AuthError::Expired).await);
    }

    let user = resolve_owner(store, &session, email).await?;

    // A signed-in session's token is blank and must never be compared
    if session.signed_in {
        return Ok(VerifyOutcome::SignedIn(session));
    }

    if code != session.token {
        session.attempt_count += 1;
        if session.attempt_count >= MAX_ATTEMPTS {
            return Err(delete_and_fail(store, &session.id, AuthError::AttemptsExceeded).await);
        }
        // updated_at is left alone: a failed attempt must not push the
        // resend cooldown out
        let attempts_left = MAX_ATTEMPTS - session.attempt_count;
        return match store.update_session(&session, Faults::NONE).await {
            Outcome::Found(_) => Ok(VerifyOutcome::InvalidCode { attempts_left }),
            Outcome::NotFound => Err(AuthError::Flow),
            Outcome::Failed(err) => Err(AuthError::Storage(err)),
        };
    }

    session.signed_in = true;
    session.token = String::new();
    session.attempt_count = 0;
    session.expires_at = now + Duration::milliseconds(SIGNED_IN_TTL_MS);
    session.updated_at = now;

    match store.update_session(&session, Faults::NONE).await {
        Outcome::Found(session) => {
            tracing::info!(user_id = user.id.0, "sign-in completed");
            Ok(VerifyOutcome::SignedIn(session))
        }
        Outcome::NotFound => Err(AuthError::Flow),
        Outcome::Failed(err) => Err(AuthError::Storage(err)),
    }
}

/// `PendingVerification -> PendingVerification`, code rotated
///
/// Guard order: session exists, not expired, cooldown elapsed, owner
/// resolvable and email matches. Delivery failure deletes the session so
/// the user is never stuck waiting for a code that was never sent.
pub async fn resend<B: Backend, E: EmailSender>(
    store: &ResilientStore<B>,
    sender: &E,
    now: DateTime<Utc>,
    session_id: Option<&SessionId>,
    email: &str,
) -> Result<OtpSession, AuthError> {
    require_valid_email(email)?;

    let session_id = session_id.ok_or(AuthError::Flow)?;

    let mut session = match store.find_session(session_id, Faults::NONE).await {
        Outcome::Found(session) => session,
        Outcome::NotFound => return Err(AuthError::Flow),
        Outcome::Failed(err) => return Err(AuthError::Storage(err)),
    };

    if is_expired(&session, now) {
        return Err(delete_and_fail(store, &session.id, AuthError::Expired).await);
    }

    let elapsed_ms = (now - session.updated_at).num_milliseconds();
    if elapsed_ms < RESEND_COOLDOWN_MS {
        let remaining_ms = RESEND_COOLDOWN_MS - elapsed_ms;
        // Whole seconds, rounded up, so the client never retries early
        let wait_seconds = (remaining_ms + 999) / 1000;
        return Err(AuthError::Throttled { wait_seconds });
    }

    let user = resolve_owner(store, &session, email).await?;

    let code = generate_code();
    session.token = code.clone();
    session.expires_at = now + Duration::milliseconds(CODE_TTL_MS);
    session.updated_at = now;

    let session = match store.update_session(&session, Faults::NONE).await {
        Outcome::Found(session) => session,
        Outcome::NotFound => return Err(AuthError::Flow),
        Outcome::Failed(err) => return Err(AuthError::Storage(err)),
    };

    if let Err(reason) = sender.send_code(&user.email, &code) {
        return Err(delete_and_fail(store, &session.id, AuthError::Delivery(reason)).await);
    }

    Ok(session)
}

/// `PendingVerification | SignedIn -> Deleted`
///
/// Never fails: with no session pointer it is a no-op, and a failed delete
/// is swallowed. The handler clears the client's references regardless.
pub async fn cancel<B: Backend>(store: &ResilientStore<B>, session_id: Option<&SessionId>) {
    if let Some(session_id) = session_id {
        if let Outcome::Failed(err) = store.delete_session(session_id, Faults::NONE).await {
            tracing::warn!("failed to delete session on cancel: {}", err);
        }
    }
}
