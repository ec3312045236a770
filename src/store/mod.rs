//! Storage abstractions for the broker
//!
//! Every persistence operation goes through [`ResilientStore`], which wraps
//! the underlying [`Backend`] call in bounded retry-with-backoff and
//! classifies the result as [`Outcome::Found`], [`Outcome::NotFound`] or
//! [`Outcome::Failed`]. Callers never observe a raw backend error.

pub mod memory;
pub mod models;

pub use memory::MemoryBackend;
pub use models::*;

use std::time::Duration;

use thiserror::Error;

/// Error carried by [`Outcome::Failed`] once the retry budget is exhausted
#[derive(Debug, Clone, Error)]
#[error("storage backend error: {0}")]
pub struct StoreError(pub String);

/// Three-way outcome of a resilient storage operation
#[derive(Debug)]
pub enum Outcome<T> {
    /// The operation succeeded and returned a value
    Found(T),
    /// The operation succeeded but matched no row
    NotFound,
    /// All retries exhausted; carries the last error
    Failed(StoreError),
}

impl<T> Outcome<T> {
    /// Returns the value for `Found`, discarding the other variants.
    pub fn found(self) -> Option<T> {
        match self {
            Outcome::Found(v) => Some(v),
            _ => None,
        }
    }
}

/// Explicit, opt-in failure injection: fail this many attempts before
/// letting the underlying operation run. Test-only; every production call
/// site passes [`Faults::NONE`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Faults(pub u32);

impl Faults {
    pub const NONE: Faults = Faults(0);
}

/// Bounded retry with doubling backoff
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(20),
        }
    }
}

/// Runs `op` under `policy`, classifying the result three ways.
///
/// Injected faults consume an attempt *before* `op` runs, so a retried
/// success applies its side effect exactly once. `op` is only re-invoked
/// after a failed attempt, never after a confirmed success.
pub(crate) async fn retry<T, F>(policy: &RetryPolicy, faults: Faults, mut op: F) -> Outcome<T>
where
    F: FnMut() -> Result<Option<T>, StoreError>,
{
    let mut remaining_faults = faults.0;
    let mut delay = policy.base_delay;
    let mut last_err = StoreError("no attempts made".to_string());

    for attempt in 1..=policy.max_attempts {
        let result = if remaining_faults > 0 {
            remaining_faults -= 1;
            Err(StoreError("injected failure".to_string()))
        } else {
            op()
        };

        match result {
            Ok(Some(value)) => return Outcome::Found(value),
            Ok(None) => return Outcome::NotFound,
            Err(err) => {
                last_err = err;
                if attempt < policy.max_attempts {
                    tracing::warn!(attempt, error = %last_err, "storage operation failed, retrying");
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                }
            }
        }
    }

    tracing::error!(error = %last_err, "storage operation failed, retry budget exhausted");
    Outcome::Failed(last_err)
}

/// Trait for the underlying persistence primitives
///
/// Methods return `Ok(None)` when no matching row exists; errors are
/// treated as transient and retried by [`ResilientStore`].
pub trait Backend: Send + Sync {
    fn insert_user(
        &self,
        email: &str,
        name: Option<&str>,
        verified: bool,
    ) -> Result<User, StoreError>;

    fn find_user(&self, user_id: UserId) -> Result<Option<User>, StoreError>;

    /// Most recently touched session owned by the user, if any
    fn find_session_for_user(&self, user_id: UserId) -> Result<Option<OtpSession>, StoreError>;

    fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// Deletes a user and cascades to every session the user owns
    fn delete_user(&self, user_id: UserId) -> Result<Option<()>, StoreError>;

    fn insert_session(&self, session: OtpSession) -> Result<OtpSession, StoreError>;

    fn find_session(&self, session_id: &SessionId) -> Result<Option<OtpSession>, StoreError>;

    /// Replaces the stored row; `Ok(None)` when the session no longer exists
    fn update_session(&self, session: &OtpSession) -> Result<Option<OtpSession>, StoreError>;

    fn delete_session(&self, session_id: &SessionId) -> Result<Option<()>, StoreError>;

    /// Returns the number of sessions removed
    fn delete_sessions_for_user(&self, user_id: UserId) -> Result<u64, StoreError>;

    /// Creates the counter at 1 when absent; returns the new count
    fn increment_counter(&self, counter_id: &str) -> Result<i64, StoreError>;

    fn find_counter(&self, counter_id: &str) -> Result<Option<Counter>, StoreError>;
}

/// Retry-wrapped persistence access
///
/// Each method takes an explicit [`Faults`] parameter (the test-only
/// failure-injection hook) and returns an [`Outcome`].
pub struct ResilientStore<B: Backend> {
    backend: B,
    policy: RetryPolicy,
}

impl<B: Backend> ResilientStore<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            policy: RetryPolicy::default(),
        }
    }

    pub fn with_policy(backend: B, policy: RetryPolicy) -> Self {
        Self { backend, policy }
    }

    /// Direct access to the backend, for test seeding
    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub async fn create_user(
        &self,
        email: &str,
        name: Option<&str>,
        verified: bool,
        faults: Faults,
    ) -> Outcome<User> {
        retry(&self.policy, faults, || {
            self.backend.insert_user(email, name, verified).map(Some)
        })
        .await
    }

    pub async fn find_user(&self, user_id: UserId, faults: Faults) -> Outcome<User> {
        retry(&self.policy, faults, || self.backend.find_user(user_id)).await
    }

    pub async fn find_session_for_user(&self, user_id: UserId, faults: Faults) -> Outcome<OtpSession> {
        retry(&self.policy, faults, || {
            self.backend.find_session_for_user(user_id)
        })
        .await
    }

    pub async fn find_user_by_email(&self, email: &str, faults: Faults) -> Outcome<User> {
        retry(&self.policy, faults, || {
            self.backend.find_user_by_email(email)
        })
        .await
    }

    pub async fn delete_user(&self, user_id: UserId, faults: Faults) -> Outcome<()> {
        retry(&self.policy, faults, || self.backend.delete_user(user_id)).await
    }

    pub async fn create_session(&self, session: OtpSession, faults: Faults) -> Outcome<OtpSession> {
        retry(&self.policy, faults, || {
            self.backend.insert_session(session.clone()).map(Some)
        })
        .await
    }

    pub async fn find_session(&self, session_id: &SessionId, faults: Faults) -> Outcome<OtpSession> {
        retry(&self.policy, faults, || {
            self.backend.find_session(session_id)
        })
        .await
    }

    pub async fn update_session(&self, session: &OtpSession, faults: Faults) -> Outcome<OtpSession> {
        retry(&self.policy, faults, || {
            self.backend.update_session(session)
        })
        .await
    }

    pub async fn delete_session(&self, session_id: &SessionId, faults: Faults) -> Outcome<()> {
        retry(&self.policy, faults, || {
            self.backend.delete_session(session_id)
        })
        .await
    }

    pub async fn delete_sessions_for_user(&self, user_id: UserId, faults: Faults) -> Outcome<u64> {
        retry(&self.policy, faults, || {
            self.backend.delete_sessions_for_user(user_id).map(Some)
        })
        .await
    }

    pub async fn increment_counter(&self, counter_id: &str, faults: Faults) -> Outcome<i64> {
        retry(&self.policy, faults, || {
            self.backend.increment_counter(counter_id).map(Some)
        })
        .await
    }

    pub async fn find_counter(&self, counter_id: &str, faults: Faults) -> Outcome<Counter> {
        retry(&self.policy, faults, || {
            self.backend.find_counter(counter_id)
        })
        .await
    }
}
