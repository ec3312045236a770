//! In-memory storage backend

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use chrono::Utc;

use super::{Backend, Counter, OtpSession, SessionId, StoreError, User, UserId};

/// In-memory backend holding users, sign-in sessions and counters
pub struct MemoryBackend {
    users: RwLock<HashMap<UserId, User>>,
    sessions: RwLock<HashMap<SessionId, OtpSession>>,
    counters: RwLock<HashMap<String, i64>>,
    next_user_id: AtomicU64,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
            sessions: RwLock::new(HashMap::new()),
            counters: RwLock::new(HashMap::new()),
            next_user_id: AtomicU64::new(1),
        }
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for MemoryBackend {
    fn insert_user(
        &self,
        email: &str,
        name: Option<&str>,
        verified: bool,
    ) -> Result<User, StoreError> {
        let normalized = email.to_lowercase();
        let mut users = self.users.write().unwrap();
        if users.values().any(|u| u.email == normalized) {
            return Err(StoreError(format!("email already exists: {normalized}")));
        }
        let now = Utc::now();
        let user = User {
            id: UserId(self.next_user_id.fetch_add(1, Ordering::SeqCst)),
            email: normalized,
            name: name.map(|n| n.to_string()),
            verified,
            created_at: now,
            updated_at: now,
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }

    fn find_user(&self, user_id: UserId) -> Result<Option<User>, StoreError> {
        Ok(self.users.read().unwrap().get(&user_id).cloned())
    }

    fn find_session_for_user(&self, user_id: UserId) -> Result<Option<OtpSession>, StoreError> {
        Ok(self
            .sessions
            .read()
            .unwrap()
            .values()
            .filter(|s| s.user_id == user_id)
            .max_by_key(|s| s.updated_at)
            .cloned())
    }

    fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let normalized = email.to_lowercase();
        Ok(self
            .users
            .read()
            .unwrap()
            .values()
            .find(|u| u.email == normalized)
            .cloned())
    }

    fn delete_user(&self, user_id: UserId) -> Result<Option<()>, StoreError> {
        let removed = self.users.write().unwrap().remove(&user_id);

        // A session cannot outlive its user
        self.sessions
            .write()
            .unwrap()
            .retain(|_, s| s.user_id != user_id);

        Ok(removed.map(|_| ()))
    }

    fn insert_session(&self, session: OtpSession) -> Result<OtpSession, StoreError> {
        self.sessions
            .write()
            .unwrap()
            .insert(session.id.clone(), session.clone());
        Ok(session)
    }

    fn find_session(&self, session_id: &SessionId) -> Result<Option<OtpSession>, StoreError> {
        Ok(self.sessions.read().unwrap().get(session_id).cloned())
    }

    fn update_session(&self, session: &OtpSession) -> Result<Option<OtpSession>, StoreError> {
        let mut sessions = self.sessions.write().unwrap();
        if !sessions.contains_key(&session.id) {
            return Ok(None);
        }
        sessions.insert(session.id.clone(), session.clone());
        Ok(Some(session.clone()))
    }

    fn delete_session(&self, session_id: &SessionId) -> Result<Option<()>, StoreError> {
        Ok(self
            .sessions
            .write()
            .unwrap()
            .remove(session_id)
            .map(|_| ()))
    }

    fn delete_sessions_for_user(&self, user_id: UserId) -> Result<u64, StoreError> {
        let mut sessions = self.sessions.write().unwrap();
        let before = sessions.len();
        sessions.retain(|_, s| s.user_id != user_id);
        Ok((before - sessions.len()) as u64)
    }

    fn increment_counter(&self, counter_id: &str) -> Result<i64, StoreError> {
        let mut counters = self.counters.write().unwrap();
        let count = counters.entry(counter_id.to_string()).or_insert(0);
        *count += 1;
        Ok(*count)
    }

    fn find_counter(&self, counter_id: &str) -> Result<Option<Counter>, StoreError> {
        Ok(self
            .counters
            .read()
            .unwrap()
            .get(counter_id)
            .map(|&count| Counter {
                id: counter_id.to_string(),
                count,
            }))
    }
}
