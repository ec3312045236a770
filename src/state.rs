//! Broker application state

use tower_cookies::Key;

use crate::config::Config;
use crate::email::EmailSender;
use crate::store::{Backend, ResilientStore};

/// Shared state behind every handler
///
/// Generic over the storage backend and email sender so tests can plug in
/// in-memory and capturing implementations.
pub struct AppState<B: Backend, E: EmailSender> {
    pub store: ResilientStore<B>,
    pub email_sender: E,
    /// Key for signing the session and clock offset cookies
    pub cookie_key: Key,
    pub config: Config,
}

impl<B: Backend, E: EmailSender> AppState<B, E> {
    pub fn new(store: ResilientStore<B>, email_sender: E, cookie_key: Key, config: Config) -> Self {
        Self {
            store,
            email_sender,
            cookie_key,
            config,
        }
    }
}
