//! Common test utilities for broker integration tests

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use axum_test::TestServer;
use otp_broker::store::RetryPolicy;
use otp_broker::{
    routes, AppState, Config, EmailSender, MemoryBackend, ResilientStore,
};
use serde_json::json;
use tower_cookies::Key;

/// Mock email sender that captures sign-in codes and can be told to fail
#[derive(Default, Clone)]
pub struct MockEmailSender {
    /// Captured (email, code) pairs
    pub sent: Arc<RwLock<Vec<(String, String)>>>,
    fail: Arc<AtomicBool>,
}

impl MockEmailSender {
    pub fn new() -> Self {
        Self {
            sent: Arc::new(RwLock::new(Vec::new())),
            fail: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Get the last code sent to an email
    pub fn get_code(&self, email: &str) -> Option<String> {
        self.sent
            .read()
            .unwrap()
            .iter()
            .rev()
            .find(|(e, _)| e == email)
            .map(|(_, c)| c.clone())
    }

    pub fn sent_count(&self) -> usize {
        self.sent.read().unwrap().len()
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

impl EmailSender for MockEmailSender {
    fn send_code(&self, email: &str, code: &str) -> Result<(), String> {
        if self.fail.load(Ordering::SeqCst) {
            return Err("simulated delivery failure".to_string());
        }
        self.sent
            .write()
            .unwrap()
            .push((email.to_string(), code.to_string()));
        Ok(())
    }
}

/// Create a test server with the test surface enabled, a fast retry policy
/// and a cookie jar that persists across requests
pub fn create_test_server() -> (TestServer, MockEmailSender) {
    let email_sender = MockEmailSender::new();

    let config = Config {
        test_endpoints: true,
        ..Config::default()
    };

    let store = ResilientStore::with_policy(
        MemoryBackend::new(),
        RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_millis(1),
        },
    );

    let state = Arc::new(AppState::new(
        store,
        email_sender.clone(),
        Key::generate(),
        config,
    ));

    let app = routes::create_router(state);
    let mut server = TestServer::new(app).expect("Failed to create test server");
    server.save_cookies();

    (server, email_sender)
}

/// Seed a user through the test surface
pub async fn seed_user(server: &TestServer, email: &str) {
    let response = server
        .post("/wsapi/test/create_user")
        .json(&json!({ "email": email }))
        .await;
    assert_eq!(response.status_code(), 200);
}

/// Seed a user and start a sign-in for them, returning the emailed code
pub async fn start_signin(server: &TestServer, email_sender: &MockEmailSender, email: &str) -> String {
    seed_user(server, email).await;

    let response = server
        .post("/wsapi/start_signin")
        .json(&json!({ "email": email }))
        .await;
    assert_eq!(response.status_code(), 200);

    email_sender.get_code(email).expect("No sign-in code sent")
}

/// Shift this client's clock by the given offset
pub async fn set_clock_offset(server: &TestServer, offset_ms: i64) {
    let response = server
        .post("/wsapi/test/set_clock_offset")
        .json(&json!({ "offset_ms": offset_ms }))
        .await;
    assert_eq!(response.status_code(), 200);
}
