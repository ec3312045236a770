//! Cancel semantics

mod common;

use common::{create_test_server, start_signin};
use serde_json::{json, Value};

/// Test: cancel with no active session is a no-op, not an error
#[tokio::test]
async fn test_cancel_without_session_is_noop() {
    let (server, _email_sender) = create_test_server();

    let response = server.post("/wsapi/cancel_signin").await;
    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["redirect"], "/signin");
}

/// Test: cancel deletes the pending session and clears the client reference
#[tokio::test]
async fn test_cancel_deletes_pending_session() {
    let (server, email_sender) = create_test_server();
    let email = "quitter@example.com";
    let code = start_signin(&server, &email_sender, email).await;

    let response = server.post("/wsapi/cancel_signin").await;
    assert_eq!(response.status_code(), 200);

    // The cookie is gone and the session row with it
    let response = server.get("/wsapi/signin_status").await;
    assert_eq!(response.status_code(), 401);

    let response = server
        .post("/wsapi/finish_signin")
        .json(&json!({ "email": email, "code": code }))
        .await;
    assert_eq!(response.status_code(), 401);
}

/// Test: cancel works on a signed-in session too
#[tokio::test]
async fn test_cancel_signs_out() {
    let (server, email_sender) = create_test_server();
    let email = "leaver@example.com";
    let code = start_signin(&server, &email_sender, email).await;

    let response = server
        .post("/wsapi/finish_signin")
        .json(&json!({ "email": email, "code": code }))
        .await;
    assert_eq!(response.status_code(), 200);

    let response = server.post("/wsapi/cancel_signin").await;
    assert_eq!(response.status_code(), 200);

    let response = server.get("/wsapi/signin_status").await;
    assert_eq!(response.status_code(), 401);
}

/// Test: cancelling twice in a row stays successful
#[tokio::test]
async fn test_cancel_is_idempotent() {
    let (server, email_sender) = create_test_server();
    let email = "doublequit@example.com";
    start_signin(&server, &email_sender, email).await;

    for _ in 0..2 {
        let response = server.post("/wsapi/cancel_signin").await;
        assert_eq!(response.status_code(), 200);
        let body: Value = response.json();
        assert_eq!(body["success"], true);
    }
}
