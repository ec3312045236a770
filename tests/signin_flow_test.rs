//! End-to-end sign-in flow

mod common;

use common::{create_test_server, seed_user, set_clock_offset, start_signin};
use serde_json::{json, Value};

/// Test: the full happy path, including the attempt ceiling and a fresh
/// start afterwards
#[tokio::test]
async fn test_full_signin_scenario() {
    let (server, email_sender) = create_test_server();
    let email = "user@example.com";

    // Start: session pending, code C1 emailed
    let code1 = start_signin(&server, &email_sender, email).await;

    let response = server.get("/wsapi/signin_status").await;
    let body: Value = response.json();
    assert_eq!(body["state"], "pending");
    assert_eq!(body["email"], email);

    // Three wrong codes delete the session
    for _ in 0..2 {
        let response = server
            .post("/wsapi/finish_signin")
            .json(&json!({ "email": email, "code": "000000" }))
            .await;
        assert_eq!(response.status_code(), 200);
        let body: Value = response.json();
        assert_eq!(body["success"], false);
    }
    let response = server
        .post("/wsapi/finish_signin")
        .json(&json!({ "email": email, "code": "000000" }))
        .await;
    assert_eq!(response.status_code(), 401);
    let body: Value = response.json();
    assert_eq!(body["reason"], "Too many attempts");
    assert_eq!(body["redirect"], "/signin");

    // A fresh start issues a new session and a new, non-sentinel code
    let response = server
        .post("/wsapi/start_signin")
        .json(&json!({ "email": email }))
        .await;
    assert_eq!(response.status_code(), 200);
    let code2 = email_sender.get_code(email).unwrap();
    assert_ne!(code2, "123456");
    assert_ne!(code2, "999999");

    // C2 signs in
    let response = server
        .post("/wsapi/finish_signin")
        .json(&json!({ "email": email, "code": code2 }))
        .await;
    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["success"], true);

    let response = server.get("/wsapi/signin_status").await;
    let body: Value = response.json();
    assert_eq!(body["state"], "signed_in");

    // The first code belongs to the deleted session and is long gone
    assert_ne!(code1, code2);
}

/// Test: a signed-in session stays valid well past the code TTL
#[tokio::test]
async fn test_signed_in_session_is_long_lived() {
    let (server, email_sender) = create_test_server();
    let email = "longlived@example.com";

    let code = start_signin(&server, &email_sender, email).await;
    let response = server
        .post("/wsapi/finish_signin")
        .json(&json!({ "email": email, "code": code }))
        .await;
    assert_eq!(response.status_code(), 200);

    // One month later the session is still signed in
    set_clock_offset(&server, 30 * 24 * 60 * 60 * 1000).await;
    let response = server.get("/wsapi/signin_status").await;
    let body: Value = response.json();
    assert_eq!(body["state"], "signed_in");
}

/// Test: finishing twice is harmless; the second call short-circuits
#[tokio::test]
async fn test_finish_twice_short_circuits() {
    let (server, email_sender) = create_test_server();
    let email = "twice@example.com";

    let code = start_signin(&server, &email_sender, email).await;
    let response = server
        .post("/wsapi/finish_signin")
        .json(&json!({ "email": email, "code": code }))
        .await;
    assert_eq!(response.status_code(), 200);

    // The token is blanked; even a wrong code reports signed in
    let response = server
        .post("/wsapi/finish_signin")
        .json(&json!({ "email": email, "code": "000000" }))
        .await;
    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["success"], true);
}

/// Test: status without any session is a flow error
#[tokio::test]
async fn test_status_without_session() {
    let (server, _email_sender) = create_test_server();

    let response = server.get("/wsapi/signin_status").await;
    assert_eq!(response.status_code(), 401);
    let body: Value = response.json();
    assert_eq!(body["success"], false);
    assert_eq!(body["redirect"], "/signin");
}

/// Test: submitting under a different email than the session's owner
/// deletes the session
#[tokio::test]
async fn test_email_mismatch_deletes_session() {
    let (server, email_sender) = create_test_server();
    let email = "owner@example.com";
    seed_user(&server, "intruder@example.com").await;

    let code = start_signin(&server, &email_sender, email).await;

    let response = server
        .post("/wsapi/finish_signin")
        .json(&json!({ "email": "intruder@example.com", "code": code }))
        .await;
    assert_eq!(response.status_code(), 401);

    // Session is gone; the right email cannot finish either
    let response = server
        .post("/wsapi/finish_signin")
        .json(&json!({ "email": email, "code": code }))
        .await;
    assert_eq!(response.status_code(), 401);
}
