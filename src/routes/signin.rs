//! Sign-in flow endpoints
//!
//! Thin adapters: resolve the request instant and session cookie, call the
//! state machine, translate outcomes into JSON plus cookie changes. Cookie
//! mutations are applied by the cookie layer even when a handler returns an
//! error, so invalidated sessions always drop their cookie.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use tower_cookies::Cookies;

use crate::clock;
use crate::email::EmailSender;
use crate::error::{AuthError, SIGNIN_REDIRECT};
use crate::otp::machine::{
    self, AwaitOutcome, StartOutcome, VerifyOutcome, CODE_TTL_MS, SIGNED_IN_TTL_MS,
};
use crate::state::AppState;
use crate::store::Backend;

use super::session::{
    clear_email_cookie, clear_session_cookie, get_session_id, set_email_cookie,
    set_session_cookie,
};

/// Drop the session cookie when the error invalidated the session
fn surface(cookies: &Cookies, err: AuthError) -> AuthError {
    if err.clears_session() {
        clear_session_cookie(cookies);
    }
    err
}

#[derive(Deserialize)]
pub struct StartSigninRequest {
    pub email: String,
}

#[derive(Serialize)]
pub struct StartSigninResponse {
    pub success: bool,
    pub reason: String,
}

/// POST /wsapi/start_signin
///
/// Responds identically whether or not the email has an account, so the
/// endpoint cannot be used to enumerate addresses.
pub async fn start_signin<B, E>(
    State(state): State<Arc<AppState<B, E>>>,
    cookies: Cookies,
    Json(req): Json<StartSigninRequest>,
) -> Result<Json<StartSigninResponse>, AuthError>
where
    B: Backend,
    E: EmailSender,
{
    let now = clock::request_time(&cookies, &state.cookie_key, state.config.test_endpoints);

    let outcome = machine::start(&state.store, &state.email_sender, now, &req.email)
        .await
        .map_err(|e| surface(&cookies, e))?;

    if let StartOutcome::Created(session) = outcome {
        set_session_cookie(&cookies, &state.cookie_key, &session.id, CODE_TTL_MS);
        set_email_cookie(&cookies, &req.email);
    }

    Ok(Json(StartSigninResponse {
        success: true,
        reason: "Check your email for a sign-in code".to_string(),
    }))
}

#[derive(Serialize)]
pub struct SigninStatusResponse {
    pub success: bool,
    pub state: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// GET /wsapi/signin_status
pub async fn signin_status<B, E>(
    State(state): State<Arc<AppState<B, E>>>,
    cookies: Cookies,
) -> Result<Json<SigninStatusResponse>, AuthError>
where
    B: Backend,
    E: EmailSender,
{
    let now = clock::request_time(&cookies, &state.cookie_key, state.config.test_endpoints);
    let session_id = get_session_id(&cookies, &state.cookie_key);

    let outcome = machine::status(&state.store, now, session_id.as_ref())
        .await
        .map_err(|e| surface(&cookies, e))?;

    let response = match outcome {
        AwaitOutcome::Pending { email } => SigninStatusResponse {
            success: true,
            state: "pending",
            email: Some(email),
        },
        AwaitOutcome::AlreadySignedIn => SigninStatusResponse {
            success: true,
            state: "signed_in",
            email: None,
        },
    };

    Ok(Json(response))
}

#[derive(Deserialize)]
pub struct FinishSigninRequest {
    pub email: String,
    pub code: String,
}

#[derive(Serialize)]
pub struct FinishSigninResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempts_left: Option<u32>,
}

/// POST /wsapi/finish_signin
pub async fn finish_signin<B, E>(
    State(state): State<Arc<AppState<B, E>>>,
    cookies: Cookies,
    Json(req): Json<FinishSigninRequest>,
) -> Result<Json<FinishSigninResponse>, AuthError>
where
    B: Backend,
    E: EmailSender,
{
    let now = clock::request_time(&cookies, &state.cookie_key, state.config.test_endpoints);
    let session_id = get_session_id(&cookies, &state.cookie_key);

    let outcome = machine::verify(&state.store, now, session_id.as_ref(), &req.email, &req.code)
        .await
        .map_err(|e| surface(&cookies, e))?;

    let response = match outcome {
        VerifyOutcome::SignedIn(session) => {
            // Refresh the client reference with the long-lived expiry
            set_session_cookie(&cookies, &state.cookie_key, &session.id, SIGNED_IN_TTL_MS);
            FinishSigninResponse {
                success: true,
                reason: None,
                attempts_left: None,
            }
        }
        VerifyOutcome::InvalidCode { attempts_left } => FinishSigninResponse {
            success: false,
            reason: Some("Invalid code, try again".to_string()),
            attempts_left: Some(attempts_left),
        },
    };

    Ok(Json(response))
}

#[derive(Deserialize)]
pub struct ResendCodeRequest {
    pub email: String,
}

#[derive(Serialize)]
pub struct ResendCodeResponse {
    pub success: bool,
    pub reason: String,
}

/// POST /wsapi/resend_code
pub async fn resend_code<B, E>(
    State(state): State<Arc<AppState<B, E>>>,
    cookies: Cookies,
    Json(req): Json<ResendCodeRequest>,
) -> Result<Json<ResendCodeResponse>, AuthError>
where
    B: Backend,
    E: EmailSender,
{
    let now = clock::request_time(&cookies, &state.cookie_key, state.config.test_endpoints);
    let session_id = get_session_id(&cookies, &state.cookie_key);

    let session = machine::resend(
        &state.store,
        &state.email_sender,
        now,
        session_id.as_ref(),
        &req.email,
    )
    .await
    .map_err(|e| surface(&cookies, e))?;

    // Renewed code, renewed cookie lifetime
    set_session_cookie(&cookies, &state.cookie_key, &session.id, CODE_TTL_MS);

    Ok(Json(ResendCodeResponse {
        success: true,
        reason: "A new code is on its way".to_string(),
    }))
}

#[derive(Serialize)]
pub struct CancelSigninResponse {
    pub success: bool,
    pub redirect: &'static str,
}

/// POST /wsapi/cancel_signin
///
/// Always clears the client's references, even when there was nothing to
/// delete, so the client can never stay pointed at a dead session.
pub async fn cancel_signin<B, E>(
    State(state): State<Arc<AppState<B, E>>>,
    cookies: Cookies,
) -> Json<CancelSigninResponse>
where
    B: Backend,
    E: EmailSender,
{
    let session_id = get_session_id(&cookies, &state.cookie_key);
    machine::cancel(&state.store, session_id.as_ref()).await;

    clear_session_cookie(&cookies);
    clear_email_cookie(&cookies);

    Json(CancelSigninResponse {
        success: true,
        redirect: SIGNIN_REDIRECT,
    })
}
