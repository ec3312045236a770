//! HTTP routes for the broker

pub mod session;
mod signin;

pub use session::{EMAIL_COOKIE, SESSION_COOKIE};

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_cookies::CookieManagerLayer;
use tower_http::trace::TraceLayer;

use crate::email::EmailSender;
use crate::state::AppState;
use crate::store::Backend;

/// Create the router with all routes
///
/// The `/wsapi/test/*` surface is mounted only when the config enables it;
/// production deployments never expose it.
pub fn create_router<B, E>(state: Arc<AppState<B, E>>) -> Router
where
    B: Backend + 'static,
    E: EmailSender + 'static,
{
    let mut router = Router::new()
        .route("/wsapi/start_signin", post(signin::start_signin))
        .route("/wsapi/signin_status", get(signin::signin_status))
        .route("/wsapi/finish_signin", post(signin::finish_signin))
        .route("/wsapi/resend_code", post(signin::resend_code))
        .route("/wsapi/cancel_signin", post(signin::cancel_signin));

    if state.config.test_endpoints {
        router = router
            .route("/wsapi/test/create_user", post(test::create_user))
            .route("/wsapi/test/pending_code", get(test::pending_code))
            .route("/wsapi/test/set_clock_offset", post(test::set_clock_offset))
            .route("/wsapi/test/clear_clock_offset", post(test::clear_clock_offset))
            .route("/wsapi/test/delete_sessions", post(test::delete_sessions))
            .route("/wsapi/test/counter_bump", post(test::counter_bump))
            .route("/wsapi/test/counter", get(test::get_counter));
    }

    router
        .layer(CookieManagerLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
