//! Session cookie plumbing
//!
//! The signed `otp_session` cookie carries the session id; the plain
//! `otp_email` cookie is a last-entered-email hint for the sign-in form.
//! Both are path=/, HttpOnly, SameSite=Strict.

use tower_cookies::cookie::time::Duration;
use tower_cookies::cookie::SameSite;
use tower_cookies::{Cookie, Cookies, Key};

use crate::store::SessionId;

pub const SESSION_COOKIE: &str = "otp_session";
pub const EMAIL_COOKIE: &str = "otp_email";

fn base_cookie(name: &'static str, value: String) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Strict)
        .build()
}

/// Read the session id from the signed cookie, rejecting tampered values
pub fn get_session_id(cookies: &Cookies, key: &Key) -> Option<SessionId> {
    cookies
        .signed(key)
        .get(SESSION_COOKIE)
        .map(|c| SessionId(c.value().to_string()))
}

/// Set (or refresh) the signed session cookie with the given lifetime
pub fn set_session_cookie(cookies: &Cookies, key: &Key, session_id: &SessionId, max_age_ms: i64) {
    let mut cookie = base_cookie(SESSION_COOKIE, session_id.0.clone());
    cookie.set_max_age(Duration::milliseconds(max_age_ms));
    cookies.signed(key).add(cookie);
}

pub fn clear_session_cookie(cookies: &Cookies) {
    let mut cookie = base_cookie(SESSION_COOKIE, String::new());
    cookie.set_max_age(Duration::ZERO);
    cookies.add(cookie);
}

pub fn set_email_cookie(cookies: &Cookies, email: &str) {
    cookies.add(base_cookie(EMAIL_COOKIE, email.to_string()));
}

pub fn clear_email_cookie(cookies: &Cookies) {
    let mut cookie = base_cookie(EMAIL_COOKIE, String::new());
    cookie.set_max_age(Duration::ZERO);
    cookies.add(cookie);
}
