//! Request-scoped clock
//!
//! Protocol code never reads the system clock directly: each handler
//! resolves the request instant once, here, and threads that single value
//! through every expiry and throttle decision it makes.
//!
//! For deterministic testing the instant can be shifted by a signed offset
//! carried in a tamper-evident cookie. Production builds (test endpoints
//! disabled) ignore the cookie entirely.

use chrono::{DateTime, Duration, Utc};
use tower_cookies::cookie::SameSite;
use tower_cookies::{Cookie, Cookies, Key};

/// Signed cookie holding the test clock offset in milliseconds
pub const CLOCK_SKEW_COOKIE: &str = "otp_clock_skew";

/// Resolve the current instant for this request.
///
/// `test_mode` must be `Config::test_endpoints`; when false the offset
/// cookie is never consulted.
pub fn request_time(cookies: &Cookies, key: &Key, test_mode: bool) -> DateTime<Utc> {
    let now = Utc::now();
    if !test_mode {
        return now;
    }

    match cookies
        .signed(key)
        .get(CLOCK_SKEW_COOKIE)
        .and_then(|c| c.value().parse::<i64>().ok())
    {
        Some(offset_ms) => now + Duration::milliseconds(offset_ms),
        None => now,
    }
}

/// Set the clock offset for this client (test surface only)
pub fn set_offset(cookies: &Cookies, key: &Key, offset_ms: i64) {
    let cookie = Cookie::build((CLOCK_SKEW_COOKIE, offset_ms.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Strict)
        .build();
    cookies.signed(key).add(cookie);
}

/// Clear the clock offset for this client (test surface only)
pub fn clear_offset(cookies: &Cookies) {
    let cookie = Cookie::build((CLOCK_SKEW_COOKIE, ""))
        .path("/")
        .http_only(true)
        .max_age(tower_cookies::cookie::time::Duration::ZERO)
        .build();
    cookies.add(cookie);
}
