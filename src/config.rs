//! Broker configuration

use tower_cookies::Key;

#[derive(Debug, Clone)]
pub struct Config {
    /// Port to listen on
    pub port: u16,

    /// Domain this broker is hosted at
    pub domain: String,

    /// Whether the /wsapi/test/* surface (and the clock offset cookie) is
    /// enabled; must stay false in production
    pub test_endpoints: bool,

    /// SMTP configuration for sending sign-in codes
    pub smtp: Option<crate::email::SmtpConfig>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(3000);

        let domain = std::env::var("DOMAIN").unwrap_or_else(|_| "localhost".to_string());

        let test_endpoints = std::env::var("TEST_ENDPOINTS")
            .map(|s| s == "1" || s.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        Self {
            port,
            domain,
            test_endpoints,
            smtp: crate::email::SmtpConfig::from_env(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            domain: "localhost".to_string(),
            test_endpoints: false,
            smtp: None,
        }
    }
}

/// Cookie signing key, from COOKIE_SECRET (at least 64 bytes) or freshly
/// generated when absent. A generated key invalidates signed cookies on
/// restart.
pub fn cookie_key() -> Key {
    match std::env::var("COOKIE_SECRET") {
        Ok(secret) => Key::try_from(secret.as_bytes()).unwrap_or_else(|_| {
            tracing::warn!("COOKIE_SECRET too short, generating a random key");
            Key::generate()
        }),
        Err(_) => Key::generate(),
    }
}
