//! OTP sign-in broker
//!
//! A server-side one-time-passcode sign-in protocol: a session state
//! machine that issues, verifies, resends and expires 6-digit codes,
//! backed by a retry-wrapped persistence layer.

pub mod clock;
pub mod config;
pub mod email;
pub mod error;
pub mod otp;
pub mod routes;
pub mod state;
pub mod store;

pub use config::{cookie_key, Config};
pub use email::{ConsoleEmailSender, EmailSender, SmtpConfig, SmtpEmailSender};
pub use error::AuthError;
pub use state::AppState;
pub use store::{Backend, Faults, MemoryBackend, Outcome, ResilientStore};
