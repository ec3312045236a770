//! One-time-passcode sign-in protocol

pub mod code;
pub mod machine;

pub use code::{generate_code, RESERVED_CODES};
pub use machine::{
    cancel, resend, start, status, verify, AwaitOutcome, StartOutcome, VerifyOutcome,
    CODE_TTL_MS, MAX_ATTEMPTS, RESEND_COOLDOWN_MS, SIGNED_IN_TTL_MS,
};
