//! Email sending abstractions

pub mod console;
pub mod smtp;

pub use console::ConsoleEmailSender;
pub use smtp::{SmtpConfig, SmtpEmailSender};

/// Trait for delivering sign-in codes
pub trait EmailSender: Send + Sync {
    /// Send a sign-in code to an email address
    fn send_code(&self, email: &str, code: &str) -> Result<(), String>;
}

/// Allow using Box<dyn EmailSender> as an EmailSender
impl EmailSender for Box<dyn EmailSender> {
    fn send_code(&self, email: &str, code: &str) -> Result<(), String> {
        (**self).send_code(email, code)
    }
}
