//! SMS delivery interface.
//!
//! Actual delivery is an external collaborator; the service layer only needs
//! "send this code to this number". The default implementation logs the code,
//! which is also how development environments run.

use tracing::info;

/// Outbound SMS sender.
pub trait SmsSender: Send + Sync {
    /// Delivers a verification code to a phone number.
    ///
    /// Returns an error message when delivery is known to have failed.
    fn send_verification_code(&self, phone_number: &str, code: &str) -> Result<(), String>;
}

/// Development sender: logs the code instead of delivering it.
#[derive(Debug, Default)]
pub struct LogSmsSender;

impl SmsSender for LogSmsSender {
    fn send_verification_code(&self, phone_number: &str, code: &str) -> Result<(), String> {
        info!(phone_number = %phone_number, code = %code, "SMS verification code (simulated send)");
        Ok(())
    }
}
