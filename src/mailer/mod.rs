mod api;
#[cfg(test)]
pub mod fake;
mod smtp;

pub use self::api::ApiMailer;
pub use self::smtp::SmtpMailer;
use async_trait::async_trait;
use thiserror::Error;

/// A rendered notification ready to be delivered
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Email {
    pub to: String,
    pub reply_to: String,
    pub subject: String,
    pub html: String,
}

/// Proof of delivery returned by the provider
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Receipt {
    pub id: String,
}

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("invalid email address {address:?}: {reason}")]
    Address { address: String, reason: String },
    #[error("failed to build email: {0}")]
    Build(String),
    #[error("timed out during {0}")]
    Timeout(&'static str),
    #[error("{0}")]
    Transport(String),
    #[error("provider rejected the email with status {status}: {detail}")]
    Rejected { status: u16, detail: String },
}

/// The capability to send one HTML email
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &Email) -> Result<Receipt, DeliveryError>;

    /// Check that the provider is reachable and accepts our credentials
    async fn verify(&self) -> Result<(), DeliveryError>;

    /// The address that emails are sent from
    fn sender(&self) -> &str;

    /// The account the provider authenticates us as
    fn account(&self) -> &str {
        self.sender()
    }
}
