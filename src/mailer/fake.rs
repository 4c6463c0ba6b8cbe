use super::{DeliveryError, Email, Mailer, Receipt};
use async_trait::async_trait;
use std::sync::Mutex;

/// Records emails in memory instead of delivering them
#[derive(Default)]
pub struct FakeMailer {
    sent: Mutex<Vec<Email>>,
    failure: Option<String>,
}

impl FakeMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A mailer whose every delivery and verification fails with `detail`
    pub fn failing(detail: &str) -> Self {
        Self {
            failure: Some(detail.to_owned()),
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<Email> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for FakeMailer {
    async fn send(&self, email: &Email) -> Result<Receipt, DeliveryError> {
        if let Some(detail) = &self.failure {
            return Err(DeliveryError::Transport(detail.clone()));
        }
        let mut sent = self.sent.lock().unwrap();
        sent.push(email.clone());
        Ok(Receipt {
            id: format!("fake-{}", sent.len()),
        })
    }

    async fn verify(&self) -> Result<(), DeliveryError> {
        match &self.failure {
            Some(detail) => Err(DeliveryError::Transport(detail.clone())),
            None => Ok(()),
        }
    }

    fn sender(&self) -> &str {
        "dispatch@example.com"
    }

    fn account(&self) -> &str {
        "dispatch"
    }
}
