use crate::mailer::{DeliveryError, Email, Mailer, Receipt};
use crate::message::NewMessage;
use log::{error, info};
use serde::Deserialize;
use std::fmt::Write;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error, Eq, PartialEq)]
#[error("missing required fields: {}", .0.join(", "))]
pub struct MissingFields(pub Vec<&'static str>);

/// Fail with the names of every required field that is blank
fn require(fields: &[(&'static str, &str)]) -> Result<(), MissingFields> {
    let missing = fields
        .iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| *name)
        .collect::<Vec<_>>();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(MissingFields(missing))
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct ContactSubmission {
    pub name: String,
    pub email: String,
    pub message: String,
}

impl ContactSubmission {
    pub fn validate(&self) -> Result<(), MissingFields> {
        require(&[
            ("name", self.name.as_str()),
            ("email", self.email.as_str()),
            ("message", self.message.as_str()),
        ])
    }

    /// The copy of this submission kept in the message log
    pub fn log_entry(&self, phone_number: &str) -> NewMessage {
        NewMessage {
            phone_number: phone_number.to_owned(),
            message: format!("Message from {} ({}): {}", self.name, self.email, self.message),
            sender_name: self.name.clone(),
            sender_email: self.email.clone(),
            message_type: "message".to_owned(),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct QuotationSubmission {
    pub name: String,
    pub company: String,
    pub email: String,
    pub phone: String,
    pub origin_zip: String,
    pub destination_zip: String,
    pub product: String,
    pub truck_type: String,
    pub message: String,
}

impl QuotationSubmission {
    pub fn validate(&self) -> Result<(), MissingFields> {
        require(&[
            ("name", self.name.as_str()),
            ("email", self.email.as_str()),
            ("message", self.message.as_str()),
        ])
    }
}

/// Turns website submissions into emails for the company inbox
pub struct Notifier {
    mailer: Arc<dyn Mailer>,
    inbox: String,
    brand: String,
}

impl Notifier {
    pub fn new(mailer: Arc<dyn Mailer>, inbox: String, brand: String) -> Self {
        Self {
            mailer,
            inbox,
            brand,
        }
    }

    pub fn account(&self) -> &str {
        self.mailer.account()
    }

    pub async fn verify(&self) -> Result<(), DeliveryError> {
        self.mailer.verify().await
    }

    pub async fn send_contact(
        &self,
        submission: &ContactSubmission,
    ) -> Result<Receipt, DeliveryError> {
        info!("Sending contact message from {}", submission.email);
        let result = self.mailer.send(&self.contact_email(submission)).await;
        log_outcome("contact message", &result);
        result
    }

    pub async fn send_quotation(
        &self,
        submission: &QuotationSubmission,
    ) -> Result<Receipt, DeliveryError> {
        info!("Sending quotation request from {}", submission.email);
        let result = self.mailer.send(&self.quotation_email(submission)).await;
        log_outcome("quotation request", &result);
        result
    }

    fn contact_email(&self, submission: &ContactSubmission) -> Email {
        let mut html = String::from("<h2>New Contact Form Submission</h2>\n");
        field(&mut html, "Name", &submission.name);
        field(&mut html, "Email", &submission.email);
        long_field(&mut html, "Message", &submission.message);

        Email {
            to: self.inbox.clone(),
            reply_to: submission.email.clone(),
            subject: format!("New Message from {} - {}", submission.name, self.brand),
            html,
        }
    }

    fn quotation_email(&self, submission: &QuotationSubmission) -> Email {
        let mut html = String::from("<h2>New Quotation Request</h2>\n");
        field(&mut html, "Name", &submission.name);
        field(&mut html, "Company", &submission.company);
        field(&mut html, "Email", &submission.email);
        field(&mut html, "Phone", &submission.phone);
        field(&mut html, "Origin Zip Code", &submission.origin_zip);
        field(&mut html, "Destination Zip Code", &submission.destination_zip);
        field(&mut html, "Product", &submission.product);
        field(&mut html, "Truck Type", &submission.truck_type);
        long_field(&mut html, "Message", &submission.message);

        Email {
            to: self.inbox.clone(),
            reply_to: submission.email.clone(),
            subject: format!("Quotation Request from {} - {}", submission.name, self.brand),
            html,
        }
    }
}

fn log_outcome(kind: &str, result: &Result<Receipt, DeliveryError>) {
    match result {
        Ok(receipt) => info!("Sent {kind} ({})", receipt.id),
        Err(err) => error!("Failed to send {kind}: {err}"),
    }
}

/// Append a labelled single-line value
fn field(html: &mut String, label: &str, value: &str) {
    let _ = writeln!(html, "<p><strong>{label}:</strong> {}</p>", escape(value));
}

/// Append a labelled free-text value on its own paragraph, keeping its line breaks
fn long_field(html: &mut String, label: &str, value: &str) {
    let text = escape(value).replace("\r\n", "\n").replace('\n', "<br>");
    let _ = writeln!(html, "<p><strong>{label}:</strong></p>\n<p>{text}</p>");
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for char in text.chars() {
        match char {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(char),
        }
    }
    escaped
}
