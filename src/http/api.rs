use crate::message::{Message, NewMessage};
use serde::{Deserialize, Serialize};

#[derive(Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SmsRequest {
    pub phone_number: String,
    pub message: String,
    pub sender_name: String,
    pub sender_email: String,
    pub message_type: Option<String>,
}

impl SmsRequest {
    pub fn is_complete(&self) -> bool {
        !self.phone_number.is_empty() && !self.message.is_empty()
    }

    pub fn into_new_message(self) -> NewMessage {
        NewMessage {
            phone_number: self.phone_number,
            message: self.message,
            sender_name: self.sender_name,
            sender_email: self.sender_email,
            message_type: self
                .message_type
                .filter(|message_type| !message_type.is_empty())
                .unwrap_or_else(|| "contact".to_owned()),
        }
    }
}

#[derive(Serialize)]
pub struct SmsSaved {
    pub message: &'static str,
    pub sms: Message,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailStatus {
    pub message: &'static str,
    pub email_user: String,
}
