use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One entry of the message log
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub phone_number: String,
    pub message: String,
    #[serde(default)]
    pub sender_name: String,
    #[serde(default)]
    pub sender_email: String,
    pub message_type: String,
    #[serde(default)]
    pub read: bool,
}

/// The caller-supplied fields of a message about to be logged
#[derive(Clone, Debug, Default)]
pub struct NewMessage {
    pub phone_number: String,
    pub message: String,
    pub sender_name: String,
    pub sender_email: String,
    pub message_type: String,
}
