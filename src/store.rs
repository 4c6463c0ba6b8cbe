use crate::io_ext::IoResultExt;
use crate::message::{Message, NewMessage};
use chrono::{DateTime, SubsecRound, Utc};
use log::debug;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tokio::sync::Mutex;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no messages have been logged yet")]
    Absent,
    #[error("message {0} not found")]
    NotFound(i64),
    #[error("failed to decode the message log: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("failed to access the message log: {0}")]
    Io(#[from] std::io::Error),
}

/// A JSON array of messages on disk
///
/// Every operation reads the whole file, changes it in memory, and writes the whole file back. Operations are
/// serialized through one async lock so that concurrent requests in this process can't lose each other's writes.
/// Other processes writing the same file are not coordinated with.
pub struct MessageLog {
    path: PathBuf,
    lock: Mutex<()>,
}

impl MessageLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Log a new unread message and return it
    pub async fn append(&self, new_message: NewMessage) -> Result<Message, StoreError> {
        self.append_at(new_message, Utc::now()).await
    }

    async fn append_at(
        &self,
        new_message: NewMessage,
        now: DateTime<Utc>,
    ) -> Result<Message, StoreError> {
        let _guard = self.lock.lock().await;
        let mut messages = self.load().await?.unwrap_or_default();

        // Ids follow the clock but are bumped past the largest existing id so they never collide
        let now = now.trunc_subsecs(3);
        let id = messages
            .iter()
            .map(|message| message.id.saturating_add(1))
            .fold(now.timestamp_millis(), i64::max);

        let message = Message {
            id,
            timestamp: now,
            phone_number: new_message.phone_number,
            message: new_message.message,
            sender_name: new_message.sender_name,
            sender_email: new_message.sender_email,
            message_type: new_message.message_type,
            read: false,
        };
        messages.push(message.clone());
        self.save(&messages).await?;

        debug!(
            "Logged message {id} for {} in {}",
            message.phone_number,
            self.path.display()
        );
        Ok(message)
    }

    /// Read every logged message in insertion order
    pub async fn list(&self) -> Result<Vec<Message>, StoreError> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.unwrap_or_default())
    }

    /// Mark a message as read and return its updated value
    pub async fn mark_read(&self, id: i64) -> Result<Message, StoreError> {
        let _guard = self.lock.lock().await;
        let mut messages = self.load().await?.ok_or(StoreError::Absent)?;
        let message = messages
            .iter_mut()
            .find(|message| message.id == id)
            .ok_or(StoreError::NotFound(id))?;
        message.read = true;
        let updated = message.clone();
        self.save(&messages).await?;
        Ok(updated)
    }

    /// Delete a message
    /// Returns `true` if a message was actually removed. Removing an id that isn't present still rewrites the log and
    /// is not an error.
    pub async fn remove(&self, id: i64) -> Result<bool, StoreError> {
        let _guard = self.lock.lock().await;
        let mut messages = self.load().await?.ok_or(StoreError::Absent)?;
        let count = messages.len();
        messages.retain(|message| message.id != id);
        self.save(&messages).await?;
        Ok(messages.len() < count)
    }

    /// Read the log, returning `None` if it has never been written
    async fn load(&self) -> Result<Option<Vec<Message>>, StoreError> {
        match fs::read_to_string(&self.path).await.ok_if_missing()? {
            Some(contents) => Ok(Some(serde_json::from_str(&contents)?)),
            None => Ok(None),
        }
    }

    /// Replace the log with a new set of messages
    async fn save(&self, messages: &[Message]) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(messages)?;
        if let Some(parent) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        // Write next to the log and rename over it so that readers never see a partial file
        let mut temp_path = OsString::from(self.path.as_os_str());
        temp_path.push(".tmp");
        let temp_path = PathBuf::from(temp_path);
        fs::write(&temp_path, json).await?;
        fs::rename(&temp_path, &self.path).await?;
        Ok(())
    }
}
