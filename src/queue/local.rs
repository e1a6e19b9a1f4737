//! File-backed FIFO queue for single-host deployments.
//!
//! Messages live in a JSON file in insertion order. Receiving marks the
//! oldest visible message in-flight for a visibility window instead of
//! deleting it; only an explicit acknowledge removes it. An in-flight
//! message whose window lapses without an acknowledge becomes visible
//! again, which is what gives the backend at-least-once delivery.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::warn;
use uuid::Uuid;

use crate::error::QueueError;
use crate::queue::{OrderQueue, ReceivedMessage, WireMessage};
use crate::storage::Directory;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredMessage {
    id: String,
    body: String,
    enqueued_at: DateTime<Utc>,
    /// While set and in the future, the message is in-flight and invisible
    /// to other receivers. Stored as a timestamp so it survives restarts.
    invisible_until: Option<DateTime<Utc>>,
}

impl StoredMessage {
    fn is_visible(&self, now: DateTime<Utc>) -> bool {
        match self.invisible_until {
            Some(deadline) => deadline <= now,
            None => true,
        }
    }
}

pub struct LocalQueue {
    path: PathBuf,
    visibility: Duration,
    directory: Arc<dyn Directory>,
    messages: Mutex<Vec<StoredMessage>>,
}

impl LocalQueue {
    /// Opens the queue file at `path`, creating an empty queue if the file
    /// does not exist yet.
    pub async fn open(
        path: &Path,
        visibility: Duration,
        directory: Arc<dyn Directory>,
    ) -> Result<Self, QueueError> {
        let messages = match tokio::fs::read(path).await {
            Ok(raw) => serde_json::from_slice(&raw)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(err) => return Err(err.into()),
        };

        Ok(Self {
            path: path.to_path_buf(),
            visibility,
            directory,
            messages: Mutex::new(messages),
        })
    }

    async fn persist(&self, messages: &[StoredMessage]) -> Result<(), QueueError> {
        let raw = serde_json::to_vec(messages)?;
        tokio::fs::write(&self.path, raw).await?;
        Ok(())
    }
}

#[async_trait]
impl OrderQueue for LocalQueue {
    async fn send(&self, order_id: u64) -> Result<String, QueueError> {
        let mut messages = self.messages.lock().await;

        let message = StoredMessage {
            id: Uuid::new_v4().to_string(),
            body: serde_json::to_string(&WireMessage { order_id })?,
            enqueued_at: Utc::now(),
            invisible_until: None,
        };
        let message_id = message.id.clone();
        messages.push(message);

        if let Err(err) = self.persist(&messages).await {
            messages.pop();
            return Err(err);
        }

        Ok(message_id)
    }

    async fn receive(&self) -> Result<Option<ReceivedMessage>, QueueError> {
        let mut messages = self.messages.lock().await;
        let now = Utc::now();

        let Some(position) = messages.iter().position(|msg| msg.is_visible(now)) else {
            return Ok(None);
        };

        let wire: WireMessage = match serde_json::from_str(&messages[position].body) {
            Ok(wire) => wire,
            Err(err) => {
                // Unparsable body: delete it here so it cannot loop forever.
                let dropped = messages.remove(position);
                warn!(message_id = %dropped.id, error = %err, "dropping malformed queue message");
                self.persist(&messages).await?;
                return Ok(None);
            }
        };

        let deadline = now
            + chrono::Duration::from_std(self.visibility)
                .unwrap_or_else(|_| chrono::Duration::seconds(30));
        messages[position].invisible_until = Some(deadline);
        self.persist(&messages).await?;

        let message = &messages[position];
        Ok(Some(ReceivedMessage {
            message_id: message.id.clone(),
            receipt: message.id.clone(),
            order_id: wire.order_id,
            order: self.directory.get_order(wire.order_id),
        }))
    }

    async fn acknowledge(&self, receipt: &str) -> bool {
        let mut messages = self.messages.lock().await;

        let Some(position) = messages.iter().position(|msg| msg.id == receipt) else {
            return false;
        };
        messages.remove(position);

        if let Err(err) = self.persist(&messages).await {
            warn!(receipt, error = %err, "failed to persist acknowledge; message may reappear");
            return false;
        }
        true
    }
}
