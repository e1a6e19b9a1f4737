//! AWS SQS queue backend.
//!
//! SQS already provides the pending/in-flight split through its per-message
//! visibility timeout, so this backend maps the trait operations straight
//! onto send_message / receive_message / delete_message.

use std::sync::Arc;

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_sqs::Client;
use tracing::warn;

use crate::error::QueueError;
use crate::queue::{OrderQueue, ReceivedMessage, WireMessage};
use crate::storage::Directory;

/// Short server-side wait to avoid busy-polling an empty queue.
const RECEIVE_WAIT_SECS: i32 = 1;

pub struct SqsQueue {
    client: Client,
    queue_url: String,
    directory: Arc<dyn Directory>,
}

impl SqsQueue {
    pub async fn connect(
        queue_url: String,
        region: Option<String>,
        directory: Arc<dyn Directory>,
    ) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(Region::new(region));
        }
        let shared_config = loader.load().await;

        Self {
            client: Client::new(&shared_config),
            queue_url,
            directory,
        }
    }

    async fn delete(&self, receipt: &str) -> bool {
        self.client
            .delete_message()
            .queue_url(&self.queue_url)
            .receipt_handle(receipt)
            .send()
            .await
            .is_ok()
    }
}

#[async_trait]
impl OrderQueue for SqsQueue {
    async fn send(&self, order_id: u64) -> Result<String, QueueError> {
        let body = serde_json::to_string(&WireMessage { order_id })?;

        let response = self
            .client
            .send_message()
            .queue_url(&self.queue_url)
            .message_body(body)
            .send()
            .await
            .map_err(|err| QueueError::Unavailable(err.to_string()))?;

        Ok(response.message_id().unwrap_or_default().to_string())
    }

    async fn receive(&self) -> Result<Option<ReceivedMessage>, QueueError> {
        let response = self
            .client
            .receive_message()
            .queue_url(&self.queue_url)
            .max_number_of_messages(1)
            .wait_time_seconds(RECEIVE_WAIT_SECS)
            .send()
            .await
            .map_err(|err| QueueError::Unavailable(err.to_string()))?;

        let Some(message) = response.messages().first() else {
            return Ok(None);
        };

        let message_id = message.message_id().unwrap_or_default().to_string();
        let Some(receipt) = message.receipt_handle() else {
            warn!(message_id = %message_id, "sqs message without receipt handle; skipping");
            return Ok(None);
        };

        let wire: Option<WireMessage> = message
            .body()
            .and_then(|body| serde_json::from_str(body).ok());
        let Some(wire) = wire else {
            // Unparsable body: delete it here so it cannot loop forever.
            warn!(message_id = %message_id, "dropping malformed sqs message");
            if !self.delete(receipt).await {
                warn!(message_id = %message_id, "failed to delete malformed sqs message");
            }
            return Ok(None);
        };

        Ok(Some(ReceivedMessage {
            message_id,
            receipt: receipt.to_string(),
            order_id: wire.order_id,
            order: self.directory.get_order(wire.order_id),
        }))
    }

    async fn acknowledge(&self, receipt: &str) -> bool {
        self.delete(receipt).await
    }
}
