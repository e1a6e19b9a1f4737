//! Queue abstraction for the assignment pipeline.
//!
//! Two interchangeable backends sit behind [`OrderQueue`]: AWS SQS and a
//! local file-backed FIFO. Both follow at-least-once semantics: `receive`
//! does not remove a message, it stays pending until `acknowledge` deletes
//! it, so a crash between the two leaves it recoverable.

pub mod local;
pub mod sqs;

pub use local::LocalQueue;
pub use sqs::SqsQueue;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::{Config, QueueBackend};
use crate::error::{AppError, QueueError};
use crate::models::order::Order;
use crate::storage::Directory;

/// Message body shared by both backends.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WireMessage {
    pub order_id: u64,
}

/// A pending message plus its resolved order payload. `receipt` is an
/// opaque backend-specific handle required to delete the message.
#[derive(Debug, Clone)]
pub struct ReceivedMessage {
    pub message_id: String,
    pub receipt: String,
    pub order_id: u64,
    /// `None` when the referenced order record no longer exists.
    pub order: Option<Order>,
}

#[async_trait]
pub trait OrderQueue: Send + Sync {
    /// Durably enqueues a message referencing `order_id`, returning the
    /// backend message id.
    async fn send(&self, order_id: u64) -> Result<String, QueueError>;

    /// Returns at most one pending message, or `None` when the queue is
    /// empty. The message is not removed; it stays pending until
    /// acknowledged. Malformed bodies are acknowledged in place and
    /// reported as `None` so they are never redelivered.
    async fn receive(&self) -> Result<Option<ReceivedMessage>, QueueError>;

    /// Deletes the message backing `receipt`. Returns `false` when the
    /// receipt is unknown or deletion fails; the message may then be
    /// redelivered.
    async fn acknowledge(&self, receipt: &str) -> bool;
}

/// Builds the backend named by the configuration. Called once at startup.
pub async fn from_config(
    config: &Config,
    directory: Arc<dyn Directory>,
) -> Result<Arc<dyn OrderQueue>, AppError> {
    match config.queue_backend {
        QueueBackend::Local => {
            let queue = LocalQueue::open(
                &config.local_queue_path,
                Duration::from_secs(config.local_queue_visibility_secs),
                directory,
            )
            .await?;
            Ok(Arc::new(queue))
        }
        QueueBackend::Sqs => {
            let queue_url = config
                .sqs_queue_url
                .clone()
                .ok_or_else(|| AppError::Internal("SQS_QUEUE_URL not set".to_string()))?;
            let queue = SqsQueue::connect(queue_url, config.aws_region.clone(), directory).await;
            Ok(Arc::new(queue))
        }
    }
}
