use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_sqs::types::{
    BatchResultErrorEntry, ChangeMessageVisibilityBatchRequestEntry,
    DeleteMessageBatchRequestEntry, Message, MessageSystemAttributeName, QueueAttributeName,
    SendMessageBatchRequestEntry,
};

use crate::errors::BatchQueueError;

/// One entry of a `SendMessageBatch` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendEntry {
    /// Correlation id, unique within its batch.
    pub id: String,
    pub body: String,
}

/// One entry of a `DeleteMessageBatch` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteEntry {
    pub id: String,
    pub receipt_handle: String,
}

/// One entry of a `ChangeMessageVisibilityBatch` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisibilityEntry {
    pub id: String,
    pub receipt_handle: String,
    pub visibility_timeout: i32,
}

/// Parameters of a single `ReceiveMessage` poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiveRequest {
    pub max_number_of_messages: i32,
    pub visibility_timeout: Option<i32>,
    pub wait_time_seconds: i32,
}

/// A message delivered by a receive call.
///
/// The receipt handle is only valid until the visibility timeout expires or the
/// message is deleted or received again.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReceivedMessage {
    pub message_id: String,
    pub receipt_handle: String,
    pub body: String,
    pub md5_of_body: Option<String>,
    /// System attributes such as `SentTimestamp` or `ApproximateReceiveCount`.
    pub attributes: HashMap<String, String>,
    /// String-valued user message attributes.
    pub message_attributes: HashMap<String, String>,
}

/// Identity of a delivered message, as needed by delete and heartbeat.
pub trait MessageHandle {
    fn message_id(&self) -> &str;
    fn receipt_handle(&self) -> &str;
}

impl MessageHandle for ReceivedMessage {
    fn message_id(&self) -> &str {
        &self.message_id
    }

    fn receipt_handle(&self) -> &str {
        &self.receipt_handle
    }
}

impl<T: MessageHandle + ?Sized> MessageHandle for &T {
    fn message_id(&self) -> &str {
        (**self).message_id()
    }

    fn receipt_handle(&self) -> &str {
        (**self).receipt_handle()
    }
}

/// An entry the service rejected inside an accepted batch request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchFailure {
    pub id: String,
    pub code: String,
    pub message: Option<String>,
    pub sender_fault: bool,
}

/// Result of one batch request: which entries succeeded and which failed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub successful: Vec<String>,
    pub failed: Vec<BatchFailure>,
}

impl BatchOutcome {
    pub fn is_complete_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// The primitive operations of the queue service.
///
/// Each batch call takes at most ten entries. Implemented for
/// [`aws_sdk_sqs::Client`]; tests substitute an in-memory implementation.
#[async_trait]
pub trait QueueService: Send + Sync {
    async fn send_message_batch(
        &self,
        queue_url: &str,
        entries: Vec<SendEntry>,
    ) -> Result<BatchOutcome, BatchQueueError>;

    /// Polls once. An empty result means no message became available within
    /// the long-poll wait.
    async fn receive_messages(
        &self,
        queue_url: &str,
        request: ReceiveRequest,
    ) -> Result<Vec<ReceivedMessage>, BatchQueueError>;

    async fn delete_message_batch(
        &self,
        queue_url: &str,
        entries: Vec<DeleteEntry>,
    ) -> Result<BatchOutcome, BatchQueueError>;

    async fn change_visibility_batch(
        &self,
        queue_url: &str,
        entries: Vec<VisibilityEntry>,
    ) -> Result<BatchOutcome, BatchQueueError>;

    /// Reads the queue's configured `VisibilityTimeout` attribute, in seconds.
    async fn default_visibility_timeout(&self, queue_url: &str) -> Result<i32, BatchQueueError>;

    /// Creates a queue and returns its URL.
    async fn create_queue(
        &self,
        name: &str,
        attributes: HashMap<String, String>,
        tags: HashMap<String, String>,
    ) -> Result<String, BatchQueueError>;

    async fn delete_queue(&self, queue_url: &str) -> Result<(), BatchQueueError>;
}

fn failures(entries: &[BatchResultErrorEntry]) -> Vec<BatchFailure> {
    entries
        .iter()
        .map(|e| BatchFailure {
            id: e.id().to_string(),
            code: e.code().to_string(),
            message: e.message().map(str::to_string),
            sender_fault: e.sender_fault(),
        })
        .collect()
}

/// Converts an SDK message, returning `None` when it lacks the identity needed
/// to delete or extend it.
fn decode_message(message: Message) -> Option<ReceivedMessage> {
    let Some(message_id) = message.message_id else {
        tracing::warn!("skipping received message without a message id");
        return None;
    };
    let Some(receipt_handle) = message.receipt_handle else {
        tracing::warn!(message_id = %message_id, "skipping received message without a receipt handle");
        return None;
    };

    let attributes = message
        .attributes
        .unwrap_or_default()
        .into_iter()
        .map(|(name, value)| (name.as_str().to_string(), value))
        .collect();
    let message_attributes = message
        .message_attributes
        .unwrap_or_default()
        .into_iter()
        .filter_map(|(name, value)| value.string_value.map(|v| (name, v)))
        .collect();

    Some(ReceivedMessage {
        message_id,
        receipt_handle,
        body: message.body.unwrap_or_default(),
        md5_of_body: message.md5_of_body,
        attributes,
        message_attributes,
    })
}

#[async_trait]
impl QueueService for aws_sdk_sqs::Client {
    async fn send_message_batch(
        &self,
        queue_url: &str,
        entries: Vec<SendEntry>,
    ) -> Result<BatchOutcome, BatchQueueError> {
        let entries = entries
            .into_iter()
            .map(|entry| {
                SendMessageBatchRequestEntry::builder()
                    .id(entry.id)
                    .message_body(entry.body)
                    .build()
                    .map_err(|e| BatchQueueError::BuildEntry {
                        operation: "SendMessageBatch",
                        message: e.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let output = self
            .send_message_batch()
            .queue_url(queue_url)
            .set_entries(Some(entries))
            .send()
            .await
            .map_err(|e| BatchQueueError::service("SendMessageBatch", aws_sdk_sqs::Error::from(e)))?;

        Ok(BatchOutcome {
            successful: output.successful().iter().map(|s| s.id().to_string()).collect(),
            failed: failures(output.failed()),
        })
    }

    async fn receive_messages(
        &self,
        queue_url: &str,
        request: ReceiveRequest,
    ) -> Result<Vec<ReceivedMessage>, BatchQueueError> {
        let output = self
            .receive_message()
            .queue_url(queue_url)
            .max_number_of_messages(request.max_number_of_messages)
            .set_visibility_timeout(request.visibility_timeout)
            .wait_time_seconds(request.wait_time_seconds)
            .message_system_attribute_names(MessageSystemAttributeName::All)
            .message_attribute_names("All")
            .send()
            .await
            .map_err(|e| BatchQueueError::service("ReceiveMessage", aws_sdk_sqs::Error::from(e)))?;

        Ok(output
            .messages
            .unwrap_or_default()
            .into_iter()
            .filter_map(decode_message)
            .collect())
    }

    async fn delete_message_batch(
        &self,
        queue_url: &str,
        entries: Vec<DeleteEntry>,
    ) -> Result<BatchOutcome, BatchQueueError> {
        let entries = entries
            .into_iter()
            .map(|entry| {
                DeleteMessageBatchRequestEntry::builder()
                    .id(entry.id)
                    .receipt_handle(entry.receipt_handle)
                    .build()
                    .map_err(|e| BatchQueueError::BuildEntry {
                        operation: "DeleteMessageBatch",
                        message: e.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let output = self
            .delete_message_batch()
            .queue_url(queue_url)
            .set_entries(Some(entries))
            .send()
            .await
            .map_err(|e| {
                BatchQueueError::service("DeleteMessageBatch", aws_sdk_sqs::Error::from(e))
            })?;

        Ok(BatchOutcome {
            successful: output.successful().iter().map(|s| s.id().to_string()).collect(),
            failed: failures(output.failed()),
        })
    }

    async fn change_visibility_batch(
        &self,
        queue_url: &str,
        entries: Vec<VisibilityEntry>,
    ) -> Result<BatchOutcome, BatchQueueError> {
        let entries = entries
            .into_iter()
            .map(|entry| {
                ChangeMessageVisibilityBatchRequestEntry::builder()
                    .id(entry.id)
                    .receipt_handle(entry.receipt_handle)
                    .visibility_timeout(entry.visibility_timeout)
                    .build()
                    .map_err(|e| BatchQueueError::BuildEntry {
                        operation: "ChangeMessageVisibilityBatch",
                        message: e.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let output = self
            .change_message_visibility_batch()
            .queue_url(queue_url)
            .set_entries(Some(entries))
            .send()
            .await
            .map_err(|e| {
                BatchQueueError::service(
                    "ChangeMessageVisibilityBatch",
                    aws_sdk_sqs::Error::from(e),
                )
            })?;

        Ok(BatchOutcome {
            successful: output.successful().iter().map(|s| s.id().to_string()).collect(),
            failed: failures(output.failed()),
        })
    }

    async fn default_visibility_timeout(&self, queue_url: &str) -> Result<i32, BatchQueueError> {
        let output = self
            .get_queue_attributes()
            .queue_url(queue_url)
            .attribute_names(QueueAttributeName::VisibilityTimeout)
            .send()
            .await
            .map_err(|e| {
                BatchQueueError::service("GetQueueAttributes", aws_sdk_sqs::Error::from(e))
            })?;

        let value = output
            .attributes
            .and_then(|mut attributes| attributes.remove(&QueueAttributeName::VisibilityTimeout));

        value
            .as_deref()
            .and_then(|v| v.parse::<i32>().ok())
            .ok_or_else(|| BatchQueueError::InvalidAttribute {
                name: QueueAttributeName::VisibilityTimeout.as_str().to_string(),
                value,
            })
    }

    async fn create_queue(
        &self,
        name: &str,
        attributes: HashMap<String, String>,
        tags: HashMap<String, String>,
    ) -> Result<String, BatchQueueError> {
        let attributes = attributes
            .into_iter()
            .map(|(k, v)| (QueueAttributeName::from(k.as_str()), v))
            .collect::<HashMap<_, _>>();

        let output = self
            .create_queue()
            .queue_name(name)
            .set_attributes((!attributes.is_empty()).then_some(attributes))
            .set_tags((!tags.is_empty()).then_some(tags))
            .send()
            .await
            .map_err(|e| BatchQueueError::service("CreateQueue", aws_sdk_sqs::Error::from(e)))?;

        output.queue_url.ok_or(BatchQueueError::MissingQueueUrl)
    }

    async fn delete_queue(&self, queue_url: &str) -> Result<(), BatchQueueError> {
        self.delete_queue()
            .queue_url(queue_url)
            .send()
            .await
            .map_err(|e| BatchQueueError::service("DeleteQueue", aws_sdk_sqs::Error::from(e)))?;
        Ok(())
    }
}
