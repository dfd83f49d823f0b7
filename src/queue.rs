use std::collections::HashMap;

use futures::future::join_all;
use tokio::sync::OnceCell;

use crate::errors::BatchQueueError;

mod chunk;
mod config;
mod service;

pub use chunk::chunk;
pub use config::{MAX_BATCH_SIZE, MAX_WAIT_TIME_SECONDS, QueueConfig};
pub use service::{
    BatchFailure, BatchOutcome, DeleteEntry, MessageHandle, QueueService, ReceiveRequest,
    ReceivedMessage, SendEntry, VisibilityEntry,
};

/// Batching client over a single queue.
///
/// Turns the size-limited primitive calls of a [`QueueService`] into bulk
/// operations: inputs of any length are split into batches of ten and
/// dispatched concurrently, and receives keep polling until a target count is
/// reached or the queue comes back empty.
///
/// The client is `Send + Sync` when the service is, and may be shared behind an
/// `Arc` across tasks.
pub struct BatchQueue<S = aws_sdk_sqs::Client>
where
    S: QueueService,
{
    /// The queue service the batches are dispatched to.
    service: S,

    config: QueueConfig,

    /// The queue's own visibility timeout, read on the first heartbeat that needs it.
    queue_visibility_timeout: OnceCell<i32>,
}

impl<S> BatchQueue<S>
where
    S: QueueService,
{
    pub fn new(service: S, config: QueueConfig) -> Self {
        BatchQueue {
            service,
            config,
            queue_visibility_timeout: OnceCell::new(),
        }
    }

    /// Creates a queue and returns a client bound to it.
    ///
    /// `config.queue_url` is replaced with the URL of the new queue; the other
    /// settings are kept.
    pub async fn create_queue(
        service: S,
        name: &str,
        attributes: HashMap<String, String>,
        tags: HashMap<String, String>,
        config: QueueConfig,
    ) -> Result<Self, BatchQueueError> {
        let queue_url = service.create_queue(name, attributes, tags).await?;
        tracing::info!(queue_name = name, queue_url = %queue_url, "Created queue");

        Ok(Self::new(service, QueueConfig { queue_url, ..config }))
    }

    /// Deletes the queue this client is bound to.
    pub async fn delete_queue(&self) -> Result<(), BatchQueueError> {
        self.service.delete_queue(&self.config.queue_url).await?;
        tracing::info!(queue_url = %self.config.queue_url, "Deleted queue");
        Ok(())
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    /// Sends every payload, ten per `SendMessageBatch` request.
    ///
    /// All requests run concurrently. The returned outcomes are in chunk
    /// order; entries the service rejected are listed in each outcome's
    /// `failed` and are not retried.
    ///
    /// # Errors
    ///
    /// [`BatchQueueError::Dispatch`] if any request failed outright. Every
    /// request is awaited first, so the error carries all chunk outcomes.
    pub async fn send<M>(&self, messages: &[M]) -> Result<Vec<BatchOutcome>, BatchQueueError>
    where
        M: AsRef<str>,
    {
        let queue_url = self.config.queue_url.as_str();
        let requests = chunk(messages, MAX_BATCH_SIZE).map(|batch| {
            let entries = batch
                .iter()
                .map(|m| SendEntry {
                    id: uuid::Uuid::new_v4().simple().to_string(),
                    body: m.as_ref().to_string(),
                })
                .collect::<Vec<_>>();
            tracing::debug!(queue_url, entries = entries.len(), "Dispatching SendMessageBatch");
            self.service.send_message_batch(queue_url, entries)
        });

        collect_outcomes("SendMessageBatch", join_all(requests).await)
    }

    /// Receives up to `queue_size` messages, polling `concurrency` requests at a time.
    ///
    /// A first poll is issued on its own; later rounds issue `concurrency`
    /// polls together. Each poll asks for
    /// `min(max_number_of_messages, queue_size - collected)` messages, sized
    /// before the round is dispatched. Polling stops once `queue_size`
    /// messages are collected or any poll in a round returns nothing.
    ///
    /// Concurrent rounds can overshoot: the result may hold up to
    /// `concurrency * max_number_of_messages - 1` messages beyond
    /// `queue_size`. They are all returned, none are dropped. A `queue_size`
    /// of zero returns immediately without polling.
    ///
    /// # Errors
    ///
    /// The first failed poll of a round, in dispatch order, after the whole
    /// round has completed. Messages received by that round are not returned
    /// and become visible again when their visibility timeout lapses.
    pub async fn receive(
        &self,
        queue_size: usize,
        concurrency: usize,
    ) -> Result<Vec<ReceivedMessage>, BatchQueueError> {
        let mut messages = Vec::new();
        if queue_size == 0 {
            return Ok(messages);
        }

        let concurrency = concurrency.max(1);
        let mut round_size = 1;
        loop {
            let request = self.receive_request(queue_size, messages.len());
            tracing::debug!(
                queue_url = %self.config.queue_url,
                polls = round_size,
                max_number_of_messages = request.max_number_of_messages,
                "Polling queue"
            );

            let polls = (0..round_size)
                .map(|_| self.service.receive_messages(&self.config.queue_url, request));
            let mut exhausted = false;
            for result in join_all(polls).await {
                let batch = result?;
                if batch.is_empty() {
                    exhausted = true;
                }
                messages.extend(batch);
            }

            if exhausted || messages.len() >= queue_size {
                break;
            }
            round_size = concurrency;
        }

        tracing::debug!(
            queue_url = %self.config.queue_url,
            received = messages.len(),
            "Receive complete"
        );
        Ok(messages)
    }

    /// Deletes the given deliveries, ten per `DeleteMessageBatch` request.
    ///
    /// Deleting an already-deleted message is reported in the outcome's
    /// `failed` list, not as an error.
    ///
    /// # Errors
    ///
    /// [`BatchQueueError::Dispatch`] if any request failed outright.
    pub async fn delete<M>(&self, messages: &[M]) -> Result<Vec<BatchOutcome>, BatchQueueError>
    where
        M: MessageHandle,
    {
        let queue_url = self.config.queue_url.as_str();
        let requests = chunk(messages, MAX_BATCH_SIZE).map(|batch| {
            let entries = batch
                .iter()
                .map(|m| DeleteEntry {
                    id: m.message_id().to_string(),
                    receipt_handle: m.receipt_handle().to_string(),
                })
                .collect::<Vec<_>>();
            tracing::debug!(queue_url, entries = entries.len(), "Dispatching DeleteMessageBatch");
            self.service.delete_message_batch(queue_url, entries)
        });

        collect_outcomes("DeleteMessageBatch", join_all(requests).await)
    }

    /// Extends the visibility of the given deliveries, ten per request.
    ///
    /// The new timeout is the configured `visibility_timeout` when set;
    /// otherwise the queue's own timeout, fetched once per client and reused
    /// for every later heartbeat.
    ///
    /// # Errors
    ///
    /// The attribute lookup error if the queue's timeout could not be read, or
    /// [`BatchQueueError::Dispatch`] if any request failed outright.
    pub async fn heartbeat<M>(&self, messages: &[M]) -> Result<Vec<BatchOutcome>, BatchQueueError>
    where
        M: MessageHandle,
    {
        let visibility_timeout = self.visibility_timeout().await?;
        let queue_url = self.config.queue_url.as_str();
        let requests = chunk(messages, MAX_BATCH_SIZE).map(|batch| {
            let entries = batch
                .iter()
                .map(|m| VisibilityEntry {
                    id: m.message_id().to_string(),
                    receipt_handle: m.receipt_handle().to_string(),
                    visibility_timeout,
                })
                .collect::<Vec<_>>();
            tracing::debug!(
                queue_url,
                entries = entries.len(),
                visibility_timeout,
                "Dispatching ChangeMessageVisibilityBatch"
            );
            self.service.change_visibility_batch(queue_url, entries)
        });

        collect_outcomes("ChangeMessageVisibilityBatch", join_all(requests).await)
    }

    /// The timeout heartbeats apply: the override, else the cached queue default.
    async fn visibility_timeout(&self) -> Result<i32, BatchQueueError> {
        if let Some(seconds) = self.config.visibility_timeout {
            return Ok(seconds);
        }

        let seconds = self
            .queue_visibility_timeout
            .get_or_try_init(|| async {
                let seconds = self
                    .service
                    .default_visibility_timeout(&self.config.queue_url)
                    .await?;
                tracing::debug!(
                    queue_url = %self.config.queue_url,
                    visibility_timeout = seconds,
                    "Cached queue visibility timeout"
                );
                Ok::<_, BatchQueueError>(seconds)
            })
            .await?;
        Ok(*seconds)
    }

    fn receive_request(&self, queue_size: usize, collected: usize) -> ReceiveRequest {
        ReceiveRequest {
            max_number_of_messages: self.config.poll_size(queue_size, collected),
            visibility_timeout: self.config.visibility_timeout,
            wait_time_seconds: self.config.wait_time_seconds.clamp(0, MAX_WAIT_TIME_SECONDS),
        }
    }
}

impl BatchQueue<aws_sdk_sqs::Client> {
    /// Creates a client backed by an SQS client loaded from the environment.
    pub async fn from_env(config: QueueConfig) -> Self {
        Self::new(crate::client::create_sqs_client_from_env().await, config)
    }
}

/// Joins per-chunk results, logging partial failures and keeping every outcome.
fn collect_outcomes(
    operation: &'static str,
    results: Vec<Result<BatchOutcome, BatchQueueError>>,
) -> Result<Vec<BatchOutcome>, BatchQueueError> {
    let total = results.len();
    let mut completed = Vec::with_capacity(total);
    let mut errors = Vec::new();

    for (index, result) in results.into_iter().enumerate() {
        match result {
            Ok(outcome) => {
                if !outcome.is_complete_success() {
                    tracing::warn!(
                        operation,
                        chunk = index,
                        failed = outcome.failed.len(),
                        succeeded = outcome.successful.len(),
                        "Batch request reported failed entries"
                    );
                }
                completed.push((index, outcome));
            }
            Err(error) => {
                tracing::error!(operation, chunk = index, error = %error, "Batch request failed");
                errors.push((index, error));
            }
        }
    }

    if errors.is_empty() {
        Ok(completed.into_iter().map(|(_, outcome)| outcome).collect())
    } else {
        Err(BatchQueueError::Dispatch {
            total,
            completed,
            errors,
        })
    }
}
