//! # SQS Batch Queue
//!
//! A batching and pagination layer over AWS SQS. It turns the service's
//! size-limited, single-shot calls into bulk operations over a single queue.
//!
//! ## Features
//!
//! - Send any number of messages, ten per `SendMessageBatch` request, dispatched concurrently
//! - Receive up to a target count across repeated long polls, optionally several at a time
//! - Batch delete of received messages
//! - Visibility heartbeats, using the queue's own timeout unless overridden
//! - Partial batch failures returned as data rather than errors
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sqs_batch_queue::{BatchQueue, QueueConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let queue_url = "https://sqs.region.amazonaws.com/account/queue-name";
//!     let queue = BatchQueue::from_env(QueueConfig::new(queue_url)).await;
//!
//!     queue.send(&["first", "second", "third"]).await?;
//!
//!     let messages = queue.receive(50, 5).await?;
//!     for message in &messages {
//!         println!("Processing message: {}", message.body);
//!     }
//!     queue.delete(&messages).await?;
//!
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod errors;
pub mod queue;

pub use errors::BatchQueueError;
pub use queue::{BatchOutcome, BatchQueue, MessageHandle, QueueConfig, QueueService, ReceivedMessage};
