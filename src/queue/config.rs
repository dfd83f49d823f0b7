/// The provider's per-request batch limit for send, receive, delete and visibility calls.
pub const MAX_BATCH_SIZE: usize = 10;

/// The longest long-poll wait SQS accepts, in seconds.
pub const MAX_WAIT_TIME_SECONDS: i32 = 20;

/// Configuration for a batch queue client.
///
/// Defines the target queue and the parameters used for every receive call.
/// Values outside the provider's limits are clamped by the builder methods.
///
/// # Fields
/// - `queue_url`: The URL of the queue every operation targets.
/// - `max_number_of_messages`: The maximum number of messages requested per receive call.
/// - `visibility_timeout`: Overrides the queue's visibility timeout for receives and heartbeats.
/// - `wait_time_seconds`: The wait time for long polling, in seconds.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// The URL of the queue every operation targets.
    pub queue_url: String,

    /// The maximum number of messages to receive in a single request.
    pub max_number_of_messages: i32,

    /// Visibility timeout applied to received messages and heartbeats, in seconds.
    pub visibility_timeout: Option<i32>,

    /// The wait time for long polling, in seconds.
    pub wait_time_seconds: i32,
}

impl Default for QueueConfig {
    fn default() -> Self {
        QueueConfig {
            queue_url: String::new(),
            max_number_of_messages: MAX_BATCH_SIZE as i32,
            visibility_timeout: None,
            wait_time_seconds: MAX_WAIT_TIME_SECONDS,
        }
    }
}

impl QueueConfig {
    pub fn new(queue_url: impl Into<String>) -> Self {
        QueueConfig {
            queue_url: queue_url.into(),
            ..Default::default()
        }
    }

    /// Sets the per-call receive size, clamped to `1..=10`.
    pub fn with_max_number_of_messages(mut self, max_number_of_messages: i32) -> Self {
        self.max_number_of_messages = max_number_of_messages.clamp(1, MAX_BATCH_SIZE as i32);
        self
    }

    pub fn with_visibility_timeout(mut self, seconds: i32) -> Self {
        self.visibility_timeout = Some(seconds);
        self
    }

    /// Sets the long-poll wait, clamped to `0..=20` seconds.
    pub fn with_wait_time_seconds(mut self, seconds: i32) -> Self {
        self.wait_time_seconds = seconds.clamp(0, MAX_WAIT_TIME_SECONDS);
        self
    }

    /// Messages requested by the next poll given how many are already collected.
    pub(crate) fn poll_size(&self, target: usize, collected: usize) -> i32 {
        let remaining = target.saturating_sub(collected);
        let max = self.max_number_of_messages.clamp(1, MAX_BATCH_SIZE as i32) as usize;
        remaining.min(max) as i32
    }
}
