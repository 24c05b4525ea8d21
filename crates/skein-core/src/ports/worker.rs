//! Worker port - executes a message's business logic.

use async_trait::async_trait;

use crate::domain::{JobStatus, Message, MessageId};
use crate::error::QueueError;

/// The slice of the orchestrator a worker (or event listener) may use.
///
/// Workers get this instead of the whole `Queue` so there is no ownership
/// cycle; the reference is only valid for the duration of one call.
#[async_trait]
pub trait QueueHandle: Send + Sync {
    async fn push(&self, message: Message) -> Result<Message, QueueError>;

    async fn status(&self, id: &MessageId) -> Result<JobStatus, QueueError>;
}

/// Runs one message.
///
/// Retry and backoff decisions belong here (e.g. push `message.for_retry()`
/// through the handle), not in the queue core.
#[async_trait]
pub trait Worker: Send + Sync {
    async fn process(&self, message: Message, queue: &dyn QueueHandle) -> Result<(), QueueError>;
}
