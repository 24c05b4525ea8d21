use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::domain::Message;
use crate::error::QueueError;
use crate::ports::{QueueHandle, Worker};

/// Business logic for one message name.
///
/// Gets the whole `Message` so it can decode the payload as it likes, plus
/// the queue handle for pushing follow-ups or retries.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, message: &Message, queue: &dyn QueueHandle) -> Result<(), QueueError>;
}

/// Registry of handlers (message name -> handler).
///
/// Design:
/// - Built during initialization (mutable).
/// - Used during processing (immutable).
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn MessageHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    pub fn register(
        &mut self,
        name: impl Into<String>,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<(), QueueError> {
        let name = name.into();
        if self.handlers.contains_key(&name) {
            return Err(QueueError::DuplicateHandler(name));
        }
        self.handlers.insert(name, handler);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn MessageHandler>> {
        self.handlers.get(name)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

/// Worker that dispatches on the message name.
pub struct RegistryWorker {
    registry: Arc<HandlerRegistry>,
}

impl RegistryWorker {
    pub fn new(registry: Arc<HandlerRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }
}

#[async_trait]
impl Worker for RegistryWorker {
    async fn process(&self, message: Message, queue: &dyn QueueHandle) -> Result<(), QueueError> {
        let handler = self
            .registry
            .get(message.name())
            .ok_or_else(|| QueueError::HandlerNotFound(message.name().to_string()))?;

        debug!(message = message.name(), id = ?message.id(), attempt = message.attempt(), "processing message");
        handler.handle(&message, queue).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::domain::{JobStatus, MessageId};
    use serde_json::json;

    #[derive(Default)]
    struct PushLog {
        pushed: Mutex<Vec<Message>>,
    }

    #[async_trait]
    impl QueueHandle for PushLog {
        async fn push(&self, message: Message) -> Result<Message, QueueError> {
            self.pushed.lock().unwrap().push(message.clone());
            Ok(message)
        }

        async fn status(&self, id: &MessageId) -> Result<JobStatus, QueueError> {
            Err(QueueError::UnknownId(id.to_string()))
        }
    }

    struct OkHandler;

    #[async_trait]
    impl MessageHandler for OkHandler {
        async fn handle(&self, _message: &Message, _queue: &dyn QueueHandle) -> Result<(), QueueError> {
            Ok(())
        }
    }

    /// Pushes a retry until the third attempt.
    struct FlakyHandler;

    #[async_trait]
    impl MessageHandler for FlakyHandler {
        async fn handle(&self, message: &Message, queue: &dyn QueueHandle) -> Result<(), QueueError> {
            if message.attempt() < 2 {
                queue.push(message.for_retry()).await?;
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn worker_runs_registered_handler() {
        let mut reg = HandlerRegistry::new();
        reg.register("ok", Arc::new(OkHandler)).unwrap();
        let worker = RegistryWorker::new(Arc::new(reg));

        worker
            .process(Message::new("ok", json!({})), &PushLog::default())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn worker_errors_when_handler_missing() {
        let worker = RegistryWorker::new(Arc::new(HandlerRegistry::new()));

        let err = worker
            .process(Message::new("missing", json!({})), &PushLog::default())
            .await
            .unwrap_err();
        assert!(matches!(err, QueueError::HandlerNotFound(name) if name == "missing"));
    }

    #[tokio::test]
    async fn handler_can_push_through_the_queue_handle() {
        let mut reg = HandlerRegistry::new();
        reg.register("flaky", Arc::new(FlakyHandler)).unwrap();
        let worker = RegistryWorker::new(Arc::new(reg));
        let queue = PushLog::default();

        worker
            .process(Message::new("flaky", json!({"n": 1})), &queue)
            .await
            .unwrap();

        let pushed = queue.pushed.lock().unwrap();
        assert_eq!(pushed.len(), 1);
        assert_eq!(pushed[0].attempt(), 1);
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut reg = HandlerRegistry::new();
        reg.register("ok", Arc::new(OkHandler)).unwrap();
        let err = reg.register("ok", Arc::new(OkHandler)).unwrap_err();
        assert!(matches!(err, QueueError::DuplicateHandler(name) if name == "ok"));
        assert_eq!(reg.len(), 1);
    }
}
