//! Event dispatchers.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::trace;

use crate::error::QueueError;
use crate::ports::{EventDispatcher, QueueEvent};

/// Observer of queue events. Returning an error vetoes the operation.
#[async_trait]
pub trait EventListener: Send + Sync {
    async fn on_event(&self, event: &QueueEvent<'_>) -> Result<(), QueueError>;
}

/// Delivers every event to each listener, in registration order.
///
/// Stops at the first listener error; later listeners do not see the event.
#[derive(Default)]
pub struct ListenerDispatcher {
    listeners: Vec<Arc<dyn EventListener>>,
}

impl ListenerDispatcher {
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    pub fn with_listener(mut self, listener: Arc<dyn EventListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    pub fn add_listener(&mut self, listener: Arc<dyn EventListener>) {
        self.listeners.push(listener);
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

#[async_trait]
impl EventDispatcher for ListenerDispatcher {
    async fn dispatch(&self, event: &QueueEvent<'_>) -> Result<(), QueueError> {
        trace!(event = event.name(), message = event.message().name(), listeners = self.listeners.len(), "dispatching");
        for listener in &self.listeners {
            listener.on_event(event).await?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopDispatcher;

#[async_trait]
impl EventDispatcher for NoopDispatcher {
    async fn dispatch(&self, _event: &QueueEvent<'_>) -> Result<(), QueueError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::domain::{JobStatus, Message, MessageId};
    use crate::ports::QueueHandle;
    use serde_json::json;

    struct NullQueue;

    #[async_trait]
    impl QueueHandle for NullQueue {
        async fn push(&self, message: Message) -> Result<Message, QueueError> {
            Ok(message)
        }

        async fn status(&self, id: &MessageId) -> Result<JobStatus, QueueError> {
            Err(QueueError::UnknownId(id.to_string()))
        }
    }

    struct Journal {
        label: &'static str,
        entries: Arc<Mutex<Vec<String>>>,
        veto: bool,
    }

    #[async_trait]
    impl EventListener for Journal {
        async fn on_event(&self, event: &QueueEvent<'_>) -> Result<(), QueueError> {
            self.entries
                .lock()
                .unwrap()
                .push(format!("{}:{}", self.label, event.name()));
            if self.veto {
                return Err(QueueError::Vetoed(self.label.into()));
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn listeners_run_in_order_and_stop_at_veto() {
        let entries = Arc::new(Mutex::new(Vec::new()));
        let listener = |label, veto| -> Arc<dyn EventListener> {
            Arc::new(Journal {
                label,
                entries: Arc::clone(&entries),
                veto,
            })
        };
        let dispatcher = ListenerDispatcher::new()
            .with_listener(listener("first", false))
            .with_listener(listener("second", true))
            .with_listener(listener("third", false));

        let message = Message::new("job", json!({}));
        let event = QueueEvent::BeforePush {
            queue: &NullQueue,
            message: &message,
        };
        let err = dispatcher.dispatch(&event).await.unwrap_err();

        assert!(matches!(err, QueueError::Vetoed(label) if label == "second"));
        assert_eq!(
            *entries.lock().unwrap(),
            vec!["first:before_push", "second:before_push"]
        );
    }

    #[tokio::test]
    async fn noop_accepts_everything() {
        let message = Message::new("job", json!({}));
        let event = QueueEvent::AfterPush {
            queue: &NullQueue,
            message: &message,
        };
        NoopDispatcher.dispatch(&event).await.unwrap();
    }
}
