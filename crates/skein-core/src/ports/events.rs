//! Event dispatch port - notifications around a push.

use async_trait::async_trait;

use super::QueueHandle;
use crate::domain::Message;
use crate::error::QueueError;

/// Notification emitted by `Queue::push`.
///
/// Carries the queue (as a narrow handle) and the message being pushed.
#[derive(Clone, Copy)]
pub enum QueueEvent<'a> {
    BeforePush {
        queue: &'a dyn QueueHandle,
        message: &'a Message,
    },
    AfterPush {
        queue: &'a dyn QueueHandle,
        message: &'a Message,
    },
}

impl<'a> QueueEvent<'a> {
    pub fn name(&self) -> &'static str {
        match self {
            QueueEvent::BeforePush { .. } => "before_push",
            QueueEvent::AfterPush { .. } => "after_push",
        }
    }

    pub fn message(&self) -> &'a Message {
        match *self {
            QueueEvent::BeforePush { message, .. } | QueueEvent::AfterPush { message, .. } => message,
        }
    }

    pub fn queue(&self) -> &'a dyn QueueHandle {
        match *self {
            QueueEvent::BeforePush { queue, .. } | QueueEvent::AfterPush { queue, .. } => queue,
        }
    }
}

/// Synchronous, in-line fan-out.
///
/// `dispatch` returns once every observer has seen the event. An error from
/// an observer aborts the operation that emitted the event.
#[async_trait]
pub trait EventDispatcher: Send + Sync {
    async fn dispatch(&self, event: &QueueEvent<'_>) -> Result<(), QueueError>;
}
