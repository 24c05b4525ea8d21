//! Adapter port - the durable backend behind a queue.
//!
//! A backend may support any subset of push / drain / subscribe. Instead of
//! one fat trait with "unsupported" stubs, each capability is its own trait
//! and `Adapter` exposes which ones exist. The orchestrator turns a missing
//! capability into `QueueError::BehaviorNotSupported` at call time.

use std::ops::ControlFlow;

use async_trait::async_trait;

use crate::domain::{JobStatus, Message, MessageId};
use crate::error::QueueError;

/// Base adapter capability: status lookup plus capability discovery.
#[async_trait]
pub trait Adapter: Send + Sync {
    /// Status of a previously pushed message.
    ///
    /// Fails with `QueueError::UnknownId` for ids this adapter never issued.
    async fn status(&self, id: &MessageId) -> Result<JobStatus, QueueError>;

    fn as_pusher(&self) -> Option<&dyn PushAdapter> {
        None
    }

    fn as_drainer(&self) -> Option<&dyn DrainAdapter> {
        None
    }

    fn as_subscriber(&self) -> Option<&dyn SubscribeAdapter> {
        None
    }
}

/// Durable enqueue.
#[async_trait]
pub trait PushAdapter: Send + Sync {
    /// Store the message and return it with its id assigned.
    async fn push(&self, message: Message) -> Result<Message, QueueError>;
}

/// Per-message continuation used while draining.
#[async_trait]
pub trait DrainHandler: Send {
    /// Offered each available message in order. `Break` means the message
    /// was NOT handled and the drain must end.
    async fn offer(&mut self, message: Message) -> Result<ControlFlow<()>, QueueError>;
}

/// Bounded drain of already-enqueued messages.
#[async_trait]
pub trait DrainAdapter: Send + Sync {
    /// Offer waiting messages one at a time until none remain or the
    /// handler breaks. Errors from the handler must be propagated.
    async fn run_existing(&self, handler: &mut dyn DrainHandler) -> Result<(), QueueError>;
}

/// Per-message callback used while subscribed.
#[async_trait]
pub trait SubscribeHandler: Send + Sync {
    async fn on_message(&self, message: Message) -> Result<(), QueueError>;
}

/// Continuous delivery.
#[async_trait]
pub trait SubscribeAdapter: Send + Sync {
    /// Deliver messages as they arrive until the adapter observes
    /// cancellation. Errors from the handler must be propagated.
    async fn subscribe(&self, handler: &dyn SubscribeHandler) -> Result<(), QueueError>;
}
