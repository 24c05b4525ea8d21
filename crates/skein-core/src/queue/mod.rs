//! Queue orchestrator: push pipeline, bounded drain, continuous listen.
//!
//! The queue owns no message state. Durable state (and the status side
//! channel) lives in the adapter; execution lives in the worker.

mod consume;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use self::consume::{Drain, Listen};
use crate::app::QueueBuilder;
use crate::domain::{JobStatus, Message, MessageId};
use crate::error::QueueError;
use crate::middleware::{PushMiddleware, PushNext};
use crate::ports::{Adapter, EventDispatcher, Loop, QueueEvent, QueueHandle, Worker};

/// Composes one adapter, worker, loop and event dispatcher.
///
/// Collaborators are fixed for the lifetime of the instance. A single
/// logical consumer is assumed: `run` and `listen` handle one message at a
/// time and never spawn work of their own.
pub struct Queue {
    adapter: Arc<dyn Adapter>,
    dispatcher: Arc<dyn EventDispatcher>,
    worker: Arc<dyn Worker>,
    run_loop: Arc<dyn Loop>,
    middlewares: Vec<Arc<dyn PushMiddleware>>,
}

impl Queue {
    pub fn new(
        adapter: Arc<dyn Adapter>,
        dispatcher: Arc<dyn EventDispatcher>,
        worker: Arc<dyn Worker>,
        run_loop: Arc<dyn Loop>,
    ) -> Self {
        Self {
            adapter,
            dispatcher,
            worker,
            run_loop,
            middlewares: Vec::new(),
        }
    }

    pub fn builder() -> QueueBuilder {
        QueueBuilder::new()
    }

    /// Push middlewares, outermost first.
    pub fn with_middlewares(mut self, middlewares: Vec<Arc<dyn PushMiddleware>>) -> Self {
        self.middlewares = middlewares;
        self
    }

    pub fn middlewares(&self) -> &[Arc<dyn PushMiddleware>] {
        &self.middlewares
    }

    /// Push a message into the queue.
    ///
    /// BeforePush is dispatched first and always fires, even when the
    /// adapter then fails (including `BehaviorNotSupported`). AfterPush only
    /// fires once the middleware chain and adapter have succeeded. Returns
    /// the message as the adapter left it, id assigned.
    pub async fn push(&self, message: Message) -> Result<Message, QueueError> {
        debug!(message = message.name(), "preparing to push message");
        self.dispatcher
            .dispatch(&QueueEvent::BeforePush {
                queue: self,
                message: &message,
            })
            .await?;

        let pusher = self
            .adapter
            .as_pusher()
            .ok_or(QueueError::not_supported("push"))?;
        let message = PushNext::new(&self.middlewares, pusher).run(message).await?;

        debug!(message = message.name(), id = ?message.id(), "successfully pushed message");
        self.dispatcher
            .dispatch(&QueueEvent::AfterPush {
                queue: self,
                message: &message,
            })
            .await?;

        Ok(message)
    }

    /// Handle the messages that are already waiting, then return.
    ///
    /// `max == 0` means no count bound. Before each message the bound and
    /// `Loop::can_continue` are checked; once either says stop, the offered
    /// message is left unhandled and the drain ends. Returns how many
    /// messages were handled.
    pub async fn run(&self, max: usize) -> Result<usize, QueueError> {
        debug!(max, "start processing queue messages");
        let drainer = self
            .adapter
            .as_drainer()
            .ok_or(QueueError::not_supported("run_existing"))?;

        let mut drain = Drain::new(self, max);
        drainer.run_existing(&mut drain).await?;

        let count = drain.count();
        debug!(count, "finish processing queue messages");
        Ok(count)
    }

    /// Handle messages as they arrive until the adapter stops delivering.
    ///
    /// There is no per-message cancellation check here; stopping is up to
    /// the adapter (e.g. an adapter polling the same loop).
    pub async fn listen(&self) -> Result<(), QueueError> {
        debug!("start listening to the queue");
        let subscriber = self
            .adapter
            .as_subscriber()
            .ok_or(QueueError::not_supported("subscribe"))?;

        subscriber.subscribe(&Listen::new(self)).await?;

        debug!("finish listening to the queue");
        Ok(())
    }

    /// Status of a pushed message. Fails with `QueueError::UnknownId` for ids
    /// the adapter never issued.
    pub async fn status(&self, id: &MessageId) -> Result<JobStatus, QueueError> {
        self.adapter.status(id).await
    }

    pub(crate) fn can_continue(&self) -> bool {
        self.run_loop.can_continue()
    }

    /// Worker errors are not caught: they end the current run/listen.
    pub(crate) async fn handle(&self, message: Message) -> Result<(), QueueError> {
        self.worker.process(message, self).await
    }
}

#[async_trait]
impl QueueHandle for Queue {
    async fn push(&self, message: Message) -> Result<Message, QueueError> {
        Queue::push(self, message).await
    }

    async fn status(&self, id: &MessageId) -> Result<JobStatus, QueueError> {
        Queue::status(self, id).await
    }
}
