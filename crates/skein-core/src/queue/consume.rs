//! Callbacks the queue hands to the adapter while consuming.

use std::ops::ControlFlow;

use async_trait::async_trait;

use super::Queue;
use crate::domain::Message;
use crate::error::QueueError;
use crate::ports::{DrainHandler, SubscribeHandler};

/// Continuation for a bounded drain.
///
/// The bound and the loop are checked strictly before handling, so a
/// `Break` always means "this message was not touched".
pub(super) struct Drain<'q> {
    queue: &'q Queue,
    max: usize,
    count: usize,
}

impl<'q> Drain<'q> {
    pub(super) fn new(queue: &'q Queue, max: usize) -> Self {
        Self { queue, max, count: 0 }
    }

    pub(super) fn count(&self) -> usize {
        self.count
    }

    fn should_stop(&self) -> bool {
        (self.max > 0 && self.max <= self.count) || !self.queue.can_continue()
    }
}

#[async_trait]
impl<'q> DrainHandler for Drain<'q> {
    async fn offer(&mut self, message: Message) -> Result<ControlFlow<()>, QueueError> {
        if self.should_stop() {
            return Ok(ControlFlow::Break(()));
        }

        self.queue.handle(message).await?;
        self.count += 1;
        Ok(ControlFlow::Continue(()))
    }
}

/// Handler for continuous mode: every delivered message is handled.
pub(super) struct Listen<'q> {
    queue: &'q Queue,
}

impl<'q> Listen<'q> {
    pub(super) fn new(queue: &'q Queue) -> Self {
        Self { queue }
    }
}

#[async_trait]
impl<'q> SubscribeHandler for Listen<'q> {
    async fn on_message(&self, message: Message) -> Result<(), QueueError> {
        self.queue.handle(message).await
    }
}
