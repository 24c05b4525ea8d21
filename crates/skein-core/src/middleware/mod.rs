//! Push middleware: interceptors wrapped around the adapter's enqueue step.
//!
//! Middlewares run outermost first. Each one receives the message and a
//! `PushNext` for the rest of the chain; calling `next.run(message)`
//! forwards, returning without calling it short-circuits the push.

mod builtin;
mod factory;

pub use builtin::{CallbackMiddleware, DeduplicateMiddleware, StampMiddleware};
pub use factory::{
    DefaultPushMiddlewareFactory, MiddlewareConstructor, MiddlewareDefinition, PushCallback,
    PushMiddlewareFactory,
};

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::Message;
use crate::error::QueueError;
use crate::ports::PushAdapter;

#[async_trait]
pub trait PushMiddleware: Send + Sync {
    async fn process_push(&self, message: Message, next: PushNext<'_>) -> Result<Message, QueueError>;
}

/// The remainder of the chain, ending in the adapter.
pub struct PushNext<'a> {
    rest: &'a [Arc<dyn PushMiddleware>],
    adapter: &'a dyn PushAdapter,
}

impl<'a> PushNext<'a> {
    pub fn new(chain: &'a [Arc<dyn PushMiddleware>], adapter: &'a dyn PushAdapter) -> Self {
        Self { rest: chain, adapter }
    }

    pub async fn run(self, message: Message) -> Result<Message, QueueError> {
        match self.rest.split_first() {
            Some((head, rest)) => {
                let next = PushNext {
                    rest,
                    adapter: self.adapter,
                };
                head.process_push(message, next).await
            }
            None => self.adapter.push(message).await,
        }
    }
}
