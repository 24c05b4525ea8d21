//! QueueBuilder - Queue の構築とワイヤリング
//!
//! # Fail-fast 設計
//! - adapter / worker が無ければ build() で BuildError
//! - middleware definition は build() 時に factory で解決する
//!   （解決できなければ Queue は作られない）

use std::sync::Arc;

use crate::config::QueueConfig;
use crate::error::QueueError;
use crate::impls::{NoopDispatcher, SignalLoop};
use crate::middleware::{DefaultPushMiddlewareFactory, MiddlewareDefinition, PushMiddlewareFactory};
use crate::ports::{Adapter, EventDispatcher, Loop, Worker};
use crate::queue::Queue;

/// Builds a `Queue`.
///
/// ```ignore
/// let queue = Queue::builder()
///     .adapter(Arc::new(InMemoryAdapter::new()))
///     .worker(Arc::new(RegistryWorker::new(registry)))
///     .middleware(MiddlewareDefinition::named("stamp", json!({"source": "api"})))
///     .build()?;
/// ```
///
/// Defaults: `NoopDispatcher`, a fresh `SignalLoop`,
/// `DefaultPushMiddlewareFactory::with_builtins()`.
#[derive(Default)]
pub struct QueueBuilder {
    adapter: Option<Arc<dyn Adapter>>,
    worker: Option<Arc<dyn Worker>>,
    run_loop: Option<Arc<dyn Loop>>,
    dispatcher: Option<Arc<dyn EventDispatcher>>,
    factory: Option<Box<dyn PushMiddlewareFactory>>,
    definitions: Vec<MiddlewareDefinition>,
}

/// BuildError は Queue 構築時のエラー
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("queue has no {0} configured")]
    Missing(&'static str),

    #[error("middleware #{index} could not be resolved: {source}")]
    Middleware {
        index: usize,
        #[source]
        source: QueueError,
    },
}

impl QueueBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn adapter(mut self, adapter: Arc<dyn Adapter>) -> Self {
        self.adapter = Some(adapter);
        self
    }

    pub fn worker(mut self, worker: Arc<dyn Worker>) -> Self {
        self.worker = Some(worker);
        self
    }

    pub fn run_loop(mut self, run_loop: Arc<dyn Loop>) -> Self {
        self.run_loop = Some(run_loop);
        self
    }

    pub fn dispatcher(mut self, dispatcher: Arc<dyn EventDispatcher>) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    pub fn factory(mut self, factory: impl PushMiddlewareFactory + 'static) -> Self {
        self.factory = Some(Box::new(factory));
        self
    }

    /// Append a middleware; the first one added is the outermost.
    pub fn middleware(mut self, definition: MiddlewareDefinition) -> Self {
        self.definitions.push(definition);
        self
    }

    /// Append the middlewares named in `config`.
    pub fn config(mut self, config: &QueueConfig) -> Self {
        self.definitions
            .extend(config.middlewares.iter().map(|m| m.to_definition()));
        self
    }

    pub fn build(self) -> Result<Queue, BuildError> {
        let adapter = self.adapter.ok_or(BuildError::Missing("adapter"))?;
        let worker = self.worker.ok_or(BuildError::Missing("worker"))?;
        let run_loop = self
            .run_loop
            .unwrap_or_else(|| Arc::new(SignalLoop::new()));
        let dispatcher = self
            .dispatcher
            .unwrap_or_else(|| Arc::new(NoopDispatcher));
        let factory = self
            .factory
            .unwrap_or_else(|| Box::new(DefaultPushMiddlewareFactory::with_builtins()));

        let middlewares = self
            .definitions
            .into_iter()
            .enumerate()
            .map(|(index, definition)| {
                factory
                    .create_push_middleware(definition)
                    .map_err(|source| BuildError::Middleware { index, source })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Queue::new(adapter, dispatcher, worker, run_loop).with_middlewares(middlewares))
    }
}
