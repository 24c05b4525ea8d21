//! In-memory adapter implementation.

use std::collections::{HashMap, VecDeque};
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{Mutex, Notify};
use tracing::{debug, warn};

use super::record::MessageRecord;
use crate::domain::{JobStatus, META_ID, META_STATUS, Message, MessageId};
use crate::error::QueueError;
use crate::observability::QueueCounts;
use crate::ports::{
    Adapter, Clock, DrainAdapter, DrainHandler, IdGenerator, Loop, PushAdapter, SubscribeAdapter,
    SubscribeHandler, SystemClock, UlidGenerator,
};

pub const META_PUSHED_AT: &str = "pushed_at";

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// In-memory adapter state.
#[derive(Default)]
struct InMemoryState {
    /// All records (single source of truth).
    records: HashMap<MessageId, MessageRecord>,

    /// Waiting messages in delivery order (ids only).
    ready: VecDeque<MessageId>,
}

impl InMemoryState {
    /// Claim the head of the ready queue (Waiting -> Running).
    fn claim_next(&mut self) -> Result<Option<(MessageId, Message)>, QueueError> {
        while let Some(id) = self.ready.pop_front() {
            let Some(record) = self.records.get_mut(&id) else {
                continue;
            };
            record.transition(JobStatus::Running)?;
            return Ok(Some((id, record.message.clone())));
        }
        Ok(None)
    }

    fn finish(&mut self, id: MessageId, status: JobStatus) -> Result<(), QueueError> {
        let record = self
            .records
            .get_mut(&id)
            .ok_or_else(|| QueueError::UnknownId(id.to_string()))?;
        record.transition(status)
    }

    /// Put an unhandled claim back at the head so it is offered first next time.
    fn release(&mut self, id: MessageId) -> Result<(), QueueError> {
        let record = self
            .records
            .get_mut(&id)
            .ok_or_else(|| QueueError::UnknownId(id.to_string()))?;
        record.release()?;
        self.ready.push_front(id);
        Ok(())
    }

    fn counts(&self) -> QueueCounts {
        let mut counts = QueueCounts::default();
        for record in self.records.values() {
            match record.status {
                JobStatus::Waiting => counts.waiting += 1,
                JobStatus::Running => counts.running += 1,
                JobStatus::Done => counts.done += 1,
                JobStatus::Failed => counts.failed += 1,
            }
        }
        counts
    }
}

#[derive(Debug, Clone, Copy)]
struct Capabilities {
    push: bool,
    drain: bool,
    subscribe: bool,
}

/// Process-local adapter: FIFO delivery, status tracking, no durability.
///
/// Records `Running` when a message is claimed and `Done`/`Failed` from the
/// outcome of the handler, which makes it the status side channel for
/// whatever worker runs the message.
pub struct InMemoryAdapter {
    state: Mutex<InMemoryState>,
    notify: Notify,
    ids: Box<dyn IdGenerator>,
    clock: Arc<dyn Clock>,
    run_loop: Option<Arc<dyn Loop>>,
    poll_interval: Duration,
    capabilities: Capabilities,
}

impl InMemoryAdapter {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(InMemoryState::default()),
            notify: Notify::new(),
            ids: Box::new(UlidGenerator::new(SystemClock)),
            clock: Arc::new(SystemClock),
            run_loop: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
            capabilities: Capabilities {
                push: true,
                drain: true,
                subscribe: true,
            },
        }
    }

    /// Use `clock` for both id timestamps and `pushed_at`.
    pub fn with_clock<C: Clock + Clone + 'static>(mut self, clock: C) -> Self {
        self.ids = Box::new(UlidGenerator::new(clock.clone()));
        self.clock = Arc::new(clock);
        self
    }

    /// Loop checked by `subscribe` between deliveries. Without one,
    /// `subscribe` only ends when its future is dropped.
    pub fn with_loop(mut self, run_loop: Arc<dyn Loop>) -> Self {
        self.run_loop = Some(run_loop);
        self
    }

    /// Upper bound on how long an idle `subscribe` waits before re-checking
    /// its loop.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn without_push(mut self) -> Self {
        self.capabilities.push = false;
        self
    }

    pub fn without_drain(mut self) -> Self {
        self.capabilities.drain = false;
        self
    }

    pub fn without_subscribe(mut self) -> Self {
        self.capabilities.subscribe = false;
        self
    }

    pub async fn counts(&self) -> QueueCounts {
        self.state.lock().await.counts()
    }

    /// Stored copy of a message (with id and last status in its metadata).
    pub async fn message(&self, id: &MessageId) -> Option<Message> {
        let state = self.state.lock().await;
        state.records.get(id).map(|record| record.message.clone())
    }

    /// How many times the message was handed to a consumer, released claims
    /// included.
    pub async fn deliveries(&self, id: &MessageId) -> Option<u32> {
        let state = self.state.lock().await;
        state.records.get(id).map(|record| record.deliveries)
    }

    fn stop_requested(&self) -> bool {
        self.run_loop
            .as_ref()
            .is_some_and(|run_loop| !run_loop.can_continue())
    }

    async fn claim_next(&self) -> Result<Option<(MessageId, Message)>, QueueError> {
        self.state.lock().await.claim_next()
    }

    async fn finish(&self, id: MessageId, status: JobStatus) -> Result<(), QueueError> {
        self.state.lock().await.finish(id, status)
    }

    /// Mark a failed handle and hand back the handler's error, which takes
    /// precedence over any bookkeeping failure.
    async fn fail(&self, id: MessageId, err: QueueError) -> QueueError {
        if let Err(mark_err) = self.finish(id, JobStatus::Failed).await {
            warn!(%id, error = %mark_err, "could not mark message as failed");
        }
        err
    }
}

impl Default for InMemoryAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Adapter for InMemoryAdapter {
    async fn status(&self, id: &MessageId) -> Result<JobStatus, QueueError> {
        let state = self.state.lock().await;
        state
            .records
            .get(id)
            .map(|record| record.status)
            .ok_or_else(|| QueueError::UnknownId(id.to_string()))
    }

    fn as_pusher(&self) -> Option<&dyn PushAdapter> {
        self.capabilities.push.then_some(self as &dyn PushAdapter)
    }

    fn as_drainer(&self) -> Option<&dyn DrainAdapter> {
        self.capabilities.drain.then_some(self as &dyn DrainAdapter)
    }

    fn as_subscriber(&self) -> Option<&dyn SubscribeAdapter> {
        self.capabilities.subscribe.then_some(self as &dyn SubscribeAdapter)
    }
}

#[async_trait]
impl PushAdapter for InMemoryAdapter {
    async fn push(&self, mut message: Message) -> Result<Message, QueueError> {
        // every push stores a new message; identity from an earlier push is dropped
        message.metadata_mut().remove(META_ID);
        message.metadata_mut().remove(META_STATUS);

        let id = self.ids.generate_message_id();
        message.assign_id(id)?;
        message.metadata_mut().insert(
            META_PUSHED_AT.to_string(),
            Value::String(self.clock.now().to_rfc3339()),
        );

        let record = MessageRecord::new(message);
        let stored = record.message.clone();
        {
            let mut state = self.state.lock().await;
            state.records.insert(id, record);
            state.ready.push_back(id);
        }

        // Notify outside the lock
        self.notify.notify_one();
        Ok(stored)
    }
}

#[async_trait]
impl DrainAdapter for InMemoryAdapter {
    async fn run_existing(&self, handler: &mut dyn DrainHandler) -> Result<(), QueueError> {
        // The lock is never held across the handler: it may push into this adapter.
        while let Some((id, message)) = self.claim_next().await? {
            match handler.offer(message).await {
                Ok(ControlFlow::Continue(())) => self.finish(id, JobStatus::Done).await?,
                Ok(ControlFlow::Break(())) => {
                    self.state.lock().await.release(id)?;
                    debug!(%id, "drain stopped, message released");
                    return Ok(());
                }
                Err(err) => return Err(self.fail(id, err).await),
            }
        }
        Ok(())
    }
}

#[async_trait]
impl SubscribeAdapter for InMemoryAdapter {
    async fn subscribe(&self, handler: &dyn SubscribeHandler) -> Result<(), QueueError> {
        loop {
            if self.stop_requested() {
                return Ok(());
            }

            match self.claim_next().await? {
                Some((id, message)) => match handler.on_message(message).await {
                    Ok(()) => self.finish(id, JobStatus::Done).await?,
                    Err(err) => return Err(self.fail(id, err).await),
                },
                None => {
                    tokio::select! {
                        _ = self.notify.notified() => {},
                        _ = tokio::time::sleep(self.poll_interval) => {},
                    }
                }
            }
        }
    }
}
