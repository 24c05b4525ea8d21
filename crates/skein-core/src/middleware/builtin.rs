//! Middlewares shipped with the core.

use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::debug;

use super::{PushCallback, PushMiddleware, PushNext};
use crate::domain::{META_ID, META_STATUS, Message};
use crate::error::QueueError;

/// Wraps an `Invocable` definition.
pub struct CallbackMiddleware {
    callback: PushCallback,
}

impl CallbackMiddleware {
    pub fn new(callback: PushCallback) -> Self {
        Self { callback }
    }
}

#[async_trait]
impl PushMiddleware for CallbackMiddleware {
    async fn process_push(&self, message: Message, next: PushNext<'_>) -> Result<Message, QueueError> {
        let message = (self.callback)(message)?;
        next.run(message).await
    }
}

/// Merges a fixed set of entries into every pushed message's metadata.
#[derive(Debug, Clone)]
pub struct StampMiddleware {
    entries: Map<String, Value>,
}

impl StampMiddleware {
    pub const NAME: &'static str = "stamp";

    pub fn new(entries: Map<String, Value>) -> Result<Self, QueueError> {
        if let Some(key) = entries.keys().find(|k| *k == META_ID || *k == META_STATUS) {
            return Err(QueueError::UnresolvableDefinition(format!(
                "stamp: '{key}' is reserved for the adapter"
            )));
        }
        Ok(Self { entries })
    }

    /// Params must be a JSON object.
    pub fn from_params(params: &Value) -> Result<Self, QueueError> {
        match params {
            Value::Object(entries) => Self::new(entries.clone()),
            other => Err(QueueError::UnresolvableDefinition(format!(
                "stamp: params must be an object, got {other}"
            ))),
        }
    }
}

#[async_trait]
impl PushMiddleware for StampMiddleware {
    async fn process_push(&self, mut message: Message, next: PushNext<'_>) -> Result<Message, QueueError> {
        for (key, value) in &self.entries {
            message.metadata_mut().insert(key.clone(), value.clone());
        }
        next.run(message).await
    }
}

/// Drops pushes that were already forwarded once by this instance.
///
/// The dedup key is `name:payload`, or the value of a metadata entry when
/// constructed with `{"key": "<metadata key>"}`. Messages lacking that entry
/// are always forwarded. A dropped message comes back with
/// `deduplicated = true` and no id.
#[derive(Debug, Default)]
pub struct DeduplicateMiddleware {
    key: Option<String>,
    seen: Mutex<HashSet<String>>,
}

impl DeduplicateMiddleware {
    pub const NAME: &'static str = "deduplicate";
    pub const META_DEDUPLICATED: &'static str = "deduplicated";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn by_metadata(key: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
            seen: Mutex::default(),
        }
    }

    pub fn from_params(params: &Value) -> Result<Self, QueueError> {
        match params {
            Value::Null => Ok(Self::new()),
            Value::Object(map) if map.is_empty() => Ok(Self::new()),
            Value::Object(map) => match map.get("key") {
                Some(Value::String(key)) if map.len() == 1 => Ok(Self::by_metadata(key.clone())),
                _ => Err(QueueError::UnresolvableDefinition(
                    "deduplicate: only a string 'key' param is accepted".into(),
                )),
            },
            other => Err(QueueError::UnresolvableDefinition(format!(
                "deduplicate: params must be an object, got {other}"
            ))),
        }
    }

    fn dedup_key(&self, message: &Message) -> Option<String> {
        match &self.key {
            Some(key) => message.metadata().get(key).map(|v| v.to_string()),
            None => Some(format!("{}:{}", message.name(), message.payload())),
        }
    }
}

#[async_trait]
impl PushMiddleware for DeduplicateMiddleware {
    async fn process_push(&self, mut message: Message, next: PushNext<'_>) -> Result<Message, QueueError> {
        let Some(key) = self.dedup_key(&message) else {
            return next.run(message).await;
        };

        // the key is taken before forwarding and given back only if the push fails
        let reserved = self
            .seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.clone());
        if !reserved {
            debug!(message = message.name(), key = %key, "dropping duplicate push");
            message
                .metadata_mut()
                .insert(Self::META_DEDUPLICATED.to_string(), Value::Bool(true));
            return Ok(message);
        }

        match next.run(message).await {
            Ok(pushed) => Ok(pushed),
            Err(err) => {
                self.seen
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .remove(&key);
                Err(err)
            }
        }
    }
}
