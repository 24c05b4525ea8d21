//! Message: the unit of work moved through the queue.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{JobStatus, MessageId};
use crate::error::QueueError;

pub const META_ID: &str = "id";
pub const META_STATUS: &str = "status";
pub const META_ATTEMPT: &str = "attempt";

/// Name + payload + a mutable metadata bag.
///
/// `name` and `payload` are fixed once constructed. The adapter writes the
/// assigned id into the metadata on enqueue; the last known status rides
/// along under `status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    name: String,
    payload: Value,
    #[serde(default)]
    metadata: BTreeMap<String, Value>,
}

impl Message {
    pub fn new(name: impl Into<String>, payload: Value) -> Self {
        Self {
            name: name.into(),
            payload,
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    pub fn metadata(&self) -> &BTreeMap<String, Value> {
        &self.metadata
    }

    pub fn metadata_mut(&mut self) -> &mut BTreeMap<String, Value> {
        &mut self.metadata
    }

    /// Id assigned by the adapter, if the message has been pushed.
    pub fn id(&self) -> Option<MessageId> {
        self.metadata
            .get(META_ID)
            .and_then(Value::as_str)
            .and_then(|s| s.parse().ok())
    }

    /// Record the id handed out by the adapter.
    ///
    /// The id is immutable once set: assigning the same id again is a no-op,
    /// a different one is rejected.
    pub fn assign_id(&mut self, id: MessageId) -> Result<(), QueueError> {
        match self.id() {
            Some(current) if current == id => Ok(()),
            Some(current) => Err(QueueError::IdAlreadyAssigned {
                current: current.to_string(),
                requested: id.to_string(),
            }),
            None => {
                self.metadata
                    .insert(META_ID.to_string(), Value::String(id.to_string()));
                Ok(())
            }
        }
    }

    pub fn status(&self) -> Option<JobStatus> {
        self.metadata
            .get(META_STATUS)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    pub fn set_status(&mut self, status: JobStatus) {
        self.metadata
            .insert(META_STATUS.to_string(), Value::String(status.as_str().into()));
    }

    /// How many times this work has been pushed before (0 for a first push).
    pub fn attempt(&self) -> u64 {
        self.metadata
            .get(META_ATTEMPT)
            .and_then(Value::as_u64)
            .unwrap_or(0)
    }

    /// Build the message a worker pushes to retry this one.
    ///
    /// Same name, payload and metadata, but without id/status so the adapter
    /// hands out a fresh id, and with the attempt counter bumped.
    pub fn for_retry(&self) -> Message {
        let mut next = self.clone();
        next.metadata.remove(META_ID);
        next.metadata.remove(META_STATUS);
        next.metadata
            .insert(META_ATTEMPT.to_string(), Value::from(self.attempt() + 1));
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use ulid::Ulid;

    #[test]
    fn new_message_has_no_id_or_status() {
        let msg = Message::new("send-email", json!({"to": "a@example.com"}));
        assert_eq!(msg.name(), "send-email");
        assert_eq!(msg.id(), None);
        assert_eq!(msg.status(), None);
        assert_eq!(msg.attempt(), 0);
    }

    #[test]
    fn id_is_immutable_once_assigned() {
        let mut msg = Message::new("send-email", json!({}));
        let first = MessageId::from_ulid(Ulid::new());
        let second = MessageId::from_ulid(Ulid::new());

        msg.assign_id(first).unwrap();
        msg.assign_id(first).unwrap();
        let err = msg.assign_id(second).unwrap_err();

        assert!(matches!(err, QueueError::IdAlreadyAssigned { .. }));
        assert_eq!(msg.id(), Some(first));
    }

    #[test]
    fn status_is_stored_in_metadata() {
        let mut msg = Message::new("send-email", json!({}));
        msg.set_status(JobStatus::Running);
        assert_eq!(msg.metadata()[META_STATUS], json!("running"));
        assert_eq!(msg.status(), Some(JobStatus::Running));
    }

    #[test]
    fn retry_drops_identity_and_bumps_attempt() {
        let mut msg = Message::new("send-email", json!({"n": 1})).with_metadata("trace", json!("t-1"));
        msg.assign_id(MessageId::from_ulid(Ulid::new())).unwrap();
        msg.set_status(JobStatus::Failed);

        let retry = msg.for_retry();

        assert_eq!(retry.name(), msg.name());
        assert_eq!(retry.payload(), msg.payload());
        assert_eq!(retry.id(), None);
        assert_eq!(retry.status(), None);
        assert_eq!(retry.attempt(), 1);
        assert_eq!(retry.metadata()["trace"], json!("t-1"));
        assert_eq!(retry.for_retry().attempt(), 2);
    }
}
