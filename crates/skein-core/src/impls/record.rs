//! Message record: message + status bookkeeping for the in-memory adapter.

use crate::domain::{JobStatus, Message};
use crate::error::QueueError;

/// Single source of truth for one stored message.
///
/// All status changes go through `transition` so terminal states stay
/// terminal. `release` is the one exception: it hands an unhandled claim
/// back (Running -> Waiting) when a drain stops before handling it.
#[derive(Debug, Clone)]
pub struct MessageRecord {
    pub message: Message,
    pub status: JobStatus,

    /// Number of times the message was handed to a consumer (released
    /// claims included).
    pub deliveries: u32,
}

impl MessageRecord {
    pub fn new(mut message: Message) -> Self {
        message.set_status(JobStatus::Waiting);
        Self {
            message,
            status: JobStatus::Waiting,
            deliveries: 0,
        }
    }

    pub fn transition(&mut self, next: JobStatus) -> Result<(), QueueError> {
        if !self.status.can_transition_to(next) {
            return Err(QueueError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        if next == JobStatus::Running {
            self.deliveries += 1;
        }
        self.set(next);
        Ok(())
    }

    /// Give back a claim that was never handled.
    pub fn release(&mut self) -> Result<(), QueueError> {
        if self.status != JobStatus::Running {
            return Err(QueueError::InvalidTransition {
                from: self.status,
                to: JobStatus::Waiting,
            });
        }
        self.set(JobStatus::Waiting);
        Ok(())
    }

    fn set(&mut self, status: JobStatus) {
        self.status = status;
        self.message.set_status(status);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn lifecycle_to_done() {
        let mut record = MessageRecord::new(Message::new("job", json!({})));
        assert_eq!(record.message.status(), Some(JobStatus::Waiting));

        record.transition(JobStatus::Running).unwrap();
        record.transition(JobStatus::Done).unwrap();

        assert_eq!(record.status, JobStatus::Done);
        assert_eq!(record.message.status(), Some(JobStatus::Done));
        assert_eq!(record.deliveries, 1);
    }

    #[test]
    fn terminal_status_is_final() {
        let mut record = MessageRecord::new(Message::new("job", json!({})));
        record.transition(JobStatus::Running).unwrap();
        record.transition(JobStatus::Failed).unwrap();

        let err = record.transition(JobStatus::Running).unwrap_err();
        assert!(matches!(
            err,
            QueueError::InvalidTransition { from: JobStatus::Failed, to: JobStatus::Running }
        ));
        assert!(record.release().is_err());
    }

    #[test]
    fn release_returns_claim_to_waiting() {
        let mut record = MessageRecord::new(Message::new("job", json!({})));
        record.transition(JobStatus::Running).unwrap();
        record.release().unwrap();

        assert_eq!(record.status, JobStatus::Waiting);
        record.transition(JobStatus::Running).unwrap();
        assert_eq!(record.deliveries, 2);
    }
}
