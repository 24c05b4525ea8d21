//! Job status as seen through the adapter's status side channel.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Status of one message instance.
///
/// State transitions:
/// - Waiting -> Running -> Done
/// - Waiting -> Running -> Failed
///
/// `Done` and `Failed` are terminal. A retry is a new message with a new id,
/// never a transition out of a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Enqueued, not yet started.
    Waiting,

    /// A worker has begun execution.
    Running,

    /// Completed successfully.
    Done,

    /// Completed with an unrecoverable error.
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Failed)
    }

    pub fn can_transition_to(self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Waiting, JobStatus::Running)
                | (JobStatus::Running, JobStatus::Done)
                | (JobStatus::Running, JobStatus::Failed)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Waiting => "waiting",
            JobStatus::Running => "running",
            JobStatus::Done => "done",
            JobStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(JobStatus::Waiting, JobStatus::Running, true)]
    #[case(JobStatus::Running, JobStatus::Done, true)]
    #[case(JobStatus::Running, JobStatus::Failed, true)]
    #[case(JobStatus::Waiting, JobStatus::Done, false)]
    #[case(JobStatus::Done, JobStatus::Running, false)]
    #[case(JobStatus::Failed, JobStatus::Waiting, false)]
    #[case(JobStatus::Done, JobStatus::Failed, false)]
    fn transitions(#[case] from: JobStatus, #[case] to: JobStatus, #[case] allowed: bool) {
        assert_eq!(from.can_transition_to(to), allowed);
    }

    #[test]
    fn only_done_and_failed_are_terminal() {
        assert!(!JobStatus::Waiting.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
        assert!(JobStatus::Done.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
    }

    #[test]
    fn serializes_lowercase() {
        let json = serde_json::to_value(JobStatus::Running).unwrap();
        assert_eq!(json, serde_json::json!("running"));
    }
}
