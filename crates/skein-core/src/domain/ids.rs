//! Message identifiers.
//!
//! Ids are ULIDs: sortable by creation time and generated without
//! coordination, so any adapter can mint them locally.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::error::QueueError;

const PREFIX: &str = "msg-";

/// Identifier assigned to a message by the adapter at enqueue time.
///
/// Displays as `msg-<ulid>` and parses back from the same form (the bare
/// ULID is accepted too).
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MessageId(Ulid);

impl MessageId {
    pub fn from_ulid(ulid: Ulid) -> Self {
        Self(ulid)
    }

    pub fn as_ulid(&self) -> Ulid {
        self.0
    }
}

impl From<Ulid> for MessageId {
    fn from(ulid: Ulid) -> Self {
        Self::from_ulid(ulid)
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{PREFIX}{}", self.0)
    }
}

impl FromStr for MessageId {
    type Err = QueueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.strip_prefix(PREFIX).unwrap_or(s);
        Ulid::from_string(raw)
            .map(Self)
            .map_err(|_| QueueError::UnknownId(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_and_parse_agree() {
        let id = MessageId::from_ulid(Ulid::new());
        let text = id.to_string();
        assert!(text.starts_with("msg-"));
        assert_eq!(text.parse::<MessageId>().unwrap(), id);
    }

    #[test]
    fn bare_ulid_is_accepted() {
        let ulid = Ulid::new();
        let id: MessageId = ulid.to_string().parse().unwrap();
        assert_eq!(id.as_ulid(), ulid);
    }

    #[test]
    fn garbage_is_an_unknown_id() {
        let err = "msg-not-a-ulid".parse::<MessageId>().unwrap_err();
        assert!(matches!(err, QueueError::UnknownId(s) if s == "msg-not-a-ulid"));
    }

    #[test]
    fn ids_sort_by_creation_time() {
        let id1 = MessageId::from_ulid(Ulid::new());
        std::thread::sleep(std::time::Duration::from_millis(2));
        let id2 = MessageId::from_ulid(Ulid::new());
        assert!(id1 < id2);
    }
}
