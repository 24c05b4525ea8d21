//! Domain model (message, ids, job status).

pub mod ids;
pub mod message;
pub mod status;

pub use ids::MessageId;
pub use message::{META_ATTEMPT, META_ID, META_STATUS, Message};
pub use status::JobStatus;
