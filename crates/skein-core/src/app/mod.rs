//! App - Queue の組み立て
//!
//! ports と middleware を組み合わせて Queue を構築する。

pub mod builder;

pub use self::builder::{BuildError, QueueBuilder};
