//! skein-core
//!
//! Queue orchestration core for the Skein runtime.
//!
//! # モジュール構成
//! - **domain**: Message, MessageId, JobStatus
//! - **ports**: 抽象化レイヤー（Adapter と capability traits, Worker, Loop, EventDispatcher, Clock）
//! - **middleware**: push middleware chain と factory
//! - **queue**: Queue 本体（push / run / listen / status）
//! - **app**: QueueBuilder
//! - **config**: TOML からの QueueConfig
//! - **impls**: 実装（InMemoryAdapter, SignalLoop, ListenerDispatcher など）
//! - **worker**: 名前で handler を引く RegistryWorker

pub mod app;
pub mod config;
pub mod domain;
pub mod error;
pub mod impls;
pub mod middleware;
pub mod observability;
pub mod ports;
pub mod queue;
pub mod worker;

pub use app::{BuildError, QueueBuilder};
pub use config::{ConfigError, MiddlewareConfig, QueueConfig};
pub use domain::{JobStatus, Message, MessageId};
pub use error::QueueError;
pub use middleware::{MiddlewareDefinition, PushMiddleware, PushMiddlewareFactory, PushNext};
pub use observability::QueueCounts;
pub use queue::Queue;
