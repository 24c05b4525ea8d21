//! Ports: the capabilities the queue core consumes.
//!
//! Each trait is a seam to an external collaborator (backend adapter,
//! worker, cancellation loop, event dispatch). The core only ever talks to
//! these traits; `impls` carries in-process implementations.

pub mod adapter;
pub mod clock;
pub mod events;
pub mod id_generator;
pub mod run_loop;
pub mod worker;

pub use self::adapter::{Adapter, DrainAdapter, DrainHandler, PushAdapter, SubscribeAdapter, SubscribeHandler};
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::events::{EventDispatcher, QueueEvent};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::run_loop::Loop;
pub use self::worker::{QueueHandle, Worker};
