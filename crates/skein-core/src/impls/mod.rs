//! Impls - ports の in-process 実装（開発用・テスト用）
//!
//! # 含まれる実装
//! - **InMemoryAdapter**: push / drain / subscribe / status をすべて持つ adapter
//! - **SignalLoop**, **AlwaysContinue**: Loop 実装
//! - **ListenerDispatcher**, **NoopDispatcher**: EventDispatcher 実装
//!
//! 永続化する adapter（DB, broker など）は別クレートに置く想定。

pub mod dispatch;
pub mod memory;
pub mod record;
pub mod signal_loop;

pub use self::dispatch::{EventListener, ListenerDispatcher, NoopDispatcher};
pub use self::memory::{InMemoryAdapter, META_PUSHED_AT};
pub use self::record::MessageRecord;
pub use self::signal_loop::{AlwaysContinue, SignalLoop, StopHandle};
