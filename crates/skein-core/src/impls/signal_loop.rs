//! Loop implementations.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::ports::Loop;

/// Loop that keeps going until stopped by a handle or an OS signal.
///
/// - `stop_handle()` で外部から止められる
/// - `watch_signals()` で Ctrl-C / SIGTERM を待つタスクを起動する
/// - 実行中のメッセージは中断しない（次の `can_continue()` で止まる）
pub struct SignalLoop {
    stop_tx: Arc<watch::Sender<bool>>,
    stop_rx: watch::Receiver<bool>,
}

/// Cloneable trigger for a `SignalLoop`.
#[derive(Clone)]
pub struct StopHandle {
    stop_tx: Arc<watch::Sender<bool>>,
}

impl StopHandle {
    pub fn stop(&self) {
        // send_replace works even when every receiver is gone
        self.stop_tx.send_replace(true);
    }
}

impl SignalLoop {
    pub fn new() -> Self {
        let (stop_tx, stop_rx) = watch::channel(false);
        Self {
            stop_tx: Arc::new(stop_tx),
            stop_rx,
        }
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            stop_tx: Arc::clone(&self.stop_tx),
        }
    }

    pub fn stop(&self) {
        self.stop_handle().stop();
    }

    /// Spawn a task that stops the loop on Ctrl-C or SIGTERM.
    pub fn watch_signals(&self) -> JoinHandle<()> {
        let handle = self.stop_handle();
        tokio::spawn(async move {
            wait_for_signal().await;
            handle.stop();
        })
    }
}

impl Default for SignalLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl Loop for SignalLoop {
    fn can_continue(&self) -> bool {
        !*self.stop_rx.borrow()
    }
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(terminate) => terminate,
        Err(err) => {
            warn!(error = %err, "SIGTERM handler unavailable, waiting for Ctrl-C only");
            wait_for_ctrl_c().await;
            return;
        }
    };

    tokio::select! {
        _ = wait_for_ctrl_c() => {},
        _ = terminate.recv() => info!("received SIGTERM, stopping after the current message"),
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    wait_for_ctrl_c().await;
}

async fn wait_for_ctrl_c() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("received Ctrl-C, stopping after the current message"),
        Err(err) => {
            warn!(error = %err, "Ctrl-C handler unavailable");
            std::future::pending::<()>().await;
        }
    }
}

/// Never asks to stop. For one-shot drains bounded by availability.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysContinue;

impl Loop for AlwaysContinue {
    fn can_continue(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_loop_continues() {
        assert!(SignalLoop::new().can_continue());
        assert!(AlwaysContinue.can_continue());
    }

    #[test]
    fn stop_handle_stops_the_loop() {
        let run_loop = SignalLoop::new();
        let handle = run_loop.stop_handle();
        handle.clone().stop();
        assert!(!run_loop.can_continue());
    }

    #[test]
    fn stop_is_idempotent() {
        let run_loop = SignalLoop::new();
        run_loop.stop();
        run_loop.stop();
        assert!(!run_loop.can_continue());
    }
}
