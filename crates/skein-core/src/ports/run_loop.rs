//! Loop port - cooperative cancellation.

/// Polled between message handles to allow graceful shutdown.
///
/// Must be side-effect free; an in-flight handle is never interrupted.
pub trait Loop: Send + Sync {
    fn can_continue(&self) -> bool;
}
