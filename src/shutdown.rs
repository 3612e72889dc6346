//! Process-level shutdown coordination
//!
//! Background tasks never call `std::process::exit` themselves; they report an
//! [`ExitReason`] through a [`ShutdownHandle`] and the binary's main task
//! decides the exit code after cancelling everything else. The first reported
//! reason wins.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::Error;

/// Why the process is going down
#[derive(Debug)]
pub enum ExitReason {
    /// Graceful completion (file playback reached end-of-sequence)
    Complete,
    /// Unrecoverable failure
    Fatal(Error),
}

/// Cloneable handle used by tasks to request shutdown and observe cancellation
#[derive(Clone)]
pub struct ShutdownHandle {
    tx: mpsc::UnboundedSender<ExitReason>,
    cancel: CancellationToken,
}

impl ShutdownHandle {
    /// Report an unrecoverable error
    pub fn fatal(&self, error: Error) {
        let _ = self.tx.send(ExitReason::Fatal(error));
    }

    /// Report graceful completion
    pub fn complete(&self) {
        let _ = self.tx.send(ExitReason::Complete);
    }

    /// Child token for scoping a session's tasks under the process lifetime
    pub fn child_token(&self) -> CancellationToken {
        self.cancel.child_token()
    }

    /// Resolves once process shutdown has begun
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await;
    }
}

/// Owned by the binary's main task
pub struct Shutdown {
    rx: mpsc::UnboundedReceiver<ExitReason>,
    cancel: CancellationToken,
}

impl Shutdown {
    pub fn new() -> (Self, ShutdownHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let handle = ShutdownHandle {
            tx,
            cancel: cancel.clone(),
        };
        (Self { rx, cancel }, handle)
    }

    /// Wait for the first exit reason, cancel all tasks, and return the
    /// process exit code.
    pub async fn wait(mut self) -> i32 {
        let reason = self.rx.recv().await.unwrap_or(ExitReason::Complete);
        self.cancel.cancel();
        match reason {
            ExitReason::Complete => 0,
            ExitReason::Fatal(error) => {
                tracing::error!("Fatal: {error}");
                1
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[tokio::test]
    async fn test_complete_exits_zero() {
        let (shutdown, handle) = Shutdown::new();
        handle.complete();
        assert_eq!(shutdown.wait().await, 0);
    }

    #[tokio::test]
    async fn test_fatal_exits_nonzero() {
        let (shutdown, handle) = Shutdown::new();
        handle.fatal(Error::ConnectionFailed);
        assert_eq!(shutdown.wait().await, 1);
    }

    #[tokio::test]
    async fn test_first_reason_wins() {
        let (shutdown, handle) = Shutdown::new();
        handle.complete();
        handle.fatal(Error::ConnectionFailed);
        assert_eq!(shutdown.wait().await, 0);
    }

    #[tokio::test]
    async fn test_cancellation_propagates() {
        let (shutdown, handle) = Shutdown::new();
        let token = handle.child_token();
        handle.fatal(Error::ConnectionFailed);
        shutdown.wait().await;
        assert!(token.is_cancelled());
    }
}
