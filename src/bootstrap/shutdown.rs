use std::sync::Arc;

use tokio::signal;
use tokio::sync::watch;
use tracing::info;

/// Shutdown state.
///
/// Background tasks watch for the transition away from `Running`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownState {
    Running,
    Stopped,
}

/// Shutdown signal shared by background tasks.
pub struct Shutdown {
    state: watch::Sender<ShutdownState>,
}

impl Shutdown {
    pub fn new() -> Arc<Self> {
        let (state, _) = watch::channel(ShutdownState::Running);
        Arc::new(Self { state })
    }

    /// Get current state
    pub fn state(&self) -> ShutdownState {
        *self.state.borrow()
    }

    /// Subscribe to state changes
    pub fn subscribe(&self) -> watch::Receiver<ShutdownState> {
        self.state.subscribe()
    }

    /// Stop all subscribers. Idempotent.
    pub fn trigger(&self) {
        if self.state() == ShutdownState::Stopped {
            return;
        }
        info!("shutdown triggered");
        self.state.send_replace(ShutdownState::Stopped);
    }

    /// Wait for SIGINT or SIGTERM, then trigger shutdown.
    pub async fn wait_for_signal(&self) -> std::io::Result<()> {
        #[cfg(unix)]
        {
            let mut terminate = signal::unix::signal(signal::unix::SignalKind::terminate())?;
            tokio::select! {
                res = signal::ctrl_c() => {
                    res?;
                    info!("received SIGINT (Ctrl+C)");
                }
                _ = terminate.recv() => {
                    info!("received SIGTERM");
                }
            }
        }

        #[cfg(not(unix))]
        {
            signal::ctrl_c().await?;
            info!("received Ctrl+C");
        }

        self.trigger();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_trigger_notifies_subscribers() {
        let shutdown = Shutdown::new();
        let mut rx = shutdown.subscribe();
        assert_eq!(shutdown.state(), ShutdownState::Running);

        shutdown.trigger();
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), ShutdownState::Stopped);

        // Second trigger is a no-op
        shutdown.trigger();
        assert_eq!(shutdown.state(), ShutdownState::Stopped);
    }
}
