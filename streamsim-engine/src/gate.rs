//! Shared run/pause signal

use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

use crate::error::{EngineError, EngineResult};

/// Open while the simulation runs. Every loop awaits it before each iteration.
///
/// Cloning is cheap; all clones observe the same signal. `start` and `stop`
/// may be called from any thread.
#[derive(Debug, Clone)]
pub struct RunGate {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for RunGate {
    fn default() -> Self {
        Self::new()
    }
}

impl RunGate {
    /// A closed gate
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Open the gate. Opening an open gate is an error.
    pub fn start(&self) -> EngineResult<()> {
        let opened = self.tx.send_if_modified(|running| {
            if *running {
                false
            } else {
                *running = true;
                true
            }
        });
        if !opened {
            return Err(EngineError::AlreadyRunning);
        }
        debug!("Run gate opened");
        Ok(())
    }

    /// Close the gate. Closing a closed gate is an error.
    pub fn stop(&self) -> EngineResult<()> {
        let closed = self.tx.send_if_modified(|running| {
            if *running {
                *running = false;
                true
            } else {
                false
            }
        });
        if !closed {
            return Err(EngineError::NotRunning);
        }
        debug!("Run gate closed");
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        *self.tx.borrow()
    }

    /// Suspend until the gate is open; returns at once if it already is
    pub async fn wait_open(&self) {
        let mut rx = self.tx.subscribe();
        // `self` holds the sender, so the channel cannot close under us
        let _ = rx.wait_for(|running| *running).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_double_start_and_stop_are_errors() {
        let gate = RunGate::new();
        assert!(!gate.is_open());
        assert!(matches!(gate.stop(), Err(EngineError::NotRunning)));

        gate.start().unwrap();
        assert!(gate.is_open());
        assert!(matches!(gate.start(), Err(EngineError::AlreadyRunning)));

        gate.stop().unwrap();
        assert!(matches!(gate.stop(), Err(EngineError::NotRunning)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_waiters_wake_on_start() {
        let gate = RunGate::new();
        let waiter = {
            let gate = gate.clone();
            tokio::spawn(async move { gate.wait_open().await })
        };

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(!waiter.is_finished());

        gate.start().unwrap();
        waiter.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_waiter_outlives_other_clones() {
        let gate = RunGate::new();
        let waiter = {
            let gate = gate.clone();
            tokio::spawn(async move { gate.wait_open().await })
        };
        let opener = gate.clone();
        drop(gate);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(!waiter.is_finished());
        opener.start().unwrap();
        waiter.await.unwrap();
    }

    #[tokio::test]
    async fn test_open_gate_does_not_block() {
        let gate = RunGate::new();
        gate.start().unwrap();
        gate.wait_open().await;
    }
}
