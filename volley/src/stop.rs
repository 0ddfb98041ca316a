use std::future;

use tokio::sync::watch;

/// Create a connected stop handle / signal pair.
pub fn channel() -> (StopHandle, StopSignal) {
    let (tx, rx) = watch::channel(false);
    (StopHandle { tx }, StopSignal { rx })
}

/// Raising side of a run-level stop.
#[derive(Debug)]
pub struct StopHandle {
    tx: watch::Sender<bool>,
}

impl StopHandle {
    /// Raise the signal. Idempotent, and works even if every receiver is gone.
    pub fn stop(&self) {
        self.tx.send_replace(true);
    }

    pub fn subscribe(&self) -> StopSignal {
        StopSignal {
            rx: self.tx.subscribe(),
        }
    }
}

/// Observing side of a run-level stop, cheap to clone into every virtual user.
#[derive(Clone, Debug)]
pub struct StopSignal {
    rx: watch::Receiver<bool>,
}

impl StopSignal {
    /// A signal that is never raised.
    pub fn never() -> Self {
        channel().1
    }

    pub fn is_stopped(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once the signal is raised. Pends forever if the handle was dropped
    /// without stopping.
    pub async fn stopped(&mut self) {
        if self.rx.wait_for(|stopped| *stopped).await.is_err() {
            future::pending::<()>().await;
        }
    }
}

impl Default for StopSignal {
    fn default() -> Self {
        Self::never()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn stop_reaches_every_subscriber() {
        let (handle, signal) = channel();
        let mut other = handle.subscribe();
        assert!(!signal.is_stopped());

        handle.stop();
        assert!(signal.is_stopped());
        other.stopped().await;
    }

    #[tokio::test(start_paused = true)]
    async fn never_does_not_resolve() {
        let mut signal = StopSignal::never();
        let res = tokio::time::timeout(Duration::from_secs(3600), signal.stopped()).await;
        assert!(res.is_err());
        assert!(!signal.is_stopped());
    }
}
