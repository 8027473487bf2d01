use std::sync::Arc;
use tokio::sync::watch;

/// Marker returned when work stopped because cancellation was requested
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled;

/// Owner side of a cancellation request. Clones share the same flag.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    tx: Arc<watch::Sender<bool>>,
}

impl CancellationToken {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Request cancellation of every call observing this token
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    pub fn signal(&self) -> CancellationSignal {
        CancellationSignal {
            rx: Some(self.tx.subscribe()),
        }
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Observer side handed to enrichment calls
#[derive(Debug, Clone, Default)]
pub struct CancellationSignal {
    rx: Option<watch::Receiver<bool>>,
}

impl CancellationSignal {
    /// A signal that never fires
    pub fn never() -> Self {
        Self { rx: None }
    }

    pub fn is_cancelled(&self) -> bool {
        self.rx.as_ref().map(|rx| *rx.borrow()).unwrap_or(false)
    }

    /// Resolves once cancellation is requested; pends forever otherwise
    pub async fn cancelled(&self) {
        if let Some(mut rx) = self.rx.clone() {
            if rx.wait_for(|cancelled| *cancelled).await.is_ok() {
                return;
            }
        }
        std::future::pending::<()>().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio_test::{assert_pending, assert_ready, task};

    #[tokio::test]
    async fn test_cancel_wakes_signal() {
        let token = CancellationToken::new();
        let signal = token.signal();
        assert!(!signal.is_cancelled());

        let waiter = tokio::spawn({
            let signal = signal.clone();
            async move { signal.cancelled().await }
        });

        token.cancel();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("signal should fire")
            .unwrap();
        assert!(signal.is_cancelled());
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn test_signal_taken_after_cancel_fires_immediately() {
        let token = CancellationToken::new();
        token.cancel();
        let signal = token.signal();

        tokio::time::timeout(Duration::from_millis(100), signal.cancelled())
            .await
            .expect("already cancelled");
    }

    #[test]
    fn test_never_does_not_fire() {
        let signal = CancellationSignal::never();
        assert!(!signal.is_cancelled());

        let mut waiter = task::spawn(signal.cancelled());
        assert_pending!(waiter.poll());
    }

    #[test]
    fn test_dropped_token_does_not_fire() {
        let signal = CancellationToken::new().signal();

        let mut waiter = task::spawn(signal.cancelled());
        assert_pending!(waiter.poll());
    }

    #[test]
    fn test_pending_waiter_is_woken() {
        let token = CancellationToken::new();
        let signal = token.signal();

        let mut waiter = task::spawn(signal.cancelled());
        assert_pending!(waiter.poll());

        token.cancel();
        assert!(waiter.is_woken());
        assert_ready!(waiter.poll());
    }
}
