//! Shutdown broadcast shared by the HTTP server and the rate-limit sweeper.

use tokio::sync::broadcast;

/// One-shot stop signal for the guard's long-running tasks.
///
/// `startup::run` owns it and hands a receiver to [`HttpServer::run`]; the
/// server resubscribes for its [`Sweeper`]. A single `trigger` drains the
/// listener and ends the sweep loop.
///
/// [`HttpServer::run`]: crate::http::HttpServer::run
/// [`Sweeper`]: crate::lifecycle::sweeper::Sweeper
#[derive(Debug)]
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        // Capacity 1: the only message ever sent is the stop signal.
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    /// Receiver for a task that must stop with the guard.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Stop every subscribed task. Harmless when none are listening.
    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }

    /// Tasks still holding a receiver.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_trigger_reaches_all_subscribers() {
        let shutdown = Shutdown::new();
        let mut a = shutdown.subscribe();
        let mut b = shutdown.subscribe();
        assert_eq!(shutdown.receiver_count(), 2);

        shutdown.trigger();
        assert!(a.recv().await.is_ok());
        assert!(b.recv().await.is_ok());
    }

    #[test]
    fn test_trigger_without_subscribers() {
        let shutdown = Shutdown::default();
        shutdown.trigger();
        assert_eq!(shutdown.receiver_count(), 0);
    }
}
