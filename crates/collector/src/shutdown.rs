use std::sync::Arc;
use tokio::sync::watch;

/// Cloneable cancellation signal observed by collector loops.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

impl Shutdown {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Requests cancellation. Calling it again has no further effect.
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    #[must_use]
    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once [`Shutdown::trigger`] has been called.
    pub async fn triggered(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives as long as `self`, so this cannot fail.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

/// Waits on an optional signal; never resolves for `None`.
pub(crate) async fn triggered_opt(shutdown: Option<&Shutdown>) {
    match shutdown {
        Some(shutdown) => shutdown.triggered().await,
        None => std::future::pending().await,
    }
}
