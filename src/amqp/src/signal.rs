use std::{future::Future, sync::Arc};

use tokio::sync::watch;

/// Latched flag raised once the broker session can no longer publish.
///
/// Raised by the connection error callback and by the publisher when the
/// shared channel has been closed underneath it.
#[derive(Debug, Clone)]
pub struct LossSignal {
    tx: Arc<watch::Sender<bool>>,
}

impl LossSignal {
    pub fn new() -> Self {
        Self {
            tx: Arc::new(watch::channel(false).0),
        }
    }

    pub fn trip(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_tripped(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once `trip` has been called, or once every handle is dropped.
    pub fn tripped(&self) -> impl Future<Output = ()> + Send + 'static {
        let mut rx = self.tx.subscribe();
        async move {
            let _ = rx.wait_for(|lost| *lost).await;
        }
    }
}

impl Default for LossSignal {
    fn default() -> Self {
        Self::new()
    }
}
