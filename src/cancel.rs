//! Cooperative cancellation shared by every suspending call in a pass.
//!
//! A [`CancelHandle`] raises the signal once; any number of [`CancelSignal`]
//! clones observe it, either by polling [`CancelSignal::is_cancelled`] at loop
//! boundaries or by racing [`CancelSignal::cancelled`] against I/O.

use tokio::sync::watch;

/// Creates a connected handle/signal pair.
pub fn cancel_pair() -> (CancelHandle, CancelSignal) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle(tx), CancelSignal(rx))
}

/// Raising side of a cancellation context.
#[derive(Debug)]
pub struct CancelHandle(watch::Sender<bool>);

impl CancelHandle {
    pub fn cancel(&self) {
        // send_replace never fails, even with every receiver gone
        self.0.send_replace(true);
    }

    pub fn signal(&self) -> CancelSignal {
        CancelSignal(self.0.subscribe())
    }
}

/// Observing side of a cancellation context.
#[derive(Debug, Clone)]
pub struct CancelSignal(watch::Receiver<bool>);

impl CancelSignal {
    /// A signal that is never raised.
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(false);
        CancelSignal(rx)
    }

    pub fn is_cancelled(&self) -> bool {
        *self.0.borrow()
    }

    /// Resolves once the signal is raised. Pends forever if the handle was
    /// dropped without cancelling.
    pub async fn cancelled(&self) {
        let mut rx = self.0.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}
