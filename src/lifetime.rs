//! Lifetime tokens for stateful consumers.
//!
//! A hook owns one [`Lifetime`]. Anything it awaits on the network is run
//! through [`Lifetime::scoped`], so a response that lands after the hook was
//! disposed is dropped instead of applied.

use std::future::Future;

use tokio::sync::watch;

#[derive(Clone, Debug)]
pub struct Lifetime {
    tx: watch::Sender<bool>,
}

impl Default for Lifetime {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifetime {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx }
    }

    pub fn dispose(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_disposed(&self) -> bool {
        *self.tx.borrow()
    }

    /// Runs `fut` until it completes or the lifetime ends. `None` means the
    /// owner went away and the output must not be applied.
    pub async fn scoped<F: Future>(&self, fut: F) -> Option<F::Output> {
        let mut rx = self.tx.subscribe();
        if *rx.borrow_and_update() {
            return None;
        }

        let output = tokio::select! {
            output = fut => Some(output),
            _ = rx.wait_for(|disposed| *disposed) => None,
        };

        // Completion racing with disposal still counts as disposed.
        output.filter(|_| !self.is_disposed())
    }
}
