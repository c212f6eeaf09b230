//! Cooperative shutdown signal
//!
//! A [`ShutdownTrigger`] fires once; every cloned [`ShutdownSignal`] observes
//! it. Long-running operations are raced against the signal with
//! [`ShutdownSignal::guard`], which drops (abandons) the operation when
//! shutdown fires first.

use std::future::Future;
use tokio::sync::watch;

use crate::error::{Error, Result};

/// Create a connected trigger/signal pair
pub fn channel() -> (ShutdownTrigger, ShutdownSignal) {
    let (tx, rx) = watch::channel(false);
    (ShutdownTrigger { tx }, ShutdownSignal { rx })
}

/// Sending half of the shutdown signal
#[derive(Debug)]
pub struct ShutdownTrigger {
    tx: watch::Sender<bool>,
}

impl ShutdownTrigger {
    /// Request shutdown; idempotent
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    /// True once [`trigger`](Self::trigger) has been called
    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Receiving half of the shutdown signal
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    /// True once shutdown was requested
    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once shutdown is requested
    ///
    /// Pends forever if the trigger was dropped without firing.
    pub async fn triggered(&self) {
        let mut rx = self.rx.clone();
        if rx.wait_for(|fired| *fired).await.is_err() {
            std::future::pending::<()>().await;
        }
    }

    /// Run `fut` unless shutdown fires first
    ///
    /// Returns [`Error::Cancelled`] without polling `fut` again once the
    /// signal fires.
    pub async fn guard<T, F>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        if self.is_triggered() {
            return Err(Error::Cancelled);
        }

        tokio::select! {
            biased;
            _ = self.triggered() => Err(Error::Cancelled),
            res = fut => res,
        }
    }
}
