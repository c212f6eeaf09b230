//! Polling driver
//!
//! ```text
//! Idle ──initial sync ok──▶ Running ──shutdown──▶ Stopped
//!   │                        │   ▲
//!   └─initial sync err─▶ Err └───┘ tick: sync, log failures
//! ```

use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::IntervalStream;
use tracing::{debug, error, info};

use super::{Reconciler, WatcherEvent};
use crate::error::Result;
use crate::shutdown::{self, ShutdownSignal, ShutdownTrigger};

/// Runs the reconciler on a fixed period until shutdown
pub struct Watcher {
    reconciler: Reconciler,
    check_period: Duration,
    shutdown: ShutdownSignal,
    /// Dropped when `watch` returns, which is what the handle waits for
    closed: watch::Sender<()>,
}

/// Controls a running [`Watcher`]
#[derive(Debug)]
pub struct WatcherHandle {
    trigger: ShutdownTrigger,
    closed: watch::Receiver<()>,
}

impl Watcher {
    /// Create a watcher and the handle used to stop it
    pub fn new(reconciler: Reconciler, check_period: Duration) -> (Self, WatcherHandle) {
        let (trigger, signal) = shutdown::channel();
        let (closed_tx, closed_rx) = watch::channel(());

        let watcher = Self {
            reconciler,
            check_period,
            shutdown: signal,
            closed: closed_tx,
        };

        let handle = WatcherHandle {
            trigger,
            closed: closed_rx,
        };

        (watcher, handle)
    }

    /// Run until shutdown
    ///
    /// The first cycle runs immediately and its failure is returned as a
    /// fatal error. Later cycles run on every tick; their failures are logged
    /// and the watcher keeps going.
    pub async fn watch(self) -> Result<()> {
        let Self {
            mut reconciler,
            check_period,
            shutdown,
            closed,
        } = self;

        reconciler.emit_event(WatcherEvent::Started {
            sources_count: reconciler.desired().len(),
        });

        info!("starts initial sync");
        reconciler
            .sync(&shutdown)
            .await
            .map_err(|e| e.in_step("initial sync failed"))?;

        let mut interval = tokio::time::interval_at(Instant::now() + check_period, check_period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut ticks = IntervalStream::new(interval);

        loop {
            tokio::select! {
                _ = shutdown.triggered() => {
                    info!("Shutdown signal received");
                    reconciler.emit_event(WatcherEvent::Stopped {
                        reason: "Shutdown signal".to_string(),
                    });
                    break;
                }

                Some(_) = ticks.next() => {
                    info!("starts syncing");
                    match reconciler.sync(&shutdown).await {
                        Ok(report) => debug!(?report, "sync finished"),
                        Err(e) if e.is_cancelled() => info!("sync abandoned on shutdown"),
                        Err(e) => error!(error = %e, "sync failed"),
                    }
                }
            }
        }

        drop(closed);
        Ok(())
    }
}

impl WatcherHandle {
    /// Request shutdown without waiting
    pub fn cancel(&self) {
        self.trigger.trigger();
    }

    /// True once the watcher has returned (or was dropped)
    pub fn is_finished(&self) -> bool {
        self.closed.has_changed().is_err()
    }

    /// Wait until the watcher has returned
    pub async fn wait(&mut self) {
        while self.closed.changed().await.is_ok() {}
    }

    /// Request shutdown and wait at most `timeout` for the watcher to stop
    ///
    /// Returns `true` if the watcher stopped in time.
    pub async fn shutdown(&mut self, timeout: Duration) -> bool {
        self.cancel();
        tokio::time::timeout(timeout, self.wait()).await.is_ok()
    }
}
