//! Reconciliation engine
//!
//! The [`Reconciler`] is responsible for:
//! - Starting every cycle from a fresh router session
//! - Reading the router's DHCP sources
//! - Diffing them against the desired mapping
//! - Writing all corrections in one batch
//! - Notifying once per corrected source
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   tick   ┌──────────────┐
//! │   Watcher   │─────────▶│  Reconciler  │
//! └─────────────┘          └──────────────┘
//!                                 │
//!         ┌───────────────────────┼───────────────────────┐
//!         │                       │                       │
//!         ▼                       ▼                       ▼
//! ┌──────────────┐       ┌──────────────┐        ┌─────────────┐
//! │ RouterClient │       │   Notifier   │        │   Events    │
//! │ (login/r/w)  │       │  (optional)  │        │  (monitor)  │
//! └──────────────┘       └──────────────┘        └─────────────┘
//! ```
//!
//! ## Cycle Flow
//!
//! 1. Reset the client session, log in
//! 2. List sources, compute the corrective batch
//! 3. If the batch is empty, stop here
//! 4. Send the whole batch in one write
//! 5. On success, notify per corrected source

pub mod watcher;

pub use watcher::{Watcher, WatcherHandle};

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::config::WatcherConfig;
use crate::error::{Error, Result, StepExt};
use crate::model::{DesiredSources, DhcpSource, DhcpSourceKind};
use crate::shutdown::ShutdownSignal;
use crate::traits::{Notifier, RouterClient};

/// Events emitted by the watcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatcherEvent {
    /// Watcher started
    Started {
        sources_count: usize,
    },

    /// Reconciliation cycle started
    CycleStarted,

    /// A source differs from its desired flag and will be rewritten
    SourceScheduled {
        source_id: String,
        vendor_class_id: String,
        expected: DhcpSourceKind,
        actual: DhcpSourceKind,
    },

    /// A source was rewritten
    SourceUpdated {
        vendor_class_id: String,
    },

    /// The batch containing this source failed
    UpdateFailed {
        vendor_class_id: String,
        error: String,
    },

    /// Notification hook succeeded
    Notified {
        vendor_class_id: String,
    },

    /// Notification hook failed
    NotifyFailed {
        vendor_class_id: String,
        error: String,
    },

    /// Reconciliation cycle finished
    CycleCompleted {
        updated: usize,
    },

    /// Watcher stopped
    Stopped {
        reason: String,
    },
}

/// Outcome of one successful reconciliation cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Vendor class IDs written successfully
    pub updated: Vec<String>,
    /// Vendor class IDs whose batch write failed
    pub failed: Vec<String>,
    /// Vendor class IDs whose notification hook failed
    pub notify_failed: Vec<String>,
}

impl SyncReport {
    /// True if the cycle found nothing to correct
    pub fn is_idle(&self) -> bool {
        self.updated.is_empty() && self.failed.is_empty()
    }
}

/// Compute the corrective batch
///
/// Sources missing from `desired` are unmanaged and skipped; sources already
/// carrying the desired flag are skipped. The result keeps the order of
/// `observed`.
pub fn diff_sources(observed: &[DhcpSource], desired: &DesiredSources) -> Vec<DhcpSource> {
    stage_corrections(observed, desired)
        .into_iter()
        .map(|(source, _)| source)
        .collect()
}

/// Corrective batch paired with each source's observed flag
///
/// Identifiers are not trusted to be unique, so the observed flag travels
/// with the staged entry instead of being looked up again.
fn stage_corrections(
    observed: &[DhcpSource],
    desired: &DesiredSources,
) -> Vec<(DhcpSource, DhcpSourceKind)> {
    let mut out = Vec::new();
    for source in observed {
        let Some(&expected) = desired.get(&source.vendor_class_id) else {
            debug!(source = %source.vendor_class_id, "skip unwatched source");
            continue;
        };

        if expected == source.proc_flag {
            continue;
        }

        info!(
            source_id = %source.id,
            source = %source.vendor_class_id,
            expected = %expected,
            actual = %source.proc_flag,
            "schedule source update"
        );
        out.push((source.with_proc_flag(expected), source.proc_flag));
    }

    out
}

/// Reconciliation engine
///
/// Owns the router client exclusively; cycles run one at a time.
pub struct Reconciler {
    /// Router client
    client: Box<dyn RouterClient>,

    /// Desired flag per vendor class identifier
    desired: DesiredSources,

    /// Optional notification hook
    notifier: Option<Box<dyn Notifier>>,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<WatcherEvent>,
}

impl Reconciler {
    /// Create a new reconciler
    ///
    /// # Returns
    ///
    /// A tuple of (reconciler, event_receiver) where event_receiver yields
    /// watcher events
    pub fn new(
        client: Box<dyn RouterClient>,
        notifier: Option<Box<dyn Notifier>>,
        config: &WatcherConfig,
    ) -> Result<(Self, mpsc::Receiver<WatcherEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.event_channel_capacity);

        let reconciler = Self {
            client,
            desired: config.dhcp_sources.clone(),
            notifier,
            event_tx: tx,
        };

        Ok((reconciler, rx))
    }

    /// Desired flag per vendor class identifier
    pub fn desired(&self) -> &DesiredSources {
        &self.desired
    }

    /// Run one reconciliation cycle
    ///
    /// Every router call and notification is raced against `shutdown`; a
    /// cycle interrupted by shutdown returns [`Error::Cancelled`].
    ///
    /// A failed batch write is not an error of the cycle: it is logged per
    /// source and reported in [`SyncReport::failed`].
    pub async fn sync(&mut self, shutdown: &ShutdownSignal) -> Result<SyncReport> {
        self.emit_event(WatcherEvent::CycleStarted);

        self.client.reset().step("reset router session")?;

        info!(client = self.client.client_name(), "try to login into router");
        let authorized = shutdown.guard(self.client.login()).await.step("login")?;
        if !authorized {
            return Err(Error::not_authorized("router refused the login").in_step("login"));
        }

        info!("load router DHCP sources");
        let observed = shutdown
            .guard(self.client.list_dhcp_sources())
            .await
            .step("list DHCP sources")?;

        let (staged, previous): (Vec<_>, Vec<_>) =
            stage_corrections(&observed, &self.desired).into_iter().unzip();
        let mut report = SyncReport::default();
        if staged.is_empty() {
            info!("nothing to update");
            self.emit_event(WatcherEvent::CycleCompleted { updated: 0 });
            return Ok(report);
        }

        for (source, &actual) in staged.iter().zip(&previous) {
            self.emit_event(WatcherEvent::SourceScheduled {
                source_id: source.id.clone(),
                vendor_class_id: source.vendor_class_id.clone(),
                expected: source.proc_flag,
                actual,
            });
        }

        info!(count = staged.len(), "update sources");
        if let Err(e) = shutdown.guard(self.client.update_dhcp_sources(&staged)).await {
            if e.is_cancelled() {
                return Err(e.in_step("update DHCP sources"));
            }

            if e.is_unauthorized() {
                warn!("router session expired during update, next cycle logs in again");
            }

            for source in &staged {
                error!(
                    source_id = %source.id,
                    source = %source.vendor_class_id,
                    error = %e,
                    "unable to update source"
                );
                self.emit_event(WatcherEvent::UpdateFailed {
                    vendor_class_id: source.vendor_class_id.clone(),
                    error: e.to_string(),
                });
                report.failed.push(source.vendor_class_id.clone());
            }

            self.emit_event(WatcherEvent::CycleCompleted { updated: 0 });
            return Ok(report);
        }

        for source in &staged {
            info!(source = %source.vendor_class_id, "updated");
            self.emit_event(WatcherEvent::SourceUpdated {
                vendor_class_id: source.vendor_class_id.clone(),
            });
            report.updated.push(source.vendor_class_id.clone());
        }

        for source in &staged {
            self.notify(&source.vendor_class_id, shutdown, &mut report)
                .await?;
        }

        self.emit_event(WatcherEvent::CycleCompleted {
            updated: report.updated.len(),
        });
        Ok(report)
    }

    /// Run the notification hook for one source, if configured
    ///
    /// Only cancellation is propagated; hook failures are logged and recorded.
    async fn notify(
        &self,
        vendor_class_id: &str,
        shutdown: &ShutdownSignal,
        report: &mut SyncReport,
    ) -> Result<()> {
        let Some(notifier) = &self.notifier else {
            return Ok(());
        };

        info!(
            source = %vendor_class_id,
            notify_script = %notifier.describe(),
            "calling notify script"
        );

        match shutdown.guard(notifier.notify(vendor_class_id)).await {
            Ok(()) => {
                info!(source = %vendor_class_id, "notified");
                self.emit_event(WatcherEvent::Notified {
                    vendor_class_id: vendor_class_id.to_string(),
                });
                Ok(())
            }
            Err(e) if e.is_cancelled() => Err(e.in_step("notify")),
            Err(e) => {
                error!(source = %vendor_class_id, error = %e, "notify failed");
                self.emit_event(WatcherEvent::NotifyFailed {
                    vendor_class_id: vendor_class_id.to_string(),
                    error: e.to_string(),
                });
                report.notify_failed.push(vendor_class_id.to_string());
                Ok(())
            }
        }
    }

    /// Emit a watcher event
    pub(crate) fn emit_event(&self, event: WatcherEvent) {
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
            }
            // Nobody listens for events.
            Err(mpsc::error::TrySendError::Closed(_)) => {}
        }
    }
}
