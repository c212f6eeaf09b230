// # Notifier Trait
//
// Side effect fired once per DHCP source the watcher corrected.
//
// ## Implementations
//
// - [`crate::notify::ScriptNotifier`]: runs an external executable

use async_trait::async_trait;

/// Trait for notification hooks
///
/// The engine races every `notify` call against its shutdown signal and
/// drops the future on shutdown, so implementations must tolerate being
/// abandoned mid-flight.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Announce that the source named `vendor_class_id` was corrected
    async fn notify(&self, vendor_class_id: &str) -> Result<(), crate::Error>;

    /// Human-readable description of the hook (for logging)
    fn describe(&self) -> String;
}
