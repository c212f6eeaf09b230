// # Router Client Trait
//
// Defines the interface the reconciliation engine uses to talk to the router.
//
// ## Implementations
//
// - ZTE F680/F860 web-management API: `f680-router` crate
//
// ## Usage
//
// ```rust,ignore
// use f680_core::RouterClient;
//
// async fn dump(client: &mut dyn RouterClient) -> f680_core::Result<()> {
//     client.reset()?;
//     if !client.login().await? {
//         return Ok(());
//     }
//
//     for source in client.list_dhcp_sources().await? {
//         println!("{} -> {}", source.vendor_class_id, source.proc_flag);
//     }
//
//     Ok(())
// }
// ```

use async_trait::async_trait;

use crate::model::DhcpSource;

/// Trait for router client implementations
///
/// A client owns its session state (cookies, scraped tokens). It is driven
/// by a single reconciliation task, so `reset` takes `&mut self` and no
/// internal locking is expected.
///
/// # Error Contract
///
/// - Every call either fully succeeds or fails; there is no partial success
///   within one read or write
/// - A router-side session timeout surfaces as [`crate::Error::Unauthorized`]
/// - Implementations never retry; the next reconciliation cycle is the retry
#[async_trait]
pub trait RouterClient: Send + Sync {
    /// Drop all cookies and session state
    ///
    /// Called before every reconciliation cycle so that no cycle depends on
    /// a session left over from the previous one.
    fn reset(&mut self) -> Result<(), crate::Error>;

    /// Perform the login handshake
    ///
    /// # Returns
    ///
    /// - `Ok(true)`: The session is authorized
    /// - `Ok(false)`: The router refused the login (e.g. locked account)
    /// - `Err(Error)`: Transport, status or decode failure
    async fn login(&self) -> Result<bool, crate::Error>;

    /// List DHCP sources in the order the router reports them
    async fn list_dhcp_sources(&self) -> Result<Vec<DhcpSource>, crate::Error>;

    /// Write the flags of `sources` in one all-or-nothing request
    ///
    /// An empty batch must not contact the router.
    async fn update_dhcp_sources(&self, sources: &[DhcpSource]) -> Result<(), crate::Error>;

    /// Get the client name (for logging/debugging)
    fn client_name(&self) -> &'static str;
}
