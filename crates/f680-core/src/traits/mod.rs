//! Core traits for the watcher
//!
//! This module defines the seams between the engine and its collaborators.
//!
//! - [`RouterClient`]: Read and write router DHCP sources
//! - [`Notifier`]: Announce corrected sources

pub mod router_client;
pub mod notifier;

pub use router_client::RouterClient;
pub use notifier::Notifier;
