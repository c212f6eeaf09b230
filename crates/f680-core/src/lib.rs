// # f680-core
//
// Core library for the router DHCP source watcher.
//
// ZTE F680/F860 routers reset the per-port "DHCP source" classification on
// every reboot. This library holds the logic that notices the drift and
// puts the desired values back.
//
// ## Architecture Overview
//
// - **RouterClient**: Trait for logging in and reading/writing DHCP sources
// - **Notifier**: Trait for the optional per-correction hook
// - **Reconciler**: One read-diff-write-notify cycle
// - **Watcher**: Runs the reconciler periodically, owns graceful shutdown
// - **WatcherConfig**: Immutable configuration, loaded once at startup
//
// ## Design Principles
//
// 1. **Fresh state**: every cycle starts from a new session and a fresh read
// 2. **One writer**: cycles never overlap, the client is never shared
// 3. **No retries**: a failed cycle waits for the next tick
// 4. **Cooperative shutdown**: in-flight work is abandoned, not awaited

pub mod traits;
pub mod engine;
pub mod config;
pub mod error;
pub mod model;
pub mod notify;
pub mod shutdown;

// Re-export core types for convenience
pub use traits::{RouterClient, Notifier};
pub use engine::{Reconciler, SyncReport, Watcher, WatcherEvent, WatcherHandle, diff_sources};
pub use config::{RouterConfig, RuntimeConfig, WatcherConfig};
pub use error::{Error, Result, StepExt};
pub use model::{DesiredSources, DhcpSource, DhcpSourceKind};
pub use notify::ScriptNotifier;
pub use shutdown::{ShutdownSignal, ShutdownTrigger};
