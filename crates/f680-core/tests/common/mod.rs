//! Test doubles and common utilities for watcher contract tests
//!
//! Doubles are `Clone` and keep all state behind `Arc`s: a test boxes one
//! clone into the reconciler and inspects the other.

#![allow(dead_code)]

use f680_core::config::WatcherConfig;
use f680_core::error::{Error, Result};
use f680_core::model::{DesiredSources, DhcpSource, DhcpSourceKind};
use f680_core::traits::{Notifier, RouterClient};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// How a mocked batch write fails
#[derive(Debug, Clone, Copy)]
pub enum UpdateFailure {
    /// `IF_ERRORSTR == SessionTimeout`
    SessionTimeout,
    /// Any other non-zero `IF_ERRORID`
    Remote,
}

/// A RouterClient backed by an in-memory source table
#[derive(Clone)]
pub struct MockRouterClient {
    /// Router-side table; successful updates are applied to it
    sources: Arc<Mutex<Vec<DhcpSource>>>,
    /// Whether login succeeds
    authorized: bool,
    /// Failure injected into every update
    update_failure: Option<UpdateFailure>,
    /// List calls with index >= this fail
    fail_lists_from: Option<usize>,
    /// Artificial latency of list calls
    list_delay: Option<Duration>,
    /// Extra latency of a single list call, by index
    slow_list_call: Option<(usize, Duration)>,

    reset_call_count: Arc<AtomicUsize>,
    login_call_count: Arc<AtomicUsize>,
    list_call_count: Arc<AtomicUsize>,
    update_call_count: Arc<AtomicUsize>,
    updated_batches: Arc<Mutex<Vec<Vec<DhcpSource>>>>,
}

impl MockRouterClient {
    pub fn new(sources: Vec<DhcpSource>) -> Self {
        Self {
            sources: Arc::new(Mutex::new(sources)),
            authorized: true,
            update_failure: None,
            fail_lists_from: None,
            list_delay: None,
            slow_list_call: None,
            reset_call_count: Arc::new(AtomicUsize::new(0)),
            login_call_count: Arc::new(AtomicUsize::new(0)),
            list_call_count: Arc::new(AtomicUsize::new(0)),
            update_call_count: Arc::new(AtomicUsize::new(0)),
            updated_batches: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Login returns `Ok(false)`
    pub fn refusing_login(mut self) -> Self {
        self.authorized = false;
        self
    }

    /// Every update fails with `failure`
    pub fn failing_updates(mut self, failure: UpdateFailure) -> Self {
        self.update_failure = Some(failure);
        self
    }

    /// The `n`-th list call (0-based) and every later one fails
    pub fn failing_lists_from(mut self, n: usize) -> Self {
        self.fail_lists_from = Some(n);
        self
    }

    /// List calls sleep for `delay` first
    pub fn with_list_delay(mut self, delay: Duration) -> Self {
        self.list_delay = Some(delay);
        self
    }

    /// Only the `n`-th list call (0-based) sleeps for `delay` first
    pub fn with_slow_list_call(mut self, n: usize, delay: Duration) -> Self {
        self.slow_list_call = Some((n, delay));
        self
    }

    pub fn reset_call_count(&self) -> usize {
        self.reset_call_count.load(Ordering::SeqCst)
    }

    pub fn login_call_count(&self) -> usize {
        self.login_call_count.load(Ordering::SeqCst)
    }

    pub fn list_call_count(&self) -> usize {
        self.list_call_count.load(Ordering::SeqCst)
    }

    pub fn update_call_count(&self) -> usize {
        self.update_call_count.load(Ordering::SeqCst)
    }

    /// Every batch passed to `update_dhcp_sources`, in call order
    pub fn updated_batches(&self) -> Vec<Vec<DhcpSource>> {
        self.updated_batches.lock().unwrap().clone()
    }

    /// Current router-side table
    pub fn sources(&self) -> Vec<DhcpSource> {
        self.sources.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl RouterClient for MockRouterClient {
    fn reset(&mut self) -> Result<()> {
        self.reset_call_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn login(&self) -> Result<bool> {
        self.login_call_count.fetch_add(1, Ordering::SeqCst);
        Ok(self.authorized)
    }

    async fn list_dhcp_sources(&self) -> Result<Vec<DhcpSource>> {
        let call = self.list_call_count.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.list_delay {
            tokio::time::sleep(delay).await;
        }

        if let Some((_, delay)) = self.slow_list_call.filter(|(n, _)| *n == call) {
            tokio::time::sleep(delay).await;
        }

        if self.fail_lists_from.is_some_and(|n| call >= n) {
            return Err(Error::status(500, "internal error"));
        }

        Ok(self.sources())
    }

    async fn update_dhcp_sources(&self, sources: &[DhcpSource]) -> Result<()> {
        if sources.is_empty() {
            return Ok(());
        }

        self.update_call_count.fetch_add(1, Ordering::SeqCst);
        self.updated_batches.lock().unwrap().push(sources.to_vec());

        match self.update_failure {
            Some(UpdateFailure::SessionTimeout) => {
                return Err(Error::remote("1", "SessionTimeout").unwrap());
            }
            Some(UpdateFailure::Remote) => {
                return Err(Error::remote("-1", "ParaError").unwrap());
            }
            None => {}
        }

        let mut table = self.sources.lock().unwrap();
        for update in sources {
            if let Some(entry) = table.iter_mut().find(|s| s.id == update.id) {
                entry.proc_flag = update.proc_flag;
            }
        }

        Ok(())
    }

    fn client_name(&self) -> &'static str {
        "mock"
    }
}

/// A Notifier that records calls
#[derive(Clone, Default)]
pub struct MockNotifier {
    /// Names passed to `notify` (recorded before any delay)
    started: Arc<Mutex<Vec<String>>>,
    /// Names whose `notify` returned
    completed: Arc<Mutex<Vec<String>>>,
    /// Names whose notification fails
    failing: HashSet<String>,
    /// Artificial latency of every notification
    delay: Option<Duration>,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Notifications for `name` fail
    pub fn failing_for(mut self, name: &str) -> Self {
        self.failing.insert(name.to_string());
        self
    }

    /// Every notification sleeps for `delay` first
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn started(&self) -> Vec<String> {
        self.started.lock().unwrap().clone()
    }

    pub fn completed(&self) -> Vec<String> {
        self.completed.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Notifier for MockNotifier {
    async fn notify(&self, vendor_class_id: &str) -> Result<()> {
        self.started
            .lock()
            .unwrap()
            .push(vendor_class_id.to_string());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.completed
            .lock()
            .unwrap()
            .push(vendor_class_id.to_string());

        if self.failing.contains(vendor_class_id) {
            return Err(Error::notify(format!("hook failed for {}", vendor_class_id)));
        }

        Ok(())
    }

    fn describe(&self) -> String {
        "mock".to_string()
    }
}

/// Shorthand for a router-side source
pub fn source(id: &str, flag: DhcpSourceKind, vendor_class_id: &str) -> DhcpSource {
    DhcpSource::new(id, flag, vendor_class_id)
}

/// Helper to create a minimal WatcherConfig for testing
pub fn minimal_config(desired: &[(&str, DhcpSourceKind)]) -> WatcherConfig {
    let mut config = WatcherConfig::new();
    config.router.password = "test-password".to_string();
    config.check_period_secs = 1;
    config.dhcp_sources = desired
        .iter()
        .map(|(name, kind)| (name.to_string(), *kind))
        .collect::<DesiredSources>();
    config
}
