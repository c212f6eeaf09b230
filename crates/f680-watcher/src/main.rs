// # f680-watcher - DHCP Source Watcher Daemon
//
// ZTE F680/F860 routers forget the per-port DHCP source classification on
// every reboot. This daemon periodically logs into the router, compares the
// DHCP source table with the configured mapping and writes back whatever
// drifted.
//
// The daemon is a thin integration layer: it reads the configuration, sets
// up logging and the runtime, wires the router client into the watcher and
// handles signals. All reconciliation logic lives in f680-core.
//
// ## Configuration
//
// A YAML file passed with `--cfg`; every field has a default:
//
// ```yaml
// debug: false
// router:
//   upstream: http://192.168.1.1
//   username: mgts
//   password: secret          # defaults to $ROUTER_PASSWORD
//   timeout_secs: 30
//   encryption_key: /etc/f680-watcher/key.pem  # placeholder key (warns) when unset
// check_period_secs: 300
// dhcp_sources:
//   LAN1: internet
//   IPTV: local
// notify_script: /usr/local/bin/on-dhcp-source-fix
// shutdown_timeout_secs: 60
// runtime:
//   worker_threads: 1
// ```
//
// `F680_LOG_LEVEL` (trace, debug, info, warn, error) overrides the level
// selected by `debug`.
//
// ## Example
//
// ```bash
// export ROUTER_PASSWORD=secret
// f680-watcher --cfg /etc/f680-watcher.yaml watch
// ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use f680_core::{
    Notifier, Reconciler, ScriptNotifier, Watcher, WatcherConfig, WatcherEvent,
};
use f680_router::F860Client;
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::sync::mpsc;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Environment variable overriding the log level
const LOG_LEVEL_ENV: &str = "F680_LOG_LEVEL";

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WatcherExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<WatcherExitCode> for ExitCode {
    fn from(code: WatcherExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

#[derive(Debug, Parser)]
#[command(name = "f680-watcher", version, about = "Keeps ZTE F680/F860 DHCP sources in place")]
struct Cli {
    /// Config file path
    #[arg(long = "cfg", value_name = "PATH", global = true)]
    cfg: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Watch the router and restore DHCP sources
    Watch,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match WatcherConfig::load(cli.cfg.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return WatcherExitCode::ConfigError.into();
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return WatcherExitCode::ConfigError.into();
    }

    let log_level = match log_level(&config) {
        Ok(level) => level,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return WatcherExitCode::ConfigError.into();
        }
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return WatcherExitCode::ConfigError.into();
    }

    match cli.command {
        Command::Watch => watch(config).into(),
    }
}

/// Level from `F680_LOG_LEVEL`, else DEBUG with `debug: true`, else INFO
fn log_level(config: &WatcherConfig) -> Result<Level> {
    let Ok(level) = env::var(LOG_LEVEL_ENV) else {
        return Ok(if config.debug { Level::DEBUG } else { Level::INFO });
    };

    match level.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => anyhow::bail!(
            "{} '{}' is not valid. Valid levels: trace, debug, info, warn, error",
            LOG_LEVEL_ENV,
            level
        ),
    }
}

/// `watch` subcommand
fn watch(config: WatcherConfig) -> WatcherExitCode {
    info!("Starting f680-watcher");
    info!(
        upstream = %config.router.upstream,
        sources = config.dhcp_sources.len(),
        check_period = ?config.check_period(),
        "Configuration loaded"
    );

    let runtime = match build_runtime(&config) {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {:#}", e);
            return WatcherExitCode::RuntimeError;
        }
    };

    runtime.block_on(async {
        let (reconciler, events) = match build_reconciler(&config) {
            Ok(parts) => parts,
            Err(e) => {
                error!("Startup error: {:#}", e);
                return WatcherExitCode::ConfigError;
            }
        };

        run_watcher(&config, reconciler, events).await
    })
}

/// A current-thread runtime for one worker, a multi-thread one otherwise
fn build_runtime(config: &WatcherConfig) -> Result<tokio::runtime::Runtime> {
    let mut builder = if config.runtime.worker_threads == 1 {
        tokio::runtime::Builder::new_current_thread()
    } else {
        let mut builder = tokio::runtime::Builder::new_multi_thread();
        builder.worker_threads(config.runtime.worker_threads);
        builder
    };

    builder
        .enable_all()
        .build()
        .context("unable to build runtime")
}

/// Wire the router client and notifier into a reconciler
fn build_reconciler(
    config: &WatcherConfig,
) -> Result<(Reconciler, mpsc::Receiver<WatcherEvent>)> {
    let client = F860Client::new(config.router.clone())
        .context("unable to create router client")?
        .with_debug(config.debug);

    let notifier = config.notify_script.as_ref().map(|path| {
        info!(notify_script = %path.display(), "Notifications enabled");
        Box::new(ScriptNotifier::new(path)) as Box<dyn Notifier>
    });

    for (name, kind) in &config.dhcp_sources {
        info!(source = %name, expected = %kind, "Managing DHCP source");
    }

    Reconciler::new(Box::new(client), notifier, config).context("unable to create reconciler")
}

/// Run the watcher until it fails or a shutdown signal arrives
async fn run_watcher(
    config: &WatcherConfig,
    reconciler: Reconciler,
    events: mpsc::Receiver<WatcherEvent>,
) -> WatcherExitCode {
    let (watcher, mut handle) = Watcher::new(reconciler, config.check_period());

    tokio::spawn(log_events(events));
    let mut watcher_task = tokio::spawn(watcher.watch());

    tokio::select! {
        result = &mut watcher_task => match result {
            Ok(Ok(())) => WatcherExitCode::CleanShutdown,
            Ok(Err(e)) => {
                error!("Watcher error: {}", e);
                WatcherExitCode::ConfigError
            }
            Err(e) => {
                error!("Watcher task failed: {}", e);
                WatcherExitCode::RuntimeError
            }
        },

        signal = wait_for_shutdown() => {
            match signal {
                Ok(signal) => info!("Received shutdown signal: {}", signal),
                Err(e) => {
                    error!("Shutdown error: {:#}", e);
                    handle.cancel();
                    return WatcherExitCode::RuntimeError;
                }
            }

            info!("Shutting down watcher");
            if handle.shutdown(config.shutdown_timeout()).await {
                info!("Watcher stopped");
                WatcherExitCode::CleanShutdown
            } else {
                warn!(
                    "Watcher did not stop within {:?}",
                    config.shutdown_timeout()
                );
                WatcherExitCode::RuntimeError
            }
        }
    }
}

/// Drain watcher events into the debug log
async fn log_events(mut events: mpsc::Receiver<WatcherEvent>) {
    while let Some(event) = events.recv().await {
        debug!(?event, "Watcher event");
    }
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
///
/// # Returns
///
/// Returns the name of the signal received.
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate()).context("Failed to setup SIGTERM handler")?;
    let mut sigint = signal(SignalKind::interrupt()).context("Failed to setup SIGINT handler")?;

    let signal = tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    };

    Ok(signal)
}

/// Wait for shutdown signals (SIGINT only)
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .context("Failed to wait for CTRL-C")?;
    Ok("SIGINT")
}
