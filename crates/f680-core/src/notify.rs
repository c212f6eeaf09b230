// # Script Notifier
//
// Runs an external executable with the corrected source's vendor class ID
// as its only argument. Only the exit status is inspected; stdout/stderr
// are inherited from the daemon.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;

use crate::error::{Error, Result};
use crate::traits::Notifier;

/// Notifier backed by an external script
#[derive(Debug, Clone)]
pub struct ScriptNotifier {
    path: PathBuf,
}

impl ScriptNotifier {
    /// Create a notifier for the executable at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the executable
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl Notifier for ScriptNotifier {
    async fn notify(&self, vendor_class_id: &str) -> Result<()> {
        // The child is not killed when this future is dropped on shutdown.
        let status = Command::new(&self.path)
            .arg(vendor_class_id)
            .status()
            .await
            .map_err(|e| {
                Error::notify(format!("unable to run {}: {}", self.path.display(), e))
            })?;

        if !status.success() {
            return Err(Error::notify(format!(
                "{} exited with {}",
                self.path.display(),
                status
            )));
        }

        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}
