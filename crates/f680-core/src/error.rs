//! Error types for the watcher
//!
//! This module defines all error types used throughout the workspace.

use thiserror::Error;

/// Result type alias for watcher operations
pub type Result<T> = std::result::Result<T, Error>;

/// Remote error string the router uses for an expired session
pub const SESSION_TIMEOUT: &str = "SessionTimeout";

/// Core error type for the watcher
#[derive(Error, Debug)]
pub enum Error {
    /// Connection, timeout or body read failures
    #[error("transport error: {0}")]
    Transport(String),

    /// Non-success HTTP status
    #[error("non-success status {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body, as returned by the router
        body: String,
    },

    /// Router reported a non-zero `IF_ERRORID`
    #[error("remote error {code}: {message}")]
    Remote {
        /// Value of `IF_ERRORID`
        code: String,
        /// Value of `IF_ERRORSTR`
        message: String,
    },

    /// Router session expired, a fresh login is required
    #[error("unauthorized: router session timed out")]
    Unauthorized,

    /// Login was refused (locked account or rejected credentials)
    #[error("not authorized: {0}")]
    NotAuthorized(String),

    /// Malformed key, token, enum value or response body
    #[error("parse error: {0}")]
    Parse(String),

    /// Request signing failures
    #[error("signing error: {0}")]
    Signing(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Notification hook failures
    #[error("notification failed: {0}")]
    Notify(String),

    /// Operation abandoned because shutdown was requested
    #[error("operation cancelled")]
    Cancelled,

    /// A protocol step that failed, wrapping the underlying cause
    #[error("{step}: {source}")]
    Step {
        /// What was being attempted
        step: String,
        /// Underlying error
        #[source]
        source: Box<Error>,
    },

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML configuration errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create an HTTP status error
    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self::Status {
            status,
            body: body.into(),
        }
    }

    /// Classify a router `IF_ERRORID`/`IF_ERRORSTR` pair
    ///
    /// Returns `None` when the code is `"0"` (success).
    pub fn remote(code: &str, message: &str) -> Option<Self> {
        if code == "0" {
            return None;
        }

        if message == SESSION_TIMEOUT {
            return Some(Self::Unauthorized);
        }

        Some(Self::Remote {
            code: code.to_string(),
            message: message.to_string(),
        })
    }

    /// Create a "not authorized" error
    pub fn not_authorized(msg: impl Into<String>) -> Self {
        Self::NotAuthorized(msg.into())
    }

    /// Create a parse error
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Create a signing error
    pub fn signing(msg: impl Into<String>) -> Self {
        Self::Signing(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a notification error
    pub fn notify(msg: impl Into<String>) -> Self {
        Self::Notify(msg.into())
    }

    /// Wrap this error with the step that produced it
    pub fn in_step(self, step: impl Into<String>) -> Self {
        Self::Step {
            step: step.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error, skipping `Step` wrappers
    pub fn root(&self) -> &Error {
        match self {
            Self::Step { source, .. } => source.root(),
            other => other,
        }
    }

    /// True if the router asked for a fresh login
    pub fn is_unauthorized(&self) -> bool {
        matches!(self.root(), Self::Unauthorized)
    }

    /// True if the operation was abandoned on shutdown
    pub fn is_cancelled(&self) -> bool {
        matches!(self.root(), Self::Cancelled)
    }
}

/// Attach a step description to the error side of a result
pub trait StepExt<T> {
    /// Wrap the error with `step`
    fn step(self, step: &str) -> Result<T>;
}

impl<T, E: Into<Error>> StepExt<T> for std::result::Result<T, E> {
    fn step(self, step: &str) -> Result<T> {
        self.map_err(|e| e.into().in_step(step))
    }
}
