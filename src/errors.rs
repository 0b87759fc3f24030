//! Informer Error Hierarchy
//!
//! Errors are grouped by where they surface: the watch stream, the list
//! (bootstrap/relist) call, and caller misuse of the public API.
//! Line-decode failures inside a watch stream never appear here; they are
//! dropped by the session.

use std::time::Duration;

use config::ConfigError;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Watch session terminated abnormally
    #[error(transparent)]
    Watch(#[from] WatchError),

    /// Bootstrap or relist call failed
    #[error(transparent)]
    List(#[from] ListError),

    /// Caller programming mistakes
    #[error(transparent)]
    Usage(#[from] UsageError),

    /// Configuration loading or validation failures
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Retry policy exhaustion
    #[error("{operation} failed after {attempts} attempts: {source}")]
    RetryExhausted {
        operation: String,
        attempts: usize,
        #[source]
        source: Box<Error>,
    },

    /// A single attempt exceeded its per-attempt timeout
    #[error("{operation} timed out after {after:?}")]
    Timeout { operation: String, after: Duration },

    /// Unrecoverable failures
    #[error("Fatal error: {0}")]
    Fatal(String),
}

#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    /// Connection could not be established or was reset
    #[error("Watch request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered the watch request with a non-success status
    #[error("Watch on {path} returned status {status}")]
    Status { path: String, status: u16 },

    /// Body read failure after streaming started
    #[error("Watch stream read failed: {0}")]
    Io(#[from] std::io::Error),

    /// Failures from non-HTTP transports
    #[error("Watch transport error: {0}")]
    Transport(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ListError {
    #[error("List request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("List on {path} returned status {status}")]
    Status { path: String, status: u16 },

    /// Response body is not a list document
    #[error("List response could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("List transport error: {0}")]
    Transport(String),
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum UsageError {
    /// Subscription verb outside {add, update, delete}
    #[error("Unknown verb: {0}")]
    UnknownVerb(String),

    #[error("Informer already started")]
    AlreadyStarted,

    #[error("Informer stopped")]
    Stopped,

    /// Builder finished without a required collaborator
    #[error("Informer builder is missing a {0}")]
    MissingComponent(&'static str),
}

impl Error {
    /// True when the error is the caller's fault rather than a runtime fault.
    pub fn is_usage(&self) -> bool {
        matches!(self, Error::Usage(_))
    }
}
