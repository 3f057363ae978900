//! Error Types
//!
//! Reporting is best-effort: sink failures are logged and dropped by the
//! dispatcher, and a malformed placement code is simply `Unknown`. The only
//! error a caller can observe is the owner task having gone away.

use thiserror::Error;

/// Failure of a call to the external reporting sink
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SinkError {
    /// The sink could not be reached
    #[error("Sink unreachable: {0}")]
    Unreachable(String),

    /// The sink was reached but rejected the call
    #[error("Remote error: {0}")]
    Remote(String),
}

/// Errors returned by the tracker handle
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TrackerError {
    /// The owner task has exited; the signal was not delivered
    #[error("Visibility logger is no longer running")]
    Closed,
}
