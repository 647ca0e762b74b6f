// Failure taxonomy for the connect/disconnect workflow

use serde::Serialize;
use thiserror::Error;

/// Errors surfaced by detection, configuration, and sharing operations.
///
/// Connect aborts on the first error; disconnect records errors but keeps
/// tearing down. `Cancelled` is special-cased by the orchestrator and never
/// results in a `Failed` state.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ShareError {
    #[error("no matching USB Ethernet adapter found")]
    NoAdapterFound,

    #[error("no usable upstream interface found")]
    NoUpstreamFound,

    #[error("command `{command}` failed: {output}")]
    ConfigurationFailed { command: String, output: String },

    #[error("sharing subsystem unavailable: {0}")]
    SharingUnavailable(String),

    #[error("required command not found: {0}")]
    CommandNotFound(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("command `{command}` timed out after {secs}s")]
    Timeout { command: String, secs: u64 },
}

impl ShareError {
    pub fn failed(command: impl Into<String>, output: impl Into<String>) -> Self {
        Self::ConfigurationFailed {
            command: command.into(),
            output: output.into(),
        }
    }

    /// Whether this error means the user declined (or could not grant)
    /// elevation, as opposed to a real configuration fault.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
