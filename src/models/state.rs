// Orchestrator state, published as snapshots to observers

use crate::error::ShareError;
use crate::models::NetworkInterfaceInfo;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ConnectionStatus {
    Idle,
    Connecting,
    Connected,
    Disconnecting,
    Failed,
}

/// The single mutable in-process resource. Written only by the orchestrator
/// (and the speed monitor for the two rate fields), read by everyone else as
/// cloned snapshots off a broadcast channel.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionState {
    pub status: ConnectionStatus,
    pub current_interface: Option<NetworkInterfaceInfo>,
    pub upstream_interface: Option<NetworkInterfaceInfo>,
    pub busy: bool,
    pub last_error: Option<ShareError>,
    /// Peripheral-perspective rates: upload is what the RM-01 sends (host rx),
    /// download is what it receives (host tx). Nonzero only while Connected.
    pub upload_bytes_per_sec: f64,
    pub download_bytes_per_sec: f64,
}

impl Default for ConnectionState {
    fn default() -> Self {
        Self {
            status: ConnectionStatus::Idle,
            current_interface: None,
            upstream_interface: None,
            busy: false,
            last_error: None,
            upload_bytes_per_sec: 0.0,
            download_bytes_per_sec: 0.0,
        }
    }
}

/// Result of a finished workflow as seen by a caller that waited for it.
///
/// A cancelled workflow resolves back to its pre-operation status rather
/// than Failed, so "did not reach the expected status and did not fail"
/// means cancellation.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowOutcome {
    Completed,
    Cancelled,
    Failed(Option<ShareError>),
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        self.status == ConnectionStatus::Connected
    }

    /// Classifies the state after a workflow against the terminal status the
    /// workflow was expected to reach (`Connected` for connect, `Idle` for
    /// disconnect).
    pub fn outcome(&self, expected: ConnectionStatus) -> WorkflowOutcome {
        match self.status {
            ConnectionStatus::Failed => WorkflowOutcome::Failed(self.last_error.clone()),
            s if s == expected => WorkflowOutcome::Completed,
            _ => WorkflowOutcome::Cancelled,
        }
    }
}
