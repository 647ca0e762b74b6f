// Domain models

mod interface;
mod state;

pub use interface::{ByteCounters, InterfaceKind, NetworkInterfaceInfo, normalize_mac};
pub use state::{ConnectionState, ConnectionStatus, WorkflowOutcome};
