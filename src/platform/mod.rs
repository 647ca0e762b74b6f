// Platform backends
//
// One NetworkConfigurator/SharingController pair per OS, selected at compile
// time and never switched at runtime. All of them drive OS tooling through a
// CommandRunner so the command sequences are testable with a scripted fake.

pub mod linux;
pub mod macos;
pub mod windows;

use crate::config::SharingConfig;
use crate::error::ShareError;
use crate::models::NetworkInterfaceInfo;

/// Applies or reverts IP configuration on the target adapter.
pub trait NetworkConfigurator: Send + Sync {
    /// Sets the fixed static address/mask/gateway and DNS. Idempotent in
    /// effect: re-applying an identical configuration succeeds and changes
    /// nothing.
    fn apply_static(
        &self,
        target: &NetworkInterfaceInfo,
        config: &SharingConfig,
    ) -> Result<(), ShareError>;

    /// Reverts the adapter to DHCP addressing and DNS, flushes the local DNS
    /// cache, and attempts a lease release/renew best-effort (not every
    /// interface type supports it).
    fn restore_dynamic(
        &self,
        target: &NetworkInterfaceInfo,
        config: &SharingConfig,
    ) -> Result<(), ShareError>;
}

/// Turns NAT/forwarding between the upstream and the target on or off.
pub trait SharingController: Send + Sync {
    /// Enables IP forwarding and installs the NAT rule routing the target
    /// subnet out through the upstream. Any pre-existing sharing rules for
    /// the subnet are torn down first; at most one active relationship.
    fn enable(
        &self,
        upstream: &NetworkInterfaceInfo,
        target: &NetworkInterfaceInfo,
        config: &SharingConfig,
    ) -> Result<(), ShareError>;

    /// Removes the NAT rules associated with the target and turns forwarding
    /// off, leaving the rest of the host stack untouched.
    fn disable(
        &self,
        target: &NetworkInterfaceInfo,
        config: &SharingConfig,
    ) -> Result<(), ShareError>;

    /// Best-effort probe: is sharing for the subnet currently in effect?
    /// Lets `status` (and startup) recognize a sharing session enabled by an
    /// earlier run. Errors degrade to false.
    fn is_active(&self, config: &SharingConfig) -> Result<bool, ShareError> {
        let _ = config;
        Ok(false)
    }
}

#[cfg(target_os = "linux")]
pub use linux::LinuxNetwork as PlatformNetwork;
#[cfg(target_os = "macos")]
pub use macos::MacosNetwork as PlatformNetwork;
#[cfg(target_os = "windows")]
pub use windows::WindowsNetwork as PlatformNetwork;
