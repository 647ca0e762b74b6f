// Network interface models

use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;

/// Coarse interface classification used for upstream candidate filtering and
/// ranking. Derived from OS hints (sysfs on Linux, hardware port / adapter
/// descriptions elsewhere), so it is best-effort; `Other` is always safe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InterfaceKind {
    Wired,
    Wireless,
    Loopback,
    Tunnel,
    Virtual,
    Other,
}

/// One host network interface as seen at detection time.
///
/// Built fresh on every detection pass and never cached across a
/// connect/disconnect cycle; the OS is the source of truth.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInterfaceInfo {
    /// OS-level identifier accepted by configuration commands
    /// (e.g. "enx0a1b2c3d4e5f", "Wi-Fi", "Ethernet 3").
    pub name: String,
    /// Human-readable hardware description used for chipset matching.
    pub descriptor: String,
    /// MAC in canonical uppercase colon-hex form.
    pub hardware_address: String,
    /// Stable OS device id where `name` is not usable for statistics lookup
    /// (macOS hardware ports map to a BSD device like "en5").
    pub persistent_id: Option<String>,
    pub kind: InterfaceKind,
    pub is_up: bool,
    /// Assigned unicast IPv4 addresses, unfiltered; candidate filtering
    /// happens in the upstream selector.
    pub ipv4_unicast: Vec<Ipv4Addr>,
    /// Nominal link speed in Mbit/s, 0 when unknown.
    pub link_speed_mbps: u64,
}

impl NetworkInterfaceInfo {
    /// Key to use for byte-counter lookups. Falls back to `name` when the OS
    /// uses the same identifier for configuration and statistics.
    pub fn stats_name(&self) -> &str {
        self.persistent_id.as_deref().unwrap_or(&self.name)
    }

    /// At least one unicast IPv4 address that is neither loopback nor
    /// link-local (169.254.0.0/16).
    pub fn has_routable_ipv4(&self) -> bool {
        self.ipv4_unicast
            .iter()
            .any(|a| !a.is_loopback() && !a.is_link_local())
    }
}

/// Cumulative interface byte counters, host perspective.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ByteCounters {
    pub received: u64,
    pub transmitted: u64,
}

/// Canonicalizes a MAC address to uppercase colon-separated hex pairs.
/// Accepts `:`/`-` separated or bare 12-digit forms; anything else is
/// returned uppercased as-is.
pub fn normalize_mac(raw: &str) -> String {
    let hex: String = raw
        .chars()
        .filter(|c| c.is_ascii_hexdigit())
        .collect::<String>()
        .to_ascii_uppercase();
    if hex.len() != 12 || raw.chars().any(|c| !c.is_ascii_hexdigit() && c != ':' && c != '-') {
        return raw.trim().to_ascii_uppercase();
    }
    hex.as_bytes()
        .chunks(2)
        .map(|pair| std::str::from_utf8(pair).unwrap_or_default())
        .collect::<Vec<_>>()
        .join(":")
}
