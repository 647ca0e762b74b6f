// Upstream (uplink) interface selection

use crate::models::{InterfaceKind, NetworkInterfaceInfo};

/// Descriptor fragments that mark an interface as useless for sharing even
/// when its kind looks plausible.
const EXCLUDED_DESCRIPTOR_TOKENS: &[&str] = &["virtual", "vpn", "tap", "tun"];

/// Picks the interface to route the RM-01's traffic through.
///
/// A candidate must not be the target adapter itself, must be a real up
/// interface (no loopback/tunnel/virtual, no VPN-ish descriptor), and must
/// hold at least one routable unicast IPv4 address. Wireless beats wired
/// beats anything else; ties go to the higher nominal link speed, then to
/// enumeration order. An absent result is a normal "no upstream available"
/// condition, not a fault.
pub fn find_best_upstream(
    interfaces: &[NetworkInterfaceInfo],
    exclude_name: &str,
) -> Option<NetworkInterfaceInfo> {
    let mut candidates: Vec<&NetworkInterfaceInfo> = interfaces
        .iter()
        .filter(|i| is_candidate(i, exclude_name))
        .collect();
    // Stable sort keeps enumeration order among full ties.
    candidates.sort_by(|a, b| {
        kind_rank(b.kind)
            .cmp(&kind_rank(a.kind))
            .then(b.link_speed_mbps.cmp(&a.link_speed_mbps))
    });
    candidates.first().map(|i| (*i).clone())
}

fn is_candidate(info: &NetworkInterfaceInfo, exclude_name: &str) -> bool {
    if info.name == exclude_name {
        return false;
    }
    if matches!(
        info.kind,
        InterfaceKind::Loopback | InterfaceKind::Tunnel | InterfaceKind::Virtual
    ) {
        return false;
    }
    let descriptor = info.descriptor.to_lowercase();
    if EXCLUDED_DESCRIPTOR_TOKENS
        .iter()
        .any(|t| descriptor.contains(t))
    {
        return false;
    }
    info.is_up && info.has_routable_ipv4()
}

fn kind_rank(kind: InterfaceKind) -> u8 {
    match kind {
        InterfaceKind::Wireless => 2,
        InterfaceKind::Wired => 1,
        _ => 0,
    }
}
