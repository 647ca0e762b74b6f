// Linux sysfs readers for interface detail sysinfo does not expose

use crate::models::InterfaceKind;
use std::path::Path;

/// USB vendor/product ids of the RM-01's ASIX chipset, as they appear in
/// MODALIAS lines.
const USB_IDS: &[&str] = &["v0b95p1790", "v0b95p178a"];

/// Hardware descriptor for an interface, from the device uevent. The ASIX
/// chipset is recognized by driver name or USB id and reported under the
/// descriptor the matcher expects; other devices report their driver name.
pub fn read_descriptor(name: &str) -> String {
    let path = format!("/sys/class/net/{name}/device/uevent");
    let Ok(content) = std::fs::read_to_string(&path) else {
        // No backing device: virtual interface.
        return String::new();
    };
    let lowered = content.to_lowercase();
    if lowered.contains("ax88179") || USB_IDS.iter().any(|id| lowered.contains(id)) {
        return "AX88179 Gigabit Ethernet".into();
    }
    content
        .lines()
        .find_map(|l| l.strip_prefix("DRIVER="))
        .unwrap_or_default()
        .to_string()
}

pub fn classify(name: &str) -> InterfaceKind {
    if name == "lo" {
        return InterfaceKind::Loopback;
    }
    if ["tun", "tap", "wg", "ppp"]
        .iter()
        .any(|p| name.starts_with(p))
    {
        return InterfaceKind::Tunnel;
    }
    if ["docker", "br-", "veth", "virbr", "vmnet"]
        .iter()
        .any(|p| name.starts_with(p))
    {
        return InterfaceKind::Virtual;
    }
    let base = format!("/sys/class/net/{name}");
    if Path::new(&format!("{base}/wireless")).exists()
        || Path::new(&format!("{base}/phy80211")).exists()
    {
        return InterfaceKind::Wireless;
    }
    if Path::new(&format!("{base}/device")).exists() {
        return InterfaceKind::Wired;
    }
    InterfaceKind::Other
}

pub fn is_operationally_up(name: &str) -> bool {
    match std::fs::read_to_string(format!("/sys/class/net/{name}/operstate")) {
        // "unknown" covers interface types that never report carrier.
        Ok(state) => matches!(state.trim(), "up" | "unknown"),
        Err(_) => false,
    }
}

/// Nominal link speed in Mbit/s; 0 when the driver does not report one
/// (the sysfs file reads -1 on e.g. Wi-Fi and down links).
pub fn link_speed_mbps(name: &str) -> u64 {
    std::fs::read_to_string(format!("/sys/class/net/{name}/speed"))
        .ok()
        .and_then(|s| s.trim().parse::<i64>().ok())
        .filter(|v| *v > 0)
        .map(|v| v as u64)
        .unwrap_or(0)
}
