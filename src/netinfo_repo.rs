// Interface enumeration and byte counters via sysinfo, enriched with
// platform-specific detail (descriptor, operational state, link speed).
// Enrichment queries go through the CommandRunner so they share its bounded
// timeout; a hung OS tool must not hang enumeration.

#[cfg(target_os = "linux")]
mod linux;

use crate::models::{ByteCounters, InterfaceKind, NetworkInterfaceInfo, normalize_mac};
use crate::platform::macos::HardwarePort;
use crate::platform::windows::{GetmacAdapter, NetshInterface};
use crate::privilege::CommandRunner;
use std::sync::{Arc, Mutex};
use sysinfo::Networks;

/// Read-only view of the host's network interfaces. The orchestrator and
/// speed monitor depend on this trait so tests can script enumerations.
///
/// Implementations are blocking; callers run them on a worker context.
pub trait InterfaceSource: Send + Sync {
    fn interfaces(&self) -> anyhow::Result<Vec<NetworkInterfaceInfo>>;
    /// Cumulative counters for the interface's stats key
    /// (`NetworkInterfaceInfo::stats_name`).
    fn byte_counters(&self, stats_name: &str) -> anyhow::Result<ByteCounters>;
}

pub struct NetinfoRepo<R: CommandRunner> {
    networks: Arc<Mutex<Networks>>,
    // Linux enrichment reads sysfs directly and leaves the runner unused.
    #[allow(dead_code)]
    runner: Arc<R>,
}

impl<R: CommandRunner> NetinfoRepo<R> {
    pub fn new(runner: Arc<R>) -> Self {
        let networks = Networks::new_with_refreshed_list();
        Self {
            networks: Arc::new(Mutex::new(networks)),
            runner,
        }
    }

    #[cfg(target_os = "linux")]
    fn enrich(&self, list: &mut [NetworkInterfaceInfo]) {
        for info in list.iter_mut() {
            info.descriptor = linux::read_descriptor(&info.name);
            info.kind = linux::classify(&info.name);
            info.is_up = linux::is_operationally_up(&info.name);
            info.link_speed_mbps = linux::link_speed_mbps(&info.name);
        }
    }

    #[cfg(target_os = "macos")]
    fn enrich(&self, list: &mut [NetworkInterfaceInfo]) {
        use crate::platform::macos::parse_hardware_ports;

        let ports = match self
            .runner
            .run("/usr/sbin/networksetup", &["-listallhardwareports"])
        {
            Ok(out) if out.success() => parse_hardware_ports(&out.stdout),
            Ok(out) => {
                tracing::warn!(
                    output = out.diagnostic(),
                    operation = "list_hardware_ports",
                    "hardware port listing failed"
                );
                Vec::new()
            }
            Err(e) => {
                tracing::warn!(error = %e, operation = "list_hardware_ports", "hardware port listing failed");
                Vec::new()
            }
        };
        apply_hardware_ports(list, &ports);
    }

    #[cfg(target_os = "windows")]
    fn enrich(&self, list: &mut [NetworkInterfaceInfo]) {
        use crate::platform::windows::{parse_getmac_csv, parse_interface_table};

        let table = match self.runner.run("netsh", &["interface", "show", "interface"]) {
            Ok(out) if out.success() => parse_interface_table(&out.stdout),
            _ => Vec::new(),
        };
        let adapters = match self.runner.run("getmac", &["/v", "/fo", "csv"]) {
            Ok(out) if out.success() => parse_getmac_csv(&out.stdout),
            _ => Vec::new(),
        };
        apply_windows_tables(list, &table, &adapters);
    }
}

impl<R: CommandRunner> InterfaceSource for NetinfoRepo<R> {
    fn interfaces(&self) -> anyhow::Result<Vec<NetworkInterfaceInfo>> {
        let mut list = {
            let mut networks = self
                .networks
                .lock()
                .map_err(|e| anyhow::anyhow!("sysinfo networks lock poisoned: {}", e))?;
            networks.refresh(true);

            networks
                .list()
                .iter()
                .map(|(name, data)| NetworkInterfaceInfo {
                    name: name.clone(),
                    descriptor: String::new(),
                    hardware_address: normalize_mac(&data.mac_address().to_string()),
                    persistent_id: None,
                    kind: InterfaceKind::Other,
                    is_up: false,
                    ipv4_unicast: data
                        .ip_networks()
                        .iter()
                        .filter_map(|n| match n.addr {
                            std::net::IpAddr::V4(v4) => Some(v4),
                            std::net::IpAddr::V6(_) => None,
                        })
                        .collect(),
                    link_speed_mbps: 0,
                })
                .collect::<Vec<_>>()
        };

        self.enrich(&mut list);
        Ok(list)
    }

    fn byte_counters(&self, stats_name: &str) -> anyhow::Result<ByteCounters> {
        let mut networks = self
            .networks
            .lock()
            .map_err(|e| anyhow::anyhow!("sysinfo networks lock poisoned: {}", e))?;
        networks.refresh(true);
        let data = networks
            .list()
            .iter()
            .find(|(name, _)| name.as_str() == stats_name)
            .map(|(_, data)| data)
            .ok_or_else(|| anyhow::anyhow!("interface not found: {}", stats_name))?;
        Ok(ByteCounters {
            received: data.total_received(),
            transmitted: data.total_transmitted(),
        })
    }
}

/// Rewrites sysinfo's BSD-device keyed entries into hardware-port form:
/// configuration commands get the port name, statistics keep the device via
/// `persistent_id`.
pub fn apply_hardware_ports(list: &mut [NetworkInterfaceInfo], ports: &[HardwarePort]) {
    for info in list.iter_mut() {
        info.is_up = !info.ipv4_unicast.is_empty();
        info.kind = classify_by_name(&info.name, "");
        if let Some(port) = ports.iter().find(|p| p.device == info.name) {
            info.persistent_id = Some(info.name.clone());
            info.name = port.port.clone();
            info.descriptor = port.port.clone();
            if !port.mac.is_empty() {
                info.hardware_address = normalize_mac(&port.mac);
            }
            info.kind = classify_by_name(info.persistent_id.as_deref().unwrap_or(""), &port.port);
        }
    }
}

/// Merges the netsh interface table (operational state) and the getmac
/// listing (adapter description, MAC) into the enumeration, keyed by
/// connection name.
pub fn apply_windows_tables(
    list: &mut [NetworkInterfaceInfo],
    table: &[NetshInterface],
    adapters: &[GetmacAdapter],
) {
    for info in list.iter_mut() {
        if let Some(row) = table.iter().find(|r| r.name == info.name) {
            info.is_up = row.admin_enabled && row.connected;
        }
        if let Some(adapter) = adapters.iter().find(|a| a.connection_name == info.name) {
            info.descriptor = adapter.adapter_description.clone();
            if !adapter.mac.is_empty() {
                info.hardware_address = normalize_mac(&adapter.mac);
            }
        }
        info.kind = classify_by_name(&info.name, &info.descriptor);
    }
}

fn classify_by_name(name: &str, descriptor: &str) -> InterfaceKind {
    let name_lower = name.to_lowercase();
    let desc_lower = descriptor.to_lowercase();
    if name_lower == "lo" || name_lower.starts_with("lo0") || desc_lower.contains("loopback") {
        InterfaceKind::Loopback
    } else if name_lower.starts_with("utun")
        || name_lower.starts_with("ppp")
        || name_lower.starts_with("tun")
        || name_lower.starts_with("tap")
    {
        InterfaceKind::Tunnel
    } else if name_lower.starts_with("bridge")
        || name_lower.starts_with("awdl")
        || desc_lower.contains("vmware")
        || desc_lower.contains("virtualbox")
        || desc_lower.contains("hyper-v")
    {
        InterfaceKind::Virtual
    } else if desc_lower.contains("wi-fi")
        || desc_lower.contains("wireless")
        || desc_lower.contains("wlan")
        || name_lower.contains("wi-fi")
    {
        InterfaceKind::Wireless
    } else if desc_lower.contains("ethernet") || name_lower.starts_with("en") {
        InterfaceKind::Wired
    } else {
        InterfaceKind::Other
    }
}
