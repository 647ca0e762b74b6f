// Upstream candidate filtering and ranking

mod common;

use common::iface;
use rm01_share::models::InterfaceKind;
use rm01_share::upstream::find_best_upstream;

#[test]
fn never_returns_the_excluded_interface() {
    let interfaces = vec![iface(
        "enx01",
        "AX88179 Gigabit Ethernet",
        InterfaceKind::Wired,
        true,
        &["10.10.99.100"],
        1000,
    )];
    assert!(find_best_upstream(&interfaces, "enx01").is_none());
}

#[test]
fn rejects_down_interfaces() {
    let interfaces = vec![iface(
        "eth0",
        "Realtek PCIe GbE",
        InterfaceKind::Wired,
        false,
        &["192.168.1.5"],
        1000,
    )];
    assert!(find_best_upstream(&interfaces, "enx01").is_none());
}

#[test]
fn rejects_link_local_only_interfaces() {
    let interfaces = vec![iface(
        "eth0",
        "Realtek PCIe GbE",
        InterfaceKind::Wired,
        true,
        &["169.254.12.7"],
        1000,
    )];
    assert!(find_best_upstream(&interfaces, "enx01").is_none());
}

#[test]
fn rejects_loopback_tunnel_and_virtual_kinds() {
    let interfaces = vec![
        iface("lo", "", InterfaceKind::Loopback, true, &["127.0.0.1"], 0),
        iface("tun0", "", InterfaceKind::Tunnel, true, &["10.8.0.2"], 0),
        iface("docker0", "", InterfaceKind::Virtual, true, &["172.17.0.1"], 0),
    ];
    assert!(find_best_upstream(&interfaces, "enx01").is_none());
}

#[test]
fn rejects_vpn_ish_descriptors_regardless_of_kind() {
    let interfaces = vec![
        iface("eth5", "TAP-Windows Adapter V9", InterfaceKind::Wired, true, &["10.8.0.2"], 1000),
        iface("eth6", "Cisco AnyConnect VPN", InterfaceKind::Wired, true, &["10.9.0.2"], 1000),
        iface("eth7", "VMware Virtual Ethernet", InterfaceKind::Wired, true, &["192.168.56.1"], 1000),
    ];
    assert!(find_best_upstream(&interfaces, "enx01").is_none());
}

#[test]
fn prefers_wireless_over_wired() {
    let interfaces = vec![
        iface("eth0", "Realtek PCIe GbE", InterfaceKind::Wired, true, &["192.168.1.5"], 1000),
        iface("wlan0", "Intel Wireless 8265", InterfaceKind::Wireless, true, &["192.168.1.6"], 300),
    ];
    let best = find_best_upstream(&interfaces, "enx01").unwrap();
    assert_eq!(best.name, "wlan0");
}

#[test]
fn breaks_kind_ties_by_link_speed_then_enumeration_order() {
    let interfaces = vec![
        iface("eth0", "Realtek PCIe GbE", InterfaceKind::Wired, true, &["192.168.1.5"], 100),
        iface("eth1", "Intel I225-V", InterfaceKind::Wired, true, &["192.168.1.6"], 2500),
        iface("eth2", "Realtek PCIe GbE", InterfaceKind::Wired, true, &["192.168.1.7"], 2500),
    ];
    let best = find_best_upstream(&interfaces, "enx01").unwrap();
    assert_eq!(best.name, "eth1");
}

#[test]
fn absent_result_when_no_candidate_qualifies() {
    assert!(find_best_upstream(&[], "enx01").is_none());
}
