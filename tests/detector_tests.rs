// Adapter matching and detection

mod common;

use common::{iface, rm01_adapter};
use rm01_share::detector;
use rm01_share::matcher;
use rm01_share::models::{InterfaceKind, normalize_mac};

#[test]
fn matcher_is_case_insensitive_and_substring_based() {
    assert!(matcher::matches_descriptor("AX88179 Gigabit Ethernet"));
    assert!(matcher::matches_descriptor("ax88179a usb ethernet adapter"));
    assert!(matcher::matches_descriptor("Something AX88179A 5"));
    assert!(!matcher::matches_descriptor("Intel Wireless 8265"));
    // Other ASIX chips must not match; the token list is deliberately narrow.
    assert!(!matcher::matches_descriptor("ASIX AX88772B USB Ethernet"));
    assert!(!matcher::matches_descriptor(""));
}

#[test]
fn detect_filters_and_preserves_enumeration_order() {
    let interfaces = vec![
        iface("lo", "", InterfaceKind::Loopback, true, &["127.0.0.1"], 0),
        rm01_adapter("enx01"),
        iface("wlan0", "Intel Wireless", InterfaceKind::Wireless, true, &[], 0),
        rm01_adapter("enx02"),
    ];
    let found = detector::detect(&interfaces);
    assert_eq!(found.len(), 2);
    assert_eq!(found[0].name, "enx01");
    assert_eq!(found[1].name, "enx02");
}

#[test]
fn find_first_returns_first_match_or_none() {
    let interfaces = vec![
        iface("eth0", "Realtek PCIe GbE", InterfaceKind::Wired, true, &[], 0),
        rm01_adapter("enxaa"),
        rm01_adapter("enxbb"),
    ];
    assert_eq!(detector::find_first(&interfaces).unwrap().name, "enxaa");

    let none = vec![iface("eth0", "Realtek PCIe GbE", InterfaceKind::Wired, true, &[], 0)];
    assert!(detector::find_first(&none).is_none());
}

#[test]
fn detect_normalizes_hardware_addresses() {
    let mut adapter = rm01_adapter("enx01");
    adapter.hardware_address = "c8:a3:62:7e:8d:4d".into();
    let found = detector::detect(&[adapter]);
    assert_eq!(found[0].hardware_address, "C8:A3:62:7E:8D:4D");
}

#[test]
fn normalize_mac_handles_common_forms() {
    assert_eq!(normalize_mac("c8:a3:62:7e:8d:4d"), "C8:A3:62:7E:8D:4D");
    assert_eq!(normalize_mac("C8-A3-62-7E-8D-4D"), "C8:A3:62:7E:8D:4D");
    assert_eq!(normalize_mac("c8a3627e8d4d"), "C8:A3:62:7E:8D:4D");
    // Unparseable input passes through uppercased rather than panicking.
    assert_eq!(normalize_mac("N/A"), "N/A");
}
