// Adapter detection over an enumerated interface list

use crate::matcher;
use crate::models::{NetworkInterfaceInfo, normalize_mac};

/// Filters an enumeration result down to RM-01 adapters, preserving the OS
/// enumeration order. MACs are normalized on the way out so every consumer
/// sees the canonical form.
pub fn detect(interfaces: &[NetworkInterfaceInfo]) -> Vec<NetworkInterfaceInfo> {
    interfaces
        .iter()
        .filter(|i| matcher::matches_descriptor(&i.descriptor))
        .cloned()
        .map(|mut i| {
            i.hardware_address = normalize_mac(&i.hardware_address);
            i
        })
        .collect()
}

/// First matching adapter, or None. Detection failure is never fatal; an
/// empty or errored enumeration simply yields None upstream of here.
pub fn find_first(interfaces: &[NetworkInterfaceInfo]) -> Option<NetworkInterfaceInfo> {
    detect(interfaces).into_iter().next()
}
