// Chipset matching for the RM-01's USB Ethernet adapter

/// Identifier tokens for the ASIX chipset inside the RM-01.
///
/// Deliberately narrow: a single token covers AX88179 and AX88179A, and
/// earlier broader lists ("asix", "usb ethernet", ...) matched unrelated USB
/// adapters. Do not widen without a second discriminator.
pub const CHIPSET_TOKENS: &[&str] = &["ax88179"];

/// Case-insensitive substring match of an interface descriptor against the
/// known chipset tokens. Pure; no I/O.
pub fn matches_descriptor(descriptor: &str) -> bool {
    let lowered = descriptor.to_lowercase();
    CHIPSET_TOKENS.iter().any(|token| lowered.contains(token))
}
