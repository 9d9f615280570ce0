//! Opaque, UUID-shaped identifiers (§3: "All identifiers are opaque strings
//! (UUID-shaped)"). No identifier field anywhere in the data model is ever
//! interpreted by callers; this generator exists purely so every component
//! mints ids the same way instead of rolling its own formatting.

use rand::RngCore;

pub type OpaqueId = String;

/// Mints a new opaque, UUID-v4-shaped identifier. Not cryptographically
/// meaningful beyond "globally unique, fixed shape" — callers must not parse
/// structure out of it.
pub fn new_opaque_id() -> OpaqueId {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    // Set version (4) and variant bits so the shape matches UUIDv4.
    bytes[6] = (bytes[6] & 0x0f) | 0x40;
    bytes[8] = (bytes[8] & 0x3f) | 0x80;
    format!(
        "{:02x}{:02x}{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
        bytes[0], bytes[1], bytes[2], bytes[3],
        bytes[4], bytes[5],
        bytes[6], bytes[7],
        bytes[8], bytes[9],
        bytes[10], bytes[11], bytes[12], bytes[13], bytes[14], bytes[15],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique_and_uuid_shaped() {
        let a = new_opaque_id();
        let b = new_opaque_id();
        assert_ne!(a, b);
        assert_eq!(a.len(), 36);
        assert_eq!(a.chars().filter(|&c| c == '-').count(), 4);
    }
}
