//! Device identity derived from the ESP32 factory MAC address.
//!
//! The broker client id is `lightsync-xxyyzz` (last 3 bytes of the 6-byte
//! MAC in lowercase hex).  It is deterministic across reboots, so a
//! reconnecting controller takes over its own previous session.

use core::fmt::Write;

use crate::sync::ClientId;

/// Full 6-byte MAC address.
pub type MacAddress = [u8; 6];

/// Read the factory MAC address from eFuse.
#[cfg(target_os = "espidf")]
pub fn read_mac() -> MacAddress {
    let mut mac: MacAddress = [0u8; 6];
    // SAFETY: the buffer is exactly the 6 bytes the call writes.
    unsafe {
        esp_idf_svc::sys::esp_efuse_mac_get_default(mac.as_mut_ptr());
    }
    mac
}

/// Simulation: returns a deterministic fake MAC.
#[cfg(not(target_os = "espidf"))]
pub fn read_mac() -> MacAddress {
    [0x02, 0x4C, 0x53, 0x00, 0xBE, 0xEF]
}

/// Derive the broker client id from the last 3 MAC bytes.
pub fn client_id(mac: &MacAddress) -> ClientId {
    let mut id = ClientId::new();
    // 16 chars always fit in the 32-byte buffer.
    let _ = write!(id, "lightsync-{:02x}{:02x}{:02x}", mac[3], mac[4], mac[5]);
    id
}
