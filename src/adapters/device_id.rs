//! Controller identity derived from the ESP32 factory MAC address.
//!
//! The node's RDM source UID uses the prototyping manufacturer range
//! (`0x7FF0`) with the last four MAC bytes as the device ID, so it is
//! deterministic across reboots and unique per board.

use crate::rdm::Uid;

/// Manufacturer ID used for the controller's own UID.
pub const CONTROLLER_MANUFACTURER_ID: u16 = 0x7FF0;

/// Full 6-byte MAC address.
pub type MacAddress = [u8; 6];

/// Read the factory MAC address from eFuse.
#[cfg(target_os = "espidf")]
pub fn read_mac() -> MacAddress {
    let mut mac: MacAddress = [0u8; 6];
    unsafe {
        esp_idf_svc::sys::esp_efuse_mac_get_default(mac.as_mut_ptr());
    }
    mac
}

/// Simulation: returns a deterministic fake MAC.
#[cfg(not(target_os = "espidf"))]
pub fn read_mac() -> MacAddress {
    [0xDE, 0xAD, 0xBE, 0xEF, 0xCA, 0xFE]
}

/// `7FF0:` followed by MAC bytes 2–5.
pub fn controller_uid(mac: &MacAddress) -> Uid {
    let device_id = u32::from_be_bytes([mac[2], mac[3], mac[4], mac[5]]);
    // All-ones would collide with the broadcast device ID.
    Uid::new(CONTROLLER_MANUFACTURER_ID, device_id.min(0xFFFF_FFFE))
}
