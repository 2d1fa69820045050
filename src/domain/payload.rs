//! Beacon Advertising Payload
//!
//! Builds the advertising and scan response data broadcast by the beacon.
//!
//! # Advertising data (AD structures, `[len][type][data]`)
//!
//! ```text
//! [02 01 04]                  : Flags - BR/EDR not supported
//! [0D FF cc cc <10 bytes>]    : Manufacturer specific data
//!                               cc cc    : Company identifier (u16 little-endian)
//!                               [0-3]    : Latitude  (i32 big-endian, 1e-7 degree)
//!                               [4-7]    : Longitude (i32 big-endian, 1e-7 degree)
//!                               [8-9]    : Altitude  (i16 big-endian, meters)
//! ```
//!
//! # Scan response
//!
//! ```text
//! [len 09 <name>]             : Complete local name
//! ```

use crate::domain::position::{PositionFix, POSITION_DATA_LEN};
use tracing::warn;

/// AD type: flags
pub const AD_TYPE_FLAGS: u8 = 0x01;
/// AD type: complete local name
pub const AD_TYPE_NAME_COMPLETE: u8 = 0x09;
/// AD type: manufacturer specific data
pub const AD_TYPE_MANUFACTURER_DATA: u8 = 0xFF;

/// Flags value: BR/EDR not supported
pub const FLAG_NO_BREDR: u8 = 0x04;

/// Comodule GmbH company identifier
pub const DEFAULT_COMPANY_ID: u16 = 0x020F;

/// Name carried in the scan response
pub const DEFAULT_DEVICE_NAME: &str = "GPS Beacon";

/// Legacy advertising PDUs carry at most 31 bytes of AD structures
pub const MAX_AD_LEN: usize = 31;

/// Longest name that fits in a single scan response structure
pub const MAX_DEVICE_NAME_LEN: usize = MAX_AD_LEN - 2;

/// Company identifier plus position block
pub const MANUFACTURER_DATA_LEN: usize = 2 + POSITION_DATA_LEN;

/// Constant parts of the payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadConfig {
    pub company_id: u16,
    pub device_name: String,
}

impl PayloadConfig {
    pub fn new(company_id: u16, device_name: &str) -> Self {
        let mut end = device_name.len().min(MAX_DEVICE_NAME_LEN);
        while !device_name.is_char_boundary(end) {
            end -= 1;
        }
        if end < device_name.len() {
            warn!(
                "Device name \"{}\" exceeds {} bytes, truncating",
                device_name, MAX_DEVICE_NAME_LEN
            );
        }
        Self {
            company_id,
            device_name: device_name[..end].to_string(),
        }
    }
}

impl Default for PayloadConfig {
    fn default() -> Self {
        Self::new(DEFAULT_COMPANY_ID, DEFAULT_DEVICE_NAME)
    }
}

/// Everything handed to the radio stack for one broadcast
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvertisingData {
    pub flags: u8,
    pub company_id: u16,
    pub position: PositionFix,
    pub device_name: String,
}

impl AdvertisingData {
    pub fn new(config: &PayloadConfig, position: PositionFix) -> Self {
        Self {
            flags: FLAG_NO_BREDR,
            company_id: config.company_id,
            position,
            device_name: config.device_name.clone(),
        }
    }

    /// Company identifier followed by the encoded position
    pub fn manufacturer_data(&self) -> [u8; MANUFACTURER_DATA_LEN] {
        let mut out = [0u8; MANUFACTURER_DATA_LEN];
        out[..2].copy_from_slice(&self.company_id.to_le_bytes());
        out[2..].copy_from_slice(&self.position.encode());
        out
    }

    /// Flags and manufacturer data as AD structures
    pub fn advertising_structures(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(MAX_AD_LEN);
        push_structure(&mut out, AD_TYPE_FLAGS, &[self.flags]);
        push_structure(&mut out, AD_TYPE_MANUFACTURER_DATA, &self.manufacturer_data());
        out
    }

    /// Complete local name as an AD structure
    pub fn scan_response_structures(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(MAX_AD_LEN);
        push_structure(&mut out, AD_TYPE_NAME_COMPLETE, self.device_name.as_bytes());
        out
    }
}

fn push_structure(out: &mut Vec<u8>, ad_type: u8, data: &[u8]) {
    out.push((data.len() + 1) as u8);
    out.push(ad_type);
    out.extend_from_slice(data);
}

/// Walk AD structures and decode the first beacon manufacturer data found
///
/// Returns the company identifier and the position it carries.
pub fn parse_manufacturer_data(ad: &[u8]) -> Option<(u16, PositionFix)> {
    let mut i = 0usize;
    while i < ad.len() {
        let len = ad[i] as usize;
        i += 1;
        if len == 0 {
            continue;
        }
        if i + len > ad.len() {
            break;
        }
        let ad_type = ad[i];
        let data = &ad[i + 1..i + len];
        i += len;

        if ad_type != AD_TYPE_MANUFACTURER_DATA || data.len() != MANUFACTURER_DATA_LEN {
            continue;
        }
        let company_id = u16::from_le_bytes([data[0], data[1]]);
        if let Ok(position) = PositionFix::decode(&data[2..]) {
            return Some((company_id, position));
        }
    }
    None
}
