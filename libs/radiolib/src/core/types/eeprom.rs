// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use crate::core::DeviceAddr;

/// Motherboard EEPROM contents (free-form key/value fields such as
/// `serial`, `name`, `mac-addr`).
pub type MboardEeprom = DeviceAddr;

/// Daughterboard EEPROM record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DboardEeprom {
    pub id: u16,
    pub serial: String,
    pub revision: i32,
}

impl DboardEeprom {
    pub fn new(id: u16, serial: &str, revision: i32) -> Self {
        Self {
            id,
            serial: serial.to_string(),
            revision,
        }
    }
}

/// Property-tree path of a motherboard EEPROM.
pub fn mboard_eeprom_path(mboard: usize) -> String {
    format!("/mboards/{}/eeprom", mboard)
}

/// Property-tree path of a daughterboard EEPROM, e.g.
/// `/mboards/0/dboards/A/rx_eeprom`.
pub fn dboard_eeprom_path(mboard: usize, slot: &str, unit: &str) -> String {
    format!("/mboards/{}/dboards/{}/{}_eeprom", mboard, slot, unit)
}
