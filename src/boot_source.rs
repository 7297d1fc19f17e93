// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2022 Andre Richter <andre.o.richter@gmail.com>

//! Boot device selection.
//!
//! The SoC's boot ROM leaves the identifier of the medium it booted from in the low byte of a
//! status register. That byte picks where the second stage is loaded from.

use crate::{memory::interface::Access, warn};
use core::fmt;
use tock_registers::{register_bitfields, LocalRegisterCopy};

//--------------------------------------------------------------------------------------------------
// Private Definitions
//--------------------------------------------------------------------------------------------------

register_bitfields! {
    u32,

    /// Boot status as left behind by the boot ROM.
    BOOT_STATUS [
        /// Identifier of the boot medium.
        DEVICE OFFSET(0) NUMBITS(8) []
    ]
}

//--------------------------------------------------------------------------------------------------
// Public Definitions
//--------------------------------------------------------------------------------------------------

/// Medium supplying the second-stage image.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BootSource {
    OneNand,
    Nand,
    Emmc,
    MmcSd1,
    /// Image download over the debug UART.
    Serial,
    /// Identifier not in the table.
    Unknown,
}

/// Reads the boot status register and resolves it to a [`BootSource`].
pub struct Selector {
    status_reg: usize,
    fallback: BootSource,
}

//--------------------------------------------------------------------------------------------------
// Public Code
//--------------------------------------------------------------------------------------------------

impl BootSource {
    /// Look up a raw boot identifier.
    pub const fn from_id(id: u8) -> Self {
        match id {
            0x02 => BootSource::Nand,
            0x03 => BootSource::OneNand,
            0x05 => BootSource::Emmc,
            0x06 => BootSource::MmcSd1,
            _ => BootSource::Unknown,
        }
    }

    /// Name used in console messages.
    pub const fn name(&self) -> &'static str {
        match self {
            BootSource::OneNand => "ONENAND",
            BootSource::Nand => "NAND",
            BootSource::Emmc => "eMMC",
            BootSource::MmcSd1 => "MMC/SD1",
            BootSource::Serial => "UART",
            BootSource::Unknown => "unknown",
        }
    }
}

impl fmt::Display for BootSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Selector {
    /// Create an instance.
    ///
    /// Identifiers missing from the table resolve to `fallback` instead of failing: there is no
    /// other medium to recover from at this stage.
    pub const fn new(status_reg: usize, fallback: BootSource) -> Self {
        Self {
            status_reg,
            fallback,
        }
    }

    /// Extract the identifier from a raw status register value.
    pub fn boot_id(raw: u32) -> u8 {
        let status = LocalRegisterCopy::<u32, BOOT_STATUS::Register>::new(raw);

        status.read(BOOT_STATUS::DEVICE) as u8
    }

    /// Read the status register, once, and resolve the boot source.
    pub fn select<A: Access + ?Sized>(&self, bus: &A) -> BootSource {
        let id = Self::boot_id(bus.read_u32(self.status_reg));

        match BootSource::from_id(id) {
            BootSource::Unknown => {
                warn!(
                    "Unknown boot device {:#04x}, falling back to {}",
                    id, self.fallback
                );
                self.fallback
            }
            source => source,
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Testing
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::sim::SimBus;

    const STATUS: usize = 0x4800_29c0;

    fn select(raw: u32) -> BootSource {
        let bus = SimBus::new(0x8000_0000, 16).with_register(STATUS, raw);

        Selector::new(STATUS, BootSource::Nand).select(&bus)
    }

    #[test]
    fn known_identifiers_map_to_their_medium() {
        assert_eq!(select(0x03), BootSource::OneNand);
        assert_eq!(select(0x02), BootSource::Nand);
        assert_eq!(select(0x05), BootSource::Emmc);
        assert_eq!(select(0x06), BootSource::MmcSd1);
    }

    #[test]
    fn unknown_identifiers_fall_back_to_nand() {
        for id in [0x00, 0x01, 0x04, 0x07, 0x2f, 0xff] {
            assert_eq!(BootSource::from_id(id), BootSource::Unknown);
            assert_eq!(select(u32::from(id)), BootSource::Nand, "id {:#x}", id);
        }
    }

    #[test]
    fn only_the_low_byte_identifies_the_medium() {
        assert_eq!(Selector::boot_id(0xdead_be06), 0x06);
        assert_eq!(select(0x1234_5605), BootSource::Emmc);
        assert_eq!(select(0x0000_0300), BootSource::Nand);
    }

    #[test]
    fn the_status_register_is_read_exactly_once() {
        let bus = SimBus::new(0x8000_0000, 16).with_register(STATUS, 0x06);

        Selector::new(STATUS, BootSource::Nand).select(&bus);

        assert_eq!(bus.register_reads(STATUS), 1);
    }

    #[test]
    fn names_match_the_console_messages() {
        assert_eq!(BootSource::MmcSd1.to_string(), "MMC/SD1");
        assert_eq!(BootSource::OneNand.to_string(), "ONENAND");
        assert_eq!(BootSource::Serial.to_string(), "UART");
    }
}
