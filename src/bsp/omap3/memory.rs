// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2018-2022 Andre Richter <andre.o.richter@gmail.com>

//! BSP Memory Management.
//!
//! The loader itself runs from on-chip SRAM, where the boot ROM put it. SDRAM is free for the
//! memory test and the second stage.
//!
//! ```text
//! 0x4020_0000  SRAM: .text .rodata .data .bss, boot core stack
//! 0x4800_29c0  CONTROL_STATUS boot device byte
//! 0x6d00_0080  SDRC_MCFG_0, SDRC_MCFG_1 at +0x30
//! 0x8000_0000  SDRAM, tested from here
//! 0x8000_8000  second stage load address
//! ```

use crate::{
    boot_source::BootSource,
    bootstrap::{Config, MemTestConfig},
    loader::{CardLayout, FlashLayout, Layout},
};
use core::{cell::UnsafeCell, ops::RangeInclusive};

//--------------------------------------------------------------------------------------------------
// Private Definitions
//--------------------------------------------------------------------------------------------------

// Symbols from the linker script.
extern "Rust" {
    static __bss_start: UnsafeCell<u64>;
    static __bss_end_inclusive: UnsafeCell<u64>;
}

//--------------------------------------------------------------------------------------------------
// Public Definitions
//--------------------------------------------------------------------------------------------------

/// The board's physical memory map.
#[rustfmt::skip]
pub(super) mod map {
    pub const SDRAM_START:      usize = 0x8000_0000;

    /// Where the second stage is copied to and entered.
    pub const LOAD_ADDR:        usize = 0x8000_8000;
    pub const LOAD_MAX_SIZE:    usize = 0x0020_0000;

    pub const SZ_2M:            usize = 0x0020_0000;

    /// Physical devices.
    pub mod mmio {
        pub const CONTROL_STATUS:   usize = 0x4800_29c0;
        pub const UART3_START:      usize = 0x4902_0000;
        pub const SDRC_MCFG_0:      usize = 0x6d00_0080;
        pub const SDRC_MCFG_1:      usize = SDRC_MCFG_0 + 0x30;
    }
}

/// Storage layout of the second stage.
#[rustfmt::skip]
mod layout {
    pub const NAND_BLOCK_SIZE:          usize = 0x0002_0000;
    pub const NAND_UBOOT_START:         usize = 0x0008_0000;
    pub const NAND_UBOOT_END:           usize = 0x0016_0000;

    pub const ONENAND_BLOCK_SIZE:       usize = 0x0002_0000;
    pub const ONENAND_START_BLOCK:      usize = 4;
    pub const ONENAND_END_BLOCK:        usize = 18;

    pub const EMMC_UBOOT_START:         usize = 0x0004_0000;
    pub const EMMC_BLOCK_SIZE:          usize = 0x0006_0000;

    pub const MEMTEST_STEP:             usize = 4;
}

pub use layout::ONENAND_BLOCK_SIZE;

/// Everything the bootstrap needs to know about this board.
pub const BOOT_CONFIG: Config = Config {
    memtest: if cfg!(feature = "memtest") {
        Some(MemTestConfig {
            base: map::SDRAM_START,
            size_registers: [map::mmio::SDRC_MCFG_0, map::mmio::SDRC_MCFG_1],
            size_unit: map::SZ_2M,
            step: layout::MEMTEST_STEP,
        })
    } else {
        None
    },
    forced_source: if cfg!(feature = "serial_download") {
        Some(BootSource::Serial)
    } else {
        None
    },
    boot_status_reg: map::mmio::CONTROL_STATUS,
    fallback: BootSource::Nand,
    layout: Layout {
        onenand: FlashLayout {
            start: layout::ONENAND_START_BLOCK * layout::ONENAND_BLOCK_SIZE,
            end: layout::ONENAND_END_BLOCK * layout::ONENAND_BLOCK_SIZE,
            block_size: layout::ONENAND_BLOCK_SIZE,
        },
        nand: FlashLayout {
            start: layout::NAND_UBOOT_START,
            end: layout::NAND_UBOOT_END,
            block_size: layout::NAND_BLOCK_SIZE,
        },
        card: CardLayout {
            raw_start: layout::EMMC_UBOOT_START,
            raw_len: layout::EMMC_BLOCK_SIZE,
            partition: 1,
            file_name: "u-boot.bin",
        },
        serial_baud: 115_200,
    },
};

//--------------------------------------------------------------------------------------------------
// Public Code
//--------------------------------------------------------------------------------------------------

/// Start address and size of the load region.
pub fn load_region() -> (usize, usize) {
    (map::LOAD_ADDR, map::LOAD_MAX_SIZE)
}

/// Return the inclusive range spanning the .bss section.
///
/// # Safety
///
/// - Values are provided by the linker script and must be trusted as-is.
/// - The linker-provided addresses must be u64 aligned.
pub fn bss_range_inclusive() -> RangeInclusive<*mut u64> {
    let range;
    unsafe {
        range = RangeInclusive::new(__bss_start.get(), __bss_end_inclusive.get());
    }
    assert!(!range.is_empty());

    range
}
