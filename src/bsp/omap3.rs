// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2018-2022 Andre Richter <andre.o.richter@gmail.com>

//! Top-level BSP file for the OMAP3 evaluation boards.

pub mod cpu;
pub mod driver;
pub mod memory;

//--------------------------------------------------------------------------------------------------
// Global instances
//--------------------------------------------------------------------------------------------------
use super::device_driver;

static UART3: device_driver::Ns16550Uart =
    unsafe { device_driver::Ns16550Uart::new(memory::map::mmio::UART3_START) };

//--------------------------------------------------------------------------------------------------
// Public Code
//--------------------------------------------------------------------------------------------------

/// Board identification.
pub fn board_name() -> &'static str {
    "OMAP3 EVM"
}

/// The console UART, as transport for the serial download.
pub fn serial_link() -> &'static device_driver::Ns16550Uart {
    &UART3
}
