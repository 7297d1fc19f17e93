// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2018-2022 Andre Richter <andre.o.richter@gmail.com>

// Rust embedded logo for `make doc`.
#![doc(html_logo_url = "https://git.io/JeGIp")]

//! The `xloader` binary.
//!
//! Board glue only: everything the bootstrap does lives in `libxloader`.

#![no_main]
#![no_std]

use libxloader::{
    bootstrap::Bootstrap,
    bsp::{self, driver::*},
    cpu,
    driver::interface::DeviceDriver,
    loader::{Devices, ImageBuffer},
    memory::PhysicalAccess,
    println,
};

/// Early init code.
///
/// # Safety
///
/// - Only a single core must be active and running this function.
#[no_mangle]
unsafe fn kernel_init() -> ! {
    let steps: [&dyn DeviceDriver; 5] = init_sequence();
    let bus = PhysicalAccess::new();

    let (mut nand, mut onenand, mut card, mut fat) = (NandFlash, OneNandFlash, MmcCard, FatFs);
    let mut serial = bsp::serial_link();
    let devices = Devices {
        onenand: Some(&mut onenand),
        nand: Some(&mut nand),
        card: Some(&mut card),
        fat: Some(&mut fat),
        serial: Some(&mut serial),
    };

    let (load_addr, load_size) = bsp::memory::load_region();
    let image = ImageBuffer::at_address(load_addr, load_size);

    let result = Bootstrap::new(&steps, &bus, devices, &bsp::memory::BOOT_CONFIG, image).run();

    match result {
        // Ready to go, never returns.
        Ok(entry) => entry.handoff(),
        Err(_) => {
            println!("X-Loader hangs");

            #[cfg(feature = "test_build")]
            cpu::qemu_exit_failure();

            #[cfg(not(feature = "test_build"))]
            cpu::wait_forever()
        }
    }
}
