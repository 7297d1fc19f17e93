// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2018-2022 Andre Richter <andre.o.richter@gmail.com>

//! BSP driver support.
//!
//! Clock, pad, SDRC, flash, MMC and FAT support come from the board's low-level C objects. This
//! module binds them to the bootstrap's driver interfaces.

use super::memory::ONENAND_BLOCK_SIZE;
use crate::{
    console,
    driver::{interface::DeviceDriver, InitFn},
    loader::interface::{self, CardDevice, FileSystem, FlashDevice},
    println,
};
use core::ffi::{c_char, c_int, c_long, c_ulong, c_void};

//--------------------------------------------------------------------------------------------------
// Private Definitions
//--------------------------------------------------------------------------------------------------

extern "C" {
    fn cpu_init() -> c_int;
    fn board_init() -> c_int;
    fn nand_init() -> c_int;

    fn nand_read_block(buf: *mut u8, block_addr: c_ulong) -> c_int;
    fn onenand_read_block(buf: *mut u8, block: c_ulong) -> c_int;

    fn mmc_init(dev: c_int) -> c_int;
    fn mmc_read(dev: c_int, src: c_ulong, dst: *mut u8, size: c_int) -> c_int;
    fn mmc_get_dev(dev: c_int) -> *mut c_void;

    fn fat_register_device(dev_desc: *mut c_void, part: c_int) -> c_int;
    fn file_fat_read(filename: *const c_char, buffer: *mut c_void, maxsize: c_ulong) -> c_long;
}

/// Longest file name, including the terminating NUL, handed to the FAT driver.
const MAX_FILE_NAME: usize = 64;

fn status(ret: c_int, msg: &'static str) -> Result<(), &'static str> {
    if ret == 0 {
        Ok(())
    } else {
        Err(msg)
    }
}

fn cpu_init_step() -> Result<(), &'static str> {
    status(unsafe { cpu_init() }, "cpu_init returned an error")
}

fn board_init_step() -> Result<(), &'static str> {
    status(unsafe { board_init() }, "board_init returned an error")
}

fn nand_init_step() -> Result<(), &'static str> {
    status(unsafe { nand_init() }, "nand_init returned an error")
}

/// Bring up UART3 and make it the console.
fn serial_init_step() -> Result<(), &'static str> {
    unsafe { super::UART3.init()? };
    console::register_console(&super::UART3);

    Ok(())
}

fn print_info_step() -> Result<(), &'static str> {
    println!();
    println!("{} for {}", crate::version(), super::board_name());

    Ok(())
}

//--------------------------------------------------------------------------------------------------
// Global instances
//--------------------------------------------------------------------------------------------------

static CPU_INIT: InitFn = InitFn::new("cpu_init", cpu_init_step);
static BOARD_INIT: InitFn = InitFn::new("board_init", board_init_step);
static SERIAL_INIT: InitFn = InitFn::new("serial_init", serial_init_step);
static PRINT_INFO: InitFn = InitFn::new("print_info", print_info_step);
static NAND_INIT: InitFn = InitFn::new("nand_init", nand_init_step);

//--------------------------------------------------------------------------------------------------
// Public Definitions
//--------------------------------------------------------------------------------------------------

/// NAND flash, read one erase block at a time.
pub struct NandFlash;

/// OneNAND flash, addressed by block number.
pub struct OneNandFlash;

/// The MMC host controller with both card slots.
pub struct MmcCard;

/// FAT file system on top of [`MmcCard`].
pub struct FatFs;

//--------------------------------------------------------------------------------------------------
// Public Code
//--------------------------------------------------------------------------------------------------

/// The bring-up steps, in the order they must run.
pub fn init_sequence() -> [&'static dyn DeviceDriver; 5] {
    [&CPU_INIT, &BOARD_INIT, &SERIAL_INIT, &PRINT_INFO, &NAND_INIT]
}

impl FlashDevice for NandFlash {
    fn read_block(&mut self, offset: usize, dst: &mut [u8]) -> Result<(), &'static str> {
        let ret = unsafe { nand_read_block(dst.as_mut_ptr(), offset as c_ulong) };

        status(ret, "NAND block read failed")
    }
}

impl FlashDevice for OneNandFlash {
    fn read_block(&mut self, offset: usize, dst: &mut [u8]) -> Result<(), &'static str> {
        let block = offset / ONENAND_BLOCK_SIZE;
        let ret = unsafe { onenand_read_block(dst.as_mut_ptr(), block as c_ulong) };

        status(ret, "OneNAND block read failed")
    }
}

impl CardDevice for MmcCard {
    fn init(&mut self, dev: u32) -> Result<(), &'static str> {
        status(unsafe { mmc_init(dev as c_int) }, "MMC init failed")
    }

    fn read(
        &mut self,
        dev: u32,
        start_sector: usize,
        dst: &mut [u8],
    ) -> Result<usize, &'static str> {
        let len = c_int::try_from(dst.len()).map_err(|_| "MMC read too large")?;

        // The host driver returns 1 on success.
        let ret = unsafe { mmc_read(dev as c_int, start_sector as c_ulong, dst.as_mut_ptr(), len) };
        if ret != 1 {
            return Err("MMC read failed");
        }

        Ok(dst.len())
    }
}

impl FileSystem for FatFs {
    fn mount(&mut self, dev: u32, partition: u32) -> Result<(), &'static str> {
        let dev_desc = unsafe { mmc_get_dev(dev as c_int) };
        if dev_desc.is_null() {
            return Err("no block device for card");
        }

        status(
            unsafe { fat_register_device(dev_desc, partition as c_int) },
            "no FAT file system on partition",
        )
    }

    fn read_file(&mut self, name: &str, dst: &mut [u8], offset: usize) -> isize {
        // The C driver always reads from the start of the file.
        if offset != 0 || name.len() >= MAX_FILE_NAME {
            return interface::NOT_FOUND;
        }

        let mut c_name = [0 as c_char; MAX_FILE_NAME];
        for (c, b) in c_name.iter_mut().zip(name.bytes()) {
            *c = b as c_char;
        }

        let read = unsafe {
            file_fat_read(
                c_name.as_ptr(),
                dst.as_mut_ptr() as *mut c_void,
                dst.len() as c_ulong,
            )
        };

        if read < 0 {
            interface::NOT_FOUND
        } else {
            read as isize
        }
    }
}
