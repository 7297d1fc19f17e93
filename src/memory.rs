// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2018-2022 Andre Richter <andre.o.richter@gmail.com>

//! Memory Management.
//!
//! Everything the bootstrap core touches in the physical address space, be it a status register
//! or an SDRAM cell under test, is reached through [`interface::Access`]. Each call is exactly one
//! bus transaction: no caching, no merging of repeated accesses, no reordering between calls.

#[cfg(test)]
pub(crate) mod sim;

use core::ops::RangeInclusive;

//--------------------------------------------------------------------------------------------------
// Public Definitions
//--------------------------------------------------------------------------------------------------

/// Memory access interfaces.
pub mod interface {

    /// Volatile access to absolute physical addresses.
    ///
    /// Methods take `&self` because the accessed memory is shared with the hardware anyway; an
    /// implementation is a view of the address space, not its owner.
    pub trait Access {
        /// Read one byte.
        fn read_u8(&self, addr: usize) -> u8;

        /// Write one byte.
        fn write_u8(&self, addr: usize, value: u8);

        /// Read one halfword. `addr` must be 2-byte aligned.
        fn read_u16(&self, addr: usize) -> u16;

        /// Write one halfword. `addr` must be 2-byte aligned.
        fn write_u16(&self, addr: usize, value: u16);

        /// Read one word. `addr` must be 4-byte aligned.
        fn read_u32(&self, addr: usize) -> u32;

        /// Write one word. `addr` must be 4-byte aligned.
        fn write_u32(&self, addr: usize, value: u32);
    }
}

/// The physical address space as seen by the boot core, with MMU and caches off.
pub struct PhysicalAccess {
    _private: (),
}

//--------------------------------------------------------------------------------------------------
// Public Code
//--------------------------------------------------------------------------------------------------

impl PhysicalAccess {
    /// Create an instance.
    ///
    /// # Safety
    ///
    /// - Every address later handed to the accessors must be backed by a device or by memory that
    ///   may be clobbered.
    pub const unsafe fn new() -> Self {
        Self { _private: () }
    }
}

impl interface::Access for PhysicalAccess {
    #[inline(always)]
    fn read_u8(&self, addr: usize) -> u8 {
        unsafe { core::ptr::read_volatile(addr as *const u8) }
    }

    #[inline(always)]
    fn write_u8(&self, addr: usize, value: u8) {
        unsafe { core::ptr::write_volatile(addr as *mut u8, value) }
    }

    #[inline(always)]
    fn read_u16(&self, addr: usize) -> u16 {
        unsafe { core::ptr::read_volatile(addr as *const u16) }
    }

    #[inline(always)]
    fn write_u16(&self, addr: usize, value: u16) {
        unsafe { core::ptr::write_volatile(addr as *mut u16, value) }
    }

    #[inline(always)]
    fn read_u32(&self, addr: usize) -> u32 {
        unsafe { core::ptr::read_volatile(addr as *const u32) }
    }

    #[inline(always)]
    fn write_u32(&self, addr: usize, value: u32) {
        unsafe { core::ptr::write_volatile(addr as *mut u32, value) }
    }
}

/// Zero out an inclusive memory range.
///
/// # Safety
///
/// - `range.start` and `range.end` must be valid.
/// - `range.start` and `range.end` must be `T` aligned.
pub unsafe fn zero_volatile<T>(range: RangeInclusive<*mut T>)
where
    T: From<u8>,
{
    let mut ptr = *range.start();
    let end_inclusive = *range.end();

    while ptr <= end_inclusive {
        core::ptr::write_volatile(ptr, T::from(0));
        ptr = ptr.offset(1);
    }
}

//--------------------------------------------------------------------------------------------------
// Testing
//--------------------------------------------------------------------------------------------------
