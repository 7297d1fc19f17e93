// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2018-2022 Andre Richter <andre.o.richter@gmail.com>

//! Driver support.

//--------------------------------------------------------------------------------------------------
// Public Definitions
//--------------------------------------------------------------------------------------------------

/// Driver interfaces.
pub mod interface {

    /// Device Driver functions.
    pub trait DeviceDriver {
        /// Return a compatibility string for identifying the driver.
        fn compatible(&self) -> &'static str;

        /// Called by the bootstrap to bring up the device.
        ///
        /// # Safety
        ///
        /// - During init, drivers might do stuff with system-wide impact.
        unsafe fn init(&self) -> Result<(), &'static str> {
            Ok(())
        }
    }
}

/// A bring-up step that is a plain function rather than a device, e.g. the board's low-level
/// `cpu_init`.
pub struct InitFn {
    name: &'static str,
    init_fn: fn() -> Result<(), &'static str>,
}

//--------------------------------------------------------------------------------------------------
// Public Code
//--------------------------------------------------------------------------------------------------

impl InitFn {
    /// Create an instance.
    pub const fn new(name: &'static str, init_fn: fn() -> Result<(), &'static str>) -> Self {
        Self { name, init_fn }
    }
}

impl interface::DeviceDriver for InitFn {
    fn compatible(&self) -> &'static str {
        self.name
    }

    unsafe fn init(&self) -> Result<(), &'static str> {
        (self.init_fn)()
    }
}

//--------------------------------------------------------------------------------------------------
// Testing
//--------------------------------------------------------------------------------------------------
