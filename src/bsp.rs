// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2018-2022 Andre Richter <andre.o.richter@gmail.com>

//! Conditional reexporting of Board Support Packages.

#[cfg(any(test, feature = "bsp_omap3"))]
pub mod device_driver;

#[cfg(feature = "bsp_omap3")]
mod omap3;

#[cfg(feature = "bsp_omap3")]
pub use omap3::*;
