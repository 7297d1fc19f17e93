// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2018-2022 Andre Richter <andre.o.richter@gmail.com>

// Rust embedded logo for `make doc`.
#![doc(html_logo_url = "https://git.io/JeGIp")]

//! The `xloader` library.
//!
//! First-stage bootstrap that runs straight out of reset. It brings up the minimum set of
//! subsystems, optionally checks that SDRAM is wired and holding data correctly, picks a boot
//! medium from the SoC's boot status register, copies the second-stage image into SDRAM and jumps
//! to it. There is no way back from the jump; every failure ends in a terminal halt.
//!
//! # Code organization and architecture
//!
//! The code is divided into different *modules*, each representing a typical **subsystem** of the
//! loader. Top-level module files of subsystems reside directly in the `src` folder. For example,
//! `src/memtest.rs` contains the memory diagnostic engine.
//!
//! ## Visibility of processor architecture code
//!
//! Some of the subsystems depend on low-level code that is specific to the target processor
//! architecture. For each supported processor architecture, there exists a subfolder in
//! `src/_arch`: `src/_arch/arm` for the ARMv7-A parts this loader boots on, and
//! `src/_arch/aarch64`.
//!
//! The architecture folders mirror the subsystem modules laid out in `src`. For example,
//! architectural code that belongs to the `cpu` subsystem (`src/cpu.rs`) goes into
//! `src/_arch/aarch64/cpu.rs`. The latter file is loaded as a module in `src/cpu.rs` using the
//! `path attribute`.
//!
//! ## BSP code
//!
//! `BSP` stands for Board Support Package. `BSP` code is organized under `src/bsp.rs` and contains
//! target board specific definitions and functions: the physical memory map, the register
//! addresses the bootstrap consults, flash/card layouts and instances of drivers for devices that
//! are featured on the respective board.
//!
//! ## Board-independent core
//!
//! - [`memtest`]: data-bus, address-bus and device tests over a memory region.
//! - [`boot_source`]: boot status register to [`boot_source::BootSource`] lookup.
//! - [`loader`]: per-source copy of the second-stage image into the load region.
//! - [`bootstrap`]: the ordered bring-up and the Init → Diagnose → Select → Load → Jump/Halt
//!   state machine.
//!
//! All hardware accesses of the core go through [`memory::interface::Access`], so the core runs
//! unchanged against a simulated address space in host unit tests.
//!
//! # Boot flow
//!
//! 1. The loader's entry point is the function `cpu::boot::arch_boot::_start()`.
//!     - It is implemented in `src/_arch/__arch_name__/cpu/boot.s`.
//! 2. Once finished with architectural setup, the arch code calls
//!    `runtime_init::runtime_init()`, which zeroes `.bss` and calls `kernel_init()` of the
//!    binary.

#![cfg_attr(not(test), no_std)]

#[cfg(target_os = "none")]
mod panic_wait;
mod synchronization;

pub mod boot_source;
pub mod bootstrap;
pub mod bsp;
pub mod console;
pub mod cpu;
pub mod driver;
pub mod loader;
pub mod memory;
pub mod memtest;
pub mod print;

#[cfg(target_os = "none")]
mod runtime_init;

#[cfg(target_os = "none")]
extern "Rust" {
    fn kernel_init() -> !;
}

/// Version string.
pub fn version() -> &'static str {
    concat!(
        env!("CARGO_PKG_NAME"),
        " version ",
        env!("CARGO_PKG_VERSION")
    )
}
