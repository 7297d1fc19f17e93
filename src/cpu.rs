// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2020-2022 Andre Richter <andre.o.richter@gmail.com>

//! Processor code.

#[cfg(target_arch = "aarch64")]
#[path = "_arch/aarch64/cpu.rs"]
mod arch_cpu;

#[cfg(target_arch = "arm")]
#[path = "_arch/arm/cpu.rs"]
mod arch_cpu;

#[cfg(target_os = "none")]
mod boot;

//--------------------------------------------------------------------------------------------------
// Architectural Public Reexports
//--------------------------------------------------------------------------------------------------
#[cfg(any(target_arch = "aarch64", target_arch = "arm"))]
pub use arch_cpu::{jump_to, wait_forever};

#[cfg(all(
    any(target_arch = "aarch64", target_arch = "arm"),
    feature = "test_build"
))]
pub use arch_cpu::qemu_exit_failure;
