// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2018-2022 Andre Richter <andre.o.richter@gmail.com>

//! Architectural processor code.
//!
//! # Orientation
//!
//! Since arch modules are imported into generic modules using the path attribute, the path of this
//! file is:
//!
//! crate::cpu::arch_cpu

use cortex_a::asm;

//--------------------------------------------------------------------------------------------------
// Public Code
//--------------------------------------------------------------------------------------------------

/// Pause execution on the core.
#[inline(always)]
pub fn wait_forever() -> ! {
    loop {
        asm::wfe()
    }
}

/// Transfer control to the image entry at `entry`.
///
/// # Safety
///
/// - `entry` must point to executable code that was completely written to memory before this call.
/// - The callee never returns; nothing on the current stack is used afterwards.
#[inline(never)]
pub unsafe fn jump_to(entry: usize) -> ! {
    use asm::barrier;

    // Make the copied image visible to instruction fetch before branching into it.
    barrier::dsb(barrier::SY);
    barrier::isb(barrier::SY);

    // ロードしたイメージの先頭を関数として呼び出し，二度と戻ってこない．
    let image: fn() -> ! = core::mem::transmute(entry);
    image()
}

//--------------------------------------------------------------------------------------------------
// Testing
//--------------------------------------------------------------------------------------------------
#[cfg(feature = "test_build")]
use qemu_exit::QEMUExit;

#[cfg(feature = "test_build")]
const QEMU_EXIT_HANDLE: qemu_exit::AArch64 = qemu_exit::AArch64::new();

/// Make the host QEMU binary execute `exit(1)`.
#[cfg(feature = "test_build")]
pub fn qemu_exit_failure() -> ! {
    QEMU_EXIT_HANDLE.exit_failure()
}
