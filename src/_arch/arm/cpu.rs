// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2018-2022 Andre Richter <andre.o.richter@gmail.com>

//! Architectural processor code, ARMv7-A.
//!
//! # Orientation
//!
//! Since arch modules are imported into generic modules using the path attribute, the path of this
//! file is:
//!
//! crate::cpu::arch_cpu

use core::arch::asm;

//--------------------------------------------------------------------------------------------------
// Public Code
//--------------------------------------------------------------------------------------------------

/// Pause execution on the core.
#[inline(always)]
pub fn wait_forever() -> ! {
    loop {
        unsafe { asm!("wfe", options(nomem, nostack, preserves_flags)) }
    }
}

/// Transfer control to the image entry at `entry`.
///
/// # Safety
///
/// - `entry` must point to ARM-state code that was completely written to memory before this call.
/// - The callee never returns; nothing on the current stack is used afterwards.
#[inline(never)]
pub unsafe fn jump_to(entry: usize) -> ! {
    // Drain the copy to memory and refetch instructions before branching into the image.
    asm!("dsb sy", "isb sy", options(nostack, preserves_flags));

    // ロードしたイメージの先頭へ分岐し，二度と戻ってこない．
    asm!("bx {entry}", entry = in(reg) entry, options(noreturn))
}

//--------------------------------------------------------------------------------------------------
// Testing
//--------------------------------------------------------------------------------------------------

/// Semihosting `SYS_EXIT`.
#[cfg(feature = "test_build")]
const SYS_EXIT: u32 = 0x18;

/// Any stop reason other than `ADP_Stopped_ApplicationExit` makes QEMU exit with status 1.
#[cfg(feature = "test_build")]
const ADP_STOPPED_RUN_TIME_ERROR: u32 = 0x2_0023;

/// Make the host QEMU binary execute `exit(1)`.
///
/// `qemu-exit` only covers AArch64, so the semihosting call is issued directly. QEMU must run with
/// `-semihosting`.
#[cfg(feature = "test_build")]
pub fn qemu_exit_failure() -> ! {
    unsafe {
        asm!(
            "svc #0x123456",
            inout("r0") SYS_EXIT => _,
            in("r1") ADP_STOPPED_RUN_TIME_ERROR,
            options(nostack)
        );
    }

    wait_forever()
}
