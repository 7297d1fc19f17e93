// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2018-2022 Andre Richter <andre.o.richter@gmail.com>

//! Printing.

use crate::console;
use core::fmt;

//--------------------------------------------------------------------------------------------------
// Public Code
//--------------------------------------------------------------------------------------------------

#[doc(hidden)]
pub fn _print(args: fmt::Arguments) {
    use console::interface::Write;

    // 出力先のUARTが壊れていても起動は続けたいので，書き込みの失敗は無視する．
    let _ = console::console().write_fmt(args);
}

/// Prints without a newline.
///
/// Carbon copy from <https://doc.rust-lang.org/src/std/macros.rs.html>
#[macro_export]
macro_rules! print {
    ($($arg:tt)*) => ($crate::print::_print(format_args!($($arg)*)));
}

/// Prints with a newline.
///
/// Carbon copy from <https://doc.rust-lang.org/src/std/macros.rs.html>
#[macro_export]
macro_rules! println {
    () => ($crate::print!("\n"));
    ($($arg:tt)*) => ({
        $crate::print::_print(format_args!("{}\n", format_args!($($arg)*)));
    })
}

/// Prints an info, with a newline.
#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => ({
        $crate::print::_print(format_args!("[I] {}\n", format_args!($($arg)*)));
    })
}

/// Prints a warning, with a newline.
#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => ({
        $crate::print::_print(format_args!("[W] {}\n", format_args!($($arg)*)));
    })
}
