// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2018-2022 Andre Richter <andre.o.richter@gmail.com>

//! TI driver top level.

mod ns16550_uart;

pub use ns16550_uart::*;
