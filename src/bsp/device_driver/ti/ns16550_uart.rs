// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2018-2022 Andre Richter <andre.o.richter@gmail.com>

//! NS16550 compatible UART driver, as found in TI OMAP3 SoCs.
//!
//! # Resources
//!
//! - OMAP35x Technical Reference Manual, chapter 17 "UART/IrDA/CIR Module".

use super::super::common::MMIODerefWrapper;
use crate::{
    console, driver,
    loader::interface::SerialLink,
    synchronization::{self, NullLock},
};
use core::fmt;
use tock_registers::{
    interfaces::{ReadWriteable, Readable, Writeable},
    register_bitfields, register_structs,
    registers::{ReadOnly, ReadWrite, WriteOnly},
};

//--------------------------------------------------------------------------------------------------
// Private Definitions
//--------------------------------------------------------------------------------------------------

// NS16550 UART registers, 8 bit wide on a 4 byte stride.
register_bitfields! {
    u32,

    /// FIFO Control Register.
    FCR [
        /// Enable the RX and TX FIFOs.
        FIFO_EN OFFSET(0) NUMBITS(1) [],

        /// Clear the RX FIFO. Self-clearing.
        RX_FIFO_CLEAR OFFSET(1) NUMBITS(1) [],

        /// Clear the TX FIFO. Self-clearing.
        TX_FIFO_CLEAR OFFSET(2) NUMBITS(1) []
    ],

    /// Line Control Register.
    LCR [
        /// Word length.
        CHAR_LENGTH OFFSET(0) NUMBITS(2) [
            FiveBit = 0b00,
            SixBit = 0b01,
            SevenBit = 0b10,
            EightBit = 0b11
        ],

        /// Two stop bits if set, one otherwise.
        NB_STOP OFFSET(2) NUMBITS(1) [],

        PARITY_EN OFFSET(3) NUMBITS(1) [],

        /// Divisor latch access. While set, offsets 0x00 and 0x04 are DLL and DLH.
        DIV_EN OFFSET(7) NUMBITS(1) []
    ],

    /// Modem Control Register.
    MCR [
        DTR OFFSET(0) NUMBITS(1) [],
        RTS OFFSET(1) NUMBITS(1) []
    ],

    /// Line Status Register.
    LSR [
        /// At least one byte in the RX FIFO.
        RX_FIFO_E OFFSET(0) NUMBITS(1) [],

        /// The TX hold register is empty.
        TX_FIFO_E OFFSET(5) NUMBITS(1) [],

        /// TX hold and shift registers are both empty.
        TX_SR_E OFFSET(6) NUMBITS(1) []
    ],

    /// Mode Definition Register 1.
    MDR1 [
        MODE_SELECT OFFSET(0) NUMBITS(3) [
            Uart16x = 0b000,
            Disable = 0b111
        ]
    ]
}

register_structs! {
    #[allow(non_snake_case)]
    pub RegisterBlock {
        (0x00 => DATA: ReadWrite<u32>),
        (0x04 => IER: ReadWrite<u32>),
        (0x08 => FCR: WriteOnly<u32, FCR::Register>),
        (0x0c => LCR: ReadWrite<u32, LCR::Register>),
        (0x10 => MCR: ReadWrite<u32, MCR::Register>),
        (0x14 => LSR: ReadOnly<u32, LSR::Register>),
        (0x18 => _reserved1),
        (0x20 => MDR1: ReadWrite<u32, MDR1::Register>),
        (0x24 => @END),
    }
}

/// Abstraction for the associated MMIO registers.
type Registers = MMIODerefWrapper<RegisterBlock>;

/// Functional clock of the UART modules.
const UART_CLOCK_HZ: u32 = 48_000_000;

/// Line rate after `init`.
const DEFAULT_BAUD: u32 = 115_200;

#[derive(PartialEq)]
enum BlockingMode {
    Blocking,
    NonBlocking,
}

struct Ns16550UartInner {
    registers: Registers,
    chars_written: usize,
    chars_read: usize,
}

//--------------------------------------------------------------------------------------------------
// Public Definitions
//--------------------------------------------------------------------------------------------------

/// Representation of the UART.
pub struct Ns16550Uart {
    inner: NullLock<Ns16550UartInner>,
}

//--------------------------------------------------------------------------------------------------
// Private Code
//--------------------------------------------------------------------------------------------------

/// Divisor latch value for `baud`, rounded to nearest.
fn divisor(baud: u32) -> Result<u16, &'static str> {
    if baud == 0 {
        return Err("baud rate is zero");
    }

    let (clock, baud) = (u64::from(UART_CLOCK_HZ), u64::from(baud));
    let div = (clock + 8 * baud) / (16 * baud);

    match u16::try_from(div) {
        Ok(div) if div != 0 => Ok(div),
        _ => Err("baud rate out of range"),
    }
}

impl Ns16550UartInner {
    /// Create an instance.
    ///
    /// # Safety
    ///
    /// - The user must ensure to provide a correct MMIO start address.
    pub const unsafe fn new(mmio_start_addr: usize) -> Self {
        Self {
            registers: Registers::new(mmio_start_addr),
            chars_written: 0,
            chars_read: 0,
        }
    }

    /// Set up 8N1 at the default baud rate with FIFOs enabled and interrupts off.
    pub fn init(&mut self) -> Result<(), &'static str> {
        self.registers.IER.set(0);
        self.set_baud_rate(DEFAULT_BAUD)?;

        self.registers
            .LCR
            .write(LCR::CHAR_LENGTH::EightBit + LCR::NB_STOP::CLEAR + LCR::PARITY_EN::CLEAR);
        self.registers
            .FCR
            .write(FCR::FIFO_EN::SET + FCR::RX_FIFO_CLEAR::SET + FCR::TX_FIFO_CLEAR::SET);
        self.registers.MCR.write(MCR::DTR::SET + MCR::RTS::SET);

        Ok(())
    }

    /// Reprogram the divisor latch. The line is disabled while the divisor changes.
    fn set_baud_rate(&mut self, baud: u32) -> Result<(), &'static str> {
        let div = divisor(baud)?;

        self.registers.MDR1.write(MDR1::MODE_SELECT::Disable);

        self.registers.LCR.modify(LCR::DIV_EN::SET);
        self.registers.DATA.set(u32::from(div & 0xff));
        self.registers.IER.set(u32::from(div >> 8));
        self.registers.LCR.modify(LCR::DIV_EN::CLEAR);

        self.registers.MDR1.write(MDR1::MODE_SELECT::Uart16x);

        Ok(())
    }

    /// Send a byte.
    fn write_byte(&mut self, b: u8) {
        // Spin while the TX hold register is still occupied.
        while !self.registers.LSR.is_set(LSR::TX_FIFO_E) {
            core::hint::spin_loop();
        }

        self.registers.DATA.set(u32::from(b));

        self.chars_written += 1;
    }

    /// Block execution until the last buffered character has been physically put on the TX wire.
    fn flush(&self) {
        while !self.registers.LSR.is_set(LSR::TX_SR_E) {
            core::hint::spin_loop();
        }
    }

    /// Retrieve a byte.
    fn read_byte(&mut self, blocking_mode: BlockingMode) -> Option<u8> {
        // If RX FIFO is empty,
        if !self.registers.LSR.is_set(LSR::RX_FIFO_E) {
            // immediately return in non-blocking mode.
            if blocking_mode == BlockingMode::NonBlocking {
                return None;
            }

            // Otherwise, wait until a char was received.
            while !self.registers.LSR.is_set(LSR::RX_FIFO_E) {
                core::hint::spin_loop();
            }
        }

        let b = self.registers.DATA.get() as u8;

        self.chars_read += 1;

        Some(b)
    }
}

/// Implementing `core::fmt::Write` enables usage of the `format_args!` macros, which in turn are
/// used to implement the loader's `print!` and `println!` macros.
impl fmt::Write for Ns16550UartInner {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for c in s.chars() {
            // CRLFで改行させてる
            if c == '\n' {
                self.write_byte(b'\r');
            }

            self.write_byte(c as u8);
        }

        Ok(())
    }
}

//--------------------------------------------------------------------------------------------------
// Public Code
//--------------------------------------------------------------------------------------------------

impl Ns16550Uart {
    pub const COMPATIBLE: &'static str = "TI NS16550 UART";

    /// Create an instance.
    ///
    /// # Safety
    ///
    /// - The user must ensure to provide a correct MMIO start address.
    pub const unsafe fn new(mmio_start_addr: usize) -> Self {
        Self {
            inner: NullLock::new(Ns16550UartInner::new(mmio_start_addr)),
        }
    }
}

//------------------------------------------------------------------------------
// OS Interface Code
//------------------------------------------------------------------------------
use synchronization::interface::Mutex;

impl driver::interface::DeviceDriver for Ns16550Uart {
    fn compatible(&self) -> &'static str {
        Self::COMPATIBLE
    }

    unsafe fn init(&self) -> Result<(), &'static str> {
        self.inner.lock(|inner| inner.init())
    }
}

impl console::interface::Write for Ns16550Uart {
    /// Passthrough of `args` to the `core::fmt::Write` implementation, but guarded by a Mutex to
    /// serialize access.
    fn write_char(&self, c: char) {
        self.inner.lock(|inner| inner.write_byte(c as u8));
    }

    fn write_fmt(&self, args: core::fmt::Arguments) -> fmt::Result {
        // Fully qualified syntax for the call to `core::fmt::Write::write_fmt()` to increase
        // readability.
        self.inner.lock(|inner| fmt::Write::write_fmt(inner, args))
    }

    fn flush(&self) {
        // Spin until TX FIFO empty is set.
        self.inner.lock(|inner| inner.flush());
    }
}

impl console::interface::Read for Ns16550Uart {
    fn clear_rx(&self) {
        // Read from the RX FIFO until it is indicating empty.
        while self
            .inner
            .lock(|inner| inner.read_byte(BlockingMode::NonBlocking))
            .is_some()
        {}
    }
}

impl console::interface::Statistics for Ns16550Uart {
    fn chars_written(&self) -> usize {
        self.inner.lock(|inner| inner.chars_written)
    }

    fn chars_read(&self) -> usize {
        self.inner.lock(|inner| inner.chars_read)
    }
}

/// The serial download shares the line with the console.
impl SerialLink for &Ns16550Uart {
    fn set_baud_rate(&mut self, baud: u32) -> Result<(), &'static str> {
        console::interface::Write::flush(*self);

        self.inner.lock(|inner| inner.set_baud_rate(baud))
    }

    fn read_byte(&mut self) -> u8 {
        self.inner
            .lock(|inner| inner.read_byte(BlockingMode::Blocking))
            .unwrap_or(0)
    }

    fn write_byte(&mut self, byte: u8) {
        self.inner.lock(|inner| inner.write_byte(byte));
    }

    fn clear_rx(&mut self) {
        console::interface::Read::clear_rx(*self);
    }
}

//--------------------------------------------------------------------------------------------------
// Testing
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        console::interface::{Statistics, Write},
        driver::interface::DeviceDriver,
    };
    use core::cell::UnsafeCell;

    const DATA: usize = 0x00;
    const IER: usize = 0x04;
    const LCR: usize = 0x0c;
    const LSR: usize = 0x14;
    const MDR1: usize = 0x20;

    /// Register file in plain memory. Nothing reacts to writes, so LSR is whatever the test put
    /// there.
    struct Mmio([UnsafeCell<u32>; 9]);

    impl Mmio {
        fn new() -> Self {
            Self(Default::default())
        }

        fn addr(&self) -> usize {
            self.0.as_ptr() as usize
        }

        fn get(&self, offset: usize) -> u32 {
            unsafe { core::ptr::read_volatile(self.0[offset / 4].get()) }
        }

        fn set(&self, offset: usize, value: u32) {
            unsafe { core::ptr::write_volatile(self.0[offset / 4].get(), value) }
        }
    }

    #[test]
    fn divisor_rounds_to_nearest() {
        assert_eq!(divisor(115_200), Ok(26));
        assert_eq!(divisor(9_600), Ok(313));
        assert!(divisor(0).is_err());
        assert!(divisor(1).is_err());
        assert!(divisor(7_000_000).is_err());
    }

    #[test]
    fn init_latches_the_divisor_and_leaves_8n1() {
        let mmio = Mmio::new();
        let uart = unsafe { Ns16550Uart::new(mmio.addr()) };

        assert_eq!(unsafe { uart.init() }, Ok(()));

        assert_eq!(mmio.get(DATA), 26);
        assert_eq!(mmio.get(IER), 0);
        assert_eq!(mmio.get(LCR), 0b11);
        assert_eq!(mmio.get(MDR1), 0);
    }

    #[test]
    fn bytes_go_out_through_the_data_register() {
        let mmio = Mmio::new();
        mmio.set(LSR, 0x60);
        let uart = unsafe { Ns16550Uart::new(mmio.addr()) };

        uart.write_char('A');
        assert_eq!(mmio.get(DATA), u32::from(b'A'));

        let mut link = &uart;
        link.write_byte(0x03);
        assert_eq!(mmio.get(DATA), 0x03);
        assert_eq!(uart.chars_written(), 2);
    }

    #[test]
    fn serial_link_reads_what_the_line_holds() {
        let mmio = Mmio::new();
        mmio.set(LSR, 0x61);
        mmio.set(DATA, u32::from(b'x'));
        let uart = unsafe { Ns16550Uart::new(mmio.addr()) };

        let mut link = &uart;
        assert_eq!(link.read_byte(), b'x');
        assert_eq!(uart.chars_read(), 1);
    }

    #[test]
    fn baud_change_reprograms_the_latch() {
        let mmio = Mmio::new();
        mmio.set(LSR, 0x60);
        let uart = unsafe { Ns16550Uart::new(mmio.addr()) };

        let mut link = &uart;
        assert_eq!(link.set_baud_rate(9_600), Ok(()));
        assert_eq!(mmio.get(DATA), 313 & 0xff);
        assert_eq!(mmio.get(IER), 313 >> 8);
        assert!(link.set_baud_rate(0).is_err());
    }
}
