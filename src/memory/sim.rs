// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2022 Andre Richter <andre.o.richter@gmail.com>

//! Simulated physical address space for unit tests.
//!
//! One RAM window backed by a byte vector, everything else behaves like a bank of 32-bit
//! registers. Wiring faults are injected per instance.

use super::interface::Access;
use std::{cell::RefCell, collections::BTreeMap};

//--------------------------------------------------------------------------------------------------
// Public Definitions
//--------------------------------------------------------------------------------------------------

/// A wiring or storage defect of the simulated RAM.
#[derive(Copy, Clone, Debug)]
pub(crate) enum Defect {
    /// Data line `bit` of a 32-bit bus always reads 0.
    DataLineOpen(u32),
    /// Address line `line` is tied to 0.
    AddressLineLow(u32),
    /// Address line `line` is tied to 1.
    AddressLineHigh(u32),
    /// Address lines `a` and `b` are bridged (wired-OR).
    AddressLinesShorted(u32, u32),
    /// The byte at `offset` ignores writes and always reads `value`.
    StuckCell { offset: usize, value: u8 },
}

pub(crate) struct SimBus {
    ram_base: usize,
    ram: RefCell<Vec<u8>>,
    registers: RefCell<BTreeMap<usize, u32>>,
    register_reads: RefCell<BTreeMap<usize, usize>>,
    defects: Vec<Defect>,
}

//--------------------------------------------------------------------------------------------------
// Public Code
//--------------------------------------------------------------------------------------------------

impl SimBus {
    pub(crate) fn new(ram_base: usize, ram_len: usize) -> Self {
        Self {
            ram_base,
            ram: RefCell::new(vec![0; ram_len]),
            registers: RefCell::new(BTreeMap::new()),
            register_reads: RefCell::new(BTreeMap::new()),
            defects: Vec::new(),
        }
    }

    pub(crate) fn with_defect(mut self, defect: Defect) -> Self {
        self.defects.push(defect);
        self
    }

    pub(crate) fn with_register(self, addr: usize, value: u32) -> Self {
        self.registers.borrow_mut().insert(addr, value);
        self
    }

    pub(crate) fn ram_base(&self) -> usize {
        self.ram_base
    }

    /// Number of times the register at `addr` was read.
    pub(crate) fn register_reads(&self, addr: usize) -> usize {
        self.register_reads
            .borrow()
            .get(&addr)
            .copied()
            .unwrap_or(0)
    }

    /// Raw cell contents, bypassing all defects.
    pub(crate) fn peek(&self, offset: usize) -> u8 {
        self.ram.borrow()[offset]
    }

    fn ram_offset(&self, addr: usize) -> Option<usize> {
        let offset = addr.checked_sub(self.ram_base)?;
        (offset < self.ram.borrow().len()).then_some(offset)
    }

    /// Offset actually selected by the address lines.
    fn decode(&self, offset: usize) -> usize {
        let len = self.ram.borrow().len();
        let decoded = self.defects.iter().fold(offset, |o, d| match *d {
            Defect::AddressLineLow(line) => o & !(1 << line),
            Defect::AddressLineHigh(line) => o | (1 << line),
            Defect::AddressLinesShorted(a, b) => {
                let mask = (1 << a) | (1 << b);
                if o & mask != 0 {
                    o | mask
                } else {
                    o
                }
            }
            _ => o,
        });

        decoded % len
    }

    fn stuck_value(&self, cell: usize) -> Option<u8> {
        self.defects.iter().find_map(|d| match *d {
            Defect::StuckCell { offset, value } if offset == cell => Some(value),
            _ => None,
        })
    }

    fn load_byte(&self, offset: usize) -> u8 {
        let cell = self.decode(offset);
        let raw = self
            .stuck_value(cell)
            .unwrap_or_else(|| self.ram.borrow()[cell]);

        let lane = (offset % 4) as u32;
        self.defects.iter().fold(raw, |v, d| match *d {
            Defect::DataLineOpen(bit) if bit / 8 == lane => v & !(1 << (bit % 8)),
            _ => v,
        })
    }

    fn store_byte(&self, offset: usize, value: u8) {
        let cell = self.decode(offset);
        if self.stuck_value(cell).is_none() {
            self.ram.borrow_mut()[cell] = value;
        }
    }

    fn read_register(&self, addr: usize) -> u32 {
        *self.register_reads.borrow_mut().entry(addr).or_insert(0) += 1;
        self.registers.borrow().get(&addr).copied().unwrap_or(0)
    }
}

impl Access for SimBus {
    fn read_u8(&self, addr: usize) -> u8 {
        match self.ram_offset(addr) {
            Some(o) => self.load_byte(o),
            None => self.read_register(addr) as u8,
        }
    }

    fn write_u8(&self, addr: usize, value: u8) {
        match self.ram_offset(addr) {
            Some(o) => self.store_byte(o, value),
            None => {
                self.registers.borrow_mut().insert(addr, u32::from(value));
            }
        }
    }

    fn read_u16(&self, addr: usize) -> u16 {
        u16::from_le_bytes([self.read_u8(addr), self.read_u8(addr + 1)])
    }

    fn write_u16(&self, addr: usize, value: u16) {
        for (i, b) in value.to_le_bytes().into_iter().enumerate() {
            self.write_u8(addr + i, b);
        }
    }

    fn read_u32(&self, addr: usize) -> u32 {
        match self.ram_offset(addr) {
            Some(o) => u32::from_le_bytes([
                self.load_byte(o),
                self.load_byte(o + 1),
                self.load_byte(o + 2),
                self.load_byte(o + 3),
            ]),
            None => self.read_register(addr),
        }
    }

    fn write_u32(&self, addr: usize, value: u32) {
        match self.ram_offset(addr) {
            Some(o) => {
                for (i, b) in value.to_le_bytes().into_iter().enumerate() {
                    self.store_byte(o + i, b);
                }
            }
            None => {
                self.registers.borrow_mut().insert(addr, value);
            }
        }
    }
}
