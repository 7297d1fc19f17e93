// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2022 Andre Richter <andre.o.richter@gmail.com>

//! Boot orchestration.
//!
//! Drives the loader from reset to the second stage:
//!
//! ```text
//! Init ──> [Diagnose] ──> SelectSource ──> Load ──> Jump
//!   │           │                            │
//!   └───────────┴────────────> Halt <────────┘
//! ```
//!
//! Every state runs exactly once and there are no retries. [`Bootstrap::run`] returns the terminal
//! state instead of acting on it, the binary then either jumps or parks the core.

use crate::{
    boot_source::{BootSource, Selector},
    driver::interface::DeviceDriver,
    info,
    loader::{self, Devices, ImageBuffer, Layout},
    memory::interface::Access,
    memtest::{self, Fault, MemoryRegion},
    println,
};
use core::fmt;
use tock_registers::{register_bitfields, LocalRegisterCopy};

//--------------------------------------------------------------------------------------------------
// Private Definitions
//--------------------------------------------------------------------------------------------------

register_bitfields! {
    u32,

    /// SDRAM memory configuration, one per chip select.
    SDRC_MCFG [
        /// Size of the bank in units of 2 MiB.
        RAMSIZE OFFSET(8) NUMBITS(10) []
    ]
}

//--------------------------------------------------------------------------------------------------
// Public Definitions
//--------------------------------------------------------------------------------------------------

/// Where and how to run the memory diagnostics.
#[derive(Copy, Clone, Debug)]
pub struct MemTestConfig {
    /// First byte of SDRAM.
    pub base: usize,
    /// Memory configuration registers of all chip selects. The tested size is the sum of theirs.
    pub size_registers: [usize; 2],
    /// Bytes per `RAMSIZE` unit.
    pub size_unit: usize,
    /// Stride of the device test, in test units.
    pub step: usize,
}

/// Compile-time configuration of a board.
#[derive(Copy, Clone, Debug)]
pub struct Config {
    /// `None` skips the Diagnose state.
    pub memtest: Option<MemTestConfig>,
    /// Boot from this source without consulting the boot status register.
    pub forced_source: Option<BootSource>,
    pub boot_status_reg: usize,
    /// Source used when the boot status holds an unknown identifier.
    pub fallback: BootSource,
    pub layout: Layout,
}

/// Why the loader halted.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BootError {
    /// A bring-up step reported failure.
    InitStep {
        step: &'static str,
        reason: &'static str,
    },
    /// The memory controller reports more SDRAM than the address space holds.
    DramSize,
    /// The memory diagnostics found a fault.
    Diagnostic(Fault),
    /// The image could not be loaded from the selected source.
    Load(BootSource),
}

/// Terminal Halt state.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Halted(pub BootError);

/// Terminal Jump state: the loaded image's entry.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Entry {
    pub addr: usize,
    pub source: BootSource,
}

/// States of the boot flow.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum State {
    Init,
    Diagnose,
    SelectSource,
    Load(BootSource),
    Jump(Entry),
    Halt(Halted),
}

/// The boot flow and everything it works on.
pub struct Bootstrap<'a, A: Access + ?Sized> {
    steps: &'a [&'a dyn DeviceDriver],
    bus: &'a A,
    devices: Devices<'a>,
    config: &'a Config,
    image: ImageBuffer<'a>,
}

//--------------------------------------------------------------------------------------------------
// Public Code
//--------------------------------------------------------------------------------------------------

impl MemTestConfig {
    /// Total SDRAM size in bytes as programmed into the memory controller.
    ///
    /// `None` if `base` plus the size does not fit a `usize`.
    pub fn dram_size<A: Access + ?Sized>(&self, bus: &A) -> Option<usize> {
        let size = self.size_registers.iter().try_fold(0_usize, |total, &reg| {
            let mcfg = LocalRegisterCopy::<u32, SDRC_MCFG::Register>::new(bus.read_u32(reg));
            let bank = (mcfg.read(SDRC_MCFG::RAMSIZE) as usize).checked_mul(self.size_unit)?;

            total.checked_add(bank)
        })?;

        self.base.checked_add(size).map(|_| size)
    }
}

impl fmt::Display for BootError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BootError::InitStep { step, reason } => write!(f, "{} failed: {}", step, reason),
            BootError::DramSize => f.write_str("DRAM size exceeds the address space"),
            BootError::Diagnostic(fault) => write!(f, "DRAM fault at {:#010x}", fault.address()),
            BootError::Load(source) => {
                write!(f, "Could not read bootloader from {}!", source)
            }
        }
    }
}

impl fmt::Display for Halted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl Entry {
    /// Transfer control to the loaded image.
    ///
    /// # Safety
    ///
    /// - The image must have been loaded completely to `self.addr`.
    #[cfg(all(
        any(target_arch = "aarch64", target_arch = "arm"),
        target_os = "none"
    ))]
    pub unsafe fn handoff(self) -> ! {
        crate::cpu::jump_to(self.addr)
    }
}

impl<'a, A: Access + ?Sized> Bootstrap<'a, A> {
    /// Create an instance.
    ///
    /// # Safety
    ///
    /// - `steps` are initialized in order, once, with the side effects their `init` has.
    /// - `bus` reaches the registers named in `config`, and the memory test region may be
    ///   clobbered. It must not overlap the loader itself. It may overlap `image`, which is only
    ///   written after the diagnostics are done.
    pub unsafe fn new(
        steps: &'a [&'a dyn DeviceDriver],
        bus: &'a A,
        devices: Devices<'a>,
        config: &'a Config,
        image: ImageBuffer<'a>,
    ) -> Self {
        Self {
            steps,
            bus,
            devices,
            config,
            image,
        }
    }

    /// Drive the state machine to a terminal state.
    pub fn run(mut self) -> Result<Entry, Halted> {
        let mut state = State::Init;

        loop {
            state = match state {
                State::Init => self.init(),
                State::Diagnose => self.diagnose(),
                State::SelectSource => State::Load(self.select_source()),
                State::Load(source) => self.load(source),
                State::Jump(entry) => {
                    println!("Starting OS Bootloader from {} ...", entry.source);
                    return Ok(entry);
                }
                State::Halt(halted) => {
                    println!("{}", halted);
                    return Err(halted);
                }
            }
        }
    }

    fn init(&mut self) -> State {
        for step in self.steps {
            if let Err(reason) = unsafe { step.init() } {
                return State::Halt(Halted(BootError::InitStep {
                    step: step.compatible(),
                    reason,
                }));
            }
        }

        match self.config.memtest {
            Some(_) => State::Diagnose,
            None => State::SelectSource,
        }
    }

    fn diagnose(&mut self) -> State {
        let cfg = match self.config.memtest {
            Some(cfg) => cfg,
            None => return State::SelectSource,
        };

        let size = match cfg.dram_size(self.bus) {
            Some(size) => size,
            None => return State::Halt(Halted(BootError::DramSize)),
        };
        info!("DRAM: {} MiB at {:#010x}", size >> 20, cfg.base);

        let region = MemoryRegion::new(cfg.base, size, cfg.step);
        match memtest::run::<u8, A>(self.bus, &region) {
            Ok(()) => State::SelectSource,
            Err(fault) => State::Halt(Halted(BootError::Diagnostic(fault))),
        }
    }

    fn select_source(&self) -> BootSource {
        match self.config.forced_source {
            Some(source) => source,
            None => Selector::new(self.config.boot_status_reg, self.config.fallback)
                .select(self.bus),
        }
    }

    fn load(&mut self, source: BootSource) -> State {
        match loader::load(
            source,
            &mut self.devices,
            &self.config.layout,
            &mut self.image,
        ) {
            Ok(()) => State::Jump(Entry {
                addr: self.image.start_addr(),
                source,
            }),
            Err(_) => State::Halt(Halted(BootError::Load(source))),
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Testing
//--------------------------------------------------------------------------------------------------
