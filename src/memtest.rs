// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2022 Andre Richter <andre.o.richter@gmail.com>

//! Memory diagnostics.
//!
//! Three independent tests, run in this order by [`run`]:
//!
//! 1. [`data_bus`]: walking 1's at a single address. Finds stuck, open and shorted data lines
//!    independent of addressing.
//! 2. [`address_bus`]: walking 1's over the address lines with aliasing checks. Finds address
//!    lines stuck high, stuck low or shorted together.
//! 3. [`device`]: increment/complement over the whole region. Every tested cell holds a 0 and a 1
//!    in every bit at some point.
//!
//! All accesses go through [`Access`], one bus transaction per read or write. The tests are
//! destructive: afterwards the region holds the complement of the device test's counter pattern.
//!
//! # Resources
//!
//! - Michael Barr, "Software-Based Memory Testing", Embedded Systems Programming, 2000.

use crate::{memory::interface::Access, print, println, warn};
use core::{fmt, mem, ops::Not};

//--------------------------------------------------------------------------------------------------
// Public Definitions
//--------------------------------------------------------------------------------------------------

/// Width of a single test access.
pub trait Datum: Copy + Eq + Not<Output = Self> + fmt::LowerHex {
    /// Lowest bit set.
    const ONE: Self;

    /// Alternating bits, 0b1010...
    const PATTERN: Self;

    /// Complement of [`Datum::PATTERN`].
    const ANTIPATTERN: Self;

    /// Shift left by one, dropping the top bit.
    fn shifted(self) -> Self;

    /// Increment, wrapping at the unit width.
    fn next(self) -> Self;

    fn is_zero(self) -> bool;

    /// Zero-extend for reporting.
    fn widen(self) -> u32;

    fn load<A: Access + ?Sized>(bus: &A, addr: usize) -> Self;

    fn store<A: Access + ?Sized>(self, bus: &A, addr: usize);
}

/// The range under test.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct MemoryRegion {
    base: usize,
    len: usize,
    step: usize,
}

/// First fault a test ran into.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Fault {
    /// The walking 1 `pattern` did not read back at `address`.
    DataBus { address: usize, pattern: u32 },

    /// Writing the region's base also changed `address`: an address line is stuck and both
    /// decode to the same cell.
    AddressStuck { address: usize },

    /// Writing `written` also changed `disturbed`: the two share a faulty address line.
    AddressAliased { written: usize, disturbed: usize },

    /// The cell at `address` held `found` instead of `expected`.
    Cell {
        address: usize,
        expected: u32,
        found: u32,
    },
}

//--------------------------------------------------------------------------------------------------
// Private Definitions
//--------------------------------------------------------------------------------------------------

/// Iterations of the final device pass between two progress lines.
const PROGRESS_INTERVAL: usize = 1 << 20;

const MIB_SHIFT: usize = 20;

//--------------------------------------------------------------------------------------------------
// Private Code
//--------------------------------------------------------------------------------------------------

macro_rules! impl_datum {
    ($t:ty, $read:ident, $write:ident) => {
        impl Datum for $t {
            const ONE: Self = 1;
            const PATTERN: Self = 0xAAAA_AAAA_u32 as $t;
            const ANTIPATTERN: Self = 0x5555_5555_u32 as $t;

            #[inline(always)]
            fn shifted(self) -> Self {
                self << 1
            }

            #[inline(always)]
            fn next(self) -> Self {
                self.wrapping_add(1)
            }

            #[inline(always)]
            fn is_zero(self) -> bool {
                self == 0
            }

            fn widen(self) -> u32 {
                u32::from(self)
            }

            #[inline(always)]
            fn load<A: Access + ?Sized>(bus: &A, addr: usize) -> Self {
                bus.$read(addr)
            }

            #[inline(always)]
            fn store<A: Access + ?Sized>(self, bus: &A, addr: usize) {
                bus.$write(addr, self)
            }
        }
    };
}

impl_datum!(u8, read_u8, write_u8);
impl_datum!(u16, read_u16, write_u16);
impl_datum!(u32, read_u32, write_u32);

/// Unit offsets that have exactly one address line set, from line 0 up to the region's end.
///
/// For a power-of-two region this is the same set as `offset & (units - 1) != 0`.
fn line_offsets(units: usize) -> impl Iterator<Item = usize> {
    core::iter::successors(Some(1_usize), |o| o.checked_mul(2)).take_while(move |&o| o < units)
}

fn cell_fault<T: Datum>(region: &MemoryRegion, address: usize, expected: T, found: T) -> Fault {
    warn!("DRAM: {:04} MB Fail", region.mib_of(address));

    Fault::Cell {
        address,
        expected: expected.widen(),
        found: found.widen(),
    }
}

//--------------------------------------------------------------------------------------------------
// Public Code
//--------------------------------------------------------------------------------------------------

impl MemoryRegion {
    /// Create an instance. A `step` of zero is treated as 1.
    pub const fn new(base: usize, len: usize, step: usize) -> Self {
        Self {
            base,
            len,
            step: if step == 0 { 1 } else { step },
        }
    }

    pub const fn base(&self) -> usize {
        self.base
    }

    /// Length in bytes.
    pub const fn len(&self) -> usize {
        self.len
    }

    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Device test stride, in units.
    pub const fn step(&self) -> usize {
        self.step
    }

    fn units<T>(&self) -> usize {
        self.len / mem::size_of::<T>()
    }

    fn addr_of<T>(&self, offset: usize) -> usize {
        self.base + offset * mem::size_of::<T>()
    }

    /// Whole MiB between the base and `address`.
    fn mib_of(&self, address: usize) -> usize {
        (address - self.base) >> MIB_SHIFT
    }
}

impl Fault {
    /// The address to blame.
    pub fn address(&self) -> usize {
        match *self {
            Fault::DataBus { address, .. } => address,
            Fault::AddressStuck { address } => address,
            Fault::AddressAliased { written, .. } => written,
            Fault::Cell { address, .. } => address,
        }
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Fault::DataBus { address, pattern } => write!(
                f,
                "data bus: pattern {:#04x} did not read back at {:#010x}",
                pattern, address
            ),
            Fault::AddressStuck { address } => {
                write!(f, "address bus: {:#010x} aliases the base address", address)
            }
            Fault::AddressAliased { written, disturbed } => write!(
                f,
                "address bus: writing {:#010x} disturbed {:#010x}",
                written, disturbed
            ),
            Fault::Cell {
                address,
                expected,
                found,
            } => write!(
                f,
                "device: {:#010x} holds {:#04x}, expected {:#04x}",
                address, found, expected
            ),
        }
    }
}

/// Walking 1's test at a single `address`.
///
/// Every bit of the unit is set once, on its own, and read back immediately.
pub fn data_bus<T: Datum, A: Access + ?Sized>(bus: &A, address: usize) -> Result<(), Fault> {
    let mut pattern = T::ONE;

    while !pattern.is_zero() {
        pattern.store(bus, address);

        if T::load(bus, address) != pattern {
            return Err(Fault::DataBus {
                address,
                pattern: pattern.widen(),
            });
        }

        pattern = pattern.shifted();
    }

    Ok(())
}

/// Address line test over `region`.
///
/// For best results the base should be aligned to the region's size, so that every power-of-two
/// offset toggles a single address line.
pub fn address_bus<T: Datum, A: Access + ?Sized>(
    bus: &A,
    region: &MemoryRegion,
) -> Result<(), Fault> {
    let units = region.units::<T>();
    let at = |offset| region.addr_of::<T>(offset);

    // Write the default pattern at each of the power-of-two offsets.
    for offset in line_offsets(units) {
        T::PATTERN.store(bus, at(offset));
    }

    // Check for address bits stuck high.
    T::ANTIPATTERN.store(bus, at(0));

    for offset in line_offsets(units) {
        if T::load(bus, at(offset)) != T::PATTERN {
            let address = at(offset);
            warn!("DRAM: {:04} MB Fail", region.mib_of(address));

            return Err(Fault::AddressStuck { address });
        }
    }

    T::PATTERN.store(bus, at(0));

    // Check for address bits stuck low or shorted.
    for test_offset in line_offsets(units) {
        T::ANTIPATTERN.store(bus, at(test_offset));

        let disturbed = core::iter::once(0)
            .chain(line_offsets(units).filter(|&o| o != test_offset))
            .find(|&o| T::load(bus, at(o)) != T::PATTERN);

        if let Some(offset) = disturbed {
            let (written, disturbed) = (at(test_offset), at(offset));
            warn!("DRAM: {:04} MB Fail", region.mib_of(written));

            return Err(Fault::AddressAliased { written, disturbed });
        }

        T::PATTERN.store(bus, at(test_offset));
    }

    Ok(())
}

/// Increment/complement test over `region`, touching every `region.step()`-th unit.
///
/// The counter starts at 1 and wraps at the unit width.
pub fn device<T: Datum, A: Access + ?Sized>(bus: &A, region: &MemoryRegion) -> Result<(), Fault> {
    let offsets = || (0..region.units::<T>()).step_by(region.step());
    let at = |offset| region.addr_of::<T>(offset);

    // Fill memory with a known pattern.
    let mut pattern = T::ONE;
    for offset in offsets() {
        pattern.store(bus, at(offset));
        pattern = pattern.next();
    }

    // Check each location and invert it for the second pass.
    pattern = T::ONE;
    for offset in offsets() {
        let found = T::load(bus, at(offset));
        if found != pattern {
            return Err(cell_fault(region, at(offset), pattern, found));
        }

        (!pattern).store(bus, at(offset));
        pattern = pattern.next();
    }

    // Check each location for the inverted pattern.
    pattern = T::ONE;
    for (n, offset) in offsets().enumerate() {
        let expected = !pattern;
        let found = T::load(bus, at(offset));
        if found != expected {
            return Err(cell_fault(region, at(offset), expected, found));
        }

        if (n + 1) % PROGRESS_INTERVAL == 0 {
            print!("DRAM: {:04} MB OK\r", region.mib_of(at(offset)) + 1);
        }

        pattern = pattern.next();
    }
    println!();

    Ok(())
}

/// Run the data bus, address bus and device tests over `region`, stopping at the first fault.
pub fn run<T: Datum, A: Access + ?Sized>(bus: &A, region: &MemoryRegion) -> Result<(), Fault> {
    println!("TESTING MEMORY, PLEASE WAIT!");

    if region.units::<T>() == 0 {
        println!("Memory Test Success (empty region)");
        return Ok(());
    }

    let result = data_bus::<T, A>(bus, region.base())
        .and_then(|()| address_bus::<T, A>(bus, region))
        .and_then(|()| device::<T, A>(bus, region));

    match result {
        Ok(()) => println!("Memory Test Success"),
        Err(ref fault) => println!("Memory Test Not Success: {}", fault),
    }

    result
}

//--------------------------------------------------------------------------------------------------
// Testing
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::sim::{Defect, SimBus};

    const BASE: usize = 0x8000_0000;
    const LEN: usize = 1024;
    const LINES: u32 = 10;

    fn clean() -> SimBus {
        SimBus::new(BASE, LEN)
    }

    #[test]
    fn line_offsets_match_the_address_mask_for_power_of_two_regions() {
        let mask = LEN - 1;
        let by_mask: Vec<usize> = core::iter::successors(Some(1_usize), |o| Some(o << 1))
            .take_while(|o| o & mask != 0)
            .collect();

        assert_eq!(line_offsets(LEN).collect::<Vec<_>>(), by_mask);
        assert_eq!(line_offsets(1).count(), 0);
        assert_eq!(line_offsets(0).count(), 0);
    }

    #[test]
    fn data_bus_passes_on_healthy_lines() {
        assert_eq!(data_bus::<u8, _>(&clean(), BASE), Ok(()));
        assert_eq!(data_bus::<u32, _>(&clean(), BASE), Ok(()));
    }

    #[test]
    fn data_bus_reports_the_walking_bit_of_an_open_line() {
        for k in 0..8 {
            let bus = clean().with_defect(Defect::DataLineOpen(k));

            assert_eq!(
                data_bus::<u8, _>(&bus, BASE),
                Err(Fault::DataBus {
                    address: BASE,
                    pattern: 1 << k
                }),
                "data line {}",
                k
            );
        }
    }

    #[test]
    fn data_bus_covers_the_full_width_of_wider_units() {
        for k in 0..32 {
            let bus = clean().with_defect(Defect::DataLineOpen(k));

            assert_eq!(
                data_bus::<u32, _>(&bus, BASE),
                Err(Fault::DataBus {
                    address: BASE,
                    pattern: 1 << k
                }),
                "data line {}",
                k
            );
        }
    }

    #[test]
    fn address_bus_passes_on_healthy_lines() {
        let region = MemoryRegion::new(BASE, LEN, 1);

        assert_eq!(address_bus::<u8, _>(&clean(), &region), Ok(()));
        assert_eq!(address_bus::<u16, _>(&clean(), &region), Ok(()));
    }

    #[test]
    fn address_bus_blames_one_of_two_shorted_lines() {
        let region = MemoryRegion::new(BASE, LEN, 1);

        for i in 0..LINES {
            for j in (i + 1)..LINES {
                let bus = clean().with_defect(Defect::AddressLinesShorted(i, j));
                let fault = address_bus::<u8, _>(&bus, &region).unwrap_err();
                let candidates = [BASE + (1 << i), BASE + (1 << j)];

                assert!(
                    candidates.contains(&fault.address()),
                    "lines {}/{}: {:?}",
                    i,
                    j,
                    fault
                );
                if let Fault::AddressAliased { written, disturbed } = fault {
                    assert!(candidates.contains(&written) && candidates.contains(&disturbed));
                    assert_ne!(written, disturbed);
                }
            }
        }
    }

    #[test]
    fn address_bus_over_halfwords_finds_shorted_lines() {
        let region = MemoryRegion::new(BASE, LEN, 1);

        // Line 0 selects the byte within a halfword and is never walked.
        for i in 1..LINES {
            for j in (i + 1)..LINES {
                let bus = clean().with_defect(Defect::AddressLinesShorted(i, j));

                assert_eq!(
                    address_bus::<u16, _>(&bus, &region),
                    Err(Fault::AddressAliased {
                        written: BASE + (1 << i),
                        disturbed: BASE + (1 << j),
                    }),
                    "lines {}/{}",
                    i,
                    j
                );
            }
        }
    }

    #[test]
    fn address_bus_finds_lines_stuck_high_and_low() {
        let region = MemoryRegion::new(BASE, LEN, 1);

        for line in 0..LINES {
            let expected = Err(Fault::AddressStuck {
                address: BASE + (1 << line),
            });

            let high = clean().with_defect(Defect::AddressLineHigh(line));
            assert_eq!(address_bus::<u8, _>(&high, &region), expected, "high {}", line);

            let low = clean().with_defect(Defect::AddressLineLow(line));
            assert_eq!(address_bus::<u8, _>(&low, &region), expected, "low {}", line);
        }
    }

    #[test]
    fn device_reports_exactly_the_corrupted_cell() {
        let region = MemoryRegion::new(BASE, LEN, 1);

        for offset in [0, 1, 255, 256, 600, LEN - 1] {
            let pass_one = (offset as u8).wrapping_add(1);
            let value = pass_one ^ 0x0f;
            let bus = clean().with_defect(Defect::StuckCell { offset, value });

            assert_eq!(
                device::<u8, _>(&bus, &region),
                Err(Fault::Cell {
                    address: BASE + offset,
                    expected: u32::from(pass_one),
                    found: u32::from(value),
                })
            );
        }
    }

    #[test]
    fn device_over_halfwords_reports_the_unit_holding_the_corrupted_byte() {
        let region = MemoryRegion::new(BASE, LEN, 1);

        for offset in [0, 1, 2, 511, 600, LEN - 1] {
            let lane = offset % 2;
            let pass_one = (offset / 2 + 1) as u16;
            let mut bytes = pass_one.to_le_bytes();
            bytes[lane] ^= 0x0f;
            let bus = clean().with_defect(Defect::StuckCell {
                offset,
                value: bytes[lane],
            });

            assert_eq!(
                device::<u16, _>(&bus, &region),
                Err(Fault::Cell {
                    address: BASE + offset - lane,
                    expected: u32::from(pass_one),
                    found: u32::from(u16::from_le_bytes(bytes)),
                }),
                "offset {}",
                offset
            );
        }
    }

    #[test]
    fn device_catches_a_cell_that_cannot_hold_the_complement() {
        let region = MemoryRegion::new(BASE, LEN, 1);
        let offset = 77;
        let pass_one = 78_u8;
        let bus = clean().with_defect(Defect::StuckCell {
            offset,
            value: pass_one,
        });

        assert_eq!(
            device::<u8, _>(&bus, &region),
            Err(Fault::Cell {
                address: BASE + offset,
                expected: u32::from(!pass_one),
                found: u32::from(pass_one),
            })
        );
    }

    #[test]
    fn device_only_touches_cells_on_the_stride() {
        let bus = clean();
        let region = MemoryRegion::new(BASE, LEN, 4);

        assert_eq!(device::<u8, _>(&bus, &region), Ok(()));

        for offset in 0..LEN {
            let expected = if offset % 4 == 0 {
                !((offset / 4) as u8).wrapping_add(1)
            } else {
                0
            };
            assert_eq!(bus.peek(offset), expected, "offset {}", offset);
        }
    }

    #[test]
    fn failure_position_counts_from_the_region_base() {
        let region = MemoryRegion::new(BASE, 64 << 20, 1);

        assert_eq!(region.mib_of(BASE), 0);
        assert_eq!(region.mib_of(BASE + (1 << 20) - 1), 0);
        assert_eq!(region.mib_of(BASE + (3 << 20) + 5), 3);
    }

    #[test]
    fn zero_step_behaves_like_unit_step() {
        assert_eq!(MemoryRegion::new(BASE, LEN, 0).step(), 1);
    }

    #[test]
    fn run_stops_at_the_first_failing_test() {
        let region = MemoryRegion::new(BASE, LEN, 1);
        let bus = clean()
            .with_defect(Defect::DataLineOpen(3))
            .with_defect(Defect::AddressLineHigh(5));

        assert!(matches!(
            run::<u8, _>(&bus, &region),
            Err(Fault::DataBus { pattern: 8, .. })
        ));
    }

    #[test]
    fn run_twice_over_healthy_memory_passes_both_times() {
        let bus = clean();
        let region = MemoryRegion::new(bus.ram_base(), LEN, 1);

        assert_eq!(run::<u8, _>(&bus, &region), Ok(()));
        assert_eq!(run::<u8, _>(&bus, &region), Ok(()));
    }

    #[test]
    fn empty_region_passes() {
        let region = MemoryRegion::new(BASE, 0, 1);

        assert!(region.is_empty());
        assert_eq!(run::<u32, _>(&clean(), &region), Ok(()));
    }
}
