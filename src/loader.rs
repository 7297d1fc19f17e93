// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2022 Andre Richter <andre.o.richter@gmail.com>

//! Second-stage image loading.
//!
//! Copies the image from the selected [`BootSource`] into the [`ImageBuffer`]. The media drivers
//! themselves live with the board; this module only knows their [`interface`]s and the board's
//! [`Layout`] of where the image is stored.
//!
//! Whatever goes wrong, the caller only learns [`LoadFailure`]. The reason is logged where it
//! happens.

mod card;
mod flash;
mod serial;

use crate::{boot_source::BootSource, warn};
use core::{fmt, marker::PhantomData};

pub use card::{is_raw_boot_sector, RAW_BOOT_SIGNATURE, RAW_BOOT_SIGNATURE_OFFSET, SECTOR_SIZE};
pub use serial::{REQUEST_BINARY, SERIAL_ACK};

//--------------------------------------------------------------------------------------------------
// Public Definitions
//--------------------------------------------------------------------------------------------------

/// Media driver interfaces.
pub mod interface {

    /// NAND and OneNAND flash.
    pub trait FlashDevice {
        /// Read the block starting at byte `offset` into `dst`, which is exactly one block long.
        fn read_block(&mut self, offset: usize, dst: &mut [u8]) -> Result<(), &'static str>;
    }

    /// MMC, SD and eMMC cards.
    pub trait CardDevice {
        /// Bring up the card in slot `dev`.
        fn init(&mut self, dev: u32) -> Result<(), &'static str>;

        /// Read `dst.len()` bytes starting at sector `start_sector`. Returns the bytes read.
        fn read(
            &mut self,
            dev: u32,
            start_sector: usize,
            dst: &mut [u8],
        ) -> Result<usize, &'static str>;
    }

    /// Read length signalling a missing or unreadable file.
    pub const NOT_FOUND: isize = -1;

    /// FAT view of a card partition.
    pub trait FileSystem {
        /// Make `partition` of card `dev` the current file system.
        fn mount(&mut self, dev: u32, partition: u32) -> Result<(), &'static str>;

        /// Read file `name` into `dst`, starting `offset` bytes into the file.
        ///
        /// Returns the number of bytes read, or [`NOT_FOUND`] if the file is missing or
        /// unreadable.
        fn read_file(&mut self, name: &str, dst: &mut [u8], offset: usize) -> isize;
    }

    /// Byte transport for the serial download.
    pub trait SerialLink {
        /// Reprogram the line to `baud` bits per second.
        fn set_baud_rate(&mut self, baud: u32) -> Result<(), &'static str>;

        /// Block until a byte arrives.
        fn read_byte(&mut self) -> u8;

        fn write_byte(&mut self, byte: u8);

        /// Drop anything already received.
        fn clear_rx(&mut self);
    }
}

/// The load region, filled front to back.
///
/// Only a raw pointer to the region is held. References into it exist only while a loader writes
/// or reads the image, so the region may be touched through other means before that.
pub struct ImageBuffer<'a> {
    start: *mut u8,
    capacity: usize,
    filled: usize,
    _mem: PhantomData<&'a mut [u8]>,
}

/// Where a flash medium keeps the image.
#[derive(Copy, Clone, Debug)]
pub struct FlashLayout {
    /// Byte offset of the first block.
    pub start: usize,
    /// Byte offset one past the last block.
    pub end: usize,
    pub block_size: usize,
}

/// Where a card keeps the image.
#[derive(Copy, Clone, Debug)]
pub struct CardLayout {
    /// Byte offset of the raw image.
    pub raw_start: usize,
    /// Bytes copied in raw mode.
    pub raw_len: usize,
    /// Partition holding the FAT file system.
    pub partition: u32,
    /// Image file name on that partition.
    pub file_name: &'static str,
}

/// Board storage layout for every boot source.
#[derive(Copy, Clone, Debug)]
pub struct Layout {
    pub onenand: FlashLayout,
    pub nand: FlashLayout,
    pub card: CardLayout,
    pub serial_baud: u32,
}

/// The drivers present in this build. `None` means the medium is not supported.
#[derive(Default)]
pub struct Devices<'a> {
    pub onenand: Option<&'a mut dyn interface::FlashDevice>,
    pub nand: Option<&'a mut dyn interface::FlashDevice>,
    pub card: Option<&'a mut dyn interface::CardDevice>,
    pub fat: Option<&'a mut dyn interface::FileSystem>,
    pub serial: Option<&'a mut dyn interface::SerialLink>,
}

/// The image could not be loaded.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct LoadFailure;

//--------------------------------------------------------------------------------------------------
// Public Code
//--------------------------------------------------------------------------------------------------

impl<'a> ImageBuffer<'a> {
    /// Wrap `mem` as an empty load region.
    pub fn new(mem: &'a mut [u8]) -> Self {
        Self {
            start: mem.as_mut_ptr(),
            capacity: mem.len(),
            filled: 0,
            _mem: PhantomData,
        }
    }

    /// Wrap the fixed load region at `addr`.
    ///
    /// No reference to the region is created here.
    ///
    /// # Safety
    ///
    /// - `addr..addr + capacity` must be RAM, valid for `'a`.
    /// - While the region is being loaded, nothing else may access it.
    pub unsafe fn at_address(addr: usize, capacity: usize) -> ImageBuffer<'a> {
        Self {
            start: addr as *mut u8,
            capacity,
            filled: 0,
            _mem: PhantomData,
        }
    }

    /// Address of the first byte, which is also the image's entry point.
    pub fn start_addr(&self) -> usize {
        self.start as usize
    }

    /// Bytes written so far.
    pub fn len(&self) -> usize {
        self.filled
    }

    pub fn is_empty(&self) -> bool {
        self.filled == 0
    }

    /// The loaded bytes.
    pub fn as_slice(&self) -> &[u8] {
        unsafe { core::slice::from_raw_parts(self.start, self.filled) }
    }

    /// The next `len` unwritten bytes, if the region has room for them.
    fn reserve(&mut self, len: usize) -> Result<&mut [u8], &'static str> {
        let end = self
            .filled
            .checked_add(len)
            .filter(|&end| end <= self.capacity)
            .ok_or("image does not fit the load region")?;

        Ok(unsafe { self.window(end) })
    }

    /// Everything not yet written.
    fn unwritten(&mut self) -> &mut [u8] {
        unsafe { self.window(self.capacity) }
    }

    /// Mark `len` more bytes as written.
    fn advance(&mut self, len: usize) {
        self.filled = (self.filled + len).min(self.capacity);
    }

    /// Bytes `filled..end`.
    ///
    /// # Safety
    ///
    /// - `end` must not exceed the capacity.
    unsafe fn window(&mut self, end: usize) -> &mut [u8] {
        core::slice::from_raw_parts_mut(self.start.add(self.filled), end - self.filled)
    }
}

impl fmt::Display for LoadFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("could not read bootloader")
    }
}

/// Copy the image from `source` into `image`.
pub fn load(
    source: BootSource,
    devices: &mut Devices,
    layout: &Layout,
    image: &mut ImageBuffer,
) -> Result<(), LoadFailure> {
    let result = match source {
        BootSource::OneNand => match devices.onenand.as_deref_mut() {
            Some(dev) => flash::copy_blocks(dev, &layout.onenand, image),
            None => Err("OneNAND support not built in"),
        },
        BootSource::Nand => match devices.nand.as_deref_mut() {
            Some(dev) => flash::copy_blocks(dev, &layout.nand, image),
            None => Err("NAND support not built in"),
        },
        BootSource::Emmc => card::load(devices, card::EMMC, &layout.card, image),
        BootSource::MmcSd1 => card::load(devices, card::MMC_SD1, &layout.card, image),
        BootSource::Serial => match devices.serial.as_deref_mut() {
            Some(link) => serial::download(link, layout.serial_baud, image),
            None => Err("serial download not built in"),
        },
        BootSource::Unknown => Err("unsupported boot device"),
    };

    result.map_err(|reason| {
        warn!("{}: {}", source, reason);
        LoadFailure
    })
}

//--------------------------------------------------------------------------------------------------
// Testing
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const LAYOUT: Layout = Layout {
        onenand: FlashLayout {
            start: 4 * 64,
            end: 8 * 64,
            block_size: 64,
        },
        nand: FlashLayout {
            start: 0x100,
            end: 0x200,
            block_size: 0x40,
        },
        card: CardLayout {
            raw_start: 2 * SECTOR_SIZE,
            raw_len: 300,
            partition: 1,
            file_name: "u-boot.bin",
        },
        serial_baud: 115_200,
    };

    #[test]
    fn image_buffer_refuses_to_overflow() {
        let mut mem = [0_u8; 8];
        let mut image = ImageBuffer::new(&mut mem);

        assert!(image.reserve(8).is_ok());
        image.advance(6);
        assert!(image.reserve(3).is_err());
        assert_eq!(image.unwritten().len(), 2);
        assert_eq!(image.len(), 6);
    }

    #[test]
    fn missing_drivers_and_unknown_sources_fail_uniformly() {
        let mut mem = [0_u8; 64];
        let mut image = ImageBuffer::new(&mut mem);
        let mut devices = Devices::default();

        for source in [
            BootSource::OneNand,
            BootSource::Nand,
            BootSource::Emmc,
            BootSource::MmcSd1,
            BootSource::Serial,
            BootSource::Unknown,
        ] {
            assert_eq!(
                load(source, &mut devices, &LAYOUT, &mut image),
                Err(LoadFailure)
            );
        }
        assert!(image.is_empty());
    }
}
