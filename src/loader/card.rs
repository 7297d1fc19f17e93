// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2022 Andre Richter <andre.o.richter@gmail.com>

//! MMC/SD and eMMC loading.
//!
//! A card either carries the image raw at a fixed offset, announced by a configuration header
//! in its first sector, or as a file on a FAT partition.

use super::{
    interface::{CardDevice, FileSystem, NOT_FOUND},
    CardLayout, Devices, ImageBuffer,
};

//--------------------------------------------------------------------------------------------------
// Public Definitions
//--------------------------------------------------------------------------------------------------

pub const SECTOR_SIZE: usize = 512;

/// Name of the configuration header item marking a raw-bootable card.
pub const RAW_BOOT_SIGNATURE: &[u8; 10] = b"CHSETTINGS";

/// Byte offset of [`RAW_BOOT_SIGNATURE`] in the first sector.
pub const RAW_BOOT_SIGNATURE_OFFSET: usize = 0x14;

/// Card slot of one card boot source.
#[derive(Copy, Clone, Debug)]
pub(super) struct Slot {
    pub dev: u32,
}

pub(super) const MMC_SD1: Slot = Slot { dev: 0 };
pub(super) const EMMC: Slot = Slot { dev: 1 };

//--------------------------------------------------------------------------------------------------
// Public Code
//--------------------------------------------------------------------------------------------------

/// Whether `sector` is the first sector of a card that supports raw boot.
pub fn is_raw_boot_sector(sector: &[u8; SECTOR_SIZE]) -> bool {
    let end = RAW_BOOT_SIGNATURE_OFFSET + RAW_BOOT_SIGNATURE.len();

    sector[RAW_BOOT_SIGNATURE_OFFSET..end] == RAW_BOOT_SIGNATURE[..]
}

fn supports_raw_boot<C: CardDevice + ?Sized>(
    card: &mut C,
    dev: u32,
) -> Result<bool, &'static str> {
    let mut sector = [0_u8; SECTOR_SIZE];

    card.read(dev, 0, &mut sector)?;

    Ok(is_raw_boot_sector(&sector))
}

fn copy_raw<C: CardDevice + ?Sized>(
    card: &mut C,
    dev: u32,
    layout: &CardLayout,
    image: &mut ImageBuffer,
) -> Result<(), &'static str> {
    let dst = image.reserve(layout.raw_len)?;
    let read = card.read(dev, layout.raw_start / SECTOR_SIZE, dst)?;

    image.advance(read);
    Ok(())
}

fn copy_file<F: FileSystem + ?Sized>(
    fat: &mut F,
    dev: u32,
    layout: &CardLayout,
    image: &mut ImageBuffer,
) -> Result<(), &'static str> {
    fat.mount(dev, layout.partition)?;

    match fat.read_file(layout.file_name, image.unwritten(), 0) {
        NOT_FOUND => Err("image file not found"),
        n if n <= 0 => Err("image file is empty"),
        n => {
            image.advance(n as usize);
            Ok(())
        }
    }
}

/// Load the image from the card in `slot`.
pub(super) fn load(
    devices: &mut Devices,
    slot: Slot,
    layout: &CardLayout,
    image: &mut ImageBuffer,
) -> Result<(), &'static str> {
    let card = devices
        .card
        .as_deref_mut()
        .ok_or("MMC support not built in")?;

    card.init(slot.dev).map_err(|_| "MMC init failed")?;

    if supports_raw_boot(card, slot.dev)? {
        return copy_raw(card, slot.dev, layout, image);
    }

    let fat = devices
        .fat
        .as_deref_mut()
        .ok_or("FAT support not built in")?;

    copy_file(fat, slot.dev, layout, image)
}

//--------------------------------------------------------------------------------------------------
// Testing
//--------------------------------------------------------------------------------------------------
