// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2022 Andre Richter <andre.o.richter@gmail.com>

//! NAND and OneNAND loading.

use super::{interface::FlashDevice, FlashLayout, ImageBuffer};

//--------------------------------------------------------------------------------------------------
// Public Code
//--------------------------------------------------------------------------------------------------

/// Copy the blocks in `layout.start..layout.end` back to back into `image`.
///
/// Stops at the first block that fails to read.
pub(super) fn copy_blocks<D: FlashDevice + ?Sized>(
    dev: &mut D,
    layout: &FlashLayout,
    image: &mut ImageBuffer,
) -> Result<(), &'static str> {
    if layout.block_size == 0 {
        return Err("flash block size is zero");
    }

    for offset in (layout.start..layout.end).step_by(layout.block_size) {
        dev.read_block(offset, image.reserve(layout.block_size)?)?;
        image.advance(layout.block_size);
    }

    Ok(())
}

//--------------------------------------------------------------------------------------------------
// Testing
//--------------------------------------------------------------------------------------------------
