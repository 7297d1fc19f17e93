// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2022 Andre Richter <andre.o.richter@gmail.com>

//! Serial download.
//!
//! Same handshake as the minipush host tool speaks:
//!
//! 1. Loader sends [`REQUEST_BINARY`] three times.
//! 2. Host answers with the image size, `u32` little endian.
//! 3. Loader acknowledges with [`SERIAL_ACK`].
//! 4. Host sends the image, byte by byte.

use super::{interface::SerialLink, ImageBuffer};
use crate::info;

//--------------------------------------------------------------------------------------------------
// Public Definitions
//--------------------------------------------------------------------------------------------------

/// Byte asking the host for the image.
pub const REQUEST_BINARY: u8 = 3;

/// Acknowledge of the announced size.
pub const SERIAL_ACK: &[u8; 2] = b"OK";

//--------------------------------------------------------------------------------------------------
// Public Code
//--------------------------------------------------------------------------------------------------

/// Receive the image over `link` at `baud` into `image`.
pub(super) fn download<L: SerialLink + ?Sized>(
    link: &mut L,
    baud: u32,
    image: &mut ImageBuffer,
) -> Result<(), &'static str> {
    link.set_baud_rate(baud)?;

    info!("Requesting binary at {} baud", baud);

    // Discard any spurious received characters before starting with the loader protocol.
    link.clear_rx();

    for _ in 0..3 {
        link.write_byte(REQUEST_BINARY);
    }

    // Read the binary's size.
    let mut size = [0_u8; 4];
    for b in size.iter_mut() {
        *b = link.read_byte();
    }
    let size = u32::from_le_bytes(size) as usize;

    if size == 0 {
        return Err("host announced an empty image");
    }
    let dst = image.reserve(size)?;

    for b in SERIAL_ACK {
        link.write_byte(*b);
    }

    for b in dst.iter_mut() {
        *b = link.read_byte();
    }
    image.advance(size);

    info!("Loaded {} bytes", size);

    Ok(())
}

//--------------------------------------------------------------------------------------------------
// Testing
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        boot_source::BootSource,
        loader::{self, tests::LAYOUT, Devices, LoadFailure},
    };
    use std::collections::VecDeque;

    struct Host {
        to_loader: VecDeque<u8>,
        from_loader: Vec<u8>,
        baud: Option<u32>,
    }

    impl Host {
        fn sending(image: &[u8]) -> Self {
            let mut to_loader: VecDeque<u8> = VecDeque::new();
            to_loader.extend((image.len() as u32).to_le_bytes());
            to_loader.extend(image);

            Self {
                to_loader,
                from_loader: Vec::new(),
                baud: None,
            }
        }
    }

    impl SerialLink for Host {
        fn set_baud_rate(&mut self, baud: u32) -> Result<(), &'static str> {
            self.baud = Some(baud);
            Ok(())
        }

        fn read_byte(&mut self) -> u8 {
            self.to_loader.pop_front().expect("loader read past the transfer")
        }

        fn write_byte(&mut self, byte: u8) {
            self.from_loader.push(byte);
        }

        fn clear_rx(&mut self) {}
    }

    #[test]
    fn handshake_then_payload_lands_in_the_buffer() {
        let payload: Vec<u8> = (0..=255).collect();
        let mut host = Host::sending(&payload);
        let mut mem = [0_u8; 512];
        let mut image = ImageBuffer::new(&mut mem);
        let mut devices = Devices {
            serial: Some(&mut host),
            ..Devices::default()
        };

        assert_eq!(
            loader::load(BootSource::Serial, &mut devices, &LAYOUT, &mut image),
            Ok(())
        );
        assert_eq!(image.as_slice(), &payload[..]);

        drop(devices);
        assert_eq!(host.from_loader, vec![3, 3, 3, b'O', b'K']);
        assert_eq!(host.baud, Some(115_200));
        assert!(host.to_loader.is_empty());
    }

    #[test]
    fn oversized_image_is_refused_before_the_ack() {
        let mut host = Host::sending(&[0x55; 64]);
        let mut mem = [0_u8; 32];
        let mut image = ImageBuffer::new(&mut mem);
        let mut devices = Devices {
            serial: Some(&mut host),
            ..Devices::default()
        };

        assert_eq!(
            loader::load(BootSource::Serial, &mut devices, &LAYOUT, &mut image),
            Err(LoadFailure)
        );

        drop(devices);
        assert_eq!(host.from_loader, vec![3, 3, 3]);
    }

    #[test]
    fn empty_image_is_refused() {
        let mut host = Host::sending(&[]);
        let mut mem = [0_u8; 32];
        let mut image = ImageBuffer::new(&mut mem);

        assert!(download(&mut host, 115_200, &mut image).is_err());
        assert!(image.is_empty());
    }
}
