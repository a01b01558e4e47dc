//! Bulk
//!
//! Low level functions to write commands to and read data from the bulk endpoints.
//!

use std::time::Duration;

use anyhow::Result;

use crate::communication::control;
use crate::constants::{misc, usb};
use crate::error::Error;
use crate::transport::Transport;

/// ### Write
///
/// Write a command packet to the BULK OUT endpoint.
///
/// The command pipe is soft reset first, and the device is given a moment to
/// latch the command afterwards. A partial write fails the command.
///
pub fn write<T: Transport + ?Sized>(port: &mut T, data: &[u8]) -> Result<()> {
    control::soft_reset(port)?;

    let written = port
        .write_bulk(usb::BULK_OUT_EP, data, misc::CONTROL_TIMEOUT_DURATION)
        .map_err(Error::from_transport)?;
    if written != data.len() {
        log::warn!("command {:02x?} only partially written ({} bytes)", data, written);
        return Err(Error::ShortWrite {
            expected: data.len(),
            written,
        }
        .into());
    }

    std::thread::sleep(misc::COMMAND_SETTLE);

    Ok(())
}

/// ### Read
///
/// Read up to `length` bytes from the BULK IN endpoint.
///
pub fn read<T: Transport + ?Sized>(
    port: &mut T,
    length: usize,
    timeout: Duration,
) -> Result<Vec<u8>> {
    let data = port
        .read_bulk(usb::BULK_IN_EP, length, timeout)
        .map_err(Error::from_transport)?;

    Ok(data)
}

/// ### Read Exact
///
/// Read exactly `length` bytes from the BULK IN endpoint, failing on a short read.
///
pub fn read_exact<T: Transport + ?Sized>(
    port: &mut T,
    length: usize,
    timeout: Duration,
) -> Result<Vec<u8>> {
    let data = read(port, length, timeout)?;

    if data.len() != length {
        return Err(Error::ShortRead {
            expected: length,
            received: data.len(),
        }
        .into());
    }

    Ok(data)
}
