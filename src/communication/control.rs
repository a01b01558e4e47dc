//! ## Control
//!
//! Set of vendor control requests to send to the device.
//!

use anyhow::Result;

use crate::constants::{control_requests, misc};
use crate::error::Error;
use crate::transport::Transport;

/// ### Busy Retry
///
/// Run a control transfer, retrying it once when the device answers busy.
/// A second busy answer is absorbed and yields an empty response.
///
fn busy_retry<R: Default>(
    request: u8,
    mut transfer: impl FnMut() -> rusb::Result<R>,
) -> Result<R> {
    let mut result = transfer();

    if matches!(result, Err(rusb::Error::Busy)) {
        log::debug!("control request {} answered busy, retrying", request);
        result = transfer();

        if matches!(result, Err(rusb::Error::Busy)) {
            log::warn!("control request {} still busy, ignoring the answer", request);
            return Ok(R::default());
        }
    }

    result.map_err(|e| Error::from_transport(e).into())
}

/// ### Write
///
/// Send a vendor request with a payload to the device.
///
/// #### Arguments
/// - `port` -> the transport to the device
/// - `request` -> the request code
/// - `value` -> the wValue field
/// - `data` -> the payload
///
pub fn write<T: Transport + ?Sized>(
    port: &mut T,
    request: u8,
    value: u16,
    data: &[u8],
) -> Result<usize> {
    busy_retry(request, || {
        port.write_control(request, value, data, misc::CONTROL_TIMEOUT_DURATION)
    })
}

/// ### Read
///
/// Read the answer of a vendor request from the device.
///
/// #### Arguments
/// - `port` -> the transport to the device
/// - `request` -> the request code
/// - `value` -> the wValue field
/// - `length` -> the number of bytes to request
///
pub fn read<T: Transport + ?Sized>(
    port: &mut T,
    request: u8,
    value: u16,
    length: usize,
) -> Result<Vec<u8>> {
    busy_retry(request, || {
        port.read_control(request, value, length, misc::CONTROL_TIMEOUT_DURATION)
    })
}

/// ### Status Probe
///
/// Read the 10 byte link status block.
///
pub fn status_probe<T: Transport + ?Sized>(port: &mut T) -> Result<Vec<u8>> {
    read(
        port,
        control_requests::STATUS_PROBE,
        0x0000,
        control_requests::STATUS_PROBE_LENGTH,
    )
}

/// ### Soft Reset
///
/// Reset the command pipe. The device expects it ahead of every command.
///
pub fn soft_reset<T: Transport + ?Sized>(port: &mut T) -> Result<()> {
    write(
        port,
        control_requests::SOFT_RESET,
        0x0000,
        &control_requests::SOFT_RESET_PAYLOAD,
    )?;
    status_probe(port)?;

    Ok(())
}

/// ### Response Length
///
/// Packet size the device answers with, as reported by the status probe.
///
pub fn response_length<T: Transport + ?Sized>(port: &mut T) -> Result<usize> {
    let status = status_probe(port)?;

    match status.first() {
        Some(&speed) if speed > 0 => Ok(misc::PACKET_SIZE),
        _ => Ok(misc::SHORT_PACKET_SIZE),
    }
}

/// ### Read EEPROM
///
/// Read `length` bytes of the configuration EEPROM at `address`.
///
pub fn read_eeprom<T: Transport + ?Sized>(
    port: &mut T,
    address: u16,
    length: usize,
) -> Result<Vec<u8>> {
    read(port, control_requests::EEPROM_READ, address, length)
}
