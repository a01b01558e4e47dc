//! ## Acquisition
//!
//! One capture: arm, wait for the hardware, locate the trigger, move the read
//! pointer and read the buffer back.
//!

use std::time::Duration;

use anyhow::Result;

use crate::communication::bulk;
use crate::constants::{misc, opcodes};
use crate::error::Error;
use crate::resolver;
use crate::transport::Transport;
use crate::types::{BufferLength, DeviceConfig, RawFrame, SweepMode, TriggerFrame};

/// ### Acquisition
///
/// Everything read from the scope during one capture.
///
#[derive(Debug, Clone)]
pub struct Acquisition {
    /// The two status poll answers
    pub status: [Vec<u8>; 2],
    pub trigger: TriggerFrame,
    /// Read pointer sent to the scope
    pub offset: u16,
    pub frame: RawFrame,
}

/// Time the scope needs to fill its buffer and settle. `sample_rate` must be
/// a clock table rate.
fn acquisition_wait(buffer_length: BufferLength, sample_rate: u32) -> Duration {
    let capture = buffer_length.samples() as f64 / f64::from(sample_rate);
    Duration::from_secs_f64(capture * misc::ACQUISITION_WAIT_FACTOR) + misc::ACQUISITION_SETTLE
}

/// Number of 512 byte packets holding a full buffer of the four channels.
pub fn packet_count(buffer_length: BufferLength) -> usize {
    misc::CHANNELS * buffer_length.samples() / misc::PACKET_SIZE
}

/// Start collection in the given sweep mode.
pub fn start_packet(mode: SweepMode) -> [u8; 4] {
    let [low, high] = mode.code();
    [opcodes::START_COLLECT, 0x00, low, high]
}

/// Move the buffer read pointer.
pub fn position_packet(offset: u16) -> [u8; 4] {
    let [low, high] = offset.to_le_bytes();
    [opcodes::POSITION_COMMIT, 0x00, low, high]
}

/// Ask for `packets` packets of sample data.
pub fn read_request_packet(buffer_length: BufferLength) -> [u8; 4] {
    [opcodes::BUFFER_READ_REQUEST, 0x00, 0x00, packet_count(buffer_length) as u8]
}

/// ### Parse Trigger
///
/// Extract the trigger position (bytes 2 and 3, little endian) and the slope
/// correction byte (byte 1) from a trigger status packet.
///
pub fn parse_trigger(raw: Vec<u8>) -> Result<TriggerFrame> {
    if raw.len() < 4 {
        return Err(Error::ShortRead {
            expected: 4,
            received: raw.len(),
        }
        .into());
    }

    Ok(TriggerFrame {
        position: u16::from_le_bytes([raw[2], raw[3]]),
        slope_correction: raw[1],
        raw,
    })
}

fn poll<T: Transport + ?Sized>(
    port: &mut T,
    config: &DeviceConfig,
    timeout: Duration,
) -> Result<[Vec<u8>; 2]> {
    bulk::write(port, &[opcodes::STATUS_POLL, 0x00])?;
    let first = bulk::read(port, misc::PACKET_SIZE, timeout)?;

    // single fixed wait, the scope is not asked again whether it is done
    std::thread::sleep(acquisition_wait(config.buffer_length, config.sample_rate));

    bulk::write(port, &[opcodes::STATUS_POLL, 0x00])?;
    let second = bulk::read(port, misc::PACKET_SIZE, timeout)?;

    Ok([first, second])
}

/// ### Acquire
///
/// Run one capture with the configuration last pushed to the scope.
///
/// #### Arguments
/// - `port` -> the transport to the device
/// - `config` -> the configuration the scope runs with
/// - `timeout` -> the timeout of each bulk read
///
pub fn acquire<T: Transport + ?Sized>(
    port: &mut T,
    config: &DeviceConfig,
    timeout: Duration,
) -> Result<Acquisition> {
    config.validate()?;

    // ARM
    // ==========
    bulk::write(port, &start_packet(config.sweep_mode))?;

    // POLL
    // ==========
    let status = poll(port, config, timeout)?;

    // TRIGGER
    // ==========
    bulk::write(port, &[opcodes::TRIGGER_READ, 0x00])?;
    let trigger = parse_trigger(bulk::read(port, misc::PACKET_SIZE, timeout)?)?;
    let resolved = resolver::resolve_offset(trigger.position, trigger.slope_correction);
    let offset = resolver::read_pointer(resolved);
    log::debug!(
        "trigger position {:#06x} correction {:#04x} -> offset {:#06x}",
        trigger.position,
        trigger.slope_correction,
        offset
    );

    // POSITION
    // ==========
    bulk::write(port, &position_packet(offset))?;

    // READ
    // ==========
    bulk::write(port, &read_request_packet(config.buffer_length))?;
    let length = misc::PACKET_SIZE * packet_count(config.buffer_length);
    let data = bulk::read_exact(port, length, timeout)?;
    log::debug!("read {} sample bytes", data.len());

    Ok(Acquisition {
        status,
        trigger,
        offset,
        frame: RawFrame {
            buffer_length: config.buffer_length,
            data,
        },
    })
}
