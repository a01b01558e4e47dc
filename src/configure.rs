//! ## Configure
//!
//! The register sequence that pushes a `DeviceConfig` to the scope.
//!

use anyhow::Result;

use crate::communication::bulk;
use crate::constants::{bring_up, calibration};
use crate::encoding::{clock, gain, trigger};
use crate::transport::Transport;
use crate::types::DeviceConfig;

/// ### Set Sample Rate
///
/// ADC preamble, then the prescaler and divider packets of the clock program.
///
pub fn set_sample_rate<T: Transport + ?Sized>(port: &mut T, config: &DeviceConfig) -> Result<()> {
    let program = clock::clock_program(config.sample_rate, config.buffer_length)?;
    log::debug!(
        "clock program for {} Hz: codes {:#08x} {:#08x}",
        config.sample_rate,
        program.codes[0],
        program.codes[1]
    );

    for packet in bring_up::CLOCK_PREAMBLE.iter() {
        bulk::write(port, packet)?;
    }
    bulk::write(port, &program.prescale)?;
    bulk::write(port, &program.divider)?;

    Ok(())
}

/// ### Set Channels and Trigger
///
/// Front end ranges, ADC re-init and the digital gain of every channel.
///
pub fn set_channels_and_trigger<T: Transport + ?Sized>(
    port: &mut T,
    config: &DeviceConfig,
) -> Result<()> {
    let program = gain::gain_program(&config.volts_per_div);

    bulk::write(port, &program.range_packet())?;
    bulk::write(port, &bring_up::RANGE_LATCH)?;
    for packet in bring_up::GAIN_REINIT.iter() {
        bulk::write(port, packet)?;
    }
    bulk::write(port, &program.digital_gain_packet())?;

    Ok(())
}

pub fn set_ram_and_trigger_control<T: Transport + ?Sized>(
    port: &mut T,
    config: &DeviceConfig,
) -> Result<()> {
    bulk::write(
        port,
        &trigger::ram_control_packet(config.trigger_source, config.sample_rate),
    )
}

/// Zero positions of the channels. Not user adjustable.
pub fn set_channel_positions<T: Transport + ?Sized>(port: &mut T) -> Result<()> {
    for packet in calibration::CHANNEL_POSITIONS.iter() {
        bulk::write(port, packet)?;
    }

    Ok(())
}

pub fn set_trigger_level<T: Transport + ?Sized>(
    port: &mut T,
    config: &DeviceConfig,
) -> Result<()> {
    bulk::write(port, &trigger::level_packet(config.trigger_level))
}

pub fn set_trigger_slope_mode<T: Transport + ?Sized>(
    port: &mut T,
    config: &DeviceConfig,
) -> Result<()> {
    bulk::write(port, &trigger::slope_packet(config.trigger_slope))
}

/// ### Configure
///
/// Push the whole configuration, in the order the scope expects it.
///
pub fn configure<T: Transport + ?Sized>(port: &mut T, config: &DeviceConfig) -> Result<()> {
    config.validate()?;

    set_sample_rate(port, config)?;
    set_channels_and_trigger(port, config)?;
    set_ram_and_trigger_control(port, config)?;
    set_channel_positions(port)?;
    set_trigger_level(port, config)?;
    set_trigger_slope_mode(port, config)?;

    log::debug!("configuration pushed: {:?}", config);

    Ok(())
}
