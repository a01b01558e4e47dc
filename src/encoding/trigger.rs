//! ## Trigger
//!
//! Trigger level, slope and source packets.
//!

use anyhow::Result;

use crate::constants::{misc, opcodes};
use crate::error::Error;
use crate::types::{TriggerSlope, VoltsPerDiv};

/// Rates at or above this one run the acquisition RAM in its fast mode.
const FAST_RAM_RATE: u32 = 250_000_000;

/// ### Level Code
///
/// Convert a trigger level in volts to a comparator code, clamped to the band
/// the comparator accepts. NaN and infinite levels are rejected.
///
pub fn level_code(volts: f64, scale: VoltsPerDiv) -> Result<u8> {
    if !volts.is_finite() {
        return Err(Error::InvalidTriggerLevel(volts).into());
    }

    let code = (volts * misc::ADC_SPAN / misc::DIVISIONS / scale.volts()
        + f64::from(misc::ZERO_OFFSET))
    .round();

    Ok(code.clamp(
        f64::from(misc::TRIGGER_LEVEL_MIN),
        f64::from(misc::TRIGGER_LEVEL_MAX),
    ) as u8)
}

/// Whether the comparator accepts a level code.
pub fn in_band(code: u8) -> bool {
    (misc::TRIGGER_LEVEL_MIN..=misc::TRIGGER_LEVEL_MAX).contains(&code)
}

/// Voltage a comparator code stands for.
pub fn level_volts(code: u8, scale: VoltsPerDiv) -> f64 {
    let counts = f64::from(code) - f64::from(misc::ZERO_OFFSET);
    counts / misc::ADC_SPAN * misc::DIVISIONS * scale.volts()
}

/// ### Level Packet
///
/// Comparator thresholds: four high/low pairs with hysteresis, then eight
/// copies of the level itself.
///
pub fn level_packet(code: u8) -> [u8; 26] {
    let mid = code.clamp(misc::TRIGGER_LEVEL_MIN, misc::TRIGGER_LEVEL_MAX);
    let high = mid + misc::TRIGGER_HYSTERESIS;
    let low = mid - misc::TRIGGER_HYSTERESIS;

    let mut packet = [mid; 26];
    packet[0] = opcodes::TRIGGER_LEVEL;
    packet[1] = 0x00;
    for pair in packet[2..18].chunks_mut(4) {
        pair.copy_from_slice(&[high, high, low, low]);
    }

    packet
}

/// Edge the trigger fires on.
pub fn slope_packet(slope: TriggerSlope) -> [u8; 6] {
    [opcodes::TRIGGER_SLOPE, 0x00, 0x00, slope.code(), 0x00, 0x00]
}

/// ### RAM and Trigger Control
///
/// Select the trigger source and the RAM mode matching the sample rate.
///
pub fn ram_control_packet(source: usize, sample_rate: u32) -> [u8; 6] {
    let mode = if sample_rate < FAST_RAM_RATE { 0x3D } else { 0x3C };

    [opcodes::RAM_TRIGGER_CONTROL, 0x00, mode, 0x00, 0x00, source as u8]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_volts_is_mid_scale() {
        assert_eq!(level_code(0.0, VoltsPerDiv::Volts1).unwrap(), 128);
        assert_eq!(level_volts(128, VoltsPerDiv::Volts1), 0.0);
    }

    #[test]
    fn level_is_rounded() {
        // 1 V at 1 V/div is 25.5 counts
        assert_eq!(level_code(1.0, VoltsPerDiv::Volts1).unwrap(), 154);
        assert_eq!(level_code(-1.0, VoltsPerDiv::Volts1).unwrap(), 103);
    }

    #[test]
    fn level_is_clamped_and_stable() {
        let scale = VoltsPerDiv::MilliVolts2;
        let high = level_code(100.0, scale).unwrap();
        assert_eq!(high, 228);
        assert_eq!(level_code(level_volts(high, scale), scale).unwrap(), 228);
        assert_eq!(level_code(-100.0, VoltsPerDiv::Volts10).unwrap(), 28);
    }

    #[test]
    fn non_finite_level_is_rejected() {
        for volts in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let err = level_code(volts, VoltsPerDiv::Volts1).unwrap_err();
            assert!(matches!(
                err.downcast_ref::<Error>(),
                Some(Error::InvalidTriggerLevel(_))
            ));
        }
    }

    #[test]
    fn comparator_band() {
        assert!(in_band(28) && in_band(127) && in_band(228));
        assert!(!in_band(27) && !in_band(229) && !in_band(0));
    }

    #[test]
    fn level_packet_layout() {
        let packet = level_packet(0x80);
        assert_eq!(
            packet,
            [
                0x07, 0x00, 0x85, 0x85, 0x7B, 0x7B, 0x85, 0x85, 0x7B, 0x7B, 0x85, 0x85, 0x7B,
                0x7B, 0x85, 0x85, 0x7B, 0x7B, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80,
            ]
        );
    }

    #[test]
    fn level_packet_clamps_out_of_band_codes() {
        assert_eq!(level_packet(255)[2], 233);
        assert_eq!(level_packet(0)[4], 23);
    }

    #[test]
    fn ram_mode_depends_on_rate() {
        assert_eq!(ram_control_packet(2, 2_500_000), [0x12, 0x00, 0x3D, 0x00, 0x00, 0x02]);
        assert_eq!(ram_control_packet(0, 250_000_000), [0x12, 0x00, 0x3C, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn slope_codes() {
        assert_eq!(slope_packet(TriggerSlope::Rise)[3], 0x00);
        assert_eq!(slope_packet(TriggerSlope::Fall)[3], 0x01);
    }
}
