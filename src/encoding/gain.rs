//! ## Gain
//!
//! Front end range selection and ADC digital gain for each channel.
//!

use crate::constants::{misc, opcodes};
use crate::types::VoltsPerDiv;

/// ### Range
///
/// Attenuator family of the analog front end.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Range {
    /// 2 mV/div to 100 mV/div
    Low,
    /// 200 mV/div to 1 V/div
    Mid,
    /// 2 V/div to 10 V/div
    High,
}

impl Range {
    /// Relay code written for the channel
    pub fn code(self) -> u8 {
        match self {
            Self::Low => 0x2E,
            Self::Mid => 0x36,
            Self::High => 0x56,
        }
    }
}

/// Range and digital gain digit of one scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GainCode {
    pub range: Range,
    /// Single hex digit
    pub digit: u8,
}

const fn code(range: Range, digit: u8) -> GainCode {
    GainCode { range, digit }
}

impl VoltsPerDiv {
    pub fn gain_code(self) -> GainCode {
        use Range::*;

        match self {
            Self::MilliVolts2 => code(Low, 0xD),
            Self::MilliVolts5 => code(Low, 0xA),
            Self::MilliVolts10 => code(Low, 0x7),
            Self::MilliVolts20 => code(Low, 0x5),
            Self::MilliVolts50 => code(Low, 0x2),
            Self::MilliVolts100 => code(Low, 0x0),
            Self::MilliVolts200 => code(Mid, 0x5),
            Self::MilliVolts500 => code(Mid, 0x2),
            Self::Volts1 => code(Mid, 0x0),
            Self::Volts2 => code(High, 0x5),
            Self::Volts5 => code(High, 0x2),
            Self::Volts10 => code(High, 0x0),
        }
    }
}

/// ### Gain Program
///
/// Range and digital gain settings of the four channels.
///
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GainProgram {
    pub codes: [GainCode; misc::CHANNELS],
}

impl GainProgram {
    /// Relay packet selecting the range of every channel
    pub fn range_packet(&self) -> [u8; 8] {
        let mut packet = [opcodes::REGISTER_WRITE, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00];
        for (i, code) in self.codes.iter().enumerate() {
            packet[i + 2] = code.range.code();
        }
        packet
    }

    /// ADC register write with the digital gain of channel pairs (1, 2) and (3, 4).
    /// The higher channel of a pair takes the high nibble.
    pub fn digital_gain_packet(&self) -> [u8; 8] {
        let pair = |low: usize, high: usize| (self.codes[high].digit << 4) | self.codes[low].digit;

        [
            opcodes::REGISTER_WRITE,
            0x00,
            0x00,
            pair(0, 1),
            pair(2, 3),
            0x2A,
            0x04,
            0x00,
        ]
    }
}

/// Build the gain program of four channel scales.
pub fn gain_program(scales: &[VoltsPerDiv; misc::CHANNELS]) -> GainProgram {
    GainProgram {
        codes: scales.map(VoltsPerDiv::gain_code),
    }
}

/// ### Scale Update
///
/// Outcome of applying requested scales on top of the current ones.
///
#[derive(Debug, Clone, PartialEq)]
pub struct ScaleUpdate {
    pub scales: [VoltsPerDiv; misc::CHANNELS],
    /// Channels whose requested value is not a known scale
    pub rejected: Vec<usize>,
}

/// Replace each channel scale by its requested value in volts. Unknown values
/// leave the channel at its current scale and are reported.
pub fn merge_scales(
    current: &[VoltsPerDiv; misc::CHANNELS],
    requested: &[f64; misc::CHANNELS],
) -> ScaleUpdate {
    let mut scales = *current;
    let mut rejected = Vec::new();

    for (channel, volts) in requested.iter().enumerate() {
        match VoltsPerDiv::from_volts(*volts) {
            Some(scale) => scales[channel] = scale,
            None => rejected.push(channel),
        }
    }

    ScaleUpdate { scales, rejected }
}
