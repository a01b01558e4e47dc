//! ## Types
//!
//! The different types used across the crate
//!

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::constants::misc;
use crate::encoding::{clock, trigger};
use crate::error::Error;

/// ### Device Address
///
/// Location of a scope on the USB bus.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceAddr {
    pub bus: u8,
    pub device: u8,
}

/// ### Buffer Length
///
/// Number of samples captured per channel.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BufferLength {
    Samples4K,
    Samples8K,
    #[default]
    Samples16K,
}

impl BufferLength {
    pub const ALL: [BufferLength; 3] = [Self::Samples4K, Self::Samples8K, Self::Samples16K];

    /// Samples per channel
    pub fn samples(self) -> usize {
        match self {
            Self::Samples4K => 4096,
            Self::Samples8K => 8192,
            Self::Samples16K => 16384,
        }
    }

    /// Divisor applied to the clock base constants
    pub fn divisor(self) -> u32 {
        match self {
            Self::Samples4K => 4,
            Self::Samples8K => 2,
            Self::Samples16K => 1,
        }
    }

    pub fn from_samples(samples: usize) -> Option<BufferLength> {
        Self::ALL.into_iter().find(|len| len.samples() == samples)
    }
}

/// ### Volts per Division
///
/// The vertical scales supported by the front end.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VoltsPerDiv {
    MilliVolts2,
    MilliVolts5,
    MilliVolts10,
    MilliVolts20,
    MilliVolts50,
    MilliVolts100,
    MilliVolts200,
    MilliVolts500,
    #[default]
    Volts1,
    Volts2,
    Volts5,
    Volts10,
}

impl VoltsPerDiv {
    pub const ALL: [VoltsPerDiv; 12] = [
        Self::MilliVolts2,
        Self::MilliVolts5,
        Self::MilliVolts10,
        Self::MilliVolts20,
        Self::MilliVolts50,
        Self::MilliVolts100,
        Self::MilliVolts200,
        Self::MilliVolts500,
        Self::Volts1,
        Self::Volts2,
        Self::Volts5,
        Self::Volts10,
    ];

    pub fn volts(self) -> f64 {
        match self {
            Self::MilliVolts2 => 0.002,
            Self::MilliVolts5 => 0.005,
            Self::MilliVolts10 => 0.01,
            Self::MilliVolts20 => 0.02,
            Self::MilliVolts50 => 0.05,
            Self::MilliVolts100 => 0.1,
            Self::MilliVolts200 => 0.2,
            Self::MilliVolts500 => 0.5,
            Self::Volts1 => 1.0,
            Self::Volts2 => 2.0,
            Self::Volts5 => 5.0,
            Self::Volts10 => 10.0,
        }
    }

    /// Look up a scale by its value in volts. Only the listed scales match.
    pub fn from_volts(volts: f64) -> Option<VoltsPerDiv> {
        Self::ALL
            .into_iter()
            .find(|scale| (scale.volts() - volts).abs() <= scale.volts() * 1e-9)
    }
}

/// ### Trigger Slope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TriggerSlope {
    #[default]
    Rise,
    Fall,
}

impl TriggerSlope {
    pub fn code(self) -> u8 {
        match self {
            Self::Rise => 0x00,
            Self::Fall => 0x01,
        }
    }
}

impl FromStr for TriggerSlope {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "RISE" => Ok(Self::Rise),
            "FALL" => Ok(Self::Fall),
            _ => Err(Error::UnsupportedSlope(s.to_string())),
        }
    }
}

/// ### Sweep Mode
///
/// Re-arm policy of the acquisition.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SweepMode {
    /// Wait for a trigger
    #[default]
    Normal,
    /// Force a trigger when none arrives
    Auto,
    /// One shot
    Single,
}

impl SweepMode {
    /// The two bytes following the start collection opcode
    pub fn code(self) -> [u8; 2] {
        match self {
            Self::Normal => [0x00, 0x00],
            Self::Auto => [0x01, 0x00],
            Self::Single => [0x04, 0x00],
        }
    }
}

impl FromStr for SweepMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "NORMAL" => Ok(Self::Normal),
            "AUTO" => Ok(Self::Auto),
            "SINGLE" => Ok(Self::Single),
            _ => Err(Error::UnsupportedSweepMode(s.to_string())),
        }
    }
}

impl fmt::Display for SweepMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Normal => "NORMAL",
            Self::Auto => "AUTO",
            Self::Single => "SINGLE",
        };
        f.write_str(name)
    }
}

/// ### Device Config
///
/// Settings pushed to the scope by `configure`. The session setters keep it
/// valid; a config built by hand is checked with `validate` before use.
///
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceConfig {
    /// Samples captured per channel
    pub buffer_length: BufferLength,
    /// Sample rate in Hz, one of the clock table rates
    pub sample_rate: u32,
    /// Vertical scale of each channel
    pub volts_per_div: [VoltsPerDiv; misc::CHANNELS],
    /// Channel index the trigger watches
    pub trigger_source: usize,
    /// Comparator code, within the accepted band
    pub trigger_level: u8,
    pub trigger_slope: TriggerSlope,
    pub sweep_mode: SweepMode,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        DeviceConfig {
            buffer_length: BufferLength::default(),
            sample_rate: misc::DEFAULT_SAMPLE_RATE,
            volts_per_div: [VoltsPerDiv::default(); misc::CHANNELS],
            trigger_source: 0,
            trigger_level: misc::TRIGGER_LEVEL_DEFAULT,
            trigger_slope: TriggerSlope::default(),
            sweep_mode: SweepMode::default(),
        }
    }
}

impl DeviceConfig {
    /// ### Validate
    ///
    /// Check the fields the scope cannot run with: the sample rate must be in
    /// the clock table, the trigger source must be a channel and the trigger
    /// level code must be inside the comparator band.
    ///
    pub fn validate(&self) -> anyhow::Result<()> {
        if !clock::is_supported(self.sample_rate) {
            return Err(Error::UnknownRate(self.sample_rate).into());
        }
        if self.trigger_source >= misc::CHANNELS {
            return Err(Error::InvalidChannel(self.trigger_source).into());
        }
        if !trigger::in_band(self.trigger_level) {
            return Err(Error::TriggerCodeOutOfBand(self.trigger_level).into());
        }

        Ok(())
    }
}

/// ### Session State
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Initializing,
    Configured,
    Acquiring,
}

/// ### Firmware Info
///
/// Blocks read from the scope while bringing it up.
///
#[derive(Debug, Clone, Default)]
pub struct FirmwareInfo {
    /// Answer to the bring-up probe
    pub bring_up: Vec<u8>,
    /// Device descriptor block of the EEPROM
    pub descriptor: Vec<u8>,
    /// Driver version block of the EEPROM
    pub driver_version: Vec<u8>,
}

/// ### Trigger Frame
///
/// Status packet returned by the trigger read command.
///
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerFrame {
    /// Raw trigger position in the circular buffer
    pub position: u16,
    /// Slope correction byte
    pub slope_correction: u8,
    /// The whole packet
    pub raw: Vec<u8>,
}

/// ### Raw Frame
///
/// Interleaved samples straight from the data endpoint.
///
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    pub buffer_length: BufferLength,
    pub data: Vec<u8>,
}

impl RawFrame {
    /// Iterate over the samples of one channel, at most `buffer_length` of them.
    pub fn channel(&self, channel: usize) -> impl Iterator<Item = u8> + '_ {
        self.data
            .iter()
            .skip(channel)
            .step_by(misc::CHANNELS)
            .take(self.buffer_length.samples())
            .copied()
    }
}

/// ### Raw Capture
///
/// Uncalibrated acquisition, with the status packets kept for diagnostics.
///
#[derive(Debug, Clone)]
pub struct RawCapture {
    pub channels: [Vec<u8>; misc::CHANNELS],
    /// The two status poll answers, in order
    pub status: [Vec<u8>; 2],
    pub trigger: TriggerFrame,
    /// Read pointer sent to the scope
    pub offset: u16,
}

/// ### Calibrated Frame
///
/// Voltages of the four channels and the time of each sample.
///
#[derive(Debug, Clone)]
pub struct CalibratedFrame {
    /// Seconds since the first sample, shared between frames of the same timebase
    pub time: Arc<[f64]>,
    pub channels: [Vec<f64>; misc::CHANNELS],
}

/// Time of each sample for a given timebase.
pub fn time_axis(buffer_length: BufferLength, sample_rate: u32) -> Arc<[f64]> {
    let rate = f64::from(sample_rate);
    (0..buffer_length.samples())
        .map(|n| n as f64 / rate)
        .collect()
}
