//! ## Sample Decoder
//!
//! Split interleaved ADC bytes into channels and scale them to volts.
//!

use std::sync::Arc;

use crate::constants::misc;
use crate::types::{CalibratedFrame, RawFrame, VoltsPerDiv};

/// ADC count of 0 V for each channel
pub const ZERO_OFFSETS: [u8; misc::CHANNELS] = [
    misc::ZERO_OFFSET,
    misc::ZERO_OFFSET,
    misc::ZERO_OFFSET_CH3,
    misc::ZERO_OFFSET,
];

/// Voltage of one ADC count on a channel.
pub fn sample_volts(raw: u8, zero_offset: u8, scale: VoltsPerDiv) -> f64 {
    (f64::from(raw) - f64::from(zero_offset)) / misc::ADC_SPAN * misc::DIVISIONS * scale.volts()
}

/// ### Split
///
/// De-interleave a raw frame into one byte stream per channel.
///
pub fn split(frame: &RawFrame) -> [Vec<u8>; misc::CHANNELS] {
    std::array::from_fn(|channel| frame.channel(channel).collect())
}

/// ### Decode
///
/// Scale a raw frame to volts using the channel scales it was captured with.
///
pub fn decode(
    frame: &RawFrame,
    scales: &[VoltsPerDiv; misc::CHANNELS],
    time: Arc<[f64]>,
) -> CalibratedFrame {
    let channels = std::array::from_fn(|channel| {
        frame
            .channel(channel)
            .map(|raw| sample_volts(raw, ZERO_OFFSETS[channel], scales[channel]))
            .collect()
    });

    CalibratedFrame { time, channels }
}
