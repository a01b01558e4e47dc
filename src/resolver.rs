//! ## Trigger Resolver
//!
//! Locate the trigger inside the circular acquisition buffer from the raw
//! trigger status.
//!

use crate::constants::misc;

/// ### Resolve Offset
///
/// Turn the raw trigger position and slope correction byte into the buffer
/// offset of the triggering sample.
///
/// The position is rounded to the nearest multiple of 8 (ties of 4 round
/// down), then moved back by 20 or 24 bytes depending on the parity of the
/// correction byte. Results wrap into the 16 bit buffer space.
///
pub fn resolve_offset(trigger_position: u16, slope_correction: u8) -> u16 {
    let mut base = i64::from(trigger_position);

    // bit 31 can never be set in a 16 bit position
    let mask = base & 0x8000_0007;
    if mask != 0 {
        if mask < 5 {
            base -= mask;
        } else {
            base += 8 - mask;
        }
    }
    base = base.rem_euclid(0x1_0000);

    let term = ((-i64::from(slope_correction) - 1) & 1) - 6;

    (base + term * 4).rem_euclid(0x1_0000) as u16
}

/// Read pointer to request from the scope for a resolved trigger offset.
pub fn read_pointer(offset: u16) -> u16 {
    offset.wrapping_add(misc::TRIGGER_SKEW)
}
