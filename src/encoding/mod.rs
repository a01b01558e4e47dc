//! ## Encoding
//!
//! Pure translation of settings into command packets. Nothing here talks to the device.
//!

pub mod clock;
pub mod gain;
pub mod trigger;

pub use clock::{clock_program, supported_rates, ClockProgram};
pub use gain::{gain_program, GainProgram};
