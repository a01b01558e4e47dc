//! ## Hantek Errors
//!
//! The errors used throughout the crate.
//!

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("device not found")]
    DeviceNotFound,
    #[error("unsupported sample rate {requested} Hz (current {current}, available {available:?})")]
    UnsupportedRate {
        requested: u32,
        available: Vec<u32>,
        current: u32,
    },
    #[error("buffer length {requested} not supported (current {current}, available {available:?})")]
    UnsupportedBufferLength {
        requested: usize,
        available: Vec<usize>,
        current: usize,
    },
    #[error("volts/div rejected for channels {channels:?} (available {available:?})")]
    UnsupportedRange {
        channels: Vec<usize>,
        available: Vec<f64>,
    },
    #[error("sample rate {0} Hz is not in the clock table")]
    UnknownRate(u32),
    #[error("unknown sweep mode {0:?} (available NORMAL, AUTO, SINGLE)")]
    UnsupportedSweepMode(String),
    #[error("unknown trigger slope {0:?} (available RISE, FALL)")]
    UnsupportedSlope(String),
    #[error("channel {0} does not exist")]
    InvalidChannel(usize),
    #[error("trigger level {0} V is not a finite voltage")]
    InvalidTriggerLevel(f64),
    #[error("trigger level code {0} outside the comparator band")]
    TriggerCodeOutOfBand(u8),
    #[error("usb transfer failed: {0}")]
    Transport(#[from] rusb::Error),
    #[error("bulk read timed out")]
    Timeout,
    #[error("short bulk read: expected {expected} bytes, received {received}")]
    ShortRead { expected: usize, received: usize },
    #[error("short command write: {written} of {expected} bytes sent")]
    ShortWrite { expected: usize, written: usize },
    #[error("session is closed")]
    Disconnected,
}

impl Error {
    /// ### From Transport
    ///
    /// Sort a transport failure into a timeout or a plain transport error.
    ///
    pub fn from_transport(err: rusb::Error) -> Error {
        match err {
            rusb::Error::Timeout => Error::Timeout,
            other => Error::Transport(other),
        }
    }
}
