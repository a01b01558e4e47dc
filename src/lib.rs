//! # Hantek 6254BC
//!
//! Pure Rust driver for the Hantek 6254BC four channel USB oscilloscope.
//!
//! The scope speaks a vendor protocol made of control requests and command
//! packets on a bulk endpoint. This library configures the sample clock, the
//! channel gains and the trigger, runs captures, locates the trigger inside
//! the circular acquisition buffer and returns calibrated voltages.
//!
//! ## Usage
//!
//! To use, add the following line to your project's Cargo.toml dependencies:
//! ```toml
//! hantek6254 = "0.1"
//! ```
//!
//! ## Example
//!
//! The example below connects to the scope, changes the settings and reads a frame.
//!
//! ```no_run
//! use hantek6254::HantekScope;
//!
//! fn main() -> anyhow::Result<()> {
//!     // connect to the scope, it comes up with the default configuration
//!     let mut scope = HantekScope::connect()?;
//!
//!     // change the settings, nothing is sent yet
//!     scope.set_buffer_length(16384)?;
//!     scope.set_sample_rate(2_500_000)?;
//!     scope.set_volts_per_div([1.0, 1.0, 0.005, 0.002])?;
//!     scope.set_trigger_source(0)?;
//!     scope.set_trigger_level(0.0)?;
//!
//!     // push the settings to the scope
//!     scope.configure()?;
//!
//!     // capture
//!     let frame = scope.get_data()?;
//!     println!("{} samples on channel 1", frame.channels[0].len());
//!
//!     scope.close()
//! }
//! ```
//!

mod configure;
mod constants;
mod error;
mod init;
mod communication {
    pub mod bulk;
    pub mod control;
}

pub mod acquisition;
pub mod decode;
pub mod encoding;
pub mod resolver;
pub mod stream;
pub mod transport;
pub mod types;

use std::sync::Arc;
use std::time::Duration;

pub use error::Error;
pub use transport::{Transport, UsbTransport};
pub use types::{
    BufferLength, CalibratedFrame, DeviceAddr, DeviceConfig, FirmwareInfo, RawCapture, RawFrame,
    SessionState, SweepMode, TriggerFrame, TriggerSlope, VoltsPerDiv,
};

use constants::misc::{CHANNELS, DEFAULT_TIMEOUT_DURATION};
use encoding::{clock, gain, trigger};

use anyhow::Result;

/// ### HantekScope
///
/// Session with one scope. Settings are staged with the setters and only
/// reach the device on `configure`; captures use the configuration last pushed.
///
#[derive(Debug)]
pub struct HantekScope<T: Transport = UsbTransport> {
    /// `None` once the session is closed
    port: Option<T>,
    state: SessionState,
    /// Staged settings
    config: DeviceConfig,
    time: Arc<[f64]>,
    /// Settings the scope is running with
    committed: DeviceConfig,
    committed_time: Arc<[f64]>,
    timeout: Duration,
    firmware: FirmwareInfo,
}

impl HantekScope<UsbTransport> {
    /// ### Devices
    ///
    /// Get the addresses of the connected scopes.
    ///
    pub fn devices() -> Result<Vec<DeviceAddr>> {
        // setup context
        let mut context = rusb::Context::new()?;

        init::list_devices(&mut context)
    }

    /// ### Connect
    ///
    /// Connect the first scope found, bring it up and push the default configuration.
    ///
    pub fn connect() -> Result<HantekScope<UsbTransport>> {
        Self::connect_at(None)
    }

    /// ### Connect At
    ///
    /// Same as `connect`, selecting the scope by its bus address.
    ///
    pub fn connect_at(address: Option<DeviceAddr>) -> Result<HantekScope<UsbTransport>> {
        let port = UsbTransport::open(address)?;
        log::info!("Hantek 6254BC connected");

        Self::with_transport(port)
    }
}

impl<T: Transport> HantekScope<T> {
    /// ### With Transport
    ///
    /// Bring up a scope reachable through `port` and push the default configuration.
    ///
    pub fn with_transport(port: T) -> Result<HantekScope<T>> {
        let config = DeviceConfig::default();
        let time = types::time_axis(config.buffer_length, config.sample_rate);

        let mut scope = HantekScope {
            port: Some(port),
            state: SessionState::Initializing,
            committed: config.clone(),
            committed_time: time.clone(),
            config,
            time,
            timeout: DEFAULT_TIMEOUT_DURATION,
            firmware: FirmwareInfo::default(),
        };

        // INITIALIZE
        // ==========
        let port = scope.port.as_mut().ok_or(Error::Disconnected)?;
        scope.firmware = init::bring_up(port)?;

        // CONFIGURE
        // ==========
        scope.configure()?;

        Ok(scope)
    }

    /// Staged configuration.
    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Blocks read from the scope EEPROM during bring-up.
    pub fn firmware_info(&self) -> &FirmwareInfo {
        &self.firmware
    }

    /// ### Set Timeout
    ///
    /// Set a new timeout for bulk reads.
    ///
    /// #### Arguments
    /// - `duration` -> the duration of the timeout
    ///
    pub fn set_timeout(&mut self, duration: Duration) {
        self.timeout = duration;
    }

    /// Sample rates in Hz the scope accepts.
    pub fn available_rates() -> Vec<u32> {
        clock::supported_rates()
    }

    pub fn available_buffer_lengths() -> Vec<usize> {
        BufferLength::ALL.iter().map(|len| len.samples()).collect()
    }

    pub fn available_volts_per_div() -> Vec<f64> {
        VoltsPerDiv::ALL.iter().map(|scale| scale.volts()).collect()
    }

    /// Staged sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate
    }

    /// Time of each sample of the staged timebase, in seconds.
    pub fn time_axis(&self) -> Arc<[f64]> {
        self.time.clone()
    }

    fn update_time_axis(&mut self) {
        self.time = types::time_axis(self.config.buffer_length, self.config.sample_rate);
    }

    /// ### Set Buffer Length
    ///
    /// Stage the number of samples per channel: 4096, 8192 or 16384.
    /// Any other value is rejected and the current length is kept.
    ///
    pub fn set_buffer_length(&mut self, samples: usize) -> Result<()> {
        match BufferLength::from_samples(samples) {
            Some(len) => {
                self.config.buffer_length = len;
                self.update_time_axis();
                log::info!("buffer length of each channel is set to {}", samples);
                Ok(())
            }
            None => {
                let available = Self::available_buffer_lengths();
                let current = self.config.buffer_length.samples();
                log::warn!(
                    "buffer length {} rejected, available {:?}, current {}",
                    samples,
                    available,
                    current
                );
                Err(Error::UnsupportedBufferLength {
                    requested: samples,
                    available,
                    current,
                }
                .into())
            }
        }
    }

    /// ### Set Sample Rate
    ///
    /// Stage a sample rate in Hz. Unsupported rates are rejected and the
    /// current rate is kept.
    ///
    pub fn set_sample_rate(&mut self, rate: u32) -> Result<()> {
        if !clock::is_supported(rate) {
            let available = Self::available_rates();
            log::warn!(
                "sample rate {} rejected, available {:?}, current {}",
                rate,
                available,
                self.config.sample_rate
            );
            return Err(Error::UnsupportedRate {
                requested: rate,
                available,
                current: self.config.sample_rate,
            }
            .into());
        }

        self.config.sample_rate = rate;
        self.update_time_axis();
        log::info!("sample rate is set to {} Hz", rate);

        Ok(())
    }

    /// ### Set Volts per Division
    ///
    /// Stage the vertical scale of the four channels. Each channel is checked
    /// on its own: valid values are applied, channels with an unknown value
    /// keep their scale and are reported in the error.
    ///
    pub fn set_volts_per_div(&mut self, volts: [f64; CHANNELS]) -> Result<()> {
        let update = gain::merge_scales(&self.config.volts_per_div, &volts);
        self.config.volts_per_div = update.scales;

        for (channel, scale) in self.config.volts_per_div.iter().enumerate() {
            log::info!("channel {}: {} V/div", channel + 1, scale.volts());
        }

        if update.rejected.is_empty() {
            return Ok(());
        }

        let available = Self::available_volts_per_div();
        log::warn!(
            "volts/div rejected for channels {:?}, available {:?}",
            update.rejected,
            available
        );
        Err(Error::UnsupportedRange {
            channels: update.rejected,
            available,
        }
        .into())
    }

    /// Stage the channel the trigger watches.
    pub fn set_trigger_source(&mut self, channel: usize) -> Result<()> {
        if channel >= CHANNELS {
            return Err(Error::InvalidChannel(channel).into());
        }

        self.config.trigger_source = channel;
        log::info!("trigger source is channel {}", channel + 1);

        Ok(())
    }

    /// ### Set Trigger Level
    ///
    /// Stage the trigger level in volts, on the scale of the trigger source.
    /// The level is clamped to what the comparator accepts; the level actually
    /// staged is returned. NaN and infinite levels are rejected and the current
    /// level is kept.
    ///
    pub fn set_trigger_level(&mut self, volts: f64) -> Result<f64> {
        let scale = self.config.volts_per_div[self.config.trigger_source];
        self.config.trigger_level = trigger::level_code(volts, scale)?;

        let level = trigger::level_volts(self.config.trigger_level, scale);
        log::info!("trigger level is set to {:.2e} V", level);

        Ok(level)
    }

    pub fn set_trigger_slope(&mut self, slope: TriggerSlope) {
        self.config.trigger_slope = slope;
        log::info!("trigger slope is set to {:?}", slope);
    }

    pub fn set_sweep_mode(&mut self, mode: SweepMode) {
        self.config.sweep_mode = mode;
        log::info!("trigger sweep mode is set to {}", mode);
    }

    /// ### Configure
    ///
    /// Push the staged configuration to the scope. Can be called any number of times.
    ///
    pub fn configure(&mut self) -> Result<()> {
        let port = self.port.as_mut().ok_or(Error::Disconnected)?;

        configure::configure(port, &self.config)?;

        self.committed = self.config.clone();
        self.committed_time = self.time.clone();
        self.state = SessionState::Configured;

        Ok(())
    }

    fn acquire(&mut self) -> Result<acquisition::Acquisition> {
        let port = self.port.as_mut().ok_or(Error::Disconnected)?;

        self.state = SessionState::Acquiring;
        let result = acquisition::acquire(port, &self.committed, self.timeout);
        self.state = SessionState::Configured;

        result
    }

    /// ### Get Data
    ///
    /// Capture a frame and return the voltages of the four channels.
    ///
    pub fn get_data(&mut self) -> Result<CalibratedFrame> {
        let capture = self.acquire()?;

        Ok(decode::decode(
            &capture.frame,
            &self.committed.volts_per_div,
            self.committed_time.clone(),
        ))
    }

    /// ### Get Raw Data
    ///
    /// Capture a frame and return the ADC bytes of the four channels together
    /// with the status and trigger packets.
    ///
    pub fn get_raw_data(&mut self) -> Result<RawCapture> {
        let capture = self.acquire()?;

        Ok(RawCapture {
            channels: decode::split(&capture.frame),
            status: capture.status,
            trigger: capture.trigger,
            offset: capture.offset,
        })
    }

    /// ### Close
    ///
    /// Reset the scope and release it. Closing twice is a no-op.
    ///
    pub fn close(&mut self) -> Result<()> {
        let Some(mut port) = self.port.take() else {
            return Ok(());
        };
        self.state = SessionState::Disconnected;

        let reset = port.reset();
        // releases the interface
        drop(port);
        log::info!("connection is closed");

        match reset {
            // the scope drops off the bus while resetting
            Ok(()) | Err(rusb::Error::NotFound) | Err(rusb::Error::NoDevice) => Ok(()),
            Err(e) => Err(Error::Transport(e).into()),
        }
    }
}

impl<T: Transport> Drop for HantekScope<T> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            log::warn!("failed to reset scope: {}", e);
        }
    }
}
