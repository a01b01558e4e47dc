//! ## Constants
//!
//! Various constants used throughout the project.
//!

#[allow(unused)]
pub mod usb {
    /// The vendor id of the 6254BC
    pub const VENDOR_ID: u16 = 0x04B5;
    /// The product id of the 6254BC
    pub const PRODUCT_ID: u16 = 0x6CDE;
    /// The only interface exposed by the scope
    pub const INTERFACE_NUMBER: u8 = 0;
    /// Alternate setting used for the interface
    pub const SETTING_NUMBER: u8 = 0;
    /// Command endpoint
    pub const BULK_OUT_EP: u8 = 0x02;
    /// Data endpoint
    pub const BULK_IN_EP: u8 = 0x86;
    /// bmRequestType for vendor requests from host to device
    pub const VENDOR_OUT: u8 = 0x40;
    /// bmRequestType for vendor requests from device to host
    pub const VENDOR_IN: u8 = 0xC0;
}

#[allow(unused)]
pub mod misc {
    use std::time::Duration;

    /// The default timeout of bulk reads
    pub const DEFAULT_TIMEOUT_DURATION: Duration = Duration::from_secs(1);
    /// The timeout used for control transfers and bulk writes
    pub const CONTROL_TIMEOUT_DURATION: Duration = Duration::from_secs(1);
    /// The device always answers in packets of this size
    pub const PACKET_SIZE: usize = 512;
    /// The bring-up answer is this short when the status probe reports a full speed link
    pub const SHORT_PACKET_SIZE: usize = 64;
    /// Pause after each command write
    pub const COMMAND_SETTLE: Duration = Duration::from_millis(1);
    /// Fixed part of the acquisition wait
    pub const ACQUISITION_SETTLE: Duration = Duration::from_millis(5);
    /// Factor applied to the capture duration before polling again
    pub const ACQUISITION_WAIT_FACTOR: f64 = 1.5;
    /// Empirical skew between the resolved trigger offset and the read pointer
    pub const TRIGGER_SKEW: u16 = 29;
    /// Number of channels of the scope
    pub const CHANNELS: usize = 4;
    /// Full scale of the ADC, in divisions
    pub const DIVISIONS: f64 = 10.0;
    /// ADC counts across the full scale
    pub const ADC_SPAN: f64 = 255.0;
    /// ADC count of 0 V for channels 1, 2 and 4
    pub const ZERO_OFFSET: u8 = 128;
    /// ADC count of 0 V for channel 3
    pub const ZERO_OFFSET_CH3: u8 = 129;
    /// Lowest trigger level code the comparator accepts
    pub const TRIGGER_LEVEL_MIN: u8 = 28;
    /// Highest trigger level code the comparator accepts
    pub const TRIGGER_LEVEL_MAX: u8 = 228;
    /// Trigger level code at power up
    pub const TRIGGER_LEVEL_DEFAULT: u8 = 127;
    /// Hysteresis around the trigger level, in ADC counts
    pub const TRIGGER_HYSTERESIS: u8 = 5;
    /// Sample rate at power up, in Hz
    pub const DEFAULT_SAMPLE_RATE: u32 = 250_000_000;
}

#[allow(unused)]
pub mod control_requests {
    /// Soft reset of the command pipe (OUT)
    pub const SOFT_RESET: u8 = 179;
    /// Link status probe (IN)
    pub const STATUS_PROBE: u8 = 178;
    /// EEPROM read (IN)
    pub const EEPROM_READ: u8 = 162;

    /// Payload of the soft reset request
    pub const SOFT_RESET_PAYLOAD: [u8; 10] =
        [0x0F, 0x03, 0x03, 0x03, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00];
    /// Length of the status probe answer
    pub const STATUS_PROBE_LENGTH: usize = 10;
}

#[allow(unused)]
pub mod eeprom {
    /// Address of the device descriptor block
    pub const DESCRIPTOR_ADDRESS: u16 = 0x1580;
    /// Length of the device descriptor block
    pub const DESCRIPTOR_LENGTH: usize = 71;
    /// Address of the driver version block
    pub const DRIVER_VERSION_ADDRESS: u16 = 0x15E0;
    /// Length of the driver version block
    pub const DRIVER_VERSION_LENGTH: usize = 8;
}

#[allow(unused)]
pub mod opcodes {
    pub const CHANNEL_POSITION_CH1: u8 = 0x00;
    pub const CHANNEL_POSITION_CH2: u8 = 0x01;
    pub const CHANNEL_POSITION_CH3: u8 = 0x02;
    pub const START_COLLECT: u8 = 0x03;
    pub const CHANNEL_POSITION_CH4: u8 = 0x04;
    pub const BUFFER_READ_REQUEST: u8 = 0x05;
    pub const STATUS_POLL: u8 = 0x06;
    pub const TRIGGER_LEVEL: u8 = 0x07;
    pub const REGISTER_WRITE: u8 = 0x08;
    pub const BRING_UP: u8 = 0x0C;
    pub const TRIGGER_READ: u8 = 0x0D;
    pub const POSITION_COMMIT: u8 = 0x0E;
    pub const CLOCK_PRESCALE: u8 = 0x0F;
    pub const CLOCK_DIVIDER: u8 = 0x10;
    pub const TRIGGER_SLOPE: u8 = 0x11;
    pub const RAM_TRIGGER_CONTROL: u8 = 0x12;
}

#[allow(unused)]
pub mod bring_up {
    /// Probe sent twice right after the soft reset
    pub const PROBE: [u8; 2] = [super::opcodes::BRING_UP, 0x00];

    /// ADC and analog front-end initialisation, in order
    pub const ADC_INIT: [[u8; 8]; 5] = [
        [0x08, 0x00, 0x00, 0x77, 0x47, 0x12, 0x04, 0x00],
        [0x08, 0x00, 0x00, 0x03, 0x00, 0x33, 0x04, 0x00],
        [0x08, 0x00, 0x00, 0x65, 0x00, 0x30, 0x02, 0x00],
        [0x08, 0x00, 0x00, 0x28, 0xF1, 0x0F, 0x02, 0x00],
        [0x08, 0x00, 0x00, 0x12, 0x38, 0x01, 0x02, 0x00],
    ];

    /// Puts the ADC in four channel mode
    pub const CHANNEL_MODE_GAIN: [u8; 8] = [0x08, 0x00, 0x00, 0x3F, 0x00, 0x55, 0x04, 0x00];

    /// ADC register writes issued ahead of a clock program
    pub const CLOCK_PREAMBLE: [[u8; 8]; 5] = [
        [0x08, 0x00, 0x00, 0x10, 0x08, 0x3A, 0x04, 0x00],
        [0x08, 0x00, 0x00, 0x04, 0x02, 0x3B, 0x04, 0x00],
        [0x08, 0x00, 0x00, 0x00, 0x00, 0x0F, 0x04, 0x00],
        [0x08, 0x00, 0x00, 0x04, 0x02, 0x31, 0x04, 0x00],
        [0x08, 0x00, 0x00, 0x00, 0x00, 0x2A, 0x04, 0x00],
    ];

    /// Relay settle write following the channel range write
    pub const RANGE_LATCH: [u8; 8] = [0x08, 0x00, 0x06, 0x06, 0x06, 0x06, 0x01, 0x01];

    /// ADC re-init after a range change
    pub const GAIN_REINIT: [[u8; 8]; 4] = [
        [0x08, 0x00, 0x00, 0x10, 0x08, 0x3A, 0x04, 0x00],
        [0x08, 0x00, 0x00, 0x04, 0x02, 0x3B, 0x04, 0x00],
        [0x08, 0x00, 0x00, 0x00, 0x00, 0x0F, 0x04, 0x00],
        [0x08, 0x00, 0x00, 0x04, 0x02, 0x31, 0x04, 0x00],
    ];
}

#[allow(unused)]
pub mod calibration {
    use super::opcodes::*;

    /// Zero position of each channel, as measured on the reference unit
    pub const CHANNEL_POSITIONS: [[u8; 4]; 4] = [
        [CHANNEL_POSITION_CH1, 0x00, 0xC2, 0x71],
        [CHANNEL_POSITION_CH2, 0x00, 0x2C, 0x71],
        [CHANNEL_POSITION_CH3, 0x00, 0xAD, 0x72],
        [CHANNEL_POSITION_CH4, 0x00, 0x39, 0x72],
    ];
}
