//! ## Transport
//!
//! The USB primitives the driver is built on, and their libusb implementation.
//!

use std::time::Duration;

use anyhow::Result;
use rusb::{Context, DeviceHandle};

use crate::constants::usb::*;
use crate::init;
use crate::types::DeviceAddr;

/// ### Transport
///
/// Vendor control requests and bulk transfers addressed by endpoint.
///
/// Implementations report failures with the libusb error codes so the
/// driver can tell timeouts and busy answers apart from real failures.
///
pub trait Transport {
    /// Vendor request from host to device. Returns the number of bytes sent.
    fn write_control(
        &mut self,
        request: u8,
        value: u16,
        data: &[u8],
        timeout: Duration,
    ) -> rusb::Result<usize>;

    /// Vendor request from device to host.
    fn read_control(
        &mut self,
        request: u8,
        value: u16,
        length: usize,
        timeout: Duration,
    ) -> rusb::Result<Vec<u8>>;

    /// Write to a bulk OUT endpoint. Returns the number of bytes sent.
    fn write_bulk(&mut self, endpoint: u8, data: &[u8], timeout: Duration) -> rusb::Result<usize>;

    /// Read up to `length` bytes from a bulk IN endpoint.
    fn read_bulk(&mut self, endpoint: u8, length: usize, timeout: Duration)
        -> rusb::Result<Vec<u8>>;

    /// Port reset of the device.
    fn reset(&mut self) -> rusb::Result<()>;
}

/// ### USB Transport
///
/// Transport over a libusb handle with the scope interface claimed.
///
#[derive(Debug)]
pub struct UsbTransport {
    handle: DeviceHandle<Context>,
    has_kernel_driver: bool,
}

impl UsbTransport {
    /// ### Open
    ///
    /// Open the first scope found, or the one at `address`, and claim its interface.
    ///
    pub fn open(address: Option<DeviceAddr>) -> Result<UsbTransport> {
        // setup context
        let mut context = Context::new()?;
        // attempt to open the device
        let mut handle = init::open_device(&mut context, address)?;

        // detach kernel driver if it is used
        let has_kernel_driver = init::detach_kernel_driver(&mut handle)?;

        // CONFIGURE DEVICE
        // ==========
        handle.set_active_configuration(1)?;
        handle.claim_interface(INTERFACE_NUMBER)?;
        handle.set_alternate_setting(INTERFACE_NUMBER, SETTING_NUMBER)?;

        Ok(UsbTransport {
            handle,
            has_kernel_driver,
        })
    }
}

impl Transport for UsbTransport {
    fn write_control(
        &mut self,
        request: u8,
        value: u16,
        data: &[u8],
        timeout: Duration,
    ) -> rusb::Result<usize> {
        self.handle
            .write_control(VENDOR_OUT, request, value, 0x0000, data, timeout)
    }

    fn read_control(
        &mut self,
        request: u8,
        value: u16,
        length: usize,
        timeout: Duration,
    ) -> rusb::Result<Vec<u8>> {
        let mut buffer = vec![0x00; length];
        let read = self
            .handle
            .read_control(VENDOR_IN, request, value, 0x0000, &mut buffer, timeout)?;
        buffer.truncate(read);
        Ok(buffer)
    }

    fn write_bulk(&mut self, endpoint: u8, data: &[u8], timeout: Duration) -> rusb::Result<usize> {
        self.handle.write_bulk(endpoint, data, timeout)
    }

    fn read_bulk(
        &mut self,
        endpoint: u8,
        length: usize,
        timeout: Duration,
    ) -> rusb::Result<Vec<u8>> {
        let mut buffer = vec![0x00; length];
        let read = self.handle.read_bulk(endpoint, &mut buffer, timeout)?;
        buffer.truncate(read);
        Ok(buffer)
    }

    fn reset(&mut self) -> rusb::Result<()> {
        self.handle.reset()
    }
}

impl Drop for UsbTransport {
    fn drop(&mut self) {
        // RESET THE CONFIGURATION
        // Release the interface
        if let Err(e) = self.handle.release_interface(INTERFACE_NUMBER) {
            log::debug!("failed to release usb interface: {}", e);
        }
        // Reattach the kernel driver if it was disconnected
        if self.has_kernel_driver {
            if let Err(e) = self.handle.attach_kernel_driver(INTERFACE_NUMBER) {
                log::debug!("failed to attach kernel driver: {}", e);
            }
        }
    }
}
