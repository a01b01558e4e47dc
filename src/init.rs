//! ## Initialization
//!
//! A set of functions to find the scope and bring it up.
//!

use anyhow::Result;
use rusb::{Device, DeviceDescriptor, DeviceHandle, UsbContext};

use crate::communication::{bulk, control};
use crate::constants::{bring_up, eeprom, misc, usb::*};
use crate::error::Error;
use crate::transport::Transport;
use crate::types::{DeviceAddr, FirmwareInfo};

fn is_scope(device_desc: &DeviceDescriptor) -> bool {
    device_desc.vendor_id() == VENDOR_ID && device_desc.product_id() == PRODUCT_ID
}

fn is_at<T: UsbContext>(device: &Device<T>, address: &DeviceAddr) -> bool {
    address.bus == device.bus_number() && address.device == device.address()
}

/// ### List Devices
///
/// List all connected scopes using a libusb context.
///
pub fn list_devices<T: UsbContext>(context: &mut T) -> Result<Vec<DeviceAddr>> {
    Ok(context
        .devices()?
        .iter()
        .filter_map(|device| {
            let device_desc = device.device_descriptor().ok()?;
            if is_scope(&device_desc) {
                Some(DeviceAddr {
                    bus: device.bus_number(),
                    device: device.address(),
                })
            } else {
                None
            }
        })
        .collect())
}

/// ### Open Device
///
/// Open the first scope, or the scope at `address`, using a libusb context.
///
pub fn open_device<T: UsbContext>(
    context: &mut T,
    address: Option<DeviceAddr>,
) -> Result<DeviceHandle<T>> {
    // list the devices
    let devices = context.devices()?;

    // find the one device we want and open it
    for device in devices.iter() {
        // get the descriptor
        if let Ok(device_desc) = device.device_descriptor() {
            // check the IDs
            let wanted = address.as_ref().map_or(true, |addr| is_at(&device, addr));
            if is_scope(&device_desc) && wanted {
                // try open the device
                match device.open() {
                    Ok(handle) => {
                        log::debug!(
                            "opened scope on bus {} device {}",
                            device.bus_number(),
                            device.address()
                        );
                        return Ok(handle);
                    }
                    Err(e) => log::debug!("scope found but could not be opened: {}", e),
                }
            }
        }
    }

    Err(Error::DeviceNotFound.into())
}

/// ### Detach Kernel Driver
///
/// If the interface uses a kernel driver, detach it for the duration of the program.
/// Returns whether a driver was detached.
///
pub fn detach_kernel_driver<T: UsbContext>(handle: &mut DeviceHandle<T>) -> Result<bool> {
    let detached = match handle.kernel_driver_active(INTERFACE_NUMBER) {
        Ok(true) => {
            handle.detach_kernel_driver(INTERFACE_NUMBER)?;
            true
        }
        _ => false,
    };

    Ok(detached)
}

/// ### Bring Up
///
/// Wake the scope up after it has been opened: probe the FPGA, read the
/// EEPROM and initialise the ADC and analog front end.
///
pub fn bring_up<T: Transport + ?Sized>(port: &mut T) -> Result<FirmwareInfo> {
    // PROBE
    // ==========
    // each command write carries its own soft reset
    bulk::write(port, &bring_up::PROBE)?;
    bulk::write(port, &bring_up::PROBE)?;

    let length = control::response_length(port)?;
    let probe = bulk::read(port, length, misc::DEFAULT_TIMEOUT_DURATION)?;
    log::debug!("bring-up probe answered {} bytes", probe.len());

    // VERSIONS
    // ==========
    let descriptor =
        control::read_eeprom(port, eeprom::DESCRIPTOR_ADDRESS, eeprom::DESCRIPTOR_LENGTH)?;
    control::soft_reset(port)?;
    let driver_version = control::read_eeprom(
        port,
        eeprom::DRIVER_VERSION_ADDRESS,
        eeprom::DRIVER_VERSION_LENGTH,
    )?;
    log::debug!("driver version block {:02x?}", driver_version);

    // ADC
    // ==========
    for packet in bring_up::ADC_INIT.iter() {
        bulk::write(port, packet)?;
    }
    bulk::write(port, &bring_up::CHANNEL_MODE_GAIN)?;

    Ok(FirmwareInfo {
        bring_up: probe,
        descriptor,
        driver_version,
    })
}
