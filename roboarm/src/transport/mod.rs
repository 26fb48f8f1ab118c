//! Physical transport layer for the arm connection.
//!
//! This module handles the raw byte link to the arm: discovery of the
//! USB-to-serial bridge by serial number, opening it with the fixed line
//! settings the firmware expects, and moving bytes without any protocol
//! knowledge. The [`Link`] trait lets the controller run against a real
//! serial port or a scripted [`MockLink`].

pub mod mock;
pub mod serial;

pub use mock::MockLink;
pub use serial::SerialLink;

use async_trait::async_trait;
use serde::Serialize;
use tokio_serial::SerialPortType;

use crate::error::{Error, Result};

/// A byte link to the device.
#[async_trait]
pub trait Link: Send {
    /// Write all bytes to the device.
    async fn write(&mut self, bytes: &[u8]) -> Result<()>;

    /// Read whatever the device has queued right now, without waiting for
    /// more. Returns an empty buffer when nothing is queued.
    async fn read_available(&mut self) -> Result<Vec<u8>>;

    /// Discard anything the device has queued.
    async fn purge(&mut self) -> Result<()> {
        self.read_available().await.map(drop)
    }
}

/// Descriptor of an attached USB serial device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UsbDeviceInfo {
    /// OS path of the serial port (e.g. /dev/ttyUSB0)
    pub port_name: String,
    pub vid: u16,
    pub pid: u16,
    pub serial_number: Option<String>,
    pub manufacturer: Option<String>,
    pub product: Option<String>,
}

/// List the USB serial devices currently attached.
pub fn available_devices() -> Result<Vec<UsbDeviceInfo>> {
    let ports = tokio_serial::available_ports()?;
    Ok(ports
        .into_iter()
        .filter_map(|port| match port.port_type {
            SerialPortType::UsbPort(usb) => Some(UsbDeviceInfo {
                port_name: port.port_name,
                vid: usb.vid,
                pid: usb.pid,
                serial_number: usb.serial_number,
                manufacturer: usb.manufacturer,
                product: usb.product,
            }),
            _ => None,
        })
        .collect())
}

/// Pick the device whose USB serial number is exactly `serial_number`.
pub fn select_device(devices: Vec<UsbDeviceInfo>, serial_number: &str) -> Result<UsbDeviceInfo> {
    devices
        .into_iter()
        .find(|device| device.serial_number.as_deref() == Some(serial_number))
        .ok_or_else(|| Error::DeviceNotFound {
            serial_number: serial_number.to_string(),
        })
}

/// Find the attached device with the given USB serial number.
pub fn find_device(serial_number: &str) -> Result<UsbDeviceInfo> {
    select_device(available_devices()?, serial_number)
}
