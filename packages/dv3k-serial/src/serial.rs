//! Discovering and opening AMBE-3000R boards attached through an FTDI USB serial bridge.

use std::path::Path;

use log::{debug, info, warn};
use serialport::{SerialPortInfo, SerialPortType, UsbPortInfo};
use tokio_serial::{
    ClearBuffer, DataBits, FlowControl, Parity, SerialPort, SerialStream, StopBits,
};

use crate::{Connection, ConnectionOptions, SerialError, StreamConnection};

/// The USB vendor ID of FTDI, whose bridges are fitted to the DV3000 and ThumbDV.
pub const FTDI_USB_VID: u16 = 0x0403;

const BY_ID_DIR: &str = "/dev/serial/by-id";
const BY_ID_PREFIX: &str = "usb-FTDI_ZUM_AMBE3000_";

/// A serial port that looks like it has an AMBE-3000R behind it.
#[derive(Clone, Debug)]
pub struct SerialDevice {
    port_name: String,
    usb_info: Option<UsbPortInfo>,
}

impl SerialDevice {
    /// A device at a known path, e.g. `/dev/ttyUSB0`.
    pub fn new(port_name: impl Into<String>) -> Self {
        Self {
            port_name: port_name.into(),
            usb_info: None,
        }
    }

    pub fn connect(&self, options: ConnectionOptions) -> Result<SerialConnection, SerialError> {
        SerialConnection::open(&self.port_name, options)
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    /// USB descriptor of the bridge, if the port was found by enumeration.
    pub fn usb_info(&self) -> Option<&UsbPortInfo> {
        self.usb_info.as_ref()
    }
}

fn is_ambe_port(info: &UsbPortInfo) -> bool {
    info.vid == FTDI_USB_VID
        && info
            .product
            .as_deref()
            .is_some_and(|product| product.to_ascii_uppercase().contains("AMBE"))
}

fn devices_by_usb_info(ports: Vec<SerialPortInfo>) -> Vec<SerialDevice> {
    let mut devices = Vec::new();

    for port in ports {
        let SerialPortType::UsbPort(info) = port.port_type else {
            continue;
        };

        if cfg!(target_os = "macos") && port.port_name.starts_with("/dev/tty.") {
            // https://pbxbook.com/other/mac-tty.html
            debug!(
                "Ignoring port named {:?} because it is a call-in device",
                port.port_name
            );
            continue;
        }

        if !is_ambe_port(&info) {
            continue;
        }

        debug!(
            "Found AMBE-3000R bridge {:?} at {}",
            info.product, port.port_name
        );
        devices.push(SerialDevice {
            port_name: port.port_name,
            usb_info: Some(info),
        });
    }

    devices
}

/// Looks for the udev symlinks created for ZUM AMBE3000 boards.
/// This is the fallback when enumeration does not report product strings.
fn devices_by_id_link(dir: &Path) -> Vec<SerialDevice> {
    debug!("Looking for AMBE-3000R ports in {}", dir.display());

    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };

    let mut devices: Vec<SerialDevice> = entries
        .filter_map(Result::ok)
        .filter(|entry| entry.file_name().to_string_lossy().starts_with(BY_ID_PREFIX))
        .map(|entry| SerialDevice::new(entry.path().to_string_lossy()))
        .collect();
    devices.sort_by(|a, b| a.port_name.cmp(&b.port_name));

    devices
}

/// Finds all connected AMBE-3000R boards.
pub fn find_devices() -> Result<Vec<SerialDevice>, SerialError> {
    let devices = devices_by_usb_info(tokio_serial::available_ports()?);
    if !devices.is_empty() || !cfg!(target_os = "linux") {
        return Ok(devices);
    }

    Ok(devices_by_id_link(Path::new(BY_ID_DIR)))
}

/// Finds the first connected AMBE-3000R board.
pub fn find_device() -> Result<SerialDevice, SerialError> {
    find_devices()?
        .into_iter()
        .next()
        .ok_or(SerialError::NoDevice)
}

/// An open serial connection to an AMBE-3000R.
pub type SerialConnection = StreamConnection<SerialStream>;

impl SerialConnection {
    /// Opens the serial port at `path` as 8N1 without flow control and discards anything
    /// left in its buffers.
    pub fn open(path: &str, options: ConnectionOptions) -> Result<Self, SerialError> {
        info!("Opening {} at {} baud", path, options.baud_rate);

        let stream = SerialStream::open(
            &tokio_serial::new(path, options.baud_rate)
                .data_bits(DataBits::Eight)
                .parity(Parity::None)
                .stop_bits(StopBits::One)
                .flow_control(FlowControl::None)
                .timeout(options.timeout),
        )?;

        if let Err(e) = stream.clear(ClearBuffer::All) {
            warn!("Failed to clear serial buffers of {}: {}", path, e);
        }

        let mut connection = Self::new(stream);
        connection.set_parity(options.parity);
        Ok(connection)
    }
}
