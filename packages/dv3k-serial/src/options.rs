use std::time::Duration;

/// Baud rate of the DV3000 and ThumbDV UART.
pub const DV3000_SERIAL_BAUDRATE: u32 = 460800;

/// Settings used when opening a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct ConnectionOptions {
    pub baud_rate: u32,
    /// Read timeout of the underlying serial port.
    pub timeout: Duration,
    /// Append a parity field to every packet sent to the chip.
    pub parity: bool,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            baud_rate: DV3000_SERIAL_BAUDRATE,
            timeout: Duration::from_secs(5),
            parity: false,
        }
    }
}
