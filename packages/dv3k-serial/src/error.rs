use dv3k_packet::{control::ControlNack, DecodeError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SerialError {
    #[error("IO Error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Packet decoding error: {0}")]
    DecodeError(#[from] DecodeError),

    #[error("Packet timeout")]
    Timeout,

    #[error("NACK received: {0}")]
    Nack(#[from] ControlNack),

    #[cfg(feature = "serial")]
    #[error("Serialport Error")]
    SerialportError(#[from] tokio_serial::Error),

    #[error("No AMBE-3000R device found")]
    NoDevice,
}
