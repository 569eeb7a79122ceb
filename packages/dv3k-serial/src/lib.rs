//! Crate for driving DVSI AMBE-3000R vocoders (DV3000, ThumbDV) over a USB serial bridge.
//! Not affiliated with Digital Voice Systems, Inc.
//!
//! Packets are encoded and decoded by the [`dv3k_packet`] crate, re-exported here as [`protocol`].
//! This crate provides the [`Connection`] trait for exchanging those packets with a device, and
//! high level [`Command`](commands::Command)s for configuring the vocoder and pushing frames
//! through it.

pub use dv3k_packet as protocol;

use std::{
    future::Future,
    time::{Duration, Instant},
};

use log::{error, trace, warn};

use dv3k_packet::{control::ControlNack, Decode, DecodeError, Encode, Reply};

pub mod commands;
mod error;
mod options;
mod stream;

#[cfg(feature = "serial")]
pub mod serial;

use crate::commands::Command;

pub use error::SerialError;
pub use options::{ConnectionOptions, DV3000_SERIAL_BAUDRATE};
pub use stream::StreamConnection;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RawPacket {
    pub bytes: Vec<u8>,
    pub used: bool,
    pub timestamp: Instant,
}
impl RawPacket {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            used: false,
            timestamp: Instant::now(),
        }
    }

    pub fn is_obsolete(&self, timeout: Duration) -> bool {
        self.timestamp.elapsed() > timeout || self.used
    }

    pub fn check_header<R: Reply>(&self) -> bool {
        R::has_valid_header(&self.bytes)
    }

    /// Decodes the packet into the given type.
    /// If successful, marks the packet as used.
    /// # Note
    /// This function will **NOT** fail if the packet has already been used.
    pub fn decode_and_use<D: Decode>(&mut self) -> Result<D, DecodeError> {
        let decoded = D::decode(&mut self.bytes.as_slice())?;
        self.used = true;
        Ok(decoded)
    }
}
/// Removes old and used packets from the incoming packets buffer.
pub(crate) fn trim_packets(packets: &mut Vec<RawPacket>) {
    trace!("Trimming packets. Length before: {}", packets.len());

    // Remove packets that are obsolete
    packets.retain(|packet| !packet.is_obsolete(Duration::from_secs(2)));

    trace!("Trimmed packets. Length after: {}", packets.len());
}

/// Represents an open connection to an AMBE-3000R.
#[allow(async_fn_in_trait)]
pub trait Connection {
    type Error: std::error::Error + From<DecodeError> + From<ControlNack>;

    /// Sends a packet.
    fn send(&mut self, packet: impl Encode) -> impl Future<Output = Result<(), Self::Error>>;

    /// Receives a packet.
    fn recv<P: Reply>(&mut self, timeout: Duration)
        -> impl Future<Output = Result<P, Self::Error>>;

    /// Whether outgoing packets carry a parity field.
    fn parity(&self) -> bool;

    /// Enables or disables the parity field on outgoing packets.
    ///
    /// This only changes what the host sends. Use
    /// [`SetParityMode`](commands::control::SetParityMode) to change it on both ends.
    fn set_parity(&mut self, enabled: bool);

    /// Executes a [`Command`].
    fn execute_command<C: Command>(
        &mut self,
        command: C,
    ) -> impl Future<Output = Result<C::Output, Self::Error>> {
        command.execute(self)
    }

    /// Sends a packet and waits for a response.
    ///
    /// This function will retry the handshake `retries` times
    /// before giving up and erroring with the error thrown on the last retry.
    async fn handshake<D: Reply>(
        &mut self,
        timeout: Duration,
        retries: usize,
        packet: impl Encode + Clone,
    ) -> Result<D, Self::Error> {
        let mut attempt = 0;

        loop {
            self.send(packet.clone()).await?;
            match self.recv::<D>(timeout).await {
                Ok(decoded) => return Ok(decoded),
                Err(e) if attempt < retries => {
                    warn!(
                        "Handshake failed while waiting for {}: {:?}. Retrying...",
                        std::any::type_name::<D>(),
                        e
                    );
                    attempt += 1;
                }
                Err(e) => {
                    error!(
                        "Handshake failed after {} retries with error: {:?}",
                        retries, e
                    );
                    return Err(e);
                }
            }
        }
    }
}
