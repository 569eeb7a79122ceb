//! A [`Connection`] over any byte stream.

use std::{io, time::Duration};

use dv3k_packet::{append_parity, Decode, Encode, PacketHeader, Reply, HEADER_SIZE, START_BYTE};
use log::{error, info, trace, warn};
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    select,
    time::sleep,
};

use crate::{trim_packets, Connection, RawPacket, SerialError};

/// An open session with an AMBE-3000R over a byte stream.
///
/// The session is opened by constructing it and closed exactly once by [`close`](Self::close),
/// which consumes it.
#[derive(Debug)]
pub struct StreamConnection<S> {
    stream: S,
    parity: bool,
    incoming_bytes: Vec<u8>,
    incoming_packets: Vec<RawPacket>,
}

impl<S: AsyncRead + AsyncWrite + Unpin> StreamConnection<S> {
    /// Wraps an already open stream.
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            parity: false,
            incoming_bytes: Vec::new(),
            incoming_packets: Default::default(),
        }
    }

    pub fn get_ref(&self) -> &S {
        &self.stream
    }

    /// Flushes any pending output and closes the underlying stream.
    pub async fn close(mut self) -> Result<(), SerialError> {
        info!("Closing connection.");

        self.stream.flush().await?;
        self.stream.shutdown().await?;

        if !self.incoming_bytes.is_empty() {
            warn!(
                "Closed connection with {} bytes of an incomplete packet.",
                self.incoming_bytes.len()
            );
        }

        if !self.incoming_packets.iter().all(|packet| packet.used) {
            warn!(
                "Closed connection with {} unread packets.",
                self.incoming_packets.iter().filter(|p| !p.used).count()
            );
        }

        Ok(())
    }

    /// Receives a single packet from the stream and adds it to the queue of incoming packets.
    ///
    /// Bytes are buffered on the connection until a whole packet has arrived, so a read
    /// interrupted by a timeout picks up where it left off on the next call.
    async fn receive_one_packet(&mut self) -> Result<(), SerialError> {
        loop {
            if let Some(packet) = take_packet(&mut self.incoming_bytes) {
                trace!("received packet: {:x?}", packet);
                self.incoming_packets.push(RawPacket::new(packet));
                return Ok(());
            }

            if self.stream.read_buf(&mut self.incoming_bytes).await? == 0 {
                return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into());
            }
        }
    }
}

/// Removes the first complete packet from `buffer`, discarding any garbage in front of it.
///
/// Returns `None` if the buffer does not hold a whole packet yet.
fn take_packet(buffer: &mut Vec<u8>) -> Option<Vec<u8>> {
    loop {
        let Some(start) = buffer.iter().position(|&byte| byte == START_BYTE) else {
            if !buffer.is_empty() {
                warn!("Skipping {} unexpected bytes outside of a packet.", buffer.len());
                buffer.clear();
            }
            return None;
        };

        if start > 0 {
            warn!("Skipping {} unexpected bytes outside of a packet.", start);
            buffer.drain(..start);
        }

        if buffer.len() < HEADER_SIZE {
            return None;
        }

        let header = match PacketHeader::decode(&mut &buffer[..HEADER_SIZE]) {
            Ok(header) => header,
            Err(e) => {
                // Not a real packet, look for the next start byte
                warn!(
                    "Skipping packet with invalid header {:x?}: {}",
                    &buffer[..HEADER_SIZE],
                    e
                );
                buffer.drain(..1);
                continue;
            }
        };

        if buffer.len() < header.packet_size() {
            return None;
        }

        return Some(buffer.drain(..header.packet_size()).collect());
    }
}

impl<S: AsyncRead + AsyncWrite + Unpin> Connection for StreamConnection<S> {
    type Error = SerialError;

    async fn send(&mut self, packet: impl Encode) -> Result<(), SerialError> {
        let mut encoded = packet.to_vec();
        if self.parity {
            append_parity(&mut encoded);
        }

        trace!("sent packet: {:x?}", encoded);

        self.stream.write_all(&encoded).await?;
        self.stream.flush().await?;

        Ok(())
    }

    async fn recv<P: Reply>(&mut self, timeout: Duration) -> Result<P, SerialError> {
        // Return an error if the right packet is not received within the timeout
        select! {
            result = async {
                loop {
                    if let Some(packet) = self
                        .incoming_packets
                        .iter_mut()
                        .find(|packet| !packet.used && packet.check_header::<P>())
                    {
                        let decoded = packet.decode_and_use::<P>();
                        if let Err(e) = &decoded {
                            error!("Failed to decode packet with valid header: {}", e);
                            packet.used = true;
                        }

                        trim_packets(&mut self.incoming_packets);
                        return decoded.map_err(SerialError::DecodeError);
                    }

                    trim_packets(&mut self.incoming_packets);
                    self.receive_one_packet().await?;
                }
            } => result,
            _ = sleep(timeout) => Err(SerialError::Timeout)
        }
    }

    fn parity(&self) -> bool {
        self.parity
    }

    fn set_parity(&mut self, enabled: bool) {
        self.parity = enabled;
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use dv3k_packet::{
        append_parity,
        control::{
            fields::RATET, Companding, ControlNack, PacketFormat, RateP, ReadyReplyPacket,
            SampleCountReporting, SoftConfig,
        },
        speech::{SpeechReplyPacket, Tone},
        DcmodeIn, EcmodeIn, EcmodeOut, SAMPLES_PER_FRAME,
    };
    use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt, DuplexStream};

    use super::*;
    use crate::commands::{
        control::{
            GetProductId, ReadConfig, Reset, ResetSoftConfig, SetChannelFormat, SetCompanding,
            SetDecoderMode, SetEncoderMode, SetGain, SetLowPower, SetParityMode, SetRateP,
            SetRateT, SetSpeechFormat,
        },
        vocoder::{DecodeChannel, EncodeSpeech, EncodeTone},
        Configure, Rate,
    };

    const FRAME: [u8; 9] = [0xAC, 0xAA, 0x40, 0x20, 0x00, 0x44, 0x40, 0x80, 0x80];

    fn connect() -> (StreamConnection<DuplexStream>, DuplexStream) {
        let (host, device) = duplex(4096);
        (StreamConnection::new(host), device)
    }

    /// Reads one request from the host side and checks it byte for byte.
    async fn expect_request(device: &mut DuplexStream, expected: &[u8]) {
        let mut buf = vec![0; expected.len()];
        device.read_exact(&mut buf).await.unwrap();
        assert_eq!(buf, expected);
    }

    /// Checks a control request and answers it with a success status.
    async fn ack_request(device: &mut DuplexStream, expected: &[u8]) {
        expect_request(device, expected).await;
        device
            .write_all(&[0x61, 0x00, 0x02, 0x00, expected[4], 0x00])
            .await
            .unwrap();
    }

    #[test]
    fn framing_skips_garbage_and_waits_for_whole_packets() {
        let mut buffer = vec![0x00, 0x61, 0x00, 0x01, 0x07, 0x61, 0x00, 0x02, 0x00, 0x0B];
        assert_eq!(take_packet(&mut buffer), None);
        assert_eq!(buffer, [0x61, 0x00, 0x02, 0x00, 0x0B]);

        buffer.push(0x00);
        assert_eq!(
            take_packet(&mut buffer),
            Some(vec![0x61, 0x00, 0x02, 0x00, 0x0B, 0x00])
        );
        assert!(buffer.is_empty());
    }

    #[tokio::test]
    async fn reset_skips_noise() {
        let (mut connection, mut device) = connect();

        let device_task = tokio::spawn(async move {
            expect_request(&mut device, &[0x61, 0x00, 0x01, 0x00, 0x33]).await;
            device
                .write_all(&[0x00, 0xFF, 0x61, 0x00, 0x01, 0x00, 0x39])
                .await
                .unwrap();
            device
        });

        connection.execute_command(Reset).await.unwrap();
        device_task.await.unwrap();
    }

    #[tokio::test]
    async fn product_id_with_parity() {
        let (mut connection, mut device) = connect();
        connection.set_parity(true);

        let device_task = tokio::spawn(async move {
            expect_request(&mut device, &[0x61, 0x00, 0x03, 0x00, 0x30, 0x2F, 0x1C]).await;

            let mut reply = vec![0x61, 0x00, 0x0B, 0x00, 0x30];
            reply.extend_from_slice(b"AMBE3000R\0");
            append_parity(&mut reply);
            device.write_all(&reply).await.unwrap();
            device
        });

        let product = connection.execute_command(GetProductId).await.unwrap();
        assert_eq!(product, "AMBE3000R");
        device_task.await.unwrap();
    }

    #[tokio::test]
    async fn parity_mode_follows_command() {
        let (mut connection, mut device) = connect();

        let device_task = tokio::spawn(async move {
            expect_request(&mut device, &[0x61, 0x00, 0x02, 0x00, 0x3F, 0x01]).await;
            device
                .write_all(&[0x61, 0x00, 0x02, 0x00, 0x3F, 0x00])
                .await
                .unwrap();
            device
        });

        connection
            .execute_command(SetParityMode { enabled: true })
            .await
            .unwrap();
        assert!(connection.parity());
        device_task.await.unwrap();
    }

    #[tokio::test]
    async fn nack() {
        let (mut connection, mut device) = connect();

        let device_task = tokio::spawn(async move {
            expect_request(&mut device, &[0x61, 0x00, 0x02, 0x00, 0x09, 0x3F]).await;
            device
                .write_all(&[0x61, 0x00, 0x02, 0x00, 0x09, 0x01])
                .await
                .unwrap();
            device
        });

        let err = connection
            .execute_command(SetRateT { index: 0x3F })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SerialError::Nack(ControlNack {
                field: RATET,
                code: 0x01
            })
        ));
        device_task.await.unwrap();
    }

    #[tokio::test]
    async fn timeout() {
        let (mut connection, _device) = connect();

        let err = connection
            .recv::<ReadyReplyPacket>(Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(matches!(err, SerialError::Timeout));
    }

    #[tokio::test]
    async fn unrelated_packets_are_kept_for_later() {
        let (mut connection, mut device) = connect();

        device
            .write_all(&[
                0x61, 0x00, 0x02, 0x00, 0x0B, 0x00, // INIT reply
                0x61, 0x00, 0x01, 0x00, 0x39, // READY
            ])
            .await
            .unwrap();

        connection
            .recv::<ReadyReplyPacket>(Duration::from_millis(500))
            .await
            .unwrap();
        let init = connection
            .recv::<dv3k_packet::control::InitReplyPacket>(Duration::from_millis(500))
            .await
            .unwrap();
        assert_eq!(init.ack(), Ok(()));
    }

    #[tokio::test]
    async fn encode_and_decode_frames() {
        let (mut connection, mut device) = connect();

        let device_task = tokio::spawn(async move {
            let mut speech = vec![0; 4 + 323];
            device.read_exact(&mut speech).await.unwrap();
            assert_eq!(speech[..7], [0x61, 0x01, 0x43, 0x02, 0x40, 0x00, 0xA0]);

            let mut channel = vec![0x61, 0x00, 0x0B, 0x01, 0x01, 0x48];
            channel.extend_from_slice(&FRAME);
            device.write_all(&channel).await.unwrap();

            let mut request = vec![0x61, 0x00, 0x0B, 0x01, 0x01, 0x48];
            request.extend_from_slice(&FRAME);
            expect_request(&mut device, &request).await;

            let mut reply = vec![0x61, 0x01, 0x42, 0x02, 0x00, 0xA0];
            reply.extend((0..SAMPLES_PER_FRAME as i16).flat_map(i16::to_be_bytes));
            device.write_all(&reply).await.unwrap();
            device
        });

        let encoded = connection
            .execute_command(EncodeSpeech {
                samples: [0; SAMPLES_PER_FRAME],
            })
            .await
            .unwrap();
        assert_eq!(encoded.bits.bits(), 72);
        assert_eq!(encoded.bits.as_bytes(), FRAME);

        let decoded = connection
            .execute_command(DecodeChannel::new(encoded.bits))
            .await
            .unwrap();
        assert_eq!(decoded.speech.samples().len(), SAMPLES_PER_FRAME);
        assert_eq!(decoded.speech.samples()[159], 159);
        device_task.await.unwrap();
    }

    #[tokio::test]
    async fn tone_frame() {
        let (mut connection, mut device) = connect();

        let device_task = tokio::spawn(async move {
            let mut speech = vec![0; 4 + 329];
            device.read_exact(&mut speech).await.unwrap();
            assert_eq!(speech[..4], [0x61, 0x01, 0x49, 0x02]);
            assert_eq!(speech[327..], [0x02, 0x40, 0x00, 0x08, 0x87, 0x0A]);

            let mut channel = vec![0x61, 0x00, 0x0E, 0x01, 0x01, 0x48];
            channel.extend_from_slice(&FRAME);
            channel.extend_from_slice(&[0x02, 0x80, 0x00]);
            device.write_all(&channel).await.unwrap();
            device
        });

        let encoded = connection
            .execute_command(EncodeTone {
                tone: Tone {
                    index: 0x87,
                    amplitude: 10,
                },
            })
            .await
            .unwrap();
        assert_eq!(encoded.cmode, Some(EcmodeOut::TONE_FRAME));
        device_task.await.unwrap();
    }

    #[tokio::test]
    async fn read_config() {
        let (mut connection, mut device) = connect();

        let device_task = tokio::spawn(async move {
            expect_request(&mut device, &[0x61, 0x00, 0x01, 0x00, 0x37]).await;
            device
                .write_all(&[0x61, 0x00, 0x04, 0x00, 0x37, 0x05, 0x21, 0x05])
                .await
                .unwrap();
            device
        });

        let config = connection.execute_command(ReadConfig).await.unwrap();
        assert_eq!(config.rate(), 33);
        device_task.await.unwrap();
    }

    #[tokio::test]
    async fn control_reply_is_resent_after_timeout() {
        let (mut connection, mut device) = connect();

        let device_task = tokio::spawn(async move {
            // Ignore the first request so the command times out once
            expect_request(&mut device, &[0x61, 0x00, 0x03, 0x00, 0x4B, 0x00, 0x00]).await;
            expect_request(&mut device, &[0x61, 0x00, 0x03, 0x00, 0x4B, 0x00, 0x00]).await;
            device
                .write_all(&[0x61, 0x00, 0x02, 0x00, 0x4B, 0x00])
                .await
                .unwrap();
            device
        });

        connection
            .execute_command(SetGain::default())
            .await
            .unwrap();
        device_task.await.unwrap();
    }

    #[tokio::test]
    async fn timeout_mid_packet() {
        let (mut connection, mut device) = connect();

        // Header of a two sample speech reply whose fields arrive late
        device.write_all(&[0x61, 0x00, 0x06, 0x02]).await.unwrap();
        let err = connection
            .recv::<SpeechReplyPacket>(Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(matches!(err, SerialError::Timeout));

        device
            .write_all(&[0x00, 0x02, 0x61, 0x00, 0xFF, 0x00])
            .await
            .unwrap();
        device
            .write_all(&[0x61, 0x00, 0x06, 0x02, 0x00, 0x02, 0x00, 0x01, 0x00, 0x02])
            .await
            .unwrap();

        let first = connection
            .recv::<SpeechReplyPacket>(Duration::from_millis(500))
            .await
            .unwrap();
        assert_eq!(first.speech.samples(), [0x6100, -256]);

        let second = connection
            .recv::<SpeechReplyPacket>(Duration::from_millis(500))
            .await
            .unwrap();
        assert_eq!(second.speech.samples(), [1, 2]);
    }

    #[tokio::test]
    async fn channel_format_then_encode() {
        let (mut connection, mut device) = connect();

        let device_task = tokio::spawn(async move {
            ack_request(&mut device, &[0x61, 0x00, 0x03, 0x00, 0x15, 0x00, 0x10]).await;

            let mut speech = vec![0; 4 + 323];
            device.read_exact(&mut speech).await.unwrap();

            let mut channel = vec![0x61, 0x00, 0x0D, 0x01, 0x01, 0x48];
            channel.extend_from_slice(&FRAME);
            channel.extend_from_slice(&[0x03, 0xA0]);
            device.write_all(&channel).await.unwrap();
            device
        });

        connection
            .execute_command(SetChannelFormat {
                format: PacketFormat {
                    samples: SampleCountReporting::Always,
                    ..Default::default()
                },
            })
            .await
            .unwrap();

        let encoded = connection
            .execute_command(EncodeSpeech {
                samples: [0; SAMPLES_PER_FRAME],
            })
            .await
            .unwrap();
        assert_eq!(encoded.bits.as_bytes(), FRAME);
        assert_eq!(encoded.samples, Some(160));
        device_task.await.unwrap();
    }

    #[tokio::test]
    async fn parameter_commands() {
        let (mut connection, mut device) = connect();

        let device_task = tokio::spawn(async move {
            ack_request(&mut device, &[0x61, 0x00, 0x03, 0x00, 0x16, 0x00, 0x00]).await;
            ack_request(&mut device, &[0x61, 0x00, 0x03, 0x00, 0x05, 0x00, 0x40]).await;
            ack_request(&mut device, &[0x61, 0x00, 0x03, 0x00, 0x06, 0x01, 0x00]).await;
            ack_request(&mut device, &[0x61, 0x00, 0x02, 0x00, 0x32, 0x03]).await;
            ack_request(&mut device, &[0x61, 0x00, 0x02, 0x00, 0x10, 0x01]).await;
            ack_request(
                &mut device,
                &[
                    0x61, 0x00, 0x0D, 0x00, 0x0A, 0x01, 0x30, 0x07, 0x63, 0x40, 0x00, 0x00, 0x00,
                    0x00, 0x00, 0x00, 0x48,
                ],
            )
            .await;

            expect_request(
                &mut device,
                &[0x61, 0x00, 0x07, 0x00, 0x34, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00],
            )
            .await;
            device
                .write_all(&[0x61, 0x00, 0x01, 0x00, 0x39])
                .await
                .unwrap();
            device
        });

        connection
            .execute_command(SetSpeechFormat::default())
            .await
            .unwrap();
        connection
            .execute_command(SetEncoderMode {
                mode: EcmodeIn::NS_ENABLE,
            })
            .await
            .unwrap();
        connection
            .execute_command(SetDecoderMode {
                mode: DcmodeIn::CP_ENABLE,
            })
            .await
            .unwrap();
        connection
            .execute_command(SetCompanding {
                companding: Companding::ALaw,
            })
            .await
            .unwrap();
        connection
            .execute_command(SetLowPower { enabled: true })
            .await
            .unwrap();
        connection
            .execute_command(SetRateP {
                rate: RateP::DSTAR,
            })
            .await
            .unwrap();
        connection
            .execute_command(ResetSoftConfig {
                config: SoftConfig::default(),
                mask: SoftConfig::default(),
            })
            .await
            .unwrap();
        device_task.await.unwrap();
    }

    #[tokio::test]
    async fn configure() {
        let (mut connection, mut device) = connect();

        let device_task = tokio::spawn(async move {
            expect_request(&mut device, &[0x61, 0x00, 0x01, 0x00, 0x33]).await;
            device
                .write_all(&[0x61, 0x00, 0x01, 0x00, 0x39])
                .await
                .unwrap();

            expect_request(&mut device, &[0x61, 0x00, 0x01, 0x00, 0x30]).await;
            let mut reply = vec![0x61, 0x00, 0x0B, 0x00, 0x30];
            reply.extend_from_slice(b"AMBE3000R\0");
            device.write_all(&reply).await.unwrap();

            expect_request(&mut device, &[0x61, 0x00, 0x01, 0x00, 0x31]).await;
            let mut reply = vec![0x61, 0x00, 0x05, 0x00, 0x31];
            reply.extend_from_slice(b"V12\0");
            device.write_all(&reply).await.unwrap();

            expect_request(&mut device, &[0x61, 0x00, 0x02, 0x00, 0x09, 0x21]).await;
            device
                .write_all(&[0x61, 0x00, 0x02, 0x00, 0x09, 0x00])
                .await
                .unwrap();

            expect_request(&mut device, &[0x61, 0x00, 0x02, 0x00, 0x0B, 0x03]).await;
            device
                .write_all(&[0x61, 0x00, 0x02, 0x00, 0x0B, 0x00])
                .await
                .unwrap();
            device
        });

        let info = connection
            .execute_command(Configure::new(Rate::Table(33)))
            .await
            .unwrap();
        assert_eq!(info.product_id, "AMBE3000R");
        assert_eq!(info.version, "V12");
        device_task.await.unwrap();
    }

    #[tokio::test]
    async fn close() {
        let (connection, mut device) = connect();

        connection.close().await.unwrap();

        let mut buf = [0; 1];
        assert_eq!(device.read(&mut buf).await.unwrap(), 0);
    }
}
