//! Channel packets.
//!
//! A channel packet sent to the chip holds one frame of compressed AMBE bits to be decoded and is
//! answered with a [`SpeechReplyPacket`](crate::speech::SpeechReplyPacket). A channel packet sent
//! by the chip holds the bits encoded from a [`SpeechPacket`](crate::speech::SpeechPacket).

use alloc::vec::Vec;
use core::fmt;

use crate::{
    control::fields::CHANNEL0,
    decode::{Decode, DecodeError, DecodeErrorKind, DecodeWithLength},
    encode::Encode,
    flags::{DcmodeIn, EcmodeOut},
    header::{decode_frame, finish_fields, frame_packet, PacketType, Reply},
    speech::Tone,
    HEADER_SIZE,
};

/// Channel field identifiers.
pub mod fields {
    pub const CHAND: u8 = 0x01;
    pub const CMODE: u8 = 0x02;
    pub const SAMPLES: u8 = 0x03;
    pub const TONE: u8 = 0x08;
    pub const CHAND4: u8 = 0x17;
}

use fields::*;

/// Number of bytes needed to pack `bits` hard-decision bits.
pub const fn packed_len(bits: u8) -> usize {
    (bits as usize).div_ceil(8)
}

/// Hard-decision channel bits, packed MSB first.
///
/// # Invariants
///
/// - `data.len() == ceil(bits / 8)`.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ChannelBits {
    bits: u8,
    data: Vec<u8>,
}

impl ChannelBits {
    /// # Errors
    ///
    /// Returns [`ChannelBitsSizeError`] if `data` is not exactly large enough to hold `bits` bits.
    pub fn new(bits: u8, data: Vec<u8>) -> Result<Self, ChannelBitsSizeError> {
        if data.len() != packed_len(bits) {
            return Err(ChannelBitsSizeError {
                bits,
                input_size: data.len(),
            });
        }

        Ok(Self { bits, data })
    }

    pub fn bits(&self) -> u8 {
        self.bits
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}

impl Encode for ChannelBits {
    fn size(&self) -> usize {
        1 + self.data.len()
    }

    fn encode(&self, data: &mut [u8]) {
        data[0] = self.bits;
        self.data.as_slice().encode(&mut data[1..]);
    }
}

impl Decode for ChannelBits {
    fn decode(data: &mut &[u8]) -> Result<Self, DecodeError> {
        let bits = u8::decode(data)?;
        let data = Vec::decode_with_len(data, packed_len(bits))?;

        Ok(Self { bits, data })
    }
}

/// Returned when a [`ChannelBits`] is given the wrong number of bytes.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ChannelBitsSizeError {
    pub bits: u8,
    pub input_size: usize,
}

impl fmt::Display for ChannelBitsSizeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} channel bits need {} bytes, but {} were given",
            self.bits,
            packed_len(self.bits),
            self.input_size
        )
    }
}

impl core::error::Error for ChannelBitsSizeError {}

/// Soft-decision channel bits, one 4-bit confidence value per byte.
///
/// # Invariants
///
/// - Holds at most 255 values, since the count is sent as a single byte.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SoftBits(Vec<u8>);

impl SoftBits {
    /// # Errors
    ///
    /// Returns [`SoftBitsSizeError`] if more than 255 values are given.
    pub fn new(values: Vec<u8>) -> Result<Self, SoftBitsSizeError> {
        if values.len() > u8::MAX as usize {
            return Err(SoftBitsSizeError {
                input_size: values.len(),
            });
        }

        Ok(Self(values))
    }

    pub fn values(&self) -> &[u8] {
        &self.0
    }
}

/// Returned when a [`SoftBits`] cannot hold the given values.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct SoftBitsSizeError {
    pub input_size: usize,
}

impl fmt::Display for SoftBitsSizeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} soft-decision values exceed the 255 values a channel field can carry",
            self.input_size
        )
    }
}

impl core::error::Error for SoftBitsSizeError {}

impl Encode for SoftBits {
    fn size(&self) -> usize {
        1 + self.0.len()
    }

    fn encode(&self, data: &mut [u8]) {
        data[0] = self.0.len() as u8;
        self.0.as_slice().encode(&mut data[1..]);
    }
}

/// Channel data handed to the decoder.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum ChannelData {
    /// Sent as a `CHAND` field.
    Hard(ChannelBits),
    /// Sent as a `CHAND4` field.
    Soft(SoftBits),
}

impl Encode for ChannelData {
    fn size(&self) -> usize {
        1 + match self {
            Self::Hard(bits) => bits.size(),
            Self::Soft(bits) => bits.size(),
        }
    }

    fn encode(&self, data: &mut [u8]) {
        match self {
            Self::Hard(bits) => {
                data[0] = CHAND;
                bits.encode(&mut data[1..]);
            }
            Self::Soft(bits) => {
                data[0] = CHAND4;
                bits.encode(&mut data[1..]);
            }
        }
    }
}

/// Channel packet sent to the chip for decoding.
///
/// # Encoding
///
/// | Field      | Size | Description |
/// |------------|------|-------------|
/// | `header`   | 4    | Start byte, length and [`PacketType::Channel`]. |
/// | `channel`  | 0–1  | [`CHANNEL0`] if `channel_select` is set. |
/// | `chand`    | n    | [`CHAND`] or [`CHAND4`], bit count and bit data. |
/// | `cmode`    | 0–3  | [`CMODE`] and a [`DcmodeIn`] overriding the decoder mode for this frame. |
/// | `tone`     | 0–3  | [`TONE`], index and amplitude. |
/// | `samples`  | 0–2  | [`SAMPLES`] and the number of samples to produce. |
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ChannelPacket {
    pub channel_select: bool,
    pub data: ChannelData,
    pub cmode: Option<DcmodeIn>,
    pub tone: Option<Tone>,
    pub samples: Option<u8>,
}

impl ChannelPacket {
    /// Creates a plain hard-decision channel packet.
    pub fn new(bits: ChannelBits) -> Self {
        Self {
            channel_select: false,
            data: ChannelData::Hard(bits),
            cmode: None,
            tone: None,
            samples: None,
        }
    }
}

impl Encode for ChannelPacket {
    fn size(&self) -> usize {
        HEADER_SIZE
            + usize::from(self.channel_select)
            + self.data.size()
            + self.cmode.map_or(0, |cmode| 1 + cmode.size())
            + self.tone.map_or(0, |tone| 1 + tone.size())
            + self.samples.map_or(0, |_| 2)
    }

    fn encode(&self, data: &mut [u8]) {
        frame_packet(PacketType::Channel, &mut data[..self.size()], |fields| {
            let mut offset = 0;

            if self.channel_select {
                fields[offset] = CHANNEL0;
                offset += 1;
            }

            self.data.encode(&mut fields[offset..]);
            offset += self.data.size();

            if let Some(cmode) = self.cmode {
                fields[offset] = CMODE;
                cmode.encode(&mut fields[offset + 1..]);
                offset += 1 + cmode.size();
            }

            if let Some(tone) = self.tone {
                fields[offset] = TONE;
                tone.encode(&mut fields[offset + 1..]);
                offset += 1 + tone.size();
            }

            if let Some(samples) = self.samples {
                fields[offset] = SAMPLES;
                fields[offset + 1] = samples;
            }
        });
    }
}

/// Channel packet returned by the chip after encoding a speech packet.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ChannelReplyPacket {
    pub bits: ChannelBits,
    /// Present when the channel format asks the chip to report the encoder mode.
    pub cmode: Option<EcmodeOut>,
    /// Number of samples the frame was encoded from, present when the channel format asks for it.
    pub samples: Option<u8>,
}

impl Decode for ChannelReplyPacket {
    fn decode(data: &mut &[u8]) -> Result<Self, DecodeError> {
        let (packet, mut fields) = decode_frame::<Self>(data, PacketType::Channel)?;

        let mut bits = None;
        let mut cmode = None;
        let mut samples = None;

        while let Some((&field, rest)) = fields.split_first() {
            match field {
                CHANNEL0 => fields = rest,
                CHAND => {
                    fields = rest;
                    bits = Some(ChannelBits::decode(&mut fields)?);
                }
                CMODE => {
                    fields = rest;
                    cmode = Some(EcmodeOut::decode(&mut fields)?);
                }
                SAMPLES => {
                    fields = rest;
                    samples = Some(u8::decode(&mut fields)?);
                }
                _ => break,
            }
        }

        finish_fields::<Self>(packet, fields)?;

        Ok(Self {
            bits: bits.ok_or_else(|| DecodeError::new::<Self>(DecodeErrorKind::UnexpectedEnd))?,
            cmode,
            samples,
        })
    }
}

impl Reply for ChannelReplyPacket {
    const PACKET_TYPE: PacketType = PacketType::Channel;
}
