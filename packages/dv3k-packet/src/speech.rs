//! Speech packets.
//!
//! A speech packet sent to the chip holds one frame of PCM samples to be encoded and is answered
//! with a [`ChannelReplyPacket`](crate::channel::ChannelReplyPacket). A speech packet sent by the
//! chip holds the samples decoded from a [`ChannelPacket`](crate::channel::ChannelPacket).

use alloc::vec::Vec;
use core::fmt;

use crate::{
    control::fields::CHANNEL0,
    decode::{Decode, DecodeError, DecodeErrorKind, DecodeWithLength},
    encode::Encode,
    flags::{DcmodeOut, EcmodeIn},
    header::{decode_frame, finish_fields, frame_packet, PacketType, Reply},
    HEADER_SIZE, SAMPLES_PER_FRAME,
};

/// Speech field identifiers.
pub mod fields {
    pub const SPEECHD: u8 = 0x00;
    pub const CMODE: u8 = 0x02;
    pub const SAMPLES: u8 = 0x03;
    pub const TONE: u8 = 0x08;
}

use fields::*;

/// A tone to generate instead of speech.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tone {
    /// Index into the chip's tone table (single frequency, DTMF, KNOX and call progress tones).
    pub index: u8,
    /// Amplitude in negative dBm0, from 0 down to 90.
    pub amplitude: u8,
}

impl Encode for Tone {
    fn size(&self) -> usize {
        2
    }

    fn encode(&self, data: &mut [u8]) {
        data[0] = self.index;
        data[1] = self.amplitude;
    }
}

impl Decode for Tone {
    fn decode(data: &mut &[u8]) -> Result<Self, DecodeError> {
        let index = u8::decode(data)?;
        let amplitude = u8::decode(data)?;

        Ok(Self { index, amplitude })
    }
}

/// A frame of 16-bit PCM samples.
///
/// # Invariants
///
/// - Holds at most 255 samples, since the count is sent as a single byte.
#[derive(Debug, Clone, Eq, PartialEq, Default)]
pub struct SpeechData(Vec<i16>);

impl SpeechData {
    /// # Errors
    ///
    /// Returns [`SpeechDataSizeError`] if more than 255 samples are given.
    pub fn new(samples: Vec<i16>) -> Result<Self, SpeechDataSizeError> {
        if samples.len() > u8::MAX as usize {
            return Err(SpeechDataSizeError {
                input_size: samples.len(),
            });
        }

        Ok(Self(samples))
    }

    pub fn samples(&self) -> &[i16] {
        &self.0
    }

    pub fn into_samples(self) -> Vec<i16> {
        self.0
    }
}

impl From<[i16; SAMPLES_PER_FRAME]> for SpeechData {
    fn from(samples: [i16; SAMPLES_PER_FRAME]) -> Self {
        Self(samples.to_vec())
    }
}

impl Encode for SpeechData {
    fn size(&self) -> usize {
        1 + self.0.len() * 2
    }

    fn encode(&self, data: &mut [u8]) {
        data[0] = self.0.len() as u8;
        for (i, sample) in self.0.iter().enumerate() {
            sample.encode(&mut data[1 + i * 2..]);
        }
    }
}

impl Decode for SpeechData {
    fn decode(data: &mut &[u8]) -> Result<Self, DecodeError> {
        let len = u8::decode(data)?;
        Ok(Self(Vec::decode_with_len(data, len as usize)?))
    }
}

/// Returned when a [`SpeechData`] cannot hold the given samples.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct SpeechDataSizeError {
    pub input_size: usize,
}

impl fmt::Display for SpeechDataSizeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} samples exceed the 255 samples a speech field can carry",
            self.input_size
        )
    }
}

impl core::error::Error for SpeechDataSizeError {}

/// Speech packet sent to the chip for encoding.
///
/// # Encoding
///
/// | Field      | Size | Description |
/// |------------|------|-------------|
/// | `header`   | 4    | Start byte, length and [`PacketType::Speech`]. |
/// | `channel`  | 0–1  | [`CHANNEL0`] if `channel_select` is set. |
/// | `speechd`  | n    | [`SPEECHD`], sample count and big-endian samples. |
/// | `cmode`    | 0–3  | [`CMODE`] and an [`EcmodeIn`] overriding the encoder mode for this frame. |
/// | `tone`     | 0–3  | [`TONE`], index and amplitude. |
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SpeechPacket {
    pub channel_select: bool,
    pub speech: SpeechData,
    pub cmode: Option<EcmodeIn>,
    pub tone: Option<Tone>,
}

impl SpeechPacket {
    /// Creates a plain speech packet addressed to channel 0.
    pub fn new(speech: SpeechData) -> Self {
        Self {
            channel_select: true,
            speech,
            cmode: None,
            tone: None,
        }
    }
}

impl Encode for SpeechPacket {
    fn size(&self) -> usize {
        HEADER_SIZE
            + usize::from(self.channel_select)
            + 1
            + self.speech.size()
            + self.cmode.map_or(0, |cmode| 1 + cmode.size())
            + self.tone.map_or(0, |tone| 1 + tone.size())
    }

    fn encode(&self, data: &mut [u8]) {
        frame_packet(PacketType::Speech, &mut data[..self.size()], |fields| {
            let mut offset = 0;

            if self.channel_select {
                fields[offset] = CHANNEL0;
                offset += 1;
            }

            fields[offset] = SPEECHD;
            self.speech.encode(&mut fields[offset + 1..]);
            offset += 1 + self.speech.size();

            if let Some(cmode) = self.cmode {
                fields[offset] = CMODE;
                cmode.encode(&mut fields[offset + 1..]);
                offset += 1 + cmode.size();
            }

            if let Some(tone) = self.tone {
                fields[offset] = TONE;
                tone.encode(&mut fields[offset + 1..]);
            }
        });
    }
}

/// Speech packet returned by the chip after decoding a channel packet.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SpeechReplyPacket {
    pub speech: SpeechData,
    /// Present when the speech format asks the chip to report the decoder mode.
    pub cmode: Option<DcmodeOut>,
    /// Present when the speech format asks the chip to report the sample count.
    pub samples: Option<u8>,
}

impl Decode for SpeechReplyPacket {
    fn decode(data: &mut &[u8]) -> Result<Self, DecodeError> {
        let (packet, mut fields) = decode_frame::<Self>(data, PacketType::Speech)?;

        let mut speech = None;
        let mut cmode = None;
        let mut samples = None;

        while let Some((&field, rest)) = fields.split_first() {
            match field {
                CHANNEL0 => fields = rest,
                SPEECHD => {
                    fields = rest;
                    speech = Some(SpeechData::decode(&mut fields)?);
                }
                CMODE => {
                    fields = rest;
                    cmode = Some(DcmodeOut::decode(&mut fields)?);
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
            speech: speech
                .ok_or_else(|| DecodeError::new::<Self>(DecodeErrorKind::UnexpectedEnd))?,
            cmode,
            samples,
        })
    }
}

impl Reply for SpeechReplyPacket {
    const PACKET_TYPE: PacketType = PacketType::Speech;
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;

    #[test]
    fn speech_frame() {
        let mut samples = vec![0i16; crate::SAMPLES_PER_FRAME];
        samples[0] = 0x0102;
        samples[159] = -1;

        let encoded = SpeechPacket::new(SpeechData::new(samples).unwrap()).to_vec();

        assert_eq!(encoded.len(), 327);
        assert_eq!(encoded[..9], [0x61, 0x01, 0x43, 0x02, 0x40, 0x00, 0xA0, 0x01, 0x02]);
        assert_eq!(encoded[325..], [0xFF, 0xFF]);
    }

    #[test]
    fn tone_frame() {
        let packet = SpeechPacket {
            channel_select: false,
            speech: SpeechData::new(vec![0; 2]).unwrap(),
            cmode: Some(EcmodeIn::TS_ENABLE),
            tone: Some(Tone {
                index: 0x80,
                amplitude: 10,
            }),
        };

        assert_eq!(
            packet.to_vec(),
            [
                0x61, 0x00, 0x0C, 0x02, 0x00, 0x02, 0x00, 0x00, 0x00, 0x00, 0x02, 0x40, 0x00,
                0x08, 0x80, 0x0A
            ]
        );
    }

    #[test]
    fn oversized() {
        assert_eq!(
            SpeechData::new(vec![0; 256]),
            Err(SpeechDataSizeError { input_size: 256 })
        );
    }

    #[test]
    fn reply_with_cmode() {
        let mut data: &[u8] = &[
            0x61, 0x00, 0x09, 0x02, 0x00, 0x02, 0x7F, 0xFF, 0x80, 0x00, 0x02, 0x00, 0x02,
        ];
        let reply = SpeechReplyPacket::decode(&mut data).unwrap();

        assert_eq!(reply.speech.samples(), [i16::MAX, i16::MIN]);
        assert_eq!(reply.cmode, Some(DcmodeOut::VOICE_ACTIVE));
        assert!(data.is_empty());
    }

    #[test]
    fn reply_with_sample_count() {
        let mut data: &[u8] = &[
            0x61, 0x00, 0x08, 0x02, 0x00, 0x02, 0x00, 0x01, 0xFF, 0xFF, 0x03, 0x02,
        ];
        let reply = SpeechReplyPacket::decode(&mut data).unwrap();

        assert_eq!(reply.speech.samples(), [1, -1]);
        assert_eq!(reply.samples, Some(2));
        assert!(data.is_empty());
    }

    #[test]
    fn reply_missing_speech() {
        let mut data: &[u8] = &[0x61, 0x00, 0x03, 0x02, 0x02, 0x00, 0x02];

        assert_eq!(
            SpeechReplyPacket::decode(&mut data).unwrap_err().kind(),
            DecodeErrorKind::UnexpectedEnd
        );
    }
}
