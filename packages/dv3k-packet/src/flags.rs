//! Encoder and decoder mode words.
//!
//! These are sent both as control fields (`PKT_ECMODE`/`PKT_DCMODE`), which set the default mode
//! for every following frame, and as `CMODE` fields inside individual speech and channel packets.

use bitflags::bitflags;

use crate::{
    decode::{Decode, DecodeError},
    encode::Encode,
};

bitflags! {
    /// Encoder mode flags sent to the chip.
    #[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct EcmodeIn: u16 {
        /// Enables noise suppression.
        const NS_ENABLE = 1 << 6;
        /// Selects which companding law is used when companding is enabled (set for A-law).
        const CP_SELECT = 1 << 7;
        /// Enables companding of the speech samples.
        const CP_ENABLE = 1 << 8;
        /// Enables echo suppression.
        const ES_ENABLE = 1 << 9;
        /// Enables discontinuous transmission.
        const DTX_ENABLE = 1 << 11;
        /// Enables tone detection.
        const TD_ENABLE = 1 << 12;
        /// Enables the echo canceller.
        const EC_ENABLE = 1 << 13;
        /// Sends the tone given in the packet's `TONE` field instead of encoding speech.
        const TS_ENABLE = 1 << 14;
    }
}

bitflags! {
    /// Encoder mode flags reported back by the chip alongside channel data.
    #[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct EcmodeOut: u16 {
        /// The encoded frame contains voice.
        const VOICE_ACTIVE = 1 << 1;
        /// The encoded frame contains a tone.
        const TONE_FRAME = 1 << 15;
    }
}

bitflags! {
    /// Decoder mode flags sent to the chip.
    #[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct DcmodeIn: u16 {
        /// The frame was lost; the decoder repeats or mutes instead of decoding it.
        const LOST_FRAME = 1 << 2;
        /// Comfort noise insertion frame.
        const CNI_FRAME = 1 << 3;
        /// Selects which companding law is used when companding is enabled (set for A-law).
        const CP_SELECT = 1 << 7;
        /// Enables companding of the speech samples.
        const CP_ENABLE = 1 << 8;
        /// Synthesizes the tone given in the packet's `TONE` field.
        const TS_ENABLE = 1 << 14;
    }
}

bitflags! {
    /// Decoder mode flags reported back by the chip alongside speech data.
    #[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct DcmodeOut: u16 {
        /// The decoded frame contains voice.
        const VOICE_ACTIVE = 1 << 1;
        /// The channel data could not be decoded.
        const DATA_INVALID = 1 << 5;
        /// The decoded frame contains a tone.
        const TONE_FRAME = 1 << 15;
    }
}

macro_rules! impl_codec_for_mode {
    ($($t:ty),*) => {
        $(
            impl Encode for $t {
                fn size(&self) -> usize {
                    2
                }

                fn encode(&self, data: &mut [u8]) {
                    self.bits().encode(data)
                }
            }

            impl Decode for $t {
                fn decode(data: &mut &[u8]) -> Result<Self, DecodeError> {
                    Ok(Self::from_bits_retain(u16::decode(data)?))
                }
            }
        )*
    };
}

impl_codec_for_mode!(EcmodeIn, EcmodeOut, DcmodeIn, DcmodeOut);
