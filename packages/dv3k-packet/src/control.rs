//! Control packets.
//!
//! Control packets configure the vocoder and query its status. Each command carries a single
//! control field and is answered by a reply carrying the same field (or `PKT_READY` for resets).

use alloc::string::String;
use bitflags::bitflags;
use thiserror::Error;

use crate::{
    decode::{expect_field, Decode, DecodeError},
    encode::Encode,
    header::{decode_frame, finish_fields, frame_packet, PacketType, Reply},
    HEADER_SIZE,
};

/// Control field identifiers.
///
/// This module is non-exhaustive.
pub mod fields {
    pub const ECMODE: u8 = 0x05;
    pub const DCMODE: u8 = 0x06;
    pub const RATET: u8 = 0x09;
    pub const RATEP: u8 = 0x0A;
    pub const INIT: u8 = 0x0B;
    pub const LOWPOWER: u8 = 0x10;
    pub const CHANFMT: u8 = 0x15;
    pub const SPCHFMT: u8 = 0x16;
    pub const PARITY: u8 = 0x2F;
    pub const PRODID: u8 = 0x30;
    pub const VERSTRING: u8 = 0x31;
    pub const COMPAND: u8 = 0x32;
    pub const RESET: u8 = 0x33;
    pub const RESETSOFTCFG: u8 = 0x34;
    pub const HALT: u8 = 0x35;
    pub const GETCFG: u8 = 0x36;
    pub const READCFG: u8 = 0x37;
    pub const READY: u8 = 0x39;
    pub const PARITYMODE: u8 = 0x3F;
    pub const CHANNEL0: u8 = 0x40;
    pub const GAIN: u8 = 0x4B;
}

use fields::*;

/// Control command packet.
///
/// A device-bound packet carrying a single control field and its payload.
///
/// # Encoding
///
/// | Field     | Size | Description |
/// |-----------|------|-------------|
/// | `header`  | 4    | Start byte, length and [`PacketType::Control`]. |
/// | `field`   | 1    | A [control field identifier](fields). |
/// | `payload` | n    | Encoded payload. |
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct ControlPacket<const FIELD: u8, P: Encode> {
    payload: P,
}

impl<const FIELD: u8, P: Encode> ControlPacket<FIELD, P> {
    /// Creates a new device-bound packet with a given payload.
    pub fn new(payload: P) -> Self {
        Self { payload }
    }
}

impl<const FIELD: u8, P: Encode> Encode for ControlPacket<FIELD, P> {
    fn size(&self) -> usize {
        HEADER_SIZE + 1 + self.payload.size()
    }

    fn encode(&self, data: &mut [u8]) {
        frame_packet(PacketType::Control, &mut data[..self.size()], |fields| {
            fields[0] = FIELD;
            self.payload.encode(&mut fields[1..]);
        });
    }
}

/// Control reply packet.
///
/// A host-bound packet sent in response to a [`ControlPacket`]. The reply starts with the field
/// identifier being answered, followed by its payload and an optional parity field.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ControlReplyPacket<const FIELD: u8, P: Decode> {
    pub payload: P,
}

impl<const FIELD: u8, P: Decode> Decode for ControlReplyPacket<FIELD, P> {
    fn decode(data: &mut &[u8]) -> Result<Self, DecodeError> {
        let (packet, mut fields) = decode_frame::<Self>(data, PacketType::Control)?;

        expect_field::<Self>(&mut fields, "field", &[FIELD])?;
        let payload = P::decode(&mut fields)?;
        finish_fields::<Self>(packet, fields)?;

        Ok(Self { payload })
    }
}

impl<const FIELD: u8, P: Decode> Reply for ControlReplyPacket<FIELD, P> {
    const PACKET_TYPE: PacketType = PacketType::Control;
    const FIRST_FIELD: Option<u8> = Some(FIELD);
}

impl<const FIELD: u8> ControlReplyPacket<FIELD, ControlStatus> {
    /// Converts the reply's status byte into a result.
    ///
    /// # Errors
    ///
    /// Returns a [`ControlNack`] if the chip rejected the command.
    pub fn ack(&self) -> Result<(), ControlNack> {
        match self.payload.0 {
            0 => Ok(()),
            code => Err(ControlNack { field: FIELD, code }),
        }
    }
}

/// Status byte returned by most control replies. Zero means success.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct ControlStatus(pub u8);

impl Decode for ControlStatus {
    fn decode(data: &mut &[u8]) -> Result<Self, DecodeError> {
        Ok(Self(u8::decode(data)?))
    }
}

/// Returned when the chip answers a control command with a non-zero status.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Error)]
#[error("control field {field:#04x} was rejected with status {code:#04x}")]
pub struct ControlNack {
    pub field: u8,
    pub code: u8,
}

pub type ResetPacket = ControlPacket<RESET, ()>;
pub type ReadyReplyPacket = ControlReplyPacket<READY, ()>;

pub type ResetSoftConfigPacket = ControlPacket<RESETSOFTCFG, ResetSoftConfigPayload>;

/// Soft configuration applied by `PKT_RESETSOFTCFG`.
///
/// Only bits set in `mask` are taken from `config`; the rest keep their hardware-pin values.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct ResetSoftConfigPayload {
    pub config: SoftConfig,
    pub mask: SoftConfig,
}

impl Encode for ResetSoftConfigPayload {
    fn size(&self) -> usize {
        6
    }

    fn encode(&self, data: &mut [u8]) {
        self.config.encode(data);
        self.mask.encode(&mut data[3..]);
    }
}

pub type InitPacket = ControlPacket<INIT, InitFlags>;
pub type InitReplyPacket = ControlReplyPacket<INIT, ControlStatus>;

bitflags! {
    /// Selects which parts of the vocoder `PKT_INIT` resets.
    #[derive(Debug, Clone, Copy, Eq, PartialEq)]
    pub struct InitFlags: u8 {
        const ENCODER = 0x01;
        const DECODER = 0x02;
        const ECHO_CANCELLER = 0x04;
    }
}

impl Default for InitFlags {
    fn default() -> Self {
        Self::ENCODER | Self::DECODER
    }
}

impl Encode for InitFlags {
    fn size(&self) -> usize {
        1
    }

    fn encode(&self, data: &mut [u8]) {
        data[0] = self.bits();
    }
}

pub type ProductIdPacket = ControlPacket<PRODID, ()>;
pub type ProductIdReplyPacket = ControlReplyPacket<PRODID, String>;

pub type VersionPacket = ControlPacket<VERSTRING, ()>;
pub type VersionReplyPacket = ControlReplyPacket<VERSTRING, String>;

pub type RateTPacket = ControlPacket<RATET, u8>;
pub type RateTReplyPacket = ControlReplyPacket<RATET, ControlStatus>;

/// Well-known indices into the chip's built-in rate table.
pub mod rates {
    /// 2450 bps voice, 1150 bps FEC. Used by DMR, NXDN and P25 phase 2.
    pub const AMBE_2450_1150: u8 = 33;
    /// 2450 bps voice without FEC.
    pub const AMBE_2450: u8 = 34;
}

pub type RatePPacket = ControlPacket<RATEP, RateP>;
pub type RatePReplyPacket = ControlReplyPacket<RATEP, ControlStatus>;

/// Custom rate control words for `PKT_RATEP`.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RateP(pub [u16; 6]);

impl RateP {
    /// 2400 bps voice, 1200 bps FEC, as used by D-STAR.
    pub const DSTAR: Self = Self([0x0130, 0x0763, 0x4000, 0x0000, 0x0000, 0x0048]);
}

impl Encode for RateP {
    fn size(&self) -> usize {
        12
    }

    fn encode(&self, data: &mut [u8]) {
        for (i, word) in self.0.iter().enumerate() {
            word.encode(&mut data[i * 2..]);
        }
    }
}

pub type ChannelFormatPacket = ControlPacket<CHANFMT, PacketFormat>;
pub type ChannelFormatReplyPacket = ControlReplyPacket<CHANFMT, ControlStatus>;

pub type SpeechFormatPacket = ControlPacket<SPCHFMT, PacketFormat>;
pub type SpeechFormatReplyPacket = ControlReplyPacket<SPCHFMT, ControlStatus>;

/// When the chip should include a `CMODE` field in its output packets.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CmodeReporting {
    #[default]
    Never,
    Always,
    OnChange,
}

/// When the chip should include a sample count field in its output packets.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SampleCountReporting {
    #[default]
    Never,
    Always,
    OnDifference,
    /// Only when the frame holds a number of samples other than 160.
    NotStandard,
}

/// Output packet format, used by both `PKT_CHANFMT` and `PKT_SPCHFMT`.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PacketFormat {
    pub cmode: CmodeReporting,
    pub samples: SampleCountReporting,
}

impl PacketFormat {
    pub const fn bits(&self) -> u16 {
        let cmode = match self.cmode {
            CmodeReporting::Never => 0x00,
            CmodeReporting::Always => 0x01,
            CmodeReporting::OnChange => 0x02,
        };
        let samples = match self.samples {
            SampleCountReporting::Never => 0x00,
            SampleCountReporting::Always => 0x10,
            SampleCountReporting::OnDifference => 0x20,
            SampleCountReporting::NotStandard => 0x30,
        };

        cmode | samples
    }
}

impl Encode for PacketFormat {
    fn size(&self) -> usize {
        2
    }

    fn encode(&self, data: &mut [u8]) {
        self.bits().encode(data)
    }
}

pub type EcmodePacket = ControlPacket<ECMODE, crate::EcmodeIn>;
pub type EcmodeReplyPacket = ControlReplyPacket<ECMODE, ControlStatus>;

pub type DcmodePacket = ControlPacket<DCMODE, crate::DcmodeIn>;
pub type DcmodeReplyPacket = ControlReplyPacket<DCMODE, ControlStatus>;

pub type ReadConfigPacket = ControlPacket<READCFG, ()>;
pub type ReadConfigReplyPacket = ControlReplyPacket<READCFG, SoftConfig>;

bitflags! {
    #[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
    pub struct Cfg0: u8 {
        const IF_SELECT0 = 0x01;
        const IF_SELECT1 = 0x02;
        const IF_SELECT2 = 0x04;
        const DTX_ENABLE = 0x08;
        const NS_ENABLE = 0x20;
        const CP_ENABLE = 0x40;
        const CP_SELECT = 0x80;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
    pub struct Cfg1: u8 {
        const RATE0 = 0x01;
        const RATE1 = 0x02;
        const RATE2 = 0x04;
        const RATE3 = 0x08;
        const RATE4 = 0x10;
        const RATE5 = 0x20;
        const EC_ENABLE = 0x40;
        const ES_ENABLE = 0x80;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
    pub struct Cfg2: u8 {
        const S_COM_RATE0 = 0x01;
        const S_COM_RATE1 = 0x02;
        const S_COM_RATE2 = 0x04;
        const PARITY_ENABLE = 0x10;
    }
}

/// The three configuration bytes normally sampled from the chip's configuration pins.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
pub struct SoftConfig {
    pub cfg0: Cfg0,
    pub cfg1: Cfg1,
    pub cfg2: Cfg2,
}

impl SoftConfig {
    /// Rate table index selected by the `RATE` bits.
    pub const fn rate(&self) -> u8 {
        self.cfg1.bits() & 0x3F
    }
}

impl Encode for SoftConfig {
    fn size(&self) -> usize {
        3
    }

    fn encode(&self, data: &mut [u8]) {
        data[0] = self.cfg0.bits();
        data[1] = self.cfg1.bits();
        data[2] = self.cfg2.bits();
    }
}

impl Decode for SoftConfig {
    fn decode(data: &mut &[u8]) -> Result<Self, DecodeError> {
        let [cfg0, cfg1, cfg2] = <[u8; 3]>::decode(data)?;

        Ok(Self {
            cfg0: Cfg0::from_bits_retain(cfg0),
            cfg1: Cfg1::from_bits_retain(cfg1),
            cfg2: Cfg2::from_bits_retain(cfg2),
        })
    }
}

pub type ParityModePacket = ControlPacket<PARITYMODE, u8>;
pub type ParityModeReplyPacket = ControlReplyPacket<PARITYMODE, ControlStatus>;

pub type CompandPacket = ControlPacket<COMPAND, Companding>;
pub type CompandReplyPacket = ControlReplyPacket<COMPAND, ControlStatus>;

/// Companding applied to the 16-bit speech samples exchanged with the chip.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum Companding {
    /// Samples are linear 16-bit PCM.
    #[default]
    Disabled = 0x00,
    MuLaw = 0x01,
    ALaw = 0x03,
}

impl Encode for Companding {
    fn size(&self) -> usize {
        1
    }

    fn encode(&self, data: &mut [u8]) {
        data[0] = *self as u8;
    }
}

pub type GainPacket = ControlPacket<GAIN, GainPayload>;
pub type GainReplyPacket = ControlReplyPacket<GAIN, ControlStatus>;

/// Input and output gain in dB. The chip accepts values from -90 to +90.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GainPayload {
    pub input: i8,
    pub output: i8,
}

impl Encode for GainPayload {
    fn size(&self) -> usize {
        2
    }

    fn encode(&self, data: &mut [u8]) {
        self.input.encode(data);
        self.output.encode(&mut data[1..]);
    }
}

pub type LowPowerPacket = ControlPacket<LOWPOWER, u8>;
pub type LowPowerReplyPacket = ControlReplyPacket<LOWPOWER, ControlStatus>;
