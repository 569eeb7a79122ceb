//! Commands that push a single frame through the vocoder.
//!
//! Frames are never resent, since a duplicate would be encoded or decoded as another frame.

use dv3k_packet::{
    channel::{ChannelBits, ChannelData, ChannelPacket, ChannelReplyPacket},
    speech::{SpeechData, SpeechPacket, SpeechReplyPacket, Tone},
    DcmodeIn, EcmodeIn, SAMPLES_PER_FRAME,
};
use log::trace;

use super::{Command, FRAME_TIMEOUT};
use crate::Connection;

/// Encodes one 20 ms frame of 8 kHz PCM into channel bits.
#[derive(Debug, Clone, Copy)]
pub struct EncodeSpeech {
    pub samples: [i16; SAMPLES_PER_FRAME],
}
impl Command for EncodeSpeech {
    type Output = ChannelReplyPacket;

    async fn execute<C: Connection + ?Sized>(
        self,
        connection: &mut C,
    ) -> Result<Self::Output, C::Error> {
        let reply = connection
            .handshake::<ChannelReplyPacket>(
                FRAME_TIMEOUT,
                0,
                SpeechPacket::new(SpeechData::from(self.samples)),
            )
            .await?;
        trace!("encoded {} bits", reply.bits.bits());
        Ok(reply)
    }
}

/// Encodes a tone frame instead of speech.
#[derive(Debug, Clone, Copy)]
pub struct EncodeTone {
    pub tone: Tone,
}
impl Command for EncodeTone {
    type Output = ChannelReplyPacket;

    async fn execute<C: Connection + ?Sized>(
        self,
        connection: &mut C,
    ) -> Result<Self::Output, C::Error> {
        let packet = SpeechPacket {
            cmode: Some(EcmodeIn::TS_ENABLE),
            tone: Some(self.tone),
            ..SpeechPacket::new(SpeechData::from([0; SAMPLES_PER_FRAME]))
        };

        connection
            .handshake::<ChannelReplyPacket>(FRAME_TIMEOUT, 0, packet)
            .await
    }
}

/// Decodes one frame of channel bits into PCM.
#[derive(Debug, Clone)]
pub struct DecodeChannel {
    pub data: ChannelData,
    /// Overrides the decoder mode for this frame, e.g. to flag it as lost.
    pub cmode: Option<DcmodeIn>,
}

impl DecodeChannel {
    pub fn new(bits: ChannelBits) -> Self {
        Self {
            data: ChannelData::Hard(bits),
            cmode: None,
        }
    }
}

impl Command for DecodeChannel {
    type Output = SpeechReplyPacket;

    async fn execute<C: Connection + ?Sized>(
        self,
        connection: &mut C,
    ) -> Result<Self::Output, C::Error> {
        let packet = ChannelPacket {
            channel_select: false,
            data: self.data,
            cmode: self.cmode,
            tone: None,
            samples: None,
        };

        let reply = connection
            .handshake::<SpeechReplyPacket>(FRAME_TIMEOUT, 0, packet)
            .await?;
        trace!("decoded {} samples", reply.speech.samples().len());
        Ok(reply)
    }
}
