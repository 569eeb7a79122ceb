//! Commands that configure or query the chip.

use dv3k_packet::{
    control::{
        fields::{
            CHANFMT, COMPAND, DCMODE, ECMODE, GAIN, INIT, LOWPOWER, PARITYMODE, RATEP, RATET,
            SPCHFMT,
        },
        Companding, ControlPacket, ControlReplyPacket, ControlStatus, GainPayload, InitFlags,
        PacketFormat, ProductIdPacket, ProductIdReplyPacket, RateP, ReadConfigPacket,
        ReadConfigReplyPacket, ReadyReplyPacket, ResetPacket, ResetSoftConfigPacket,
        ResetSoftConfigPayload, SoftConfig, VersionPacket, VersionReplyPacket,
    },
    DcmodeIn, EcmodeIn, Encode,
};
use log::{debug, info};

use super::{Command, CONTROL_RETRIES, CONTROL_TIMEOUT, RESET_TIMEOUT};
use crate::Connection;

/// Sends a control field whose reply is a single status byte, failing on a NACK.
async fn set_field<C: Connection + ?Sized, const FIELD: u8, P: Encode + Clone>(
    connection: &mut C,
    payload: P,
) -> Result<(), C::Error> {
    connection
        .handshake::<ControlReplyPacket<FIELD, ControlStatus>>(
            CONTROL_TIMEOUT,
            CONTROL_RETRIES,
            ControlPacket::<FIELD, P>::new(payload),
        )
        .await?
        .ack()?;

    Ok(())
}

/// Resets the chip and waits for it to report that it is ready.
#[derive(Debug, Clone, Copy)]
pub struct Reset;
impl Command for Reset {
    type Output = ();

    async fn execute<C: Connection + ?Sized>(
        self,
        connection: &mut C,
    ) -> Result<Self::Output, C::Error> {
        info!("Resetting vocoder");
        connection
            .handshake::<ReadyReplyPacket>(RESET_TIMEOUT, 1, ResetPacket::new(()))
            .await?;
        Ok(())
    }
}

/// Resets the chip, overriding the configuration pins with the bits selected by `mask`.
#[derive(Debug, Clone, Copy)]
pub struct ResetSoftConfig {
    pub config: SoftConfig,
    pub mask: SoftConfig,
}
impl Command for ResetSoftConfig {
    type Output = ();

    async fn execute<C: Connection + ?Sized>(
        self,
        connection: &mut C,
    ) -> Result<Self::Output, C::Error> {
        info!("Resetting vocoder with soft configuration {:?}", self.config);
        connection
            .handshake::<ReadyReplyPacket>(
                RESET_TIMEOUT,
                1,
                ResetSoftConfigPacket::new(ResetSoftConfigPayload {
                    config: self.config,
                    mask: self.mask,
                }),
            )
            .await?;
        Ok(())
    }
}

/// Initializes the encoder, decoder and/or echo canceller.
#[derive(Debug, Clone, Copy, Default)]
pub struct Initialize {
    pub flags: InitFlags,
}
impl Command for Initialize {
    type Output = ();

    async fn execute<C: Connection + ?Sized>(
        self,
        connection: &mut C,
    ) -> Result<Self::Output, C::Error> {
        debug!("Initializing {:?}", self.flags);
        set_field::<C, INIT, _>(connection, self.flags).await
    }
}

/// Reads the chip's product identification string.
#[derive(Debug, Clone, Copy)]
pub struct GetProductId;
impl Command for GetProductId {
    type Output = String;

    async fn execute<C: Connection + ?Sized>(
        self,
        connection: &mut C,
    ) -> Result<Self::Output, C::Error> {
        Ok(connection
            .handshake::<ProductIdReplyPacket>(
                CONTROL_TIMEOUT,
                CONTROL_RETRIES,
                ProductIdPacket::new(()),
            )
            .await?
            .payload)
    }
}

/// Reads the chip's firmware version string.
#[derive(Debug, Clone, Copy)]
pub struct GetVersion;
impl Command for GetVersion {
    type Output = String;

    async fn execute<C: Connection + ?Sized>(
        self,
        connection: &mut C,
    ) -> Result<Self::Output, C::Error> {
        Ok(connection
            .handshake::<VersionReplyPacket>(CONTROL_TIMEOUT, CONTROL_RETRIES, VersionPacket::new(()))
            .await?
            .payload)
    }
}

/// Selects an entry from the chip's built-in rate table.
#[derive(Debug, Clone, Copy)]
pub struct SetRateT {
    pub index: u8,
}
impl Command for SetRateT {
    type Output = ();

    async fn execute<C: Connection + ?Sized>(
        self,
        connection: &mut C,
    ) -> Result<Self::Output, C::Error> {
        debug!("Setting rate table index {}", self.index);
        set_field::<C, RATET, _>(connection, self.index).await
    }
}

/// Sets custom rate control words.
#[derive(Debug, Clone, Copy)]
pub struct SetRateP {
    pub rate: RateP,
}
impl Command for SetRateP {
    type Output = ();

    async fn execute<C: Connection + ?Sized>(
        self,
        connection: &mut C,
    ) -> Result<Self::Output, C::Error> {
        debug!("Setting rate control words {:04x?}", self.rate.0);
        set_field::<C, RATEP, _>(connection, self.rate).await
    }
}

/// Chooses which optional fields the chip adds to the channel packets it sends.
#[derive(Debug, Clone, Copy, Default)]
pub struct SetChannelFormat {
    pub format: PacketFormat,
}
impl Command for SetChannelFormat {
    type Output = ();

    async fn execute<C: Connection + ?Sized>(
        self,
        connection: &mut C,
    ) -> Result<Self::Output, C::Error> {
        set_field::<C, CHANFMT, _>(connection, self.format).await
    }
}

/// Chooses which optional fields the chip adds to the speech packets it sends.
#[derive(Debug, Clone, Copy, Default)]
pub struct SetSpeechFormat {
    pub format: PacketFormat,
}
impl Command for SetSpeechFormat {
    type Output = ();

    async fn execute<C: Connection + ?Sized>(
        self,
        connection: &mut C,
    ) -> Result<Self::Output, C::Error> {
        set_field::<C, SPCHFMT, _>(connection, self.format).await
    }
}

/// Sets the default encoder mode for every following frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct SetEncoderMode {
    pub mode: EcmodeIn,
}
impl Command for SetEncoderMode {
    type Output = ();

    async fn execute<C: Connection + ?Sized>(
        self,
        connection: &mut C,
    ) -> Result<Self::Output, C::Error> {
        set_field::<C, ECMODE, _>(connection, self.mode).await
    }
}

/// Sets the default decoder mode for every following frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct SetDecoderMode {
    pub mode: DcmodeIn,
}
impl Command for SetDecoderMode {
    type Output = ();

    async fn execute<C: Connection + ?Sized>(
        self,
        connection: &mut C,
    ) -> Result<Self::Output, C::Error> {
        set_field::<C, DCMODE, _>(connection, self.mode).await
    }
}

/// Reads back the configuration the chip is currently running with.
#[derive(Debug, Clone, Copy)]
pub struct ReadConfig;
impl Command for ReadConfig {
    type Output = SoftConfig;

    async fn execute<C: Connection + ?Sized>(
        self,
        connection: &mut C,
    ) -> Result<Self::Output, C::Error> {
        Ok(connection
            .handshake::<ReadConfigReplyPacket>(
                CONTROL_TIMEOUT,
                CONTROL_RETRIES,
                ReadConfigPacket::new(()),
            )
            .await?
            .payload)
    }
}

/// Turns parity fields on or off, on the chip and on the connection.
#[derive(Debug, Clone, Copy)]
pub struct SetParityMode {
    pub enabled: bool,
}
impl Command for SetParityMode {
    type Output = ();

    async fn execute<C: Connection + ?Sized>(
        self,
        connection: &mut C,
    ) -> Result<Self::Output, C::Error> {
        set_field::<C, PARITYMODE, _>(connection, u8::from(self.enabled)).await?;
        connection.set_parity(self.enabled);
        Ok(())
    }
}

/// Selects companding of the speech samples.
#[derive(Debug, Clone, Copy, Default)]
pub struct SetCompanding {
    pub companding: Companding,
}
impl Command for SetCompanding {
    type Output = ();

    async fn execute<C: Connection + ?Sized>(
        self,
        connection: &mut C,
    ) -> Result<Self::Output, C::Error> {
        set_field::<C, COMPAND, _>(connection, self.companding).await
    }
}

/// Sets the input and output gain in dB.
#[derive(Debug, Clone, Copy, Default)]
pub struct SetGain {
    pub input: i8,
    pub output: i8,
}
impl Command for SetGain {
    type Output = ();

    async fn execute<C: Connection + ?Sized>(
        self,
        connection: &mut C,
    ) -> Result<Self::Output, C::Error> {
        set_field::<C, GAIN, _>(
            connection,
            GainPayload {
                input: self.input,
                output: self.output,
            },
        )
        .await
    }
}

/// Enables or disables the chip's low power mode.
#[derive(Debug, Clone, Copy)]
pub struct SetLowPower {
    pub enabled: bool,
}
impl Command for SetLowPower {
    type Output = ();

    async fn execute<C: Connection + ?Sized>(
        self,
        connection: &mut C,
    ) -> Result<Self::Output, C::Error> {
        set_field::<C, LOWPOWER, _>(connection, u8::from(self.enabled)).await
    }
}
