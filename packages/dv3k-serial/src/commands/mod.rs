use std::{future::Future, time::Duration};

use dv3k_packet::control::{rates, InitFlags, RateP};
use log::info;

use crate::Connection;

pub mod control;
pub mod vocoder;

use control::{GetProductId, GetVersion, Initialize, Reset, SetRateP, SetRateT};

/// How long to wait for a reply to a control packet.
pub const CONTROL_TIMEOUT: Duration = Duration::from_millis(500);

/// How many times a control packet is resent before giving up.
pub const CONTROL_RETRIES: usize = 2;

/// How long to wait for the chip to come back after a reset.
pub const RESET_TIMEOUT: Duration = Duration::from_secs(5);

/// How long to wait for an encoded or decoded frame.
pub const FRAME_TIMEOUT: Duration = Duration::from_secs(1);

pub trait Command {
    type Output;

    fn execute<C: Connection + ?Sized>(
        self,
        connection: &mut C,
    ) -> impl Future<Output = Result<Self::Output, C::Error>>;
}

/// Vocoder rate, either from the chip's rate table or as custom rate control words.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Rate {
    Table(u8),
    Custom(RateP),
}

impl Rate {
    /// The rate used by DMR, NXDN and P25 phase 2.
    pub const DMR: Self = Self::Table(rates::AMBE_2450_1150);

    /// The rate used by D-STAR.
    pub const DSTAR: Self = Self::Custom(RateP::DSTAR);
}

/// Identification strings read from the chip.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct DeviceInfo {
    pub product_id: String,
    pub version: String,
}

/// Brings a freshly opened chip into a known state.
///
/// The chip is reset, identified, switched to `rate`, and then has the parts selected by `init`
/// initialized.
#[derive(Debug, Clone, Copy)]
pub struct Configure {
    pub rate: Rate,
    pub init: InitFlags,
}

impl Configure {
    pub fn new(rate: Rate) -> Self {
        Self {
            rate,
            init: InitFlags::default(),
        }
    }
}

impl Command for Configure {
    type Output = DeviceInfo;

    async fn execute<C: Connection + ?Sized>(
        self,
        connection: &mut C,
    ) -> Result<Self::Output, C::Error> {
        connection.execute_command(Reset).await?;

        let product_id = connection.execute_command(GetProductId).await?;
        let version = connection.execute_command(GetVersion).await?;
        info!("Connected to {} ({})", product_id, version);

        match self.rate {
            Rate::Table(index) => connection.execute_command(SetRateT { index }).await?,
            Rate::Custom(rate) => connection.execute_command(SetRateP { rate }).await?,
        }

        connection
            .execute_command(Initialize { flags: self.init })
            .await?;

        Ok(DeviceInfo {
            product_id,
            version,
        })
    }
}
