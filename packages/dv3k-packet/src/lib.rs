//! Implementation of the DVSI AMBE-3000R packet protocol in Rust.
//!
//! The AMBE-3000R vocoder chip (found in the DV3000 and ThumbDV USB dongles) is driven over a
//! UART using a simple framed packet format. Every packet, in both directions, looks like this:
//!
//! | Field    | Size | Description |
//! |----------|------|-------------|
//! | `start`  | 1    | Must be [`START_BYTE`]. |
//! | `length` | 2    | Big-endian number of bytes following the `type` byte. |
//! | `type`   | 1    | A [`PacketType`]. |
//! | `fields` | n    | A sequence of field identifiers, each followed by its data. |
//!
//! This crate is structured around two traits: [`Encode`] and [`Decode`]. Every device-bound
//! packet implements [`Encode`] and every host-bound packet implements [`Decode`].

#![no_std]

extern crate alloc;

pub mod channel;
pub mod control;
pub mod speech;

mod decode;
mod encode;
mod flags;
mod header;
mod parity;
mod string;

pub use decode::{Decode, DecodeError, DecodeErrorKind, DecodeWithLength};
pub use encode::Encode;
pub use flags::{DcmodeIn, DcmodeOut, EcmodeIn, EcmodeOut};
pub use header::{PacketHeader, PacketType, Reply};
pub use parity::{append_parity, parity};

/// First byte of every packet, in both directions.
pub const START_BYTE: u8 = 0x61;

/// Size of the fixed packet header (start byte, length, type).
pub const HEADER_SIZE: usize = 4;

/// Number of 16-bit PCM samples in a standard 20ms speech frame at 8kHz.
pub const SAMPLES_PER_FRAME: usize = 160;
