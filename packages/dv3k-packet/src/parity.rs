use alloc::vec::Vec;

use crate::{control::fields::PARITY, HEADER_SIZE};

/// Computes the parity byte over `data`.
///
/// The chip's parity is a plain XOR of every byte following the start byte, up to and including the
/// [`PARITY`] field identifier.
pub fn parity(data: &[u8]) -> u8 {
    data.iter().fold(0, |acc, byte| acc ^ byte)
}

/// Appends a parity field to an already encoded packet, fixing up its length.
///
/// The chip requires this on every device-bound packet once parity mode is enabled.
pub fn append_parity(packet: &mut Vec<u8>) {
    debug_assert!(packet.len() >= HEADER_SIZE);

    let length = u16::from_be_bytes([packet[1], packet[2]]) + 2;
    packet[1..3].copy_from_slice(&length.to_be_bytes());

    packet.push(PARITY);
    let value = parity(&packet[1..]);
    packet.push(value);
}
