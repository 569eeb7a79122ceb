use crate::{
    control::fields::PARITY,
    decode::{Decode, DecodeError, DecodeErrorKind},
    encode::Encode,
    parity::parity,
    HEADER_SIZE, START_BYTE,
};

/// The kind of a packet, sent as the fourth byte of every packet.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum PacketType {
    /// Configuration and status packets.
    Control = 0x00,
    /// Compressed (AMBE) channel data.
    Channel = 0x01,
    /// Uncompressed PCM speech data.
    Speech = 0x02,
}

impl Decode for PacketType {
    fn decode(data: &mut &[u8]) -> Result<Self, DecodeError> {
        match u8::decode(data)? {
            0x00 => Ok(Self::Control),
            0x01 => Ok(Self::Channel),
            0x02 => Ok(Self::Speech),
            v => Err(DecodeError::new::<Self>(DecodeErrorKind::UnexpectedByte {
                name: "PacketType",
                value: v,
                expected: &[0x00, 0x01, 0x02],
            })),
        }
    }
}

/// The fixed four byte header that begins every packet.
///
/// The transport reads this first to learn how many more bytes belong to the packet.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct PacketHeader {
    /// Number of bytes following the header.
    pub length: u16,
    pub packet_type: PacketType,
}

impl PacketHeader {
    /// Total size of the packet this header describes, header included.
    pub const fn packet_size(&self) -> usize {
        HEADER_SIZE + self.length as usize
    }
}

impl Decode for PacketHeader {
    fn decode(data: &mut &[u8]) -> Result<Self, DecodeError> {
        if u8::decode(data)? != START_BYTE {
            return Err(DecodeError::new::<Self>(DecodeErrorKind::InvalidHeader));
        }

        let length = u16::decode(data)?;
        let packet_type = PacketType::decode(data)?;

        Ok(Self {
            length,
            packet_type,
        })
    }
}

/// A host-bound packet that the transport can pick out of the incoming byte stream.
pub trait Reply: Decode {
    /// Type of packet this reply arrives as.
    const PACKET_TYPE: PacketType;

    /// Field identifier the reply always starts with, if any.
    const FIRST_FIELD: Option<u8> = None;

    /// Cheaply checks whether `data` looks like this reply, without decoding it.
    fn has_valid_header(data: &[u8]) -> bool {
        let Some(header) = data.get(0..HEADER_SIZE) else {
            return false;
        };

        if header[0] != START_BYTE || header[3] != Self::PACKET_TYPE as u8 {
            return false;
        }

        match Self::FIRST_FIELD {
            Some(field) => data.get(HEADER_SIZE) == Some(&field),
            None => true,
        }
    }
}

/// Writes the packet header and lets `fields_fn` fill in the remaining bytes.
///
/// `data` must be exactly as long as the packet.
pub(crate) fn frame_packet(
    packet_type: PacketType,
    data: &mut [u8],
    fields_fn: impl FnOnce(&mut [u8]),
) {
    let length = (data.len() - HEADER_SIZE) as u16;

    data[0] = START_BYTE;
    length.encode(&mut data[1..]);
    data[3] = packet_type as u8;

    fields_fn(&mut data[HEADER_SIZE..]);
}

/// Decodes the header of a host-bound packet of type `T`, checking its type.
///
/// On success, `data` is advanced past the whole packet and the packet's field bytes are returned
/// alongside the complete packet (used for parity checking).
pub(crate) fn decode_frame<'a, T>(
    data: &mut &'a [u8],
    expected_type: PacketType,
) -> Result<(&'a [u8], &'a [u8]), DecodeError> {
    let original_data = *data;

    let header = PacketHeader::decode(data)
        .map_err(|e| DecodeError::new::<T>(e.kind()))?;

    if header.packet_type != expected_type {
        return Err(DecodeError::new::<T>(DecodeErrorKind::UnexpectedByte {
            name: "type",
            value: header.packet_type as u8,
            expected: match expected_type {
                PacketType::Control => &[0x00],
                PacketType::Channel => &[0x01],
                PacketType::Speech => &[0x02],
            },
        }));
    }

    let packet = original_data.get(..header.packet_size()).ok_or_else(|| {
        DecodeError::new::<T>(DecodeErrorKind::Length {
            declared: header.length as usize,
            available: original_data.len() - HEADER_SIZE,
        })
    })?;

    *data = &original_data[header.packet_size()..];

    Ok((packet, &packet[HEADER_SIZE..]))
}

/// Checks whatever remains after a packet's known fields.
///
/// The only thing allowed to follow is a parity field, which must match the packet contents.
pub(crate) fn finish_fields<T>(packet: &[u8], rest: &[u8]) -> Result<(), DecodeError> {
    match rest {
        [] => Ok(()),
        [PARITY, value] => {
            // XOR of everything between the start byte and the parity value itself.
            let expected = parity(&packet[1..packet.len() - 1]);
            if *value != expected {
                return Err(DecodeError::new::<T>(DecodeErrorKind::Parity {
                    value: *value,
                    expected,
                }));
            }
            Ok(())
        }
        [PARITY] => Err(DecodeError::new::<T>(DecodeErrorKind::UnexpectedEnd)),
        [field, ..] => Err(DecodeError::new::<T>(DecodeErrorKind::UnexpectedByte {
            name: "field",
            value: *field,
            expected: &[PARITY],
        })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header() {
        let mut data: &[u8] = &[0x61, 0x00, 0x0B, 0x01, 0xAA];
        let header = PacketHeader::decode(&mut data).unwrap();

        assert_eq!(header.length, 11);
        assert_eq!(header.packet_type, PacketType::Channel);
        assert_eq!(header.packet_size(), 15);
        assert_eq!(data, &[0xAA]);
    }

    #[test]
    fn bad_start_byte() {
        let mut data: &[u8] = &[0x62, 0x00, 0x01, 0x00, 0x33];

        assert_eq!(
            PacketHeader::decode(&mut data).unwrap_err().kind(),
            DecodeErrorKind::InvalidHeader
        );
    }

    #[test]
    fn truncated_packet() {
        let mut data: &[u8] = &[0x61, 0x00, 0x05, 0x00, 0x39, 0x00];

        assert_eq!(
            decode_frame::<()>(&mut data, PacketType::Control)
                .unwrap_err()
                .kind(),
            DecodeErrorKind::Length {
                declared: 5,
                available: 2
            }
        );
    }

    #[test]
    fn trailing_parity() {
        let packet = [0x61, 0x00, 0x03, 0x00, 0x39, 0x2F, 0x15];
        assert!(finish_fields::<()>(&packet, &packet[5..]).is_ok());

        let packet = [0x61, 0x00, 0x03, 0x00, 0x39, 0x2F, 0x16];
        assert_eq!(
            finish_fields::<()>(&packet, &packet[5..]).unwrap_err().kind(),
            DecodeErrorKind::Parity {
                value: 0x16,
                expected: 0x15
            }
        );
    }
}
