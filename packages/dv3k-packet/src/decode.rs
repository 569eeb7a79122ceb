use alloc::vec::Vec;
use core::str::Utf8Error;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub struct DecodeError {
    kind: DecodeErrorKind,
    type_name: &'static str,
}

impl DecodeError {
    pub fn new<T>(kind: DecodeErrorKind) -> Self {
        Self {
            kind,
            type_name: core::any::type_name::<T>(),
        }
    }

    pub const fn kind(&self) -> DecodeErrorKind {
        self.kind
    }
}

impl core::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Failed to decode {}: {}", self.type_name, self.kind)
    }
}

#[derive(Error, Clone, Copy, Debug, PartialEq, Eq)]
pub enum DecodeErrorKind {
    #[error("Packet was too short.")]
    UnexpectedEnd,

    #[error(
        "Could not decode {name} with unexpected byte. Found {value:x}, expected one of: {expected:x?}."
    )]
    UnexpectedByte {
        name: &'static str,
        value: u8,
        expected: &'static [u8],
    },

    #[error("Parity byte mismatch. Found {value:x}, expected {expected:x}.")]
    Parity { value: u8, expected: u8 },

    #[error("Packet did not start with a valid start byte.")]
    InvalidHeader,

    #[error("Header declares {declared} bytes of fields, but only {available} were received.")]
    Length { declared: usize, available: usize },

    #[error("String ran past expected null terminator.")]
    UnterminatedString,

    #[error(transparent)]
    Utf8Error(#[from] Utf8Error),
}

impl<T: Decode> DecodeWithLength for Vec<T> {
    fn decode_with_len(data: &mut &[u8], len: usize) -> Result<Self, DecodeError> {
        let mut vec = Vec::with_capacity(len);
        for _ in 0..len {
            vec.push(T::decode(data)?);
        }
        Ok(vec)
    }
}

/// A type that can be reconstructed (decoded) from a raw sequence of bytes.
///
/// The input slice will be advanced by the number of bytes successfully
/// consumed during decoding.
pub trait Decode {
    /// Attempts to decode `Self` from the beginning of the provided byte slice.
    ///
    /// # Errors
    ///
    /// Returns a [`DecodeError`] if the input is malformed or insufficient
    /// to decode a complete value of this type.
    fn decode(data: &mut &[u8]) -> Result<Self, DecodeError>
    where
        Self: Sized;
}

/// A type that can be decoded from a sequence of bytes, given the number of
/// items contained within the type.
///
/// This is used for the length-prefixed sample and bit arrays carried by
/// speech and channel fields.
pub trait DecodeWithLength {
    /// Attempts to decode `Self` from the provided byte slice, consuming exactly
    /// `len` items.
    ///
    /// # Errors
    ///
    /// Returns a [`DecodeError`] if the input is malformed or insufficient
    /// to decode a complete value of this type.
    fn decode_with_len(data: &mut &[u8], len: usize) -> Result<Self, DecodeError>
    where
        Self: Sized;
}

impl Decode for () {
    fn decode(_data: &mut &[u8]) -> Result<Self, DecodeError> {
        Ok(())
    }
}

macro_rules! impl_decode_for_primitive {
    ($($t:ty),*) => {
        $(
            impl Decode for $t {
                fn decode(data: &mut &[u8]) -> Result<Self, DecodeError> {
                    let (bytes, rest) = data
                        .split_first_chunk::<{ size_of::<$t>() }>()
                        .ok_or_else(|| DecodeError::new::<Self>(DecodeErrorKind::UnexpectedEnd))?;
                    *data = rest;
                    Ok(Self::from_be_bytes(*bytes))
                }
            }
        )*
    };
}

impl_decode_for_primitive!(u8, u16, u32, i8, i16, i32);

impl<const N: usize> Decode for [u8; N] {
    fn decode(data: &mut &[u8]) -> Result<Self, DecodeError> {
        let (bytes, rest) = data
            .split_first_chunk::<N>()
            .ok_or_else(|| DecodeError::new::<Self>(DecodeErrorKind::UnexpectedEnd))?;
        *data = rest;
        Ok(*bytes)
    }
}

/// Reads a single field identifier and checks it against `expected`.
pub(crate) fn expect_field<T>(
    data: &mut &[u8],
    name: &'static str,
    expected: &'static [u8],
) -> Result<u8, DecodeError> {
    let value = u8::decode(data)?;
    if !expected.contains(&value) {
        return Err(DecodeError::new::<T>(DecodeErrorKind::UnexpectedByte {
            name,
            value,
            expected,
        }));
    }
    Ok(value)
}
