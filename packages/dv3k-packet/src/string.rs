use core::ffi::CStr;

use alloc::{borrow::ToOwned, string::String};

use crate::decode::{Decode, DecodeError, DecodeErrorKind};

/// Null-terminated strings, as sent in the `PRODID` and `VERSTRING` replies.
impl Decode for String {
    fn decode(data: &mut &[u8]) -> Result<Self, DecodeError> {
        let cstr = CStr::from_bytes_until_nul(data)
            .map_err(|_| DecodeError::new::<Self>(DecodeErrorKind::UnterminatedString))?;

        let consumed = cstr.to_bytes_with_nul().len();
        let string = cstr
            .to_str()
            .map_err(|e| DecodeError::new::<Self>(e.into()))?
            .to_owned();

        *data = &data[consumed..];
        Ok(string)
    }
}
