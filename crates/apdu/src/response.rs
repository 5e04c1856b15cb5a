//! APDU response units and status words.

use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};
use tracing::trace;

use crate::status;

/// Status word (SW1 ‖ SW2) carried at the end of every response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatusWord(pub u16);

impl StatusWord {
    /// Create from the two raw status bytes.
    pub const fn new(sw1: u8, sw2: u8) -> Self {
        Self(((sw1 as u16) << 8) | sw2 as u16)
    }

    /// The full 16-bit value.
    pub const fn to_u16(self) -> u16 {
        self.0
    }

    /// Whether this status word indicates success (`0x9000`).
    pub const fn is_success(self) -> bool {
        self.0 == status::SW_OK
    }

    /// Whether more response data is available (`0x61xx`), with the count.
    pub const fn more_data_available(self) -> Option<u8> {
        if self.0 & 0xFF00 == 0x6100 {
            Some(self.0 as u8)
        } else {
            None
        }
    }

    /// Remaining attempts for retry-counter failures (`0x63Cx`).
    pub const fn retry_counter(self) -> Option<u8> {
        if self.0 & 0xFFF0 == status::SW_RETRY_COUNTER_MASK {
            Some((self.0 & 0x000F) as u8)
        } else {
            None
        }
    }
}

impl From<u16> for StatusWord {
    fn from(sw: u16) -> Self {
        Self(sw)
    }
}

impl fmt::Display for StatusWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06X}", self.0)
    }
}

/// Error returned when a response buffer cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("response must be at least 2 bytes, got {len}")]
pub struct ResponseError {
    /// Length of the malformed buffer.
    pub len: usize,
}

/// A parsed APDU response: payload data followed by the status word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    data: Bytes,
    sw: StatusWord,
}

impl Response {
    /// Create a response from payload and status word.
    pub fn new(data: impl Into<Bytes>, sw: impl Into<StatusWord>) -> Self {
        Self {
            data: data.into(),
            sw: sw.into(),
        }
    }

    /// Parse a raw response; the trailing two bytes are the big-endian SW.
    pub fn from_bytes(raw: &[u8]) -> Result<Self, ResponseError> {
        if raw.len() < 2 {
            return Err(ResponseError { len: raw.len() });
        }

        let (data, sw) = raw.split_at(raw.len() - 2);
        let sw = StatusWord::new(sw[0], sw[1]);
        trace!(%sw, data_len = data.len(), "parsed response unit");

        Ok(Self {
            data: Bytes::copy_from_slice(data),
            sw,
        })
    }

    /// Response payload without the status word.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Consume the response, keeping only the payload.
    pub fn into_data(self) -> Bytes {
        self.data
    }

    /// The status word.
    pub const fn sw(&self) -> StatusWord {
        self.sw
    }

    /// Whether the status word is `0x9000`.
    pub const fn is_success(&self) -> bool {
        self.sw.is_success()
    }

    /// Re-serialize to `data ‖ sw`.
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.data.len() + 2);
        buf.put_slice(&self.data);
        buf.put_u16(self.sw.to_u16());
        buf.freeze()
    }
}
