//! APDU command units.
//!
//! A command is the five-byte header `CLA INS P1 P2 Lc` followed by `Lc`
//! data bytes and an optional expected-length byte `Le`. `Lc` is omitted
//! from the wire when the command carries no data; `Le = 0` means "up to
//! 256 bytes".

use bytes::{BufMut, Bytes, BytesMut};

/// A serializable APDU command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Command class byte.
    pub cla: u8,
    /// Instruction byte.
    pub ins: u8,
    /// Parameter 1.
    pub p1: u8,
    /// Parameter 2.
    pub p2: u8,
    /// Command data, omitted from the wire when empty.
    pub data: Option<Bytes>,
    /// Expected response length; `Some(0)` requests up to 256 bytes.
    pub le: Option<u8>,
}

impl Command {
    /// Create a new command with just the header bytes.
    pub const fn new(cla: u8, ins: u8, p1: u8, p2: u8) -> Self {
        Self {
            cla,
            ins,
            p1,
            p2,
            data: None,
            le: None,
        }
    }

    /// Create a new command with a data payload.
    pub fn new_with_data<T: Into<Bytes>>(cla: u8, ins: u8, p1: u8, p2: u8, data: T) -> Self {
        Self::new(cla, ins, p1, p2).with_data(data)
    }

    /// Set the data field.
    pub fn with_data<T: Into<Bytes>>(mut self, data: T) -> Self {
        let data = data.into();
        self.data = (!data.is_empty()).then_some(data);
        self
    }

    /// Set the expected length field.
    pub const fn with_le(mut self, le: u8) -> Self {
        self.le = Some(le);
        self
    }

    /// Command data, empty when none is set.
    pub fn data(&self) -> &[u8] {
        self.data.as_deref().unwrap_or(&[])
    }

    /// Serialize to raw wire bytes.
    pub fn to_bytes(&self) -> Bytes {
        let data_len = self.data.as_ref().map_or(0, |data| data.len());
        let mut buf = BytesMut::with_capacity(4 + 1 + data_len + 1);

        buf.put_u8(self.cla);
        buf.put_u8(self.ins);
        buf.put_u8(self.p1);
        buf.put_u8(self.p2);

        if let Some(data) = &self.data {
            buf.put_u8(data.len() as u8);
            buf.put_slice(data);
        }

        if let Some(le) = self.le {
            buf.put_u8(le);
        }

        buf.freeze()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn test_header_only() {
        let cmd = Command::new(0x80, 0xD4, 0x00, 0x00);
        assert_eq!(cmd.to_bytes(), hex!("80 D4 00 00").as_slice());
    }

    #[test]
    fn test_with_data() {
        let cmd = Command::new_with_data(0x80, 0x20, 0x00, 0x00, b"123456".as_slice());
        assert_eq!(
            cmd.to_bytes(),
            hex!("80 20 00 00 06 31 32 33 34 35 36").as_slice()
        );
    }

    #[test]
    fn test_with_data_and_le() {
        let cmd = Command::new_with_data(0x00, 0xA4, 0x04, 0x00, hex!("A000000151").as_slice())
            .with_le(0);
        assert_eq!(
            cmd.to_bytes(),
            hex!("00 A4 04 00 05 A0 00 00 01 51 00").as_slice()
        );
    }

    #[test]
    fn test_empty_data_omits_lc() {
        let cmd = Command::new(0x80, 0xF2, 0x00, 0x00).with_data(Bytes::new());
        assert_eq!(cmd.to_bytes(), hex!("80 F2 00 00").as_slice());
    }
}
