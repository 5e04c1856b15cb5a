//! BER-TLV tag/length codec and tag-path lookup.
//!
//! Card responses are BER-TLV encoded. This module provides the small part
//! of BER-TLV the protocol needs: shortest-form length encoding, tag
//! parsing (including multi-byte tags) and a path-based value lookup that
//! can disambiguate sibling tags by occurrence index.

use std::fmt;

use bytes::{BufMut, BytesMut};

/// A BER-TLV tag.
///
/// Tags are one or more bytes: the first byte opens a multi-byte tag when
/// its low five bits are all set, and subsequent bytes continue while their
/// high bit is set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag(Vec<u8>);

impl Tag {
    /// Raw tag bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<u8> for Tag {
    fn from(byte: u8) -> Self {
        Self(vec![byte])
    }
}

impl From<&[u8]> for Tag {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl<const N: usize> From<[u8; N]> for Tag {
    fn from(bytes: [u8; N]) -> Self {
        Self(bytes.to_vec())
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(&self.0))
    }
}

/// Errors produced by the TLV codec.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TlvError {
    /// The requested tag is not present at the searched level.
    #[error("tag {0} not found")]
    TagNotFound(Tag),

    /// The reserved indefinite-length octet 0x80 was encountered.
    #[error("length cannot be 0x80")]
    UnsupportedLength80,

    /// The length field claims more than four length bytes.
    #[error("length cannot be more than 4 bytes")]
    LengthTooBig,

    /// The buffer ended inside a tag, length or value.
    #[error("unexpected end of TLV data")]
    UnexpectedEnd,
}

/// Find the value of the first occurrence of `path` within `raw`.
///
/// The search scans tag/length/value triples at the current level until the
/// head of `path` matches, then recurses into the matched value with the
/// rest of the path.
pub fn find_tag<'a>(raw: &'a [u8], path: &[Tag]) -> Result<&'a [u8], TlvError> {
    find_tag_n(raw, path, 0)
}

/// Find the value of the `nth` occurrence (0-based) of `path` within `raw`.
///
/// The occurrence counter applies to the final path element only, matching
/// how sibling tags (e.g. two `0x02` entries in a template) are selected.
pub fn find_tag_n<'a>(raw: &'a [u8], path: &[Tag], nth: usize) -> Result<&'a [u8], TlvError> {
    let Some((target, rest)) = path.split_first() else {
        return Ok(raw);
    };

    let mut input = raw;
    let mut occurrence = nth;

    loop {
        let tag = match parse_tag(&mut input) {
            Ok(tag) => tag,
            // Ran off the end of this level without a match.
            Err(TlvError::UnexpectedEnd) => return Err(TlvError::TagNotFound(target.clone())),
            Err(err) => return Err(err),
        };

        let length = parse_length(&mut input)? as usize;
        if input.len() < length {
            return Err(TlvError::UnexpectedEnd);
        }
        let (value, remainder) = input.split_at(length);
        input = remainder;

        if &tag == target {
            if rest.is_empty() {
                if occurrence > 0 {
                    occurrence -= 1;
                    continue;
                }
                return Ok(value);
            }

            return find_tag_n(value, rest, nth);
        }
    }
}

/// Parse a tag from the front of `input`, advancing it.
pub fn parse_tag(input: &mut &[u8]) -> Result<Tag, TlvError> {
    let first = read_byte(input)?;
    let mut tag = vec![first];

    if first & 0x1F != 0x1F {
        return Ok(Tag(tag));
    }

    loop {
        let next = read_byte(input)?;
        tag.push(next);

        if next & 0x80 != 0x80 {
            return Ok(Tag(tag));
        }
    }
}

/// Parse a BER length from the front of `input`, advancing it.
///
/// Accepts the short form (`0x00..=0x7F`) and the long forms `0x81..=0x84`.
/// The indefinite form `0x80` is reserved and rejected.
pub fn parse_length(input: &mut &[u8]) -> Result<u32, TlvError> {
    let first = read_byte(input)?;

    if first == 0x80 {
        return Err(TlvError::UnsupportedLength80);
    }

    if first > 0x80 {
        let length_size = (first - 0x80) as usize;
        if length_size > 4 {
            return Err(TlvError::LengthTooBig);
        }

        if input.len() < length_size {
            return Err(TlvError::UnexpectedEnd);
        }

        let mut length = 0u32;
        for _ in 0..length_size {
            length = (length << 8) | read_byte(input)? as u32;
        }

        return Ok(length);
    }

    Ok(first as u32)
}

/// Append `length` in the shortest legal BER form.
pub fn write_length(buf: &mut BytesMut, length: u32) {
    if length < 0x80 {
        buf.put_u8(length as u8);
    } else if length < 0x100 {
        buf.put_u8(0x81);
        buf.put_u8(length as u8);
    } else if length < 0x1_0000 {
        buf.put_u8(0x82);
        buf.put_u16(length as u16);
    } else if length < 0x100_0000 {
        buf.put_u8(0x83);
        buf.put_u8((length >> 16) as u8);
        buf.put_u16(length as u16);
    } else {
        buf.put_u8(0x84);
        buf.put_u32(length);
    }
}

/// Append a complete tag/length/value triple.
pub fn write_tlv(buf: &mut BytesMut, tag: &Tag, value: &[u8]) {
    buf.put_slice(tag.as_bytes());
    write_length(buf, value.len() as u32);
    buf.put_slice(value);
}

fn read_byte(input: &mut &[u8]) -> Result<u8, TlvError> {
    let (&byte, rest) = input.split_first().ok_or(TlvError::UnexpectedEnd)?;
    *input = rest;
    Ok(byte)
}
