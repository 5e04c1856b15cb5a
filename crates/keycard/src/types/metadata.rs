use std::collections::BTreeSet;

use bytes::{BufMut, Bytes, BytesMut};
use keycard_apdu::tlv::{parse_length, write_length};

use crate::error::{Error, Result};

const METADATA_VERSION: u8 = 1;
const MAX_NAME_LEN: usize = 20;

/// Card metadata stored in the public data record: a short wallet name and
/// the set of wallet paths known to live on the card.
///
/// Paths are kept as an ordered set; the wire form run-length encodes them
/// as `(start, count)` pairs whenever consecutive values differ by exactly
/// one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    name: String,
    paths: BTreeSet<u32>,
}

impl Metadata {
    /// Create metadata with the given name and wallet paths.
    pub fn new(name: &str, paths: impl IntoIterator<Item = u32>) -> Result<Self> {
        if name.len() > MAX_NAME_LEN {
            return Err(Error::InvalidData("name longer than 20 chars"));
        }

        Ok(Self {
            name: name.to_string(),
            paths: paths.into_iter().collect(),
        })
    }

    /// Parse serialized metadata.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let (&header, mut input) = data
            .split_first()
            .ok_or(Error::InvalidData("empty metadata"))?;

        if header >> 5 != METADATA_VERSION {
            return Err(Error::InvalidData("unsupported metadata version"));
        }

        let name_len = (header & 0x1F) as usize;
        if input.len() < name_len {
            return Err(Error::InvalidData("truncated metadata name"));
        }
        let name = std::str::from_utf8(&input[..name_len])
            .map_err(|_| Error::InvalidData("metadata name is not UTF-8"))?
            .to_string();
        input = &input[name_len..];

        let mut paths = BTreeSet::new();
        while !input.is_empty() {
            let start = parse_length(&mut input)?;
            let count = parse_length(&mut input)?;
            let end = start
                .checked_add(count)
                .ok_or(Error::InvalidData("path run overflows u32"))?;
            paths.extend(start..=end);
        }

        Ok(Self { name, paths })
    }

    /// The wallet name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The wallet paths in ascending order.
    pub fn paths(&self) -> impl Iterator<Item = u32> + '_ {
        self.paths.iter().copied()
    }

    /// Record a wallet path.
    pub fn add_path(&mut self, path: u32) {
        self.paths.insert(path);
    }

    /// Forget a wallet path.
    pub fn remove_path(&mut self, path: u32) {
        self.paths.remove(&path);
    }

    /// Serialize to the wire form.
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::new();
        buf.put_u8((METADATA_VERSION << 5) | self.name.len() as u8);
        buf.put_slice(self.name.as_bytes());

        let mut paths = self.paths.iter().copied();
        let Some(mut start) = paths.next() else {
            return buf.freeze();
        };
        let mut count = 0u32;

        for path in paths {
            if path == start + count + 1 {
                count += 1;
            } else {
                write_length(&mut buf, start);
                write_length(&mut buf, count);
                start = path;
                count = 0;
            }
        }

        write_length(&mut buf, start);
        write_length(&mut buf, count);

        buf.freeze()
    }
}
