//! BIP32 derivation path parsing and wire encoding.
//!
//! Paths are written `m/44'/60'/0'/0/0`. The leading token selects the
//! derivation source: `m` derives from the master key, `..` from the
//! parent, and no prefix from the current key. An apostrophe hardens the
//! segment by setting bit 31. On the wire a path is the concatenation of
//! its segments as big-endian `u32`s.

use std::fmt;
use std::str::FromStr;

use crate::constants::p1;
use crate::error::Error;

/// First index of the hardened range (2^31).
pub const HARDENED_START: u32 = 0x8000_0000;

/// Where a derivation starts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Source {
    /// Derive from the master key (`m/...`).
    Master,
    /// Derive from the parent of the current key (`../...`).
    Parent,
    /// Derive from the current key (no prefix).
    #[default]
    Current,
}

impl Source {
    /// The P1 source bits used by DERIVE KEY and EXPORT KEY.
    pub(crate) const fn p1(self) -> u8 {
        match self {
            Self::Master => p1::DERIVE_FROM_MASTER,
            Self::Parent => p1::DERIVE_FROM_PARENT,
            Self::Current => p1::DERIVE_FROM_CURRENT,
        }
    }
}

/// A parsed derivation path: a source and zero or more `u32` segments.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KeyPath {
    source: Source,
    segments: Vec<u32>,
}

impl KeyPath {
    /// Build a path from raw segments, e.g. the key-path form of GET STATUS.
    pub fn from_segments(source: Source, segments: Vec<u32>) -> Self {
        Self { source, segments }
    }

    /// The derivation source.
    pub const fn source(&self) -> Source {
        self.source
    }

    /// The path segments, hardened flag included.
    pub fn segments(&self) -> &[u32] {
        &self.segments
    }

    /// Whether the path starts from the master key.
    pub const fn is_absolute(&self) -> bool {
        matches!(self.source, Source::Master)
    }

    /// Wire form: concatenated big-endian `u32` segments.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.segments
            .iter()
            .flat_map(|segment| segment.to_be_bytes())
            .collect()
    }
}

impl FromStr for KeyPath {
    type Err = Error;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let (source, rest) = match input {
            "" => return Ok(Self::default()),
            "m" => return Ok(Self::from_segments(Source::Master, Vec::new())),
            ".." => return Ok(Self::from_segments(Source::Parent, Vec::new())),
            _ => {
                if let Some(rest) = input.strip_prefix("m/") {
                    (Source::Master, rest)
                } else if let Some(rest) = input.strip_prefix("../") {
                    (Source::Parent, rest)
                } else {
                    (Source::Current, input)
                }
            }
        };

        let segments = rest
            .split('/')
            .map(parse_segment)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { source, segments })
    }
}

fn parse_segment(token: &str) -> Result<u32, Error> {
    let (digits, hardened) = match token.strip_suffix('\'') {
        Some(digits) => (digits, true),
        None => (token, false),
    };

    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::BadDerivationPath(format!(
            "expected number, got {token:?}"
        )));
    }

    let index = digits
        .parse::<u32>()
        .map_err(|_| Error::BadDerivationPath(format!("index {digits} out of range")))?;

    if index >= HARDENED_START {
        return Err(Error::BadDerivationPath(format!(
            "index must be lower than 2^31, got {index}"
        )));
    }

    Ok(if hardened { index | HARDENED_START } else { index })
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut needs_separator = match self.source {
            Source::Master => {
                f.write_str("m")?;
                true
            }
            Source::Parent => {
                f.write_str("..")?;
                true
            }
            Source::Current => false,
        };

        for &segment in &self.segments {
            if needs_separator {
                f.write_str("/")?;
            }
            needs_separator = true;

            if segment >= HARDENED_START {
                write!(f, "{}'", segment - HARDENED_START)?;
            } else {
                write!(f, "{segment}")?;
            }
        }

        Ok(())
    }
}
