use derive_more::Display;

use crate::error::Error;

/// Application version (major.minor).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display)]
#[display("{}.{}", major, minor)]
pub struct Version {
    pub major: u8,
    pub minor: u8,
}

impl TryFrom<&[u8]> for Version {
    type Error = Error;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        match value {
            [major, minor] => Ok(Self {
                major: *major,
                minor: *minor,
            }),
            _ => Err(Error::InvalidData("version must be 2 bytes")),
        }
    }
}
