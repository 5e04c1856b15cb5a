use std::fmt;

use keycard_apdu::tlv::{find_tag, find_tag_n, Tag};
use keycard_apdu::TlvError;

use crate::constants::tags;
use crate::error::{Error, Result};
use crate::types::{Capabilities, Version};

/// Application info returned by SELECT.
#[derive(Debug, Clone)]
pub struct ApplicationInfo {
    /// Whether the applet is installed on the card.
    pub installed: bool,
    /// Whether the applet has been initialized with credentials.
    pub initialized: bool,
    /// Instance UID (16 bytes).
    pub instance_uid: [u8; 16],
    /// Secure-channel public key, when the card has one.
    pub public_key: Option<k256::PublicKey>,
    /// Applet version.
    pub version: Version,
    /// Number of remaining pairing slots.
    pub available_slots: u8,
    /// SHA-256 of the master public key; `None` when no key is loaded.
    pub key_uid: Option<[u8; 32]>,
    /// Supported capabilities.
    pub capabilities: Capabilities,
}

impl ApplicationInfo {
    /// Info for a card that does not have the applet installed.
    pub(crate) fn not_installed() -> Self {
        Self {
            installed: false,
            initialized: false,
            instance_uid: [0; 16],
            public_key: None,
            version: Version::default(),
            available_slots: 0,
            key_uid: None,
            capabilities: Capabilities::from(0),
        }
    }

    /// Info for an installed but uninitialized card.
    pub(crate) fn pre_initialized(public_key: Option<k256::PublicKey>) -> Self {
        Self {
            installed: true,
            public_key,
            ..Self::not_installed()
        }
    }
}

/// The two shapes a successful SELECT response can take.
#[derive(Debug)]
pub enum SelectResponse {
    /// Initialized card: full application info template.
    Initialized(ApplicationInfo),
    /// Pre-initialized card: only the secure-channel public key, which
    /// older applets may omit entirely.
    PreInitialized(Option<k256::PublicKey>),
}

impl SelectResponse {
    /// Parse a SELECT response payload.
    pub fn parse(data: &[u8]) -> Result<Self> {
        match data.first() {
            Some(&tags::TEMPLATE_APPLICATION_INFO) => {
                Ok(Self::Initialized(parse_application_info(data)?))
            }
            Some(&tags::ECC_PUBLIC_KEY) => {
                let raw = find_tag(data, &[Tag::from(tags::ECC_PUBLIC_KEY)])?;
                Ok(Self::PreInitialized(parse_public_key(raw)?))
            }
            _ => Err(Error::InvalidData("unknown select response template")),
        }
    }
}

fn parse_application_info(data: &[u8]) -> Result<ApplicationInfo> {
    let template = Tag::from(tags::TEMPLATE_APPLICATION_INFO);

    let instance_uid: [u8; 16] =
        find_tag(data, &[template.clone(), Tag::from(tags::INSTANCE_UID)])?
            .try_into()
            .map_err(|_| Error::InvalidData("instance UID must be 16 bytes"))?;

    let public_key = parse_public_key(find_tag(
        data,
        &[template.clone(), Tag::from(tags::ECC_PUBLIC_KEY)],
    )?)?;

    // two sibling 0x02 tags: the version comes first, the slot count second
    let version =
        Version::try_from(find_tag(data, &[template.clone(), Tag::from(tags::OTHER)])?)?;
    let available_slots =
        match find_tag_n(data, &[template.clone(), Tag::from(tags::OTHER)], 1)? {
            [slots] => *slots,
            _ => return Err(Error::InvalidData("available slots must be 1 byte")),
        };

    let key_uid = match find_tag(data, &[template.clone(), Tag::from(tags::KEY_UID)])? {
        [] => None,
        uid => Some(
            uid.try_into()
                .map_err(|_| Error::InvalidData("key UID must be 32 bytes"))?,
        ),
    };

    // absent on older applets, which support everything
    let capabilities = match find_tag(data, &[template, Tag::from(tags::CAPABILITIES)]) {
        Ok([bits]) => Capabilities::from(*bits),
        Ok(_) => return Err(Error::InvalidData("capabilities must be 1 byte")),
        Err(TlvError::TagNotFound(_)) => Capabilities::all(),
        Err(err) => return Err(err.into()),
    };

    Ok(ApplicationInfo {
        installed: true,
        initialized: true,
        instance_uid,
        public_key,
        version,
        available_slots,
        key_uid,
        capabilities,
    })
}

fn parse_public_key(raw: &[u8]) -> Result<Option<k256::PublicKey>> {
    match raw.len() {
        0 => Ok(None),
        65 => Ok(Some(k256::PublicKey::from_sec1_bytes(raw)?)),
        _ => Err(Error::InvalidData("public key must be 65 bytes")),
    }
}

impl fmt::Display for ApplicationInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Application Info:")?;
        writeln!(f, "  Instance UID: {}", hex::encode(self.instance_uid))?;
        writeln!(f, "  Version: {}", self.version)?;
        writeln!(f, "  Remaining pairing slots: {}", self.available_slots)?;

        match &self.key_uid {
            Some(key_uid) => writeln!(f, "  Key UID: {}", hex::encode(key_uid))?,
            None => writeln!(f, "  Key UID: None (use GENERATE KEY)")?,
        }

        writeln!(f, "  Capabilities: {}", self.capabilities)?;

        write!(f, "  Secure channel public key: ")?;
        match &self.public_key {
            Some(public_key) => {
                use k256::elliptic_curve::sec1::ToEncodedPoint;
                write!(f, "{}", hex::encode(public_key.to_encoded_point(false)))
            }
            None => write!(f, "None"),
        }
    }
}
