use keycard_apdu::tlv::{find_tag, Tag};
use keycard_apdu::TlvError;

use crate::constants::tags;
use crate::error::{Error, Result};

/// Key material exported by EXPORT KEY, any field possibly absent
/// depending on the requested export option.
#[derive(Clone)]
pub struct Keypair {
    /// Private key, present for private-and-public exports.
    pub private_key: Option<k256::SecretKey>,
    /// Public key; derived from the private key when the card omits it.
    pub public_key: Option<k256::PublicKey>,
    /// BIP32 chain code, present for extended-public exports.
    pub chain_code: Option<[u8; 32]>,
}

impl Keypair {
    /// Parse a keypair template (tag `0xA1`).
    pub fn parse(data: &[u8]) -> Result<Self> {
        let template = find_tag(data, &[Tag::from(tags::TEMPLATE_KEYPAIR)])?;

        let private_key = match optional(find_tag(
            template,
            &[Tag::from(tags::ECC_PRIVATE_KEY)],
        ))? {
            Some(raw) => Some(k256::SecretKey::from_slice(raw)?),
            None => None,
        };

        let public_key = match optional(find_tag(template, &[Tag::from(tags::ECC_PUBLIC_KEY)]))? {
            Some([]) | None => private_key.as_ref().map(k256::SecretKey::public_key),
            Some(raw) => Some(k256::PublicKey::from_sec1_bytes(raw)?),
        };

        let chain_code = match optional(find_tag(template, &[Tag::from(tags::CHAIN_CODE)]))? {
            Some(raw) => Some(
                raw.try_into()
                    .map_err(|_| Error::InvalidData("chain code must be 32 bytes"))?,
            ),
            None => None,
        };

        Ok(Self {
            private_key,
            public_key,
            chain_code,
        })
    }
}

fn optional(result: std::result::Result<&[u8], TlvError>) -> Result<Option<&[u8]>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(TlvError::TagNotFound(_)) => Ok(None),
        Err(err) => Err(err.into()),
    }
}

impl std::fmt::Debug for Keypair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // private key material stays out of logs
        f.debug_struct("Keypair")
            .field("private_key", &self.private_key.as_ref().map(|_| "<redacted>"))
            .field("public_key", &self.public_key)
            .field("has_chain_code", &self.chain_code.is_some())
            .finish()
    }
}
