use k256::ecdsa::{RecoveryId, Signature as EcdsaSignature, VerifyingKey};
use keycard_apdu::tlv::{find_tag, find_tag_n, Tag};
use keycard_apdu::TlvError;

use crate::constants::tags;
use crate::error::{Error, Result};

/// An ECDSA signature with its recovery id and the signing public key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveredSignature {
    /// The public key that produced the signature.
    pub public_key: k256::PublicKey,
    /// The `(r, s)` pair.
    pub signature: EcdsaSignature,
    /// Recovery id in `0..=3`.
    pub recovery_id: RecoveryId,
}

/// A SIGN response, tagged by the wire form it arrived in.
///
/// Modern applets return a raw 65-byte recoverable signature under tag
/// `0x80`; older ones return a template with the public key and a DER
/// signature, for which the recovery id must be computed by trial
/// recovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signature {
    /// Raw `r ‖ s ‖ v` form.
    Recoverable(RecoveredSignature),
    /// Legacy template form; `v` was recovered against the signed digest.
    Legacy(RecoveredSignature),
}

impl Signature {
    /// Parse a SIGN response payload against the digest that was signed.
    pub fn parse(digest: &[u8; 32], payload: &[u8]) -> Result<Self> {
        // check for the old template first: the raw-signature tag collides
        // with the public key tag inside it
        match find_tag(payload, &[Tag::from(tags::TEMPLATE_SIGNATURE)]) {
            Ok(template) => Ok(Self::Legacy(parse_legacy(digest, template)?)),
            Err(TlvError::TagNotFound(_)) => {
                let raw = find_tag(payload, &[Tag::from(tags::ECC_PUBLIC_KEY)])?;
                Ok(Self::Recoverable(parse_recoverable(digest, raw)?))
            }
            Err(err) => Err(err.into()),
        }
    }

    fn inner(&self) -> &RecoveredSignature {
        match self {
            Self::Recoverable(inner) | Self::Legacy(inner) => inner,
        }
    }

    /// The signing public key.
    pub fn public_key(&self) -> &k256::PublicKey {
        &self.inner().public_key
    }

    /// The `r` scalar as 32 big-endian bytes.
    pub fn r(&self) -> [u8; 32] {
        self.inner().signature.r().to_bytes().into()
    }

    /// The `s` scalar as 32 big-endian bytes.
    pub fn s(&self) -> [u8; 32] {
        self.inner().signature.s().to_bytes().into()
    }

    /// The recovery id.
    pub fn v(&self) -> u8 {
        self.inner().recovery_id.to_byte()
    }
}

/// Parse a 65-byte `r ‖ s ‖ v` signature, recovering the public key from
/// `digest`.
pub(crate) fn parse_recoverable(digest: &[u8; 32], raw: &[u8]) -> Result<RecoveredSignature> {
    if raw.len() != 65 {
        return Err(Error::BadSignature);
    }

    let signature = EcdsaSignature::from_slice(&raw[..64])?;
    let recovery_id = RecoveryId::from_byte(raw[64]).ok_or(Error::BadSignature)?;
    let public_key = VerifyingKey::recover_from_prehash(digest, &signature, recovery_id)?;

    Ok(RecoveredSignature {
        public_key: public_key.into(),
        signature,
        recovery_id,
    })
}

fn parse_legacy(digest: &[u8; 32], template: &[u8]) -> Result<RecoveredSignature> {
    let public_key = k256::PublicKey::from_sec1_bytes(find_tag(
        template,
        &[Tag::from(tags::ECC_PUBLIC_KEY)],
    )?)?;

    let (r, s) = der_signature_to_rs(template)?;
    let signature = EcdsaSignature::from_scalars(r, s)?;

    // the card does not tell us v; try all four candidates
    for v in 0..=3u8 {
        let recovery_id = RecoveryId::from_byte(v).ok_or(Error::BadSignature)?;
        let Ok(recovered) = VerifyingKey::recover_from_prehash(digest, &signature, recovery_id)
        else {
            continue;
        };

        if k256::PublicKey::from(recovered) == public_key {
            return Ok(RecoveredSignature {
                public_key,
                signature,
                recovery_id,
            });
        }
    }

    Err(Error::BadSignature)
}

/// Extract `(r, s)` from a DER `SEQUENCE` of two `INTEGER`s.
pub(crate) fn der_signature_to_rs(tlv: &[u8]) -> Result<([u8; 32], [u8; 32])> {
    let path = [
        Tag::from(tags::ECDSA_SIGNATURE),
        Tag::from(tags::DER_INTEGER),
    ];
    let r = scalar_bytes(find_tag_n(tlv, &path, 0)?)?;
    let s = scalar_bytes(find_tag_n(tlv, &path, 1)?)?;

    Ok((r, s))
}

// DER integers may carry a leading zero or drop leading zero bytes; fit
// into exactly 32.
fn scalar_bytes(raw: &[u8]) -> Result<[u8; 32]> {
    let raw = if raw.len() > 32 {
        let (extra, rest) = raw.split_at(raw.len() - 32);
        if extra.iter().any(|&b| b != 0) {
            return Err(Error::BadSignature);
        }
        rest
    } else {
        raw
    };

    let mut out = [0u8; 32];
    out[32 - raw.len()..].copy_from_slice(raw);
    Ok(out)
}
