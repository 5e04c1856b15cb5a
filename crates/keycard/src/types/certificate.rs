use k256::ecdsa::signature::hazmat::PrehashVerifier;
use k256::ecdsa::{Signature as EcdsaSignature, VerifyingKey};
use keycard_apdu::tlv::{find_tag, Tag};
use sha2::{Digest, Sha256};

use crate::constants::tags;
use crate::error::{Error, Result};
use crate::types::signature::{der_signature_to_rs, parse_recoverable, RecoveredSignature};

const CERTIFICATE_LEN: usize = 98;

/// A card identity certificate: a 33-byte compressed identity public key
/// followed by a 65-byte recoverable signature over SHA-256 of that key.
#[derive(Debug, Clone)]
pub struct Certificate {
    identity: [u8; 33],
    signature: RecoveredSignature,
}

impl Certificate {
    /// Parse a 98-byte certificate.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() != CERTIFICATE_LEN {
            return Err(Error::BadCertificate("certificate must be 98 bytes"));
        }

        let identity: [u8; 33] = data[0..33].try_into().unwrap();
        let digest: [u8; 32] = Sha256::digest(identity).into();
        let signature = parse_recoverable(&digest, &data[33..98])
            .map_err(|_| Error::BadCertificate("invalid issuer signature"))?;

        Ok(Self {
            identity,
            signature,
        })
    }

    /// The compressed identity public key.
    pub const fn identity(&self) -> &[u8; 33] {
        &self.identity
    }

    /// The key recovered from the issuer signature.
    pub fn issuer(&self) -> &k256::PublicKey {
        &self.signature.public_key
    }
}

/// Verify an IDENT response against the challenge that was sent.
///
/// The payload is a signature template carrying the certificate (tag
/// `0x8A`) and a DER signature over the challenge by the certified
/// identity key. Returns the compressed public key of the certificate
/// issuer, for the caller to check against the expected CA.
pub fn verify_identity(challenge: &[u8; 32], payload: &[u8]) -> Result<[u8; 33]> {
    let template = find_tag(payload, &[Tag::from(tags::TEMPLATE_SIGNATURE)])?;
    let cert_data = find_tag(template, &[Tag::from(tags::CERTIFICATE)])?;
    let certificate = Certificate::parse(cert_data)?;

    let (r, s) = der_signature_to_rs(template)?;
    let signature = EcdsaSignature::from_scalars(r, s)?;

    let identity = VerifyingKey::from_sec1_bytes(certificate.identity())?;
    identity
        .verify_prehash(challenge, &signature)
        .map_err(|_| Error::BadSignature)?;

    let issuer = certificate.issuer().to_sec1_bytes();
    Ok(issuer
        .as_ref()
        .try_into()
        .expect("compressed SEC1 point is 33 bytes"))
}
