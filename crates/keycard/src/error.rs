//! Error types for Keycard operations.
//!
//! All domain failures are variants of a single [`Error`] sum type so that
//! callers can match on exactly what went wrong. Retry-counter failures
//! carry the remaining attempts as a field.

use thiserror::Error;

/// Result type for Keycard operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for Keycard operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Underlying transport failure.
    #[error(transparent)]
    Transport(#[from] keycard_apdu::TransportError),

    /// TLV parsing failure, including tag-not-found.
    #[error(transparent)]
    Tlv(#[from] keycard_apdu::TlvError),

    /// Malformed response unit.
    #[error(transparent)]
    Response(#[from] keycard_apdu::ResponseError),

    /// The card answered with a status word outside the allowed set.
    /// The raw word is kept for diagnostics.
    #[error("unexpected response status {sw:#06X}")]
    BadResponse {
        /// Raw status word.
        sw: u16,
    },

    /// PIN verification failed.
    #[error("wrong PIN, {remaining} attempts remaining")]
    WrongPin {
        /// Attempts left before the PIN blocks.
        remaining: u8,
    },

    /// PUK verification failed.
    #[error("wrong PUK, {remaining} attempts remaining")]
    WrongPuk {
        /// Attempts left before the card is bricked.
        remaining: u8,
    },

    /// All pairing slots on the card are taken.
    #[error("no available pairing slots")]
    NoAvailablePairingSlots,

    /// The operation requires an initialized card.
    #[error("card is not initialized")]
    CardNotInitialized,

    /// INIT was attempted on an already initialized card.
    #[error("card is already initialized")]
    CardAlreadyInitialized,

    /// No applet has been selected yet.
    #[error("no applet selected")]
    NotSelected,

    /// The operation requires pairing information.
    #[error("pairing information required")]
    PairingRequired,

    /// The card capability required by the operation is absent.
    #[error("capability not supported: {0}")]
    CapabilityNotSupported(&'static str),

    /// The card cryptogram did not match the pairing passphrase.
    #[error("invalid card cryptogram")]
    InvalidCardCryptogram,

    /// Secure-channel MAC verification failed. Fatal for the session; the
    /// applet must be reselected before any further use.
    #[error("invalid response MAC")]
    InvalidResponseMac,

    /// A wrapped command was issued without an open secure channel.
    #[error("secure channel is not open")]
    SecureChannelNotOpen,

    /// Derivation path string or layout rejected.
    #[error("bad derivation path: {0}")]
    BadDerivationPath(String),

    /// GENERATE MNEMONIC checksum size outside `4..=8`.
    #[error("bad checksum size")]
    BadChecksumSize,

    /// Identity certificate rejected.
    #[error("bad certificate: {0}")]
    BadCertificate(&'static str),

    /// Signature failed to parse or verify.
    #[error("bad signature")]
    BadSignature,

    /// Response or argument bytes did not have the expected shape.
    #[error("invalid data: {0}")]
    InvalidData(&'static str),

    /// Elliptic curve error from key material handling.
    #[error(transparent)]
    EllipticCurve(#[from] k256::elliptic_curve::Error),

    /// ECDSA signature handling error.
    #[error(transparent)]
    Ecdsa(#[from] k256::ecdsa::Error),

    /// Unpadding failed when decrypting a secure-channel payload.
    #[error("unpadding error when decrypting")]
    Unpad,

    /// BIP39 wordlist lookup failed.
    #[error("mnemonic index out of wordlist range")]
    Wordlist,
}

impl From<cipher::block_padding::UnpadError> for Error {
    fn from(_: cipher::block_padding::UnpadError) -> Self {
        Self::Unpad
    }
}
