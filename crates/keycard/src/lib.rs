//! Host-side client for the Keycard hardware-wallet applet.
//!
//! The applet holds BIP32 key material and signs on behalf of the host;
//! this crate drives it over any [`keycard_apdu::Transport`]: application
//! selection, the pairing protocol, the AES-CBC + AES-CMAC secure channel
//! and the key operations (derive, sign, export).
//!
//! A session follows a fixed progression, enforced by the [`Card`] sum
//! type inside [`CommandSet`]:
//!
//! ```text
//! select → (init) → pair → open_secure_channel → verify_pin → key ops
//! ```
//!
//! One [`CommandSet`] is bound to one transport; the smartcard link is
//! strictly request/response, so callers needing concurrency serialize
//! externally or use one command set per reader.

mod command_set;
mod constants;
mod crypto;
mod error;
mod pairing;
mod path;
mod secrets;
mod secure_channel;
mod types;

pub use command_set::{
    mnemonic_phrase, Card, CommandSet, CredentialType, DeriveMode, ExportOption, PersistentRecord,
};
pub use crypto::{Challenge, Cryptogram, PairingToken, PAIRING_TOKEN_SALT};
pub use error::{Error, Result};
pub use pairing::{PairingScheme, PassphrasePairing};
pub use path::{KeyPath, Source, HARDENED_START};
pub use secrets::Secrets;
pub use secure_channel::{ChannelState, SecureChannel};
pub use types::{
    verify_identity, ApplicationInfo, ApplicationStatus, Capabilities, Capability, Certificate,
    Keypair, Metadata, PairingInfo, RecoveredSignature, SelectResponse, Signature, Version,
};

pub use constants::*;
