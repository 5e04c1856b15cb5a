//! Pairing protocol: the two-step challenge/response that establishes a
//! persistent pairing key on the card.
//!
//! The passphrase scheme ships here; alternative schemes (for example a
//! certificate-based challenge/response) plug in through
//! [`PairingScheme`].

use keycard_apdu::{status, Command, Transport};
use rand::RngCore;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::command_set::check_ok;
use crate::constants::{ins, p1, CLA_GP};
use crate::crypto::{calculate_cryptogram, generate_pairing_token, Challenge};
use crate::error::{Error, Result};
use crate::types::PairingInfo;

/// A strategy that establishes a pairing with the card.
pub trait PairingScheme {
    /// Run the pairing protocol over the given transport.
    fn pair(&self, transport: &mut dyn Transport) -> Result<PairingInfo>;
}

/// The Keycard passphrase scheme: both sides derive a shared token from a
/// human-memorable passphrase via PBKDF2 and prove knowledge of it with
/// SHA-256 cryptograms.
pub struct PassphrasePairing {
    passphrase: String,
}

impl PassphrasePairing {
    /// Create the scheme from a pairing passphrase.
    pub fn new(passphrase: impl Into<String>) -> Self {
        Self {
            passphrase: passphrase.into(),
        }
    }
}

impl PairingScheme for PassphrasePairing {
    fn pair(&self, transport: &mut dyn Transport) -> Result<PairingInfo> {
        let token = generate_pairing_token(&self.passphrase);

        let mut challenge = Challenge::default();
        rand::rng().fill_bytes(&mut challenge);

        let cmd = Command::new_with_data(
            CLA_GP,
            ins::PAIR,
            p1::PAIRING_FIRST_STEP,
            0x00,
            challenge.to_vec(),
        );
        let response = transport.transmit(&cmd)?;

        if response.sw().to_u16() == status::SW_NO_AVAILABLE_PAIRING_SLOTS {
            return Err(Error::NoAvailablePairingSlots);
        }
        check_ok(&response)?;

        let data = response.data();
        if data.len() != 64 {
            return Err(Error::InvalidData("pairing step 1 response must be 64 bytes"));
        }
        let card_cryptogram = &data[..32];
        let card_challenge = Challenge::clone_from_slice(&data[32..]);

        // the card proves knowledge of the passphrase before we do
        if calculate_cryptogram(&token, &challenge).as_slice() != card_cryptogram {
            return Err(Error::InvalidCardCryptogram);
        }

        let client_cryptogram = calculate_cryptogram(&token, &card_challenge);
        let cmd = Command::new_with_data(
            CLA_GP,
            ins::PAIR,
            p1::PAIRING_FINAL_STEP,
            0x00,
            client_cryptogram.to_vec(),
        );
        let response = transport.transmit(&cmd)?;
        check_ok(&response)?;

        let data = response.data();
        if data.len() != 33 {
            return Err(Error::InvalidData("pairing step 2 response must be 33 bytes"));
        }
        let index = data[0];
        let card_salt = &data[1..33];

        let key: [u8; 32] = {
            let mut hasher = Sha256::new();
            hasher.update(token);
            hasher.update(card_salt);
            hasher.finalize().into()
        };

        debug!(index, "pairing established");

        Ok(PairingInfo { key, index })
    }
}
