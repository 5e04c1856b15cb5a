//! Secure channel: session-key derivation, encrypted framing and MAC
//! chaining.
//!
//! The channel owns the host ephemeral keypair and the session state, but
//! not the transport: the command set routes every wrapped exchange
//! through [`wrap_command`](SecureChannel::wrap_command) and
//! [`process_response`](SecureChannel::process_response).
//!
//! The IV chain ties each exchange to the previous one. Wrapping a request
//! sets `iv` to the CMAC of that request; the card encrypts its response
//! under that value, and the MAC it returns becomes the IV for the next
//! request. Any MAC mismatch leaves the chain undefined, so the channel
//! closes and the applet must be reselected.

use bytes::BytesMut;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::{ecdh::SharedSecret, PublicKey, SecretKey};
use keycard_apdu::{Command, Response};
use tracing::{debug, warn};
use zeroize::Zeroize;

use crate::crypto::{
    calculate_mac, decrypt_data, derive_session_keys, encrypt_data, one_shot_encrypt, ApduMeta,
    Challenge, ChannelIv, SessionKey,
};
use crate::error::{Error, Result};

/// Lifecycle of a secure channel.
///
/// A channel is created `Derived` (ephemeral keys and ECDH secret exist),
/// becomes `Open` once MUTUAL AUTHENTICATE succeeds, and `Closed` on any
/// MAC or framing failure. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    /// ECDH secret derived, session keys not yet established.
    Derived,
    /// Session keys established and mutually authenticated.
    Open,
    /// Torn down; a new channel is required.
    Closed,
}

/// Session keys, zeroized when the session ends.
struct SessionKeys {
    enc: SessionKey,
    mac: SessionKey,
}

impl Drop for SessionKeys {
    fn drop(&mut self) {
        self.enc.as_mut_slice().zeroize();
        self.mac.as_mut_slice().zeroize();
    }
}

struct Session {
    keys: SessionKeys,
    iv: ChannelIv,
}

impl Session {
    fn update_iv(&mut self, meta: &ApduMeta, data: &[u8]) {
        self.iv = calculate_mac(meta, data, &self.keys.mac);
    }
}

/// Secure channel for one card session.
pub struct SecureChannel {
    host_private: SecretKey,
    shared_secret: SharedSecret,
    session: Option<Session>,
    state: ChannelState,
}

impl std::fmt::Debug for SecureChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecureChannel")
            .field("state", &self.state)
            .field("session_established", &self.session.is_some())
            .finish()
    }
}

impl SecureChannel {
    /// Create a channel for the given card public key.
    ///
    /// Generates a fresh host ephemeral keypair and computes the ECDH
    /// shared secret. The ephemeral key lives only as long as the channel.
    pub fn new(card_public_key: &PublicKey) -> Self {
        let host_private = SecretKey::random(&mut rand_v8::thread_rng());
        let shared_secret = crate::crypto::generate_ecdh_shared_secret(
            &host_private,
            card_public_key,
        );

        Self {
            host_private,
            shared_secret,
            session: None,
            state: ChannelState::Derived,
        }
    }

    /// Current lifecycle state.
    pub const fn state(&self) -> ChannelState {
        self.state
    }

    /// Whether the channel is open for wrapped traffic.
    pub const fn is_open(&self) -> bool {
        matches!(self.state, ChannelState::Open)
    }

    /// Uncompressed 65-byte SEC1 encoding of the host ephemeral public key.
    pub fn raw_public_key(&self) -> Vec<u8> {
        self.host_private
            .public_key()
            .to_encoded_point(false)
            .as_bytes()
            .to_vec()
    }

    /// One-shot encryption of the INIT payload under the ECDH secret,
    /// before any session keys exist.
    pub(crate) fn one_shot_encrypt(&self, data: &mut BytesMut) -> bytes::Bytes {
        one_shot_encrypt(&self.host_private.public_key(), &self.shared_secret, data)
    }

    /// Derive the session keys from an OPEN SECURE CHANNEL response.
    ///
    /// The 48-byte payload splits into `salt(32) ‖ seed_iv(16)`. The
    /// channel stays in `Derived` until mutual authentication completes.
    pub(crate) fn init_session(&mut self, pairing_key: &[u8; 32], payload: &[u8]) -> Result<()> {
        if payload.len() != 48 {
            return Err(Error::InvalidData(
                "open secure channel response must be 48 bytes",
            ));
        }

        let salt = Challenge::clone_from_slice(&payload[..32]);
        let iv = ChannelIv::clone_from_slice(&payload[32..48]);
        let (enc, mac) = derive_session_keys(&self.shared_secret, pairing_key, &salt);

        self.session = Some(Session {
            keys: SessionKeys { enc, mac },
            iv,
        });

        Ok(())
    }

    /// Mark the channel open after a successful MUTUAL AUTHENTICATE.
    pub(crate) fn mark_open(&mut self) {
        debug!("secure channel established");
        self.state = ChannelState::Open;
    }

    /// Tear the channel down. Session keys are zeroized; the chained IV is
    /// gone, so the channel cannot be reused.
    pub(crate) fn close(&mut self) {
        self.session = None;
        self.state = ChannelState::Closed;
    }

    /// Wrap a command for the secure channel.
    ///
    /// The data field is encrypted under the current IV; the new IV is the
    /// CMAC over the 16-byte header meta and the ciphertext, and rides in
    /// front of the ciphertext on the wire.
    pub(crate) fn wrap_command(&mut self, command: &Command) -> Result<Command> {
        let session = self.session.as_mut().ok_or(Error::SecureChannelNotOpen)?;

        let mut payload = BytesMut::from(command.data());
        let enc_data = encrypt_data(&mut payload, &session.keys.enc, &session.iv);

        let mut meta = ApduMeta::default();
        meta[0] = command.cla;
        meta[1] = command.ins;
        meta[2] = command.p1;
        meta[3] = command.p2;
        meta[4] = (enc_data.len() + 16) as u8;

        session.update_iv(&meta, &enc_data);

        let mut data = BytesMut::with_capacity(16 + enc_data.len());
        data.extend_from_slice(&session.iv);
        data.extend_from_slice(&enc_data);

        debug!(
            ins = format_args!("{:#04X}", command.ins),
            len = data.len(),
            "wrapped command"
        );

        Ok(Command::new(command.cla, command.ins, command.p1, command.p2).with_data(data.freeze()))
    }

    /// Verify and decrypt a wrapped response, yielding the inner response
    /// unit.
    ///
    /// The outer status word must be `0x9000` and the leading 16 bytes
    /// must match the CMAC recomputed over the remainder; either failure
    /// closes the channel. The ciphertext is decrypted under the chained
    /// IV (the MAC of the request we just sent), and the verified response
    /// MAC becomes the IV for the next exchange.
    pub(crate) fn process_response(&mut self, response: &Response) -> Result<Response> {
        if !response.is_success() {
            warn!(sw = %response.sw(), "secure channel response failed, closing");
            self.close();
            return Err(Error::BadResponse {
                sw: response.sw().to_u16(),
            });
        }

        let Some(session) = self.session.as_mut() else {
            return Err(Error::SecureChannelNotOpen);
        };

        let data = response.data();
        if data.len() < 16 {
            self.close();
            return Err(Error::InvalidData("secure channel response too short"));
        }

        let (rmac, rdata) = data.split_at(16);

        let mut rmeta = ApduMeta::default();
        rmeta[0] = data.len() as u8;

        let expected = calculate_mac(&rmeta, rdata, &session.keys.mac);
        if expected.as_slice() != rmac {
            warn!("response MAC verification failed, closing secure channel");
            self.close();
            return Err(Error::InvalidResponseMac);
        }

        let mut buf = BytesMut::from(rdata);
        let plain = match decrypt_data(&mut buf, &session.keys.enc, &session.iv) {
            Ok(plain) => plain,
            Err(err) => {
                self.close();
                return Err(err.into());
            }
        };

        session.iv = expected;

        match Response::from_bytes(&plain) {
            Ok(inner) => Ok(inner),
            Err(err) => {
                // plaintext without a status word is as fatal as a bad MAC
                self.close();
                Err(err.into())
            }
        }
    }
}
