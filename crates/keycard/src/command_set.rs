//! The command dispatcher: sequences application selection, secure-channel
//! opening, PIN verification and key operations.
//!
//! [`CommandSet`] owns the transport exclusively; the secure channel is a
//! sibling component driven through it, and routing a command plain or
//! wrapped is decided here. Card progression is a sum type: operations are
//! legal only in the variant that carries their preconditions.

use bytes::{Bytes, BytesMut};
use coins_bip39::{English, Wordlist};
use keycard_apdu::{status, Command, Response, Transport};
use rand::RngCore;
use tracing::debug;

use crate::constants::{ins, p1, p2, CLA_GP, CLA_ISO, KEYCARD_AID};
use crate::crypto::Challenge;
use crate::error::{Error, Result};
use crate::pairing::{PairingScheme, PassphrasePairing};
use crate::path::{KeyPath, Source};
use crate::secure_channel::SecureChannel;
use crate::secrets::Secrets;
use crate::types::{
    verify_identity, ApplicationInfo, ApplicationStatus, Capability, Keypair, PairingInfo,
    SelectResponse, Signature,
};

/// Card state as the host has established it so far.
///
/// Each variant carries exactly the data its operations need; there is no
/// way to reach an operation without first acquiring its precondition.
pub enum Card {
    /// Applet selected but not initialized; INIT is the only way forward.
    Uninitialized {
        /// Secure-channel key of the card, when the applet exposes one.
        card_key: Option<k256::PublicKey>,
    },
    /// Applet selected and initialized.
    Initialized {
        /// Info returned by SELECT.
        info: ApplicationInfo,
    },
    /// A pairing is loaded; the secure channel can be opened.
    Paired {
        /// Info returned by SELECT.
        info: ApplicationInfo,
        /// The persistent pairing.
        pairing: PairingInfo,
    },
    /// Secure channel open; wrapped commands are available.
    Open {
        /// Info returned by SELECT.
        info: ApplicationInfo,
        /// The persistent pairing.
        pairing: PairingInfo,
        /// The established channel.
        channel: SecureChannel,
    },
}

/// Persistent data records addressed by STORE DATA / GET DATA.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistentRecord {
    /// General public data.
    Public = 0x00,
    /// The NDEF record.
    Ndef = 0x01,
    /// The cash-card record.
    Cash = 0x02,
}

/// How EXPORT KEY selects the key to export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeriveMode {
    /// Export the current key; the path must be empty.
    Current = 0x00,
    /// Derive the key for this call only.
    Derive = 0x01,
    /// Derive and make it the new current key.
    DeriveAndMakeCurrent = 0x02,
}

/// What EXPORT KEY returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportOption {
    /// Private and public key.
    PrivateAndPublic = 0x00,
    /// Public key only.
    PublicOnly = 0x01,
    /// Public key and chain code.
    ExtendedPublic = 0x02,
}

/// Which credential CHANGE PIN replaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialType {
    /// The 6-digit PIN.
    Pin,
    /// The 12-digit PUK.
    Puk,
    /// The pairing passphrase.
    PairingSecret,
}

/// Command dispatcher bound to one transport.
pub struct CommandSet<T: Transport> {
    transport: T,
    card: Option<Card>,
}

impl<T: Transport> CommandSet<T> {
    /// Create a command set over a transport. No command is sent until
    /// [`select`](Self::select) is called.
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            card: None,
        }
    }

    /// The current card state, `None` before SELECT.
    pub fn card(&self) -> Option<&Card> {
        self.card.as_ref()
    }

    /// Application info from the last SELECT, when the card was
    /// initialized.
    pub fn application_info(&self) -> Option<&ApplicationInfo> {
        match self.card.as_ref()? {
            Card::Initialized { info }
            | Card::Paired { info, .. }
            | Card::Open { info, .. } => Some(info),
            Card::Uninitialized { .. } => None,
        }
    }

    /// The active pairing, if any.
    pub fn pairing_info(&self) -> Option<&PairingInfo> {
        match self.card.as_ref()? {
            Card::Paired { pairing, .. } | Card::Open { pairing, .. } => Some(pairing),
            _ => None,
        }
    }

    /// Whether the secure channel is open.
    pub fn is_secure_channel_open(&self) -> bool {
        matches!(self.card, Some(Card::Open { .. }))
    }

    /// The underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Mutable access to the underlying transport.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Consume the command set, returning the transport.
    pub fn into_transport(self) -> T {
        self.transport
    }

    /// SELECT the applet and parse its response.
    ///
    /// Resets the card state: an initialized card lands in
    /// [`Card::Initialized`], an uninitialized one in
    /// [`Card::Uninitialized`]. A card without the applet reports
    /// `installed: false` and leaves the state empty.
    pub fn select(&mut self) -> Result<ApplicationInfo> {
        let cmd = Command::new_with_data(
            CLA_ISO,
            ins::SELECT,
            0x04,
            0x00,
            Bytes::from_static(KEYCARD_AID),
        )
        .with_le(0);

        let response = self.transport.transmit(&cmd)?;
        check_sw(&response, &[status::SW_OK, status::SW_FILE_NOT_FOUND])?;

        self.card = None;
        if response.sw().to_u16() == status::SW_FILE_NOT_FOUND {
            return Ok(ApplicationInfo::not_installed());
        }

        match SelectResponse::parse(response.data())? {
            SelectResponse::Initialized(info) => {
                debug!(version = %info.version, "selected initialized card");
                self.card = Some(Card::Initialized { info: info.clone() });
                Ok(info)
            }
            SelectResponse::PreInitialized(card_key) => {
                debug!("selected uninitialized card");
                self.card = Some(Card::Uninitialized { card_key });
                Ok(ApplicationInfo::pre_initialized(card_key))
            }
        }
    }

    /// INIT the card with its credentials.
    ///
    /// The payload `PIN ‖ PUK ‖ pairing_token` travels one-shot-encrypted
    /// under a fresh ECDH secret. Only valid on an uninitialized card; the
    /// applet must be reselected afterwards.
    pub fn init(&mut self, secrets: &Secrets) -> Result<()> {
        let card_key = match self.card.as_ref() {
            Some(Card::Uninitialized {
                card_key: Some(card_key),
            }) => *card_key,
            Some(Card::Uninitialized { card_key: None }) => {
                return Err(Error::InvalidData("card has no secure channel key"));
            }
            Some(_) => return Err(Error::CardAlreadyInitialized),
            None => return Err(Error::NotSelected),
        };

        let channel = SecureChannel::new(&card_key);
        let mut payload = BytesMut::from(secrets.to_bytes().as_ref());
        let data = channel.one_shot_encrypt(&mut payload);

        let cmd = Command::new_with_data(CLA_GP, ins::INIT, 0x00, 0x00, data);
        let response = self.transport.transmit(&cmd)?;
        check_ok(&response)?;

        debug!("card initialized, reselect required");
        self.card = None;

        Ok(())
    }

    /// Pair with the card using the passphrase scheme.
    pub fn pair(&mut self, passphrase: &str) -> Result<PairingInfo> {
        self.pair_with(&PassphrasePairing::new(passphrase))
    }

    /// Pair with the card using an arbitrary pairing scheme.
    pub fn pair_with(&mut self, scheme: &dyn PairingScheme) -> Result<PairingInfo> {
        let info = self.initialized_info()?;
        require_capability(&info, Capability::SecureChannel)?;

        let pairing = scheme.pair(&mut self.transport)?;

        self.card = Some(Card::Paired {
            info,
            pairing: pairing.clone(),
        });
        Ok(pairing)
    }

    /// Load a pairing persisted from an earlier session.
    pub fn set_pairing_info(&mut self, pairing: PairingInfo) -> Result<()> {
        let info = self.initialized_info()?;
        self.card = Some(Card::Paired { info, pairing });
        Ok(())
    }

    /// UNPAIR the given slot. Requires an open secure channel; unpairing
    /// our own slot drops the pairing from the card state.
    pub fn unpair(&mut self, index: u8) -> Result<()> {
        let cmd = Command::new(CLA_GP, ins::UNPAIR, index, 0x00);
        let response = self.send_wrapped(&cmd)?;
        check_ok(&response)?;

        if self.pairing_info().is_some_and(|pairing| pairing.index == index) {
            if let Some(Card::Open { info, .. } | Card::Paired { info, .. }) = self.card.take() {
                self.card = Some(Card::Initialized { info });
            }
        }

        Ok(())
    }

    /// Open the secure channel: OPEN SECURE CHANNEL, session-key
    /// derivation, then a wrapped MUTUAL AUTHENTICATE.
    pub fn open_secure_channel(&mut self) -> Result<()> {
        let (info, pairing) = match self.card.take() {
            Some(Card::Paired { info, pairing } | Card::Open { info, pairing, .. }) => {
                (info, pairing)
            }
            other => {
                self.card = other;
                return Err(Error::PairingRequired);
            }
        };

        match self.establish_channel(&info, &pairing) {
            Ok(channel) => {
                self.card = Some(Card::Open {
                    info,
                    pairing,
                    channel,
                });
                Ok(())
            }
            Err(err) => {
                self.card = Some(Card::Paired { info, pairing });
                Err(err)
            }
        }
    }

    fn establish_channel(
        &mut self,
        info: &ApplicationInfo,
        pairing: &PairingInfo,
    ) -> Result<SecureChannel> {
        require_capability(info, Capability::SecureChannel)?;
        let card_key = info
            .public_key
            .ok_or(Error::InvalidData("card has no secure channel key"))?;

        let mut channel = SecureChannel::new(&card_key);

        debug!(slot = pairing.index, "opening secure channel");
        let cmd = Command::new_with_data(
            CLA_GP,
            ins::OPEN_SECURE_CHANNEL,
            pairing.index,
            0x00,
            channel.raw_public_key(),
        );
        let response = self.transport.transmit(&cmd)?;
        check_ok(&response)?;

        channel.init_session(&pairing.key, response.data())?;

        // the MUTUAL AUTHENTICATE is itself wrapped with the fresh keys
        let mut challenge = Challenge::default();
        rand::rng().fill_bytes(&mut challenge);
        let cmd = Command::new_with_data(
            CLA_GP,
            ins::MUTUALLY_AUTHENTICATE,
            0x00,
            0x00,
            challenge.to_vec(),
        );

        let wrapped = channel.wrap_command(&cmd)?;
        let response = self.transport.transmit(&wrapped)?;
        let inner = channel.process_response(&response)?;
        check_ok(&inner)?;

        channel.mark_open();
        Ok(channel)
    }

    /// VERIFY PIN over the secure channel. `0x63Cx` becomes
    /// [`Error::WrongPin`] with the remaining attempts.
    pub fn verify_pin(&mut self, pin: &str) -> Result<()> {
        let cmd = Command::new_with_data(
            CLA_GP,
            ins::VERIFY_PIN,
            0x00,
            0x00,
            Bytes::copy_from_slice(pin.as_bytes()),
        );
        let response = self.send_wrapped(&cmd)?;

        if let Some(remaining) = response.sw().retry_counter() {
            return Err(Error::WrongPin { remaining });
        }
        check_ok(&response)
    }

    /// CHANGE PIN, PUK or pairing secret. The new pairing secret is a
    /// passphrase and is converted to its PBKDF2 token.
    pub fn change_credential(&mut self, credential: CredentialType, value: &str) -> Result<()> {
        let info = self.initialized_info()?;
        require_capability(&info, Capability::CredentialsManagement)?;

        let (p1, data) = match credential {
            CredentialType::Pin => (p1::CHANGE_PIN, Bytes::copy_from_slice(value.as_bytes())),
            CredentialType::Puk => (p1::CHANGE_PUK, Bytes::copy_from_slice(value.as_bytes())),
            CredentialType::PairingSecret => (
                p1::CHANGE_PAIRING_SECRET,
                Bytes::copy_from_slice(&crate::crypto::generate_pairing_token(value)),
            ),
        };

        let cmd = Command::new_with_data(CLA_GP, ins::CHANGE_PIN, p1, 0x00, data);
        let response = self.send_wrapped(&cmd)?;
        check_ok(&response)
    }

    /// UNBLOCK PIN with the PUK, setting a new PIN. `0x63Cx` becomes
    /// [`Error::WrongPuk`].
    pub fn unblock_pin(&mut self, puk: &str, new_pin: &str) -> Result<()> {
        let mut data = BytesMut::with_capacity(puk.len() + new_pin.len());
        data.extend_from_slice(puk.as_bytes());
        data.extend_from_slice(new_pin.as_bytes());

        let cmd = Command::new_with_data(CLA_GP, ins::UNBLOCK_PIN, 0x00, 0x00, data.freeze());
        let response = self.send_wrapped(&cmd)?;

        if let Some(remaining) = response.sw().retry_counter() {
            return Err(Error::WrongPuk { remaining });
        }
        check_ok(&response)
    }

    /// GET STATUS with P1 = 0: retry counters and key flags.
    pub fn get_status(&mut self) -> Result<ApplicationStatus> {
        let cmd = Command::new(CLA_GP, ins::GET_STATUS, p1::GET_STATUS_APPLICATION, 0x00);
        let response = self.send_wrapped(&cmd)?;
        check_ok(&response)?;

        ApplicationStatus::parse(response.data())
    }

    /// GET STATUS with P1 = 1: the current key path as raw big-endian
    /// `u32` segments.
    pub fn get_key_path(&mut self) -> Result<KeyPath> {
        let cmd = Command::new(CLA_GP, ins::GET_STATUS, p1::GET_STATUS_KEY_PATH, 0x00);
        let response = self.send_wrapped(&cmd)?;
        check_ok(&response)?;

        let data = response.data();
        if data.len() % 4 != 0 {
            return Err(Error::InvalidData("key path must be whole u32 segments"));
        }

        let segments = data
            .chunks_exact(4)
            .map(|chunk| u32::from_be_bytes(chunk.try_into().unwrap()))
            .collect();
        Ok(KeyPath::from_segments(Source::Master, segments))
    }

    /// GENERATE KEY: create a keypair on the card, returning its UID.
    pub fn generate_key(&mut self) -> Result<[u8; 32]> {
        let info = self.initialized_info()?;
        require_capability(&info, Capability::KeyManagement)?;

        let cmd = Command::new(CLA_GP, ins::GENERATE_KEY, 0x00, 0x00);
        let response = self.send_wrapped(&cmd)?;
        check_ok(&response)?;

        key_uid(response.data())
    }

    /// REMOVE KEY: erase the key material on the card.
    pub fn remove_key(&mut self) -> Result<()> {
        let info = self.initialized_info()?;
        require_capability(&info, Capability::KeyManagement)?;

        let cmd = Command::new(CLA_GP, ins::REMOVE_KEY, 0x00, 0x00);
        let response = self.send_wrapped(&cmd)?;
        check_ok(&response)
    }

    /// DERIVE KEY: move the current key to the given path.
    pub fn derive_key(&mut self, path: &KeyPath) -> Result<()> {
        let cmd = Command::new_with_data(
            CLA_GP,
            ins::DERIVE_KEY,
            path.source().p1(),
            0x00,
            path.to_bytes(),
        );
        let response = self.send_wrapped(&cmd)?;
        check_ok(&response)
    }

    /// EXPORT KEY at the given path.
    pub fn export_key(
        &mut self,
        mode: DeriveMode,
        what: ExportOption,
        path: &KeyPath,
    ) -> Result<Keypair> {
        let p1 = match mode {
            DeriveMode::Current => p1::EXPORT_KEY_CURRENT,
            DeriveMode::Derive => p1::EXPORT_KEY_DERIVE,
            DeriveMode::DeriveAndMakeCurrent => p1::EXPORT_KEY_DERIVE_AND_MAKE_CURRENT,
        } | path.source().p1();
        let p2 = match what {
            ExportOption::PrivateAndPublic => p2::EXPORT_KEY_PRIVATE_AND_PUBLIC,
            ExportOption::PublicOnly => p2::EXPORT_KEY_PUBLIC_ONLY,
            ExportOption::ExtendedPublic => p2::EXPORT_KEY_EXTENDED_PUBLIC,
        };

        let cmd = Command::new_with_data(CLA_GP, ins::EXPORT_KEY, p1, p2, path.to_bytes());
        let response = self.send_wrapped(&cmd)?;
        check_ok(&response)?;

        Keypair::parse(response.data())
    }

    /// SIGN a 32-byte digest with the current key.
    pub fn sign(&mut self, digest: &[u8; 32]) -> Result<Signature> {
        self.sign_inner(digest, p1::SIGN_CURRENT_KEY, None)
    }

    /// SIGN a 32-byte digest with the key at `path`, optionally making it
    /// the new current key.
    pub fn sign_with_path(
        &mut self,
        digest: &[u8; 32],
        path: &KeyPath,
        make_current: bool,
    ) -> Result<Signature> {
        let p1 = if make_current {
            p1::SIGN_DERIVE_AND_MAKE_CURRENT
        } else {
            p1::SIGN_DERIVE
        };
        self.sign_inner(digest, p1, Some(path))
    }

    fn sign_inner(
        &mut self,
        digest: &[u8; 32],
        p1: u8,
        path: Option<&KeyPath>,
    ) -> Result<Signature> {
        let mut data = BytesMut::with_capacity(32 + path.map_or(0, |p| p.segments().len() * 4));
        data.extend_from_slice(digest);
        if let Some(path) = path {
            data.extend_from_slice(&path.to_bytes());
        }

        let cmd = Command::new_with_data(CLA_GP, ins::SIGN, p1, p2::SIGN, data.freeze());
        let response = self.send_wrapped(&cmd)?;
        check_ok(&response)?;

        Signature::parse(digest, response.data())
    }

    /// SIGN a 32-byte digest with the pinless path. Travels plain: the
    /// whole point is that it works without an authenticated session.
    pub fn sign_pinless(&mut self, digest: &[u8; 32]) -> Result<Signature> {
        let cmd = Command::new_with_data(
            CLA_GP,
            ins::SIGN,
            p1::SIGN_PINLESS,
            p2::SIGN,
            Bytes::copy_from_slice(digest),
        );
        let response = self.transport.transmit(&cmd)?;
        check_ok(&response)?;

        Signature::parse(digest, response.data())
    }

    /// SET PINLESS PATH. A non-empty path must be absolute; `None` clears
    /// the path.
    pub fn set_pinless_path(&mut self, path: Option<&KeyPath>) -> Result<()> {
        let data = match path {
            Some(path) => {
                if !path.segments().is_empty() && !path.is_absolute() {
                    return Err(Error::BadDerivationPath(
                        "pinless path must be set with an absolute path".into(),
                    ));
                }
                path.to_bytes()
            }
            None => Vec::new(),
        };

        let cmd = Command::new_with_data(CLA_GP, ins::SET_PINLESS_PATH, 0x00, 0x00, data);
        let response = self.send_wrapped(&cmd)?;
        check_ok(&response)
    }

    /// STORE DATA into a persistent record.
    pub fn store_data(&mut self, record: PersistentRecord, data: &[u8]) -> Result<()> {
        if record == PersistentRecord::Ndef {
            let info = self.initialized_info()?;
            require_capability(&info, Capability::Ndef)?;
        }

        let cmd = Command::new_with_data(
            CLA_GP,
            ins::STORE_DATA,
            record as u8,
            0x00,
            Bytes::copy_from_slice(data),
        );
        let response = self.send_wrapped(&cmd)?;
        check_ok(&response)
    }

    /// GET DATA from a persistent record.
    pub fn get_data(&mut self, record: PersistentRecord) -> Result<Bytes> {
        if record == PersistentRecord::Ndef {
            let info = self.initialized_info()?;
            require_capability(&info, Capability::Ndef)?;
        }

        let cmd = Command::new(CLA_GP, ins::GET_DATA, record as u8, 0x00);
        let response = self.send_wrapped(&cmd)?;
        check_ok(&response)?;

        Ok(response.into_data())
    }

    /// GENERATE MNEMONIC: BIP39 word indices with the given checksum size.
    ///
    /// `checksum_size` outside `4..=8` is rejected before anything is
    /// sent.
    pub fn generate_mnemonic(&mut self, checksum_size: u8) -> Result<Vec<u16>> {
        if !(4..=8).contains(&checksum_size) {
            return Err(Error::BadChecksumSize);
        }

        let cmd = Command::new(CLA_GP, ins::GENERATE_MNEMONIC, checksum_size, 0x00);
        let response = self.send_wrapped(&cmd)?;
        check_ok(&response)?;

        let data = response.data();
        if data.len() % 2 != 0 {
            return Err(Error::InvalidData("mnemonic indices must be whole u16s"));
        }

        Ok(data
            .chunks_exact(2)
            .map(|chunk| u16::from_be_bytes(chunk.try_into().unwrap()))
            .collect())
    }

    /// LOAD SEED: load a 64-byte BIP39 seed, returning the new key UID.
    pub fn load_seed(&mut self, seed: &[u8; 64]) -> Result<[u8; 32]> {
        let info = self.initialized_info()?;
        require_capability(&info, Capability::KeyManagement)?;

        let cmd = Command::new_with_data(
            CLA_GP,
            ins::LOAD_KEY,
            p1::LOAD_KEY_SEED,
            0x00,
            Bytes::copy_from_slice(seed),
        );
        let response = self.send_wrapped(&cmd)?;
        check_ok(&response)?;

        key_uid(response.data())
    }

    /// IDENTIFY the card: have it sign a challenge with its certified
    /// identity key. Returns the compressed public key of the certificate
    /// issuer for the caller to check against the expected CA.
    pub fn identify(&mut self, challenge: Option<&[u8; 32]>) -> Result<[u8; 33]> {
        let challenge = match challenge {
            Some(challenge) => *challenge,
            None => {
                let mut random = [0u8; 32];
                rand::rng().fill_bytes(&mut random);
                random
            }
        };

        let cmd = Command::new_with_data(
            CLA_GP,
            ins::IDENTIFY,
            0x00,
            0x00,
            Bytes::copy_from_slice(&challenge),
        );
        let response = self.transport.transmit(&cmd)?;
        check_ok(&response)?;

        verify_identity(&challenge, response.data())
    }

    /// FACTORY RESET the card. Plain, guarded by the magic P1/P2 pair; the
    /// applet must be reselected afterwards.
    pub fn factory_reset(&mut self) -> Result<()> {
        if let Some(info) = self.application_info() {
            require_capability(info, Capability::FactoryReset)?;
        }

        let cmd = Command::new(
            CLA_GP,
            ins::FACTORY_RESET,
            p1::FACTORY_RESET_MAGIC,
            p2::FACTORY_RESET_MAGIC,
        );
        let response = self.transport.transmit(&cmd)?;
        check_ok(&response)?;

        self.card = None;
        Ok(())
    }

    // Route a command through the open secure channel. Transport failures
    // and MAC failures both tear the channel down: its IV chain is
    // undefined from that point on.
    fn send_wrapped(&mut self, command: &Command) -> Result<Response> {
        let Some(Card::Open { channel, .. }) = self.card.as_mut() else {
            return Err(Error::SecureChannelNotOpen);
        };

        let wrapped = channel.wrap_command(command)?;
        let result = match self.transport.transmit(&wrapped) {
            Ok(response) => channel.process_response(&response),
            Err(err) => {
                channel.close();
                Err(err.into())
            }
        };

        if result.is_err() && !matches!(&result, Err(Error::SecureChannelNotOpen)) {
            // only MAC/framing/transport failures close the channel;
            // demote so the caller has to reopen after reselecting
            if !channel.is_open() {
                if let Some(Card::Open { info, pairing, .. }) = self.card.take() {
                    self.card = Some(Card::Paired { info, pairing });
                }
            }
        }

        result
    }

    fn initialized_info(&self) -> Result<ApplicationInfo> {
        match self.card.as_ref() {
            Some(Card::Initialized { info })
            | Some(Card::Paired { info, .. })
            | Some(Card::Open { info, .. }) => Ok(info.clone()),
            Some(Card::Uninitialized { .. }) => Err(Error::CardNotInitialized),
            None => Err(Error::NotSelected),
        }
    }
}

fn require_capability(info: &ApplicationInfo, capability: Capability) -> Result<()> {
    if info.capabilities.has(capability) {
        return Ok(());
    }

    Err(Error::CapabilityNotSupported(match capability {
        Capability::SecureChannel => "secure channel",
        Capability::KeyManagement => "key management",
        Capability::CredentialsManagement => "credentials management",
        Capability::Ndef => "NDEF",
        Capability::FactoryReset => "factory reset",
    }))
}

fn key_uid(data: &[u8]) -> Result<[u8; 32]> {
    data.try_into()
        .map_err(|_| Error::InvalidData("key UID must be 32 bytes"))
}

/// Render BIP39 indices as an English mnemonic phrase.
pub fn mnemonic_phrase(indices: &[u16]) -> Result<String> {
    let words = indices
        .iter()
        .map(|&index| English::get(index as usize).map_err(|_| Error::Wordlist))
        .collect::<Result<Vec<_>>>()?;

    Ok(words.join(" "))
}

/// Require `0x9000`.
pub(crate) fn check_ok(response: &Response) -> Result<()> {
    check_sw(response, &[status::SW_OK])
}

/// Require one of the whitelisted status words; anything else surfaces as
/// [`Error::BadResponse`] with the raw word.
pub(crate) fn check_sw(response: &Response, allowed: &[u16]) -> Result<()> {
    let sw = response.sw().to_u16();
    if allowed.contains(&sw) {
        return Ok(());
    }

    Err(Error::BadResponse { sw })
}
