//! An in-memory card simulator implementing the applet side of the
//! protocol: pairing, session-key derivation and the wrapped exchange,
//! plus enough of the key operations to drive the command set end to end.
//!
//! The crypto here is written against the RustCrypto primitives directly,
//! independent of the library internals, so the two sides only agree when
//! the protocol actually matches.

use std::collections::HashMap;

use aes::cipher::{block_padding::Iso7816, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use cmac::{Cmac, Mac};
use k256::ecdsa::SigningKey;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::{PublicKey, SecretKey};
use keycard_apdu::tlv::{write_tlv, Tag};
use keycard_apdu::{Command, Response, Transport, TransportError};
use pbkdf2::pbkdf2_hmac;
use sha2::{Digest, Sha256, Sha512};

type Enc128 = cbc::Encryptor<aes::Aes128>;
type Dec128 = cbc::Decryptor<aes::Aes128>;
type Dec256 = cbc::Decryptor<aes::Aes256>;

const PAIRING_SALT: &[u8] = b"Status Hardware Wallet Lite";

/// Salt the simulated card hands out in PAIR step 2. Chosen to match the
/// golden pairing-key fixture.
pub const CARD_PAIRING_SALT: [u8; 32] = [0x11; 32];
/// Salt the simulated card hands out in OPEN SECURE CHANNEL.
pub const CARD_SESSION_SALT: [u8; 32] = [0x5A; 32];
const CARD_SESSION_IV: [u8; 16] = [0x6B; 16];
const CARD_CHALLENGE: [u8; 32] = [0xC4; 32];

const SW_OK: u16 = 0x9000;

struct Session {
    enc: [u8; 16],
    mac: [u8; 16],
    chain: [u8; 16],
}

pub struct CardSimulator {
    card_key: SecretKey,
    identity_key: SigningKey,
    ca_key: SigningKey,
    initialized: bool,
    pairing_token: [u8; 32],
    pairings: HashMap<u8, [u8; 32]>,
    slots: u8,
    card_challenge: Option<[u8; 32]>,
    session: Option<Session>,
    pin: String,
    pin_retries: u8,
    puk: String,
    puk_retries: u8,
    key: Option<SigningKey>,
    key_path: Vec<u32>,
    pinless_path: Option<Vec<u8>>,
    records: HashMap<u8, Vec<u8>>,
    /// Answer SIGN with the legacy template instead of the raw form.
    pub legacy_sign: bool,
    /// Corrupt the next wrapped response MAC.
    pub tamper_response_mac: bool,
}

impl std::fmt::Debug for CardSimulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CardSimulator")
            .field("initialized", &self.initialized)
            .field("session", &self.session.is_some())
            .finish()
    }
}

impl CardSimulator {
    /// An initialized card with PIN `123456`, PUK `123456789012` and a
    /// loaded key with `d = 1` (so recovered public keys equal the
    /// generator).
    pub fn new(pairing_pass: &str) -> Self {
        let mut one = [0u8; 32];
        one[31] = 1;

        Self {
            card_key: SecretKey::random(&mut rand_v8::thread_rng()),
            identity_key: SigningKey::from_bytes(&[0x22; 32].into()).unwrap(),
            ca_key: SigningKey::from_bytes(&[0x33; 32].into()).unwrap(),
            initialized: true,
            pairing_token: derive_token(pairing_pass),
            pairings: HashMap::new(),
            slots: 5,
            card_challenge: None,
            session: None,
            pin: "123456".to_string(),
            pin_retries: 3,
            puk: "123456789012".to_string(),
            puk_retries: 5,
            key: Some(SigningKey::from_bytes(&one.into()).unwrap()),
            key_path: Vec::new(),
            pinless_path: None,
            records: HashMap::new(),
            legacy_sign: false,
            tamper_response_mac: false,
        }
    }

    /// A card that has the applet installed but no credentials yet.
    pub fn uninitialized() -> Self {
        Self {
            initialized: false,
            key: None,
            ..Self::new("unused")
        }
    }

    /// The compressed CA public key certificates chain up to.
    pub fn ca_public_key(&self) -> [u8; 33] {
        self.ca_key
            .verifying_key()
            .to_sec1_bytes()
            .as_ref()
            .try_into()
            .unwrap()
    }

    pub fn pairing_count(&self) -> usize {
        self.pairings.len()
    }

    fn process(&mut self, command: &Command) -> (Vec<u8>, u16) {
        let data = command.data().to_vec();
        match (command.cla, command.ins) {
            (0x00, 0xA4) => self.select(),
            (0x80, 0x12) => self.pair_step(command.p1, &data),
            (0x80, 0x10) => self.open_channel(command.p1, &data),
            (0x80, 0xFE) => self.init(&data),
            (0x80, 0x14) => self.ident(&data),
            (0x80, 0xFD) => self.factory_reset(command.p1, command.p2),
            (0x80, 0xC0) if command.p1 == 0x03 => self.sign_pinless(&data),
            (0x80, _) if self.session.is_some() => self.wrapped(command, &data),
            _ => (Vec::new(), 0x6D00),
        }
    }

    fn select(&mut self) -> (Vec<u8>, u16) {
        self.session = None;

        let card_pub = self
            .card_key
            .public_key()
            .to_encoded_point(false)
            .as_bytes()
            .to_vec();

        if !self.initialized {
            let mut out = bytes::BytesMut::new();
            write_tlv(&mut out, &Tag::from(0x80u8), &card_pub);
            return (out.to_vec(), SW_OK);
        }

        let mut inner = bytes::BytesMut::new();
        write_tlv(&mut inner, &Tag::from(0x8Fu8), &[0x01; 16]);
        write_tlv(&mut inner, &Tag::from(0x80u8), &card_pub);
        write_tlv(&mut inner, &Tag::from(0x02u8), &[3, 1]);
        write_tlv(
            &mut inner,
            &Tag::from(0x02u8),
            &[self.slots - self.pairings.len() as u8],
        );
        match &self.key {
            Some(key) => {
                let uid = Sha256::digest(key.verifying_key().to_encoded_point(false).as_bytes());
                write_tlv(&mut inner, &Tag::from(0x8Eu8), &uid);
            }
            None => write_tlv(&mut inner, &Tag::from(0x8Eu8), &[]),
        }
        write_tlv(&mut inner, &Tag::from(0x8Du8), &[0x1F]);

        let mut out = bytes::BytesMut::new();
        write_tlv(&mut out, &Tag::from(0xA4u8), &inner);
        (out.to_vec(), SW_OK)
    }

    fn pair_step(&mut self, p1: u8, data: &[u8]) -> (Vec<u8>, u16) {
        match p1 {
            0x00 => {
                if self.pairings.len() as u8 >= self.slots {
                    return (Vec::new(), 0x6A84);
                }
                let Ok(challenge) = <[u8; 32]>::try_from(data) else {
                    return (Vec::new(), 0x6A80);
                };

                let cryptogram = sha256_pair(&self.pairing_token, &challenge);
                self.card_challenge = Some(CARD_CHALLENGE);

                let mut out = cryptogram.to_vec();
                out.extend_from_slice(&CARD_CHALLENGE);
                (out, SW_OK)
            }
            0x01 => {
                let Some(card_challenge) = self.card_challenge.take() else {
                    return (Vec::new(), 0x6A86);
                };
                let expected = sha256_pair(&self.pairing_token, &card_challenge);
                if data != expected {
                    return (Vec::new(), 0x6982);
                }

                let slot = (0..self.slots)
                    .find(|slot| !self.pairings.contains_key(slot))
                    .unwrap();
                let key = sha256_pair(&self.pairing_token, &CARD_PAIRING_SALT);
                self.pairings.insert(slot, key);

                let mut out = vec![slot];
                out.extend_from_slice(&CARD_PAIRING_SALT);
                (out, SW_OK)
            }
            _ => (Vec::new(), 0x6A86),
        }
    }

    fn open_channel(&mut self, slot: u8, data: &[u8]) -> (Vec<u8>, u16) {
        let Some(pairing_key) = self.pairings.get(&slot) else {
            return (Vec::new(), 0x6A86);
        };
        let Ok(host_pub) = PublicKey::from_sec1_bytes(data) else {
            return (Vec::new(), 0x6A80);
        };

        let shared = k256::elliptic_curve::ecdh::diffie_hellman(
            self.card_key.to_nonzero_scalar(),
            host_pub.as_affine(),
        );

        let mut hasher = Sha512::new();
        hasher.update(shared.raw_secret_bytes());
        hasher.update(pairing_key);
        hasher.update(CARD_SESSION_SALT);
        let digest = hasher.finalize();

        self.session = Some(Session {
            enc: digest[0..16].try_into().unwrap(),
            mac: digest[16..32].try_into().unwrap(),
            chain: CARD_SESSION_IV,
        });

        let mut out = CARD_SESSION_SALT.to_vec();
        out.extend_from_slice(&CARD_SESSION_IV);
        (out, SW_OK)
    }

    fn init(&mut self, data: &[u8]) -> (Vec<u8>, u16) {
        if self.initialized {
            return (Vec::new(), 0x6985);
        }
        if data.len() < 1 + 65 + 16 {
            return (Vec::new(), 0x6A80);
        }

        let key_len = data[0] as usize;
        let Ok(host_pub) = PublicKey::from_sec1_bytes(&data[1..1 + key_len]) else {
            return (Vec::new(), 0x6A80);
        };
        let iv: [u8; 16] = data[1 + key_len..1 + key_len + 16].try_into().unwrap();
        let ciphertext = &data[1 + key_len + 16..];

        let shared = k256::elliptic_curve::ecdh::diffie_hellman(
            self.card_key.to_nonzero_scalar(),
            host_pub.as_affine(),
        );

        let mut buf = ciphertext.to_vec();
        let Ok(plain) = Dec256::new(shared.raw_secret_bytes(), &iv.into())
            .decrypt_padded_mut::<Iso7816>(&mut buf)
        else {
            return (Vec::new(), 0x6A80);
        };

        if plain.len() != 6 + 12 + 32 {
            return (Vec::new(), 0x6A80);
        }

        self.pin = String::from_utf8(plain[..6].to_vec()).unwrap();
        self.puk = String::from_utf8(plain[6..18].to_vec()).unwrap();
        self.pairing_token = plain[18..50].try_into().unwrap();
        self.initialized = true;

        (Vec::new(), SW_OK)
    }

    fn ident(&mut self, challenge: &[u8]) -> (Vec<u8>, u16) {
        use k256::ecdsa::signature::hazmat::PrehashSigner;

        let Ok(challenge) = <[u8; 32]>::try_from(challenge) else {
            return (Vec::new(), 0x6A80);
        };

        // certificate: compressed identity key, CA-signed
        let identity_pub = self.identity_key.verifying_key().to_sec1_bytes();
        let cert_digest: [u8; 32] = Sha256::digest(&identity_pub).into();
        let (ca_sig, ca_recid) = self.ca_key.sign_prehash_recoverable(&cert_digest).unwrap();
        let mut cert = identity_pub.to_vec();
        cert.extend_from_slice(&ca_sig.to_bytes());
        cert.push(ca_recid.to_byte());

        let sig: k256::ecdsa::Signature = self.identity_key.sign_prehash(&challenge).unwrap();

        let mut der_ints = bytes::BytesMut::new();
        write_tlv(&mut der_ints, &Tag::from(0x02u8), &sig.r().to_bytes());
        write_tlv(&mut der_ints, &Tag::from(0x02u8), &sig.s().to_bytes());

        let mut inner = bytes::BytesMut::new();
        write_tlv(&mut inner, &Tag::from(0x8Au8), &cert);
        write_tlv(&mut inner, &Tag::from(0x30u8), &der_ints);

        let mut out = bytes::BytesMut::new();
        write_tlv(&mut out, &Tag::from(0xA0u8), &inner);
        (out.to_vec(), SW_OK)
    }

    fn factory_reset(&mut self, p1: u8, p2: u8) -> (Vec<u8>, u16) {
        if p1 != 0xAA || p2 != 0x55 {
            return (Vec::new(), 0x6A86);
        }

        *self = Self {
            card_key: self.card_key.clone(),
            ..Self::uninitialized()
        };
        (Vec::new(), SW_OK)
    }

    fn wrapped(&mut self, command: &Command, data: &[u8]) -> (Vec<u8>, u16) {
        if data.len() < 16 {
            return (Vec::new(), 0x6700);
        }
        let (request_mac, enc_data) = data.split_at(16);

        let mut meta = [0u8; 16];
        meta[0] = command.cla;
        meta[1] = command.ins;
        meta[2] = command.p1;
        meta[3] = command.p2;
        meta[4] = data.len() as u8;

        let session = self.session.as_ref().unwrap();
        if cmac16(&session.mac, &meta, enc_data) != request_mac {
            return (Vec::new(), 0x6982);
        }

        let mut buf = enc_data.to_vec();
        let Ok(plain) = Dec128::new(&session.enc.into(), &session.chain.into())
            .decrypt_padded_mut::<Iso7816>(&mut buf)
        else {
            return (Vec::new(), 0x6982);
        };
        let plain = plain.to_vec();

        self.session.as_mut().unwrap().chain = request_mac.try_into().unwrap();

        let (inner_data, inner_sw) = self.handle(command.ins, command.p1, command.p2, &plain);

        let mut plain_resp = inner_data;
        plain_resp.extend_from_slice(&inner_sw.to_be_bytes());

        let session = self.session.as_ref().unwrap();
        let rdata = aes128_enc(&session.enc, &session.chain, &plain_resp);
        let mut rmeta = [0u8; 16];
        rmeta[0] = (16 + rdata.len()) as u8;
        let rmac = cmac16(&session.mac, &rmeta, &rdata);
        self.session.as_mut().unwrap().chain = rmac;

        let mut out = rmac.to_vec();
        if self.tamper_response_mac {
            out[0] ^= 0xFF;
            self.tamper_response_mac = false;
        }
        out.extend_from_slice(&rdata);
        (out, SW_OK)
    }

    fn handle(&mut self, ins: u8, p1: u8, _p2: u8, data: &[u8]) -> (Vec<u8>, u16) {
        match ins {
            // MUTUALLY AUTHENTICATE: echo a challenge of our own
            0x11 => (vec![0xA5; 32], SW_OK),
            0x20 => self.verify_pin(data),
            0x21 => self.change_credential(p1, data),
            0x22 => self.unblock_pin(data),
            0x13 => {
                self.pairings.remove(&p1);
                (Vec::new(), SW_OK)
            }
            0xF2 => self.get_status(p1),
            0xD1 => self.derive_key(p1, data),
            0xD4 => self.generate_key(),
            0xD3 => {
                self.key = None;
                self.key_path.clear();
                (Vec::new(), SW_OK)
            }
            0xC0 => self.sign(p1, data),
            0xC1 => {
                self.pinless_path = (!data.is_empty()).then(|| data.to_vec());
                (Vec::new(), SW_OK)
            }
            0xC2 => self.export_key(_p2),
            0xCA => match self.records.get(&p1) {
                Some(record) => (record.clone(), SW_OK),
                None => (Vec::new(), SW_OK),
            },
            0xE2 => {
                self.records.insert(p1, data.to_vec());
                (Vec::new(), SW_OK)
            }
            0xD2 => {
                if !(4..=8).contains(&p1) {
                    return (Vec::new(), 0x6A86);
                }
                let words = u16::from(p1) * 3;
                let out = (0..words).flat_map(|i| i.to_be_bytes()).collect();
                (out, SW_OK)
            }
            0xD0 if p1 == 0x03 => self.load_seed(data),
            _ => (Vec::new(), 0x6D00),
        }
    }

    fn verify_pin(&mut self, data: &[u8]) -> (Vec<u8>, u16) {
        if data == self.pin.as_bytes() {
            self.pin_retries = 3;
            (Vec::new(), SW_OK)
        } else {
            self.pin_retries = self.pin_retries.saturating_sub(1);
            (Vec::new(), 0x63C0 | u16::from(self.pin_retries))
        }
    }

    fn change_credential(&mut self, p1: u8, data: &[u8]) -> (Vec<u8>, u16) {
        match p1 {
            0x00 => self.pin = String::from_utf8_lossy(data).into_owned(),
            0x01 => self.puk = String::from_utf8_lossy(data).into_owned(),
            0x02 => match data.try_into() {
                Ok(token) => self.pairing_token = token,
                Err(_) => return (Vec::new(), 0x6A80),
            },
            _ => return (Vec::new(), 0x6A86),
        }
        (Vec::new(), SW_OK)
    }

    fn unblock_pin(&mut self, data: &[u8]) -> (Vec<u8>, u16) {
        if data.len() != self.puk.len() + 6 {
            return (Vec::new(), 0x6A80);
        }
        let (puk, new_pin) = data.split_at(self.puk.len());

        if puk == self.puk.as_bytes() {
            self.pin = String::from_utf8_lossy(new_pin).into_owned();
            self.pin_retries = 3;
            self.puk_retries = 5;
            (Vec::new(), SW_OK)
        } else {
            self.puk_retries = self.puk_retries.saturating_sub(1);
            (Vec::new(), 0x63C0 | u16::from(self.puk_retries))
        }
    }

    fn get_status(&mut self, p1: u8) -> (Vec<u8>, u16) {
        match p1 {
            0x00 => {
                let mut inner = bytes::BytesMut::new();
                write_tlv(&mut inner, &Tag::from(0x02u8), &[self.pin_retries]);
                write_tlv(&mut inner, &Tag::from(0x02u8), &[self.puk_retries]);
                let key_flag = if self.key.is_some() { 0xFF } else { 0x00 };
                write_tlv(&mut inner, &Tag::from(0x01u8), &[key_flag]);
                write_tlv(&mut inner, &Tag::from(0x01u8), &[0xFF]);

                let mut out = bytes::BytesMut::new();
                write_tlv(&mut out, &Tag::from(0xA3u8), &inner);
                (out.to_vec(), SW_OK)
            }
            0x01 => {
                let out = self
                    .key_path
                    .iter()
                    .flat_map(|segment| segment.to_be_bytes())
                    .collect();
                (out, SW_OK)
            }
            _ => (Vec::new(), 0x6A86),
        }
    }

    fn derive_key(&mut self, p1: u8, data: &[u8]) -> (Vec<u8>, u16) {
        if data.len() % 4 != 0 {
            return (Vec::new(), 0x6A80);
        }
        let segments: Vec<u32> = data
            .chunks_exact(4)
            .map(|chunk| u32::from_be_bytes(chunk.try_into().unwrap()))
            .collect();

        match p1 {
            0x00 => self.key_path = segments,
            0x40 => {
                if self.key_path.pop().is_none() {
                    return (Vec::new(), 0x6A80);
                }
                self.key_path.extend(segments);
            }
            0x80 => self.key_path.extend(segments),
            _ => return (Vec::new(), 0x6A86),
        }
        (Vec::new(), SW_OK)
    }

    fn generate_key(&mut self) -> (Vec<u8>, u16) {
        let key = SigningKey::random(&mut rand_v8::thread_rng());
        let uid = Sha256::digest(key.verifying_key().to_encoded_point(false).as_bytes());
        self.key = Some(key);
        self.key_path.clear();
        (uid.to_vec(), SW_OK)
    }

    fn load_seed(&mut self, data: &[u8]) -> (Vec<u8>, u16) {
        if data.len() != 64 {
            return (Vec::new(), 0x6A80);
        }
        // real derivation is out of scope for the simulator
        self.key = Some(SigningKey::from_bytes(&[0x42; 32].into()).unwrap());
        self.key_path.clear();

        let key = self.key.as_ref().unwrap();
        let uid = Sha256::digest(key.verifying_key().to_encoded_point(false).as_bytes());
        (uid.to_vec(), SW_OK)
    }

    fn sign(&mut self, p1: u8, data: &[u8]) -> (Vec<u8>, u16) {
        if data.len() < 32 {
            return (Vec::new(), 0x6A80);
        }
        if matches!(p1, 0x01 | 0x02) && data.len() > 32 {
            let (_, path) = data.split_at(32);
            let _ = self.derive_key(0x00, path);
        }

        let digest: [u8; 32] = data[..32].try_into().unwrap();
        self.sign_digest(&digest)
    }

    fn sign_pinless(&mut self, data: &[u8]) -> (Vec<u8>, u16) {
        if self.pinless_path.is_none() {
            return (Vec::new(), 0x6A88);
        }
        let Ok(digest) = <[u8; 32]>::try_from(data) else {
            return (Vec::new(), 0x6A80);
        };
        self.sign_digest(&digest)
    }

    fn sign_digest(&mut self, digest: &[u8; 32]) -> (Vec<u8>, u16) {
        let Some(key) = self.key.as_ref() else {
            return (Vec::new(), 0x6985);
        };
        let (signature, recovery_id) = key.sign_prehash_recoverable(digest).unwrap();

        if self.legacy_sign {
            let mut der_ints = bytes::BytesMut::new();
            write_tlv(&mut der_ints, &Tag::from(0x02u8), &signature.r().to_bytes());
            write_tlv(&mut der_ints, &Tag::from(0x02u8), &signature.s().to_bytes());

            let mut inner = bytes::BytesMut::new();
            write_tlv(
                &mut inner,
                &Tag::from(0x80u8),
                key.verifying_key().to_encoded_point(false).as_bytes(),
            );
            write_tlv(&mut inner, &Tag::from(0x30u8), &der_ints);

            let mut out = bytes::BytesMut::new();
            write_tlv(&mut out, &Tag::from(0xA0u8), &inner);
            (out.to_vec(), SW_OK)
        } else {
            let mut raw = signature.to_bytes().to_vec();
            raw.push(recovery_id.to_byte());

            let mut out = bytes::BytesMut::new();
            write_tlv(&mut out, &Tag::from(0x80u8), &raw);
            (out.to_vec(), SW_OK)
        }
    }

    fn export_key(&mut self, p2: u8) -> (Vec<u8>, u16) {
        let Some(key) = self.key.as_ref() else {
            return (Vec::new(), 0x6985);
        };

        let mut inner = bytes::BytesMut::new();
        if p2 == 0x00 {
            write_tlv(&mut inner, &Tag::from(0x81u8), &key.to_bytes());
        }
        write_tlv(
            &mut inner,
            &Tag::from(0x80u8),
            key.verifying_key().to_encoded_point(false).as_bytes(),
        );
        if p2 == 0x02 {
            write_tlv(&mut inner, &Tag::from(0x82u8), &[0x77; 32]);
        }

        let mut out = bytes::BytesMut::new();
        write_tlv(&mut out, &Tag::from(0xA1u8), &inner);
        (out.to_vec(), SW_OK)
    }
}

impl Transport for CardSimulator {
    fn transmit(&mut self, command: &Command) -> Result<Response, TransportError> {
        let (data, sw) = self.process(command);
        Ok(Response::new(data, sw))
    }
}

fn derive_token(passphrase: &str) -> [u8; 32] {
    let mut token = [0u8; 32];
    pbkdf2_hmac::<Sha256>(passphrase.as_bytes(), PAIRING_SALT, 50_000, &mut token);
    token
}

fn sha256_pair(token: &[u8; 32], data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(token);
    hasher.update(data);
    hasher.finalize().into()
}

fn cmac16(key: &[u8; 16], meta: &[u8; 16], data: &[u8]) -> [u8; 16] {
    let mut mac = <Cmac<aes::Aes128> as Mac>::new(key.into());
    mac.update(meta);
    mac.update(data);
    mac.finalize().into_bytes().into()
}

fn aes128_enc(key: &[u8; 16], iv: &[u8; 16], plain: &[u8]) -> Vec<u8> {
    let mut buf = plain.to_vec();
    let len = buf.len();
    buf.resize(len + 16 - len % 16, 0);
    Enc128::new(key.into(), iv.into())
        .encrypt_padded_mut::<Iso7816>(&mut buf, len)
        .unwrap()
        .to_vec()
}
