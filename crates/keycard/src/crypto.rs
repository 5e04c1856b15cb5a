//! Cryptographic primitives for the secure channel and pairing protocol.
//!
//! Everything in here is deterministic given its inputs; randomness is
//! injected by the callers (challenges, one-shot IVs).

use aes::cipher::{
    block_padding::Iso7816,
    typenum::{U16, U32},
    BlockDecryptMut, BlockEncryptMut, Iv, IvSizeUser, Key, KeyIvInit, KeySizeUser,
};
use bytes::{Bytes, BytesMut};
use cipher::block_padding::UnpadError;
use cmac::{Cmac, Mac};
use k256::elliptic_curve::generic_array::GenericArray;
use k256::{ecdh::SharedSecret, elliptic_curve::sec1::ToEncodedPoint, PublicKey, SecretKey};
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::{Digest, Sha256, Sha512};
use unicode_normalization::UnicodeNormalization;

/// PBKDF2 salt for the pairing passphrase.
pub const PAIRING_TOKEN_SALT: &str = "Status Hardware Wallet Lite";

const PBKDF2_ITERATIONS: u32 = 50_000;

/// 32-byte PBKDF2 output shared by both sides of the pairing protocol.
pub type PairingToken = GenericArray<u8, U32>;
/// 32-byte proof of knowledge exchanged during pairing.
pub type Cryptogram = GenericArray<u8, U32>;
/// 32-byte random challenge.
pub type Challenge = GenericArray<u8, U32>;
/// 16-byte command header block prepended to every MAC input.
pub(crate) type ApduMeta = GenericArray<u8, U16>;

/// Marker for the secure-channel cipher parameters (AES-128-CBC with a
/// 16-byte chained IV).
pub struct ChannelScp;

impl KeySizeUser for ChannelScp {
    type KeySize = U16;
}

impl IvSizeUser for ChannelScp {
    type IvSize = U16;
}

/// 16-byte AES session key.
pub(crate) type SessionKey = Key<ChannelScp>;
/// 16-byte chained IV / MAC value.
pub(crate) type ChannelIv = Iv<ChannelScp>;

type Encryptor = cbc::Encryptor<aes::Aes128>;
type Decryptor = cbc::Decryptor<aes::Aes128>;
// INIT runs before any session keys exist and encrypts under the raw
// 32-byte ECDH secret instead.
type OneShotEncryptor = cbc::Encryptor<aes::Aes256>;

/// Compute the ECDH shared secret between `private` and `public`.
///
/// The secret is the x-coordinate of `d·P` as 32 big-endian bytes, with no
/// KDF applied.
pub fn generate_ecdh_shared_secret(private: &SecretKey, public: &PublicKey) -> SharedSecret {
    k256::elliptic_curve::ecdh::diffie_hellman(private.to_nonzero_scalar(), public.as_affine())
}

/// Compute the pairing cryptogram `SHA-256(shared_secret ‖ challenge)`.
pub(crate) fn calculate_cryptogram(
    shared_secret: &PairingToken,
    challenge: &Challenge,
) -> Cryptogram {
    let mut hasher = Sha256::new();
    hasher.update(shared_secret);
    hasher.update(challenge);
    hasher.finalize()
}

/// Derive the pairing token from a passphrase.
///
/// PBKDF2-HMAC-SHA256 with 50 000 iterations over the NFKD-normalized
/// passphrase and salt.
pub(crate) fn generate_pairing_token(passphrase: &str) -> PairingToken {
    let passphrase = passphrase.nfkd().collect::<String>();
    let salt = PAIRING_TOKEN_SALT.nfkd().collect::<String>();

    let mut token = PairingToken::default();
    pbkdf2_hmac::<Sha256>(
        passphrase.as_bytes(),
        salt.as_bytes(),
        PBKDF2_ITERATIONS,
        &mut token,
    );

    token
}

/// Derive the session keys for an opened secure channel.
///
/// `H = SHA-512(shared_secret ‖ pairing_key ‖ salt)`; the encryption key is
/// `H[0..16]` and the MAC key `H[16..32]`.
pub(crate) fn derive_session_keys(
    secret: &SharedSecret,
    pairing_key: &[u8; 32],
    salt: &Challenge,
) -> (SessionKey, SessionKey) {
    let mut hasher = Sha512::new();
    hasher.update(secret.raw_secret_bytes());
    hasher.update(pairing_key);
    hasher.update(salt);
    let data = hasher.finalize();

    let enc_key = SessionKey::clone_from_slice(&data[0..16]);
    let mac_key = SessionKey::clone_from_slice(&data[16..32]);

    (enc_key, mac_key)
}

/// Encrypt `data` in place with AES-128-CBC, padding it in ISO 7816-4
/// format first. Padding is applied even when the input is already block
/// aligned.
pub(crate) fn encrypt_data(data: &mut BytesMut, enc_key: &SessionKey, iv: &ChannelIv) -> Bytes {
    let msg_len = prepare_padding(data);
    // SAFETY: the buffer was just grown to a multiple of 16 bytes.
    let encrypted = Encryptor::new(enc_key, iv)
        .encrypt_padded_mut::<Iso7816>(data, msg_len)
        .unwrap();
    Bytes::copy_from_slice(encrypted)
}

/// Decrypt `data` in place with AES-128-CBC and strip the ISO 7816-4
/// padding.
pub(crate) fn decrypt_data(
    data: &mut BytesMut,
    enc_key: &SessionKey,
    iv: &ChannelIv,
) -> Result<Bytes, UnpadError> {
    let decrypted = Decryptor::new(enc_key, iv).decrypt_padded_mut::<Iso7816>(data)?;

    Ok(Bytes::copy_from_slice(decrypted))
}

/// Compute the AES-CMAC (RFC 4493) over `meta ‖ data`.
///
/// The 16-byte meta block is prepended exactly once; the result doubles as
/// the next chained IV.
pub(crate) fn calculate_mac(meta: &ApduMeta, data: &[u8], mac_key: &SessionKey) -> ChannelIv {
    let mut mac = <Cmac<aes::Aes128> as Mac>::new(mac_key);
    mac.update(meta);
    mac.update(data);

    mac.finalize().into_bytes()
}

/// One-shot encryption for INIT, before any session keys exist.
///
/// Output layout: `[len(host_pub)] ‖ host_pub ‖ iv ‖ AES-256-CBC(pad(data),
/// key = shared_secret, iv)` with a fresh random IV.
pub(crate) fn one_shot_encrypt(
    public_key: &PublicKey,
    ecdh_shared_secret: &SharedSecret,
    data: &mut BytesMut,
) -> Bytes {
    let mut iv = Iv::<ChannelScp>::default();
    rand::rng().fill_bytes(&mut iv);

    let msg_len = prepare_padding(data);
    // SAFETY: the buffer was just grown to a multiple of 16 bytes.
    let ciphertext = OneShotEncryptor::new(ecdh_shared_secret.raw_secret_bytes(), &iv)
        .encrypt_padded_mut::<Iso7816>(data, msg_len)
        .unwrap();

    let pub_key_data = public_key.to_encoded_point(false);
    let mut buf = BytesMut::with_capacity(1 + pub_key_data.len() + iv.len() + ciphertext.len());
    buf.extend_from_slice(&[pub_key_data.len() as u8]);
    buf.extend_from_slice(pub_key_data.as_bytes());
    buf.extend_from_slice(&iv);
    buf.extend_from_slice(ciphertext);

    buf.freeze()
}

// Grow the buffer to the next 16-byte boundary so the padded encryptors
// have room to work in place; returns the original message length.
fn prepare_padding(data: &mut BytesMut) -> usize {
    let len = data.len();
    data.resize(len + 16 - len % 16, 0);

    len
}
