//! Applet identifiers, instruction bytes and TLV tags.

/// AID of the Keycard applet.
pub const KEYCARD_AID: &[u8] = &[0xA0, 0x00, 0x00, 0x08, 0x04, 0x00, 0x01, 0x01];

/// Default instance index appended to [`KEYCARD_AID`].
pub const KEYCARD_DEFAULT_INSTANCE_INDEX: u8 = 1;

/// Create a Keycard instance AID with the specified index.
pub fn keycard_instance_aid(index: u8) -> Vec<u8> {
    assert!(index >= 1);
    let mut aid = Vec::from(KEYCARD_AID);
    aid.push(index);
    aid
}

/// Interindustry class byte, used only by SELECT.
pub const CLA_ISO: u8 = 0x00;
/// GlobalPlatform proprietary class byte, used by every applet command.
pub const CLA_GP: u8 = 0x80;

/// Instruction bytes of the applet protocol.
pub mod ins {
    pub const SELECT: u8 = 0xA4;
    pub const INIT: u8 = 0xFE;
    pub const FACTORY_RESET: u8 = 0xFD;
    pub const OPEN_SECURE_CHANNEL: u8 = 0x10;
    pub const MUTUALLY_AUTHENTICATE: u8 = 0x11;
    pub const PAIR: u8 = 0x12;
    pub const UNPAIR: u8 = 0x13;
    pub const IDENTIFY: u8 = 0x14;
    pub const GET_STATUS: u8 = 0xF2;
    pub const VERIFY_PIN: u8 = 0x20;
    pub const CHANGE_PIN: u8 = 0x21;
    pub const UNBLOCK_PIN: u8 = 0x22;
    pub const SIGN: u8 = 0xC0;
    pub const SET_PINLESS_PATH: u8 = 0xC1;
    pub const EXPORT_KEY: u8 = 0xC2;
    pub const GET_DATA: u8 = 0xCA;
    pub const LOAD_KEY: u8 = 0xD0;
    pub const DERIVE_KEY: u8 = 0xD1;
    pub const GENERATE_MNEMONIC: u8 = 0xD2;
    pub const REMOVE_KEY: u8 = 0xD3;
    pub const GENERATE_KEY: u8 = 0xD4;
    pub const STORE_DATA: u8 = 0xE2;
}

/// First parameter bytes.
pub mod p1 {
    pub const PAIRING_FIRST_STEP: u8 = 0x00;
    pub const PAIRING_FINAL_STEP: u8 = 0x01;

    pub const GET_STATUS_APPLICATION: u8 = 0x00;
    pub const GET_STATUS_KEY_PATH: u8 = 0x01;

    pub const DERIVE_FROM_MASTER: u8 = 0x00;
    pub const DERIVE_FROM_PARENT: u8 = 0x40;
    pub const DERIVE_FROM_CURRENT: u8 = 0x80;

    pub const CHANGE_PIN: u8 = 0x00;
    pub const CHANGE_PUK: u8 = 0x01;
    pub const CHANGE_PAIRING_SECRET: u8 = 0x02;

    pub const SIGN_CURRENT_KEY: u8 = 0x00;
    pub const SIGN_DERIVE: u8 = 0x01;
    pub const SIGN_DERIVE_AND_MAKE_CURRENT: u8 = 0x02;
    pub const SIGN_PINLESS: u8 = 0x03;

    pub const EXPORT_KEY_CURRENT: u8 = 0x00;
    pub const EXPORT_KEY_DERIVE: u8 = 0x01;
    pub const EXPORT_KEY_DERIVE_AND_MAKE_CURRENT: u8 = 0x02;

    pub const LOAD_KEY_SEED: u8 = 0x03;

    pub const FACTORY_RESET_MAGIC: u8 = 0xAA;
}

/// Second parameter bytes.
pub mod p2 {
    pub const SIGN: u8 = 0x01;

    pub const EXPORT_KEY_PRIVATE_AND_PUBLIC: u8 = 0x00;
    pub const EXPORT_KEY_PUBLIC_ONLY: u8 = 0x01;
    pub const EXPORT_KEY_EXTENDED_PUBLIC: u8 = 0x02;

    pub const FACTORY_RESET_MAGIC: u8 = 0x55;
}

/// BER-TLV tags used by applet responses.
pub mod tags {
    /// Signature template containing:
    /// - TAG_ECC_PUBLIC_KEY
    /// - TAG_ECDSA_SIGNATURE
    pub const TEMPLATE_SIGNATURE: u8 = 0xA0;
    /// Keypair template containing:
    /// - TAG_ECC_PRIVATE_KEY
    /// - optional TAG_CHAIN_CODE / TAG_ECC_PUBLIC_KEY
    pub const TEMPLATE_KEYPAIR: u8 = 0xA1;
    /// Application status template containing:
    /// - TAG_OTHER (for the PIN and PUK retry counts)
    /// - TAG_KEY_INITIALIZED
    pub const TEMPLATE_APPLICATION_STATUS: u8 = 0xA3;
    /// Application info template containing:
    /// - TAG_INSTANCE_UID
    /// - TAG_ECC_PUBLIC_KEY
    /// - TAG_OTHER (application version and remaining pairing slots)
    /// - TAG_KEY_UID
    /// - TAG_CAPABILITIES
    pub const TEMPLATE_APPLICATION_INFO: u8 = 0xA4;

    /// Instance UID (16 bytes).
    pub const INSTANCE_UID: u8 = 0x8F;
    /// ECC public key (uncompressed, 65 bytes, or 0 bytes if not available).
    /// Doubles as the raw recoverable-signature tag in SIGN responses and as
    /// the outer tag of a pre-initialized SELECT response.
    pub const ECC_PUBLIC_KEY: u8 = 0x80;
    /// ECC private key (32 bytes).
    pub const ECC_PRIVATE_KEY: u8 = 0x81;
    /// BIP32 chain code (32 bytes).
    pub const CHAIN_CODE: u8 = 0x82;
    /// Application version (2 bytes) / remaining pairing slots (1 byte).
    pub const OTHER: u8 = 0x02;
    /// Key UID (SHA-256 of the master public key, 32 bytes).
    pub const KEY_UID: u8 = 0x8E;
    /// Capability bitset (1 byte).
    pub const CAPABILITIES: u8 = 0x8D;
    /// Identity certificate inside an IDENT response.
    pub const CERTIFICATE: u8 = 0x8A;
    /// DER ECDSA signature (a SEQUENCE of two INTEGERs for r and s).
    pub const ECDSA_SIGNATURE: u8 = 0x30;
    /// DER INTEGER.
    pub const DER_INTEGER: u8 = 0x02;

    /// Key initialized flag (0xFF when a key is loaded).
    pub const KEY_INITIALIZED: u8 = 0x01;
}
