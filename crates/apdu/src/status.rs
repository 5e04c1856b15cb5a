//! ISO/IEC 7816-4 status word constants used by the protocol.

/// Success.
pub const SW_OK: u16 = 0x9000;

/// Wrong data.
pub const SW_WRONG_DATA: u16 = 0x6A80;

/// File not found / applet not present.
pub const SW_FILE_NOT_FOUND: u16 = 0x6A82;

/// All pairing slots are taken (PAIR step 1).
pub const SW_NO_AVAILABLE_PAIRING_SLOTS: u16 = 0x6A84;

/// Incorrect P1/P2 parameters.
pub const SW_INCORRECT_P1P2: u16 = 0x6A86;

/// Referenced data not found (e.g. pinless path not set).
pub const SW_REFERENCED_DATA_NOT_FOUND: u16 = 0x6A88;

/// Conditions of use not satisfied.
pub const SW_CONDITIONS_NOT_SATISFIED: u16 = 0x6985;

/// Security status not satisfied.
pub const SW_SECURITY_STATUS_NOT_SATISFIED: u16 = 0x6982;

/// Base pattern of retry-counter failures: `0x63Cx` with `x` attempts left.
pub const SW_RETRY_COUNTER_MASK: u16 = 0x63C0;
