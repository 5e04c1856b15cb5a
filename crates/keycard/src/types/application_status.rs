use std::fmt;

use keycard_apdu::tlv::{find_tag, find_tag_n, Tag};

use crate::constants::tags;
use crate::error::Result;

/// Application status returned by GET STATUS with P1 = 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApplicationStatus {
    /// Remaining PIN attempts.
    pub pin_retry_count: u8,
    /// Remaining PUK attempts.
    pub puk_retry_count: u8,
    /// Whether a key is loaded on the card.
    pub key_initialized: bool,
    /// Whether the applet can derive public keys on its own.
    pub pubkey_derivation_supported: bool,
}

impl ApplicationStatus {
    /// Parse the `0xA3` status template. Counters and flags missing from
    /// the template read as zero / false.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let template = find_tag(data, &[Tag::from(tags::TEMPLATE_APPLICATION_STATUS)])?;

        let mut status = Self {
            pin_retry_count: 0,
            puk_retry_count: 0,
            key_initialized: false,
            pubkey_derivation_supported: false,
        };

        if let Ok([count]) = find_tag(template, &[Tag::from(tags::OTHER)]) {
            status.pin_retry_count = *count;
        }
        if let Ok([count]) = find_tag_n(template, &[Tag::from(tags::OTHER)], 1) {
            status.puk_retry_count = *count;
        }
        if let Ok(flag) = find_tag(template, &[Tag::from(tags::KEY_INITIALIZED)]) {
            status.key_initialized = flag == [0xFF];
        }
        if let Ok(flag) = find_tag_n(template, &[Tag::from(tags::KEY_INITIALIZED)], 1) {
            status.pubkey_derivation_supported = flag == [0xFF];
        }

        Ok(status)
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Application Status:")?;
        writeln!(f, "  PIN retries remaining: {}", self.pin_retry_count)?;
        writeln!(f, "  PUK retries remaining: {}", self.puk_retry_count)?;
        write!(f, "  Key initialized: {}", self.key_initialized)
    }
}
