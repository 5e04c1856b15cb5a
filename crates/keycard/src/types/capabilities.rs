use std::fmt;

/// Capability flags advertised by the applet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    SecureChannel = 0x01,
    KeyManagement = 0x02,
    CredentialsManagement = 0x04,
    Ndef = 0x08,
    FactoryReset = 0x10,
}

/// Capability flags container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities(u8);

impl Capabilities {
    /// Build from a list of capabilities.
    pub fn new(capabilities: &[Capability]) -> Self {
        Self(capabilities.iter().fold(0, |flags, &cap| flags | cap as u8))
    }

    /// Every capability. Used when a SELECT response predates the
    /// capabilities tag.
    pub const fn all() -> Self {
        Self(0x1F)
    }

    /// Whether the given capability bit is set.
    pub fn has(&self, capability: Capability) -> bool {
        self.0 & capability as u8 != 0
    }
}

impl From<u8> for Capabilities {
    fn from(value: u8) -> Self {
        Self(value)
    }
}

impl fmt::Display for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names = Vec::new();
        if self.has(Capability::SecureChannel) {
            names.push("Secure Channel");
        }
        if self.has(Capability::KeyManagement) {
            names.push("Key Management");
        }
        if self.has(Capability::CredentialsManagement) {
            names.push("Credentials Management");
        }
        if self.has(Capability::Ndef) {
            names.push("NDEF");
        }
        if self.has(Capability::FactoryReset) {
            names.push("Factory Reset");
        }
        write!(f, "{}", names.join(", "))
    }
}
