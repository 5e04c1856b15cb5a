/// A persistent pairing: the 256-bit pairing key and the slot it occupies
/// on the card.
///
/// Created by the pairing protocol, persisted by the caller, fed back into
/// the secure-channel open, and destroyed by UNPAIR. The library never
/// writes it to disk itself.
#[derive(Clone, PartialEq, Eq)]
pub struct PairingInfo {
    /// 32-byte pairing key.
    pub key: [u8; 32],
    /// Pairing slot on the card.
    pub index: u8,
}

impl std::fmt::Debug for PairingInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // key material stays out of logs
        f.debug_struct("PairingInfo")
            .field("index", &self.index)
            .finish_non_exhaustive()
    }
}
