//! ISO/IEC 7816-4 command/response framing, BER-TLV codec and the card
//! transport trait.
//!
//! This crate carries the wire-level pieces shared by the higher-level
//! protocol crates: serializing command units, splitting response units
//! into `(data, sw)`, walking BER-TLV structures, and the synchronous
//! [`Transport`] seam that reader backends implement.

mod command;
mod response;
pub mod status;
pub mod tlv;
mod transport;

pub use command::Command;
pub use response::{Response, ResponseError, StatusWord};
pub use tlv::{Tag, TlvError};
pub use transport::{Transport, TransportError};
