//! Card transport abstraction.
//!
//! A transport is the synchronous byte channel to one card reader. It has
//! no knowledge of secure channels or the command state machine; it moves
//! one command unit and returns the matching response unit.

use std::fmt;

use crate::{Command, Response};

/// Errors surfaced by a transport implementation.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The reader or card connection is gone.
    #[error("card connection lost")]
    Connection,

    /// The exchange failed mid-transmission.
    #[error("transmission failed")]
    Transmission,

    /// Reader-specific failure with context.
    #[error("transport error: {0}")]
    Other(String),
}

/// Synchronous request/response channel to a card.
///
/// Exactly one command may be in flight per transport. Implementations are
/// responsible for chaining `GET RESPONSE` when the card answers `0x61xx`,
/// so callers always receive the complete response.
pub trait Transport: Send + fmt::Debug {
    /// Transmit a single command and block until its response arrives.
    fn transmit(&mut self, command: &Command) -> Result<Response, TransportError>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn transmit(&mut self, command: &Command) -> Result<Response, TransportError> {
        (**self).transmit(command)
    }
}

#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct MockTransport {
    pub responses: Vec<Response>,
    pub commands: Vec<Command>,
}

#[cfg(test)]
impl Transport for MockTransport {
    fn transmit(&mut self, command: &Command) -> Result<Response, TransportError> {
        self.commands.push(command.clone());

        if self.responses.is_empty() {
            return Err(TransportError::Transmission);
        }
        Ok(self.responses.remove(0))
    }
}
