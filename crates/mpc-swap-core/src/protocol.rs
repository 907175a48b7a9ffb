//! Positional handshake layout
//!
//! The trade handshake is a strictly positional protocol: a message's meaning
//! is given by where it sits in the stream, not by anything it contains. This
//! module names the nine positions and tracks, per role, which inbound
//! position comes next.

use crate::types::Role;
use crate::{Error, Result};
use std::fmt;

/// Protocol identifier for offer-list retrieval streams
pub const ORDERS_PROTOCOL: &str = "/pintswap/0.1.0/orders";

/// Protocol identifier for trade handshake streams
pub const CREATE_TRADE_PROTOCOL: &str = "/pintswap/0.1.0/create-trade";

/// One position in the 9-message handshake
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandshakeStep {
    Keygen1,
    Keygen2,
    Keygen3,
    OfferHash,
    TxHash,
    Sign1,
    Sign2,
    Sign3,
    Sign4,
}

impl HandshakeStep {
    /// All steps in global wire order
    pub const ALL: [HandshakeStep; 9] = [
        HandshakeStep::Keygen1,
        HandshakeStep::Keygen2,
        HandshakeStep::Keygen3,
        HandshakeStep::OfferHash,
        HandshakeStep::TxHash,
        HandshakeStep::Sign1,
        HandshakeStep::Sign2,
        HandshakeStep::Sign3,
        HandshakeStep::Sign4,
    ];

    /// 1-based position in the global sequence
    pub fn position(&self) -> usize {
        match self {
            HandshakeStep::Keygen1 => 1,
            HandshakeStep::Keygen2 => 2,
            HandshakeStep::Keygen3 => 3,
            HandshakeStep::OfferHash => 4,
            HandshakeStep::TxHash => 5,
            HandshakeStep::Sign1 => 6,
            HandshakeStep::Sign2 => 7,
            HandshakeStep::Sign3 => 8,
            HandshakeStep::Sign4 => 9,
        }
    }

    /// Role that sends this message
    pub fn sender(&self) -> Role {
        match self {
            HandshakeStep::Keygen2 | HandshakeStep::Sign2 | HandshakeStep::Sign4 => Role::Responder,
            _ => Role::Initiator,
        }
    }

    /// Steps a role receives, in order
    pub fn inbound_for(role: Role) -> impl Iterator<Item = HandshakeStep> {
        Self::ALL
            .into_iter()
            .filter(move |step| step.sender() == role.counterparty())
    }
}

impl fmt::Display for HandshakeStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HandshakeStep::Keygen1 => "Keygen1",
            HandshakeStep::Keygen2 => "Keygen2",
            HandshakeStep::Keygen3 => "Keygen3",
            HandshakeStep::OfferHash => "OfferHash",
            HandshakeStep::TxHash => "TxHash",
            HandshakeStep::Sign1 => "Sign1",
            HandshakeStep::Sign2 => "Sign2",
            HandshakeStep::Sign3 => "Sign3",
            HandshakeStep::Sign4 => "Sign4",
        };
        write!(f, "{}", name)
    }
}

/// Tracks the next inbound position for one role
///
/// Every message pulled off the channel is checked against the step the
/// caller is about to handle; any mismatch, or a message past the end of the
/// role's sequence, is a [`Error::ProtocolOrderViolation`].
#[derive(Debug, Clone)]
pub struct InboundSequence {
    role: Role,
    steps: Vec<HandshakeStep>,
    received: usize,
}

impl InboundSequence {
    /// Sequence for the given role
    pub fn new(role: Role) -> Self {
        Self {
            role,
            steps: HandshakeStep::inbound_for(role).collect(),
            received: 0,
        }
    }

    /// Role this sequence belongs to
    pub fn role(&self) -> Role {
        self.role
    }

    /// Next expected step, or `None` once the sequence is exhausted
    pub fn expected(&self) -> Option<HandshakeStep> {
        self.steps.get(self.received).copied()
    }

    /// Number of inbound messages accepted so far
    pub fn received(&self) -> usize {
        self.received
    }

    /// True once every inbound message for the role has been accepted
    pub fn is_complete(&self) -> bool {
        self.received == self.steps.len()
    }

    /// Accept the next inbound message as `step`
    pub fn advance(&mut self, step: HandshakeStep) -> Result<()> {
        match self.expected() {
            Some(expected) if expected == step => {
                self.received += 1;
                Ok(())
            }
            Some(expected) => Err(Error::order_violation(expected, step)),
            None => Err(Error::order_violation("end of stream", step)),
        }
    }

    /// Reject any message arriving after the role's last step
    pub fn reject_extra(&self) -> Result<()> {
        match self.expected() {
            None => Err(Error::order_violation(
                "end of stream",
                format!("message #{}", self.received + 1),
            )),
            Some(expected) => Err(Error::order_violation(expected, "unexpected message")),
        }
    }
}
