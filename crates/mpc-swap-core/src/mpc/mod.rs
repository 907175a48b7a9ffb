//! Two-party threshold-ECDSA engine capability
//!
//! The coordinators never look inside engine messages; they only route them
//! in handshake order. An engine is split into four single-use contexts, one
//! per role and sub-protocol, created by a [`ThresholdEngine`] factory.
//!
//! ```text
//! DKG       I.step1 -> R.step1 -> I.step2 -> R.step2
//! Signing   I.step1 -> R.step1 -> I.step2 -> R.step2 -> I.step3
//! ```
//!
//! Calling a step out of order, or driving a context after it finished, is an
//! [`Error::EngineMisuse`](crate::Error::EngineMisuse).

use crate::{KeyShare, Result, Signature};

pub mod messages;
pub mod reference;

pub use messages::{EngineMessage, EngineRound};
pub use reference::ReferenceEngine;

/// Initiator side of the key-generation sub-protocol
pub trait InitiatorDkg: Send {
    /// Produce wire message 1
    fn step1(&mut self) -> Result<Vec<u8>>;

    /// Consume wire message 2, produce wire message 3
    fn step2(&mut self, message: &[u8]) -> Result<Vec<u8>>;

    /// Export this party's key share once `step2` has run
    fn export_share(&self) -> Result<KeyShare>;
}

/// Responder side of the key-generation sub-protocol
pub trait ResponderDkg: Send {
    /// Consume wire message 1, produce wire message 2
    fn step1(&mut self, message: &[u8]) -> Result<Vec<u8>>;

    /// Consume wire message 3
    fn step2(&mut self, message: &[u8]) -> Result<()>;

    /// Export this party's key share once `step2` has run
    fn export_share(&self) -> Result<KeyShare>;
}

/// Initiator side of the signing sub-protocol
pub trait InitiatorSign: Send {
    /// Produce signing message 1
    fn step1(&mut self) -> Result<Vec<u8>>;

    /// Consume signing message 2, produce signing message 3
    fn step2(&mut self, message: &[u8]) -> Result<Vec<u8>>;

    /// Consume signing message 4
    fn step3(&mut self, message: &[u8]) -> Result<()>;

    /// Export the finished signature
    fn export_signature(&self) -> Result<Signature>;
}

/// Responder side of the signing sub-protocol
pub trait ResponderSign: Send {
    /// Consume signing message 1, produce signing message 2
    fn step1(&mut self, message: &[u8]) -> Result<Vec<u8>>;

    /// Consume signing message 3, produce signing message 4
    fn step2(&mut self, message: &[u8]) -> Result<Vec<u8>>;
}

/// Factory for role-specific engine contexts
pub trait ThresholdEngine: Send + Sync {
    /// Fresh initiator DKG context
    fn initiator_dkg(&self) -> Box<dyn InitiatorDkg>;

    /// Fresh responder DKG context
    fn responder_dkg(&self) -> Box<dyn ResponderDkg>;

    /// Initiator signing context seeded with a key share and message hash
    fn initiator_sign(
        &self,
        share: &KeyShare,
        message_hash: [u8; 32],
    ) -> Result<Box<dyn InitiatorSign>>;

    /// Responder signing context seeded with a key share and message hash
    fn responder_sign(
        &self,
        share: &KeyShare,
        message_hash: [u8; 32],
    ) -> Result<Box<dyn ResponderSign>>;
}
