//! Reference engine wire messages

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Round tag carried by every reference engine message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineRound {
    KeygenCommit,
    KeygenShare,
    KeygenReveal,
    SignCommit,
    SignNonce,
    SignReveal,
    SignPartial,
}

impl fmt::Display for EngineRound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EngineRound::KeygenCommit => "keygen_commit",
            EngineRound::KeygenShare => "keygen_share",
            EngineRound::KeygenReveal => "keygen_reveal",
            EngineRound::SignCommit => "sign_commit",
            EngineRound::SignNonce => "sign_nonce",
            EngineRound::SignReveal => "sign_reveal",
            EngineRound::SignPartial => "sign_partial",
        };
        write!(f, "{}", name)
    }
}

/// Reference engine message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "round", rename_all = "snake_case")]
pub enum EngineMessage {
    /// DKG 1 (I→R): commitment to the initiator's public share
    KeygenCommit { commitment: [u8; 32] },
    /// DKG 2 (R→I): responder's public share (compressed point)
    KeygenShare { public_share: Vec<u8> },
    /// DKG 3 (I→R): opening of the commitment plus the initiator's material
    KeygenReveal {
        public_share: Vec<u8>,
        blinding: [u8; 32],
        material: Vec<u8>,
    },
    /// Sign 1 (I→R): commitment to the initiator's nonce point
    SignCommit { commitment: [u8; 32] },
    /// Sign 2 (R→I): responder's nonce point
    SignNonce { nonce_point: Vec<u8> },
    /// Sign 3 (I→R): opening of the nonce commitment
    SignReveal {
        nonce_point: Vec<u8>,
        blinding: [u8; 32],
    },
    /// Sign 4 (R→I): responder's partial signature
    SignPartial { partial: Vec<u8> },
}

impl EngineMessage {
    /// Round tag of this message
    pub fn round(&self) -> EngineRound {
        match self {
            EngineMessage::KeygenCommit { .. } => EngineRound::KeygenCommit,
            EngineMessage::KeygenShare { .. } => EngineRound::KeygenShare,
            EngineMessage::KeygenReveal { .. } => EngineRound::KeygenReveal,
            EngineMessage::SignCommit { .. } => EngineRound::SignCommit,
            EngineMessage::SignNonce { .. } => EngineRound::SignNonce,
            EngineMessage::SignReveal { .. } => EngineRound::SignReveal,
            EngineMessage::SignPartial { .. } => EngineRound::SignPartial,
        }
    }

    /// Serialize for the wire
    pub fn encode(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Decode a message that must belong to `expected`
    pub fn decode(bytes: &[u8], expected: EngineRound) -> Result<Self> {
        let message: EngineMessage = serde_json::from_slice(bytes)
            .map_err(|e| Error::malformed(expected, e))?;
        if message.round() != expected {
            return Err(Error::order_violation(expected, message.round()));
        }
        Ok(message)
    }
}
