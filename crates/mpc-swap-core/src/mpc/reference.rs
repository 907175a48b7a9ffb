//! Reference two-party engine over secp256k1
//!
//! Follows the commit/reveal shape of two-party ECDSA: key shares combine
//! additively into the joint key, nonces combine multiplicatively into the
//! signing nonce, and the responder produces a partial `s` the initiator
//! finishes locally.
//!
//! The initiator's share travels in the clear where a production engine would
//! send an additively homomorphic encryption of it. Use this engine for tests
//! and local development only.

use super::{InitiatorDkg, InitiatorSign, ResponderDkg, ResponderSign, ThresholdEngine};
use crate::keygen::dkg::{ReferenceInitiatorDkg, ReferenceResponderDkg};
use crate::sign::dsg::{ReferenceInitiatorSign, ReferenceResponderSign};
use crate::types::keccak256_hash;
use crate::{Error, KeyShare, Result};
use k256::{
    Scalar,
    elliptic_curve::{bigint::U256, ops::Reduce},
};

/// Engine factory for the reference implementation
#[derive(Debug, Clone, Copy, Default)]
pub struct ReferenceEngine;

impl ReferenceEngine {
    pub fn new() -> Self {
        Self
    }
}

impl ThresholdEngine for ReferenceEngine {
    fn initiator_dkg(&self) -> Box<dyn InitiatorDkg> {
        Box::new(ReferenceInitiatorDkg::new())
    }

    fn responder_dkg(&self) -> Box<dyn ResponderDkg> {
        Box::new(ReferenceResponderDkg::new())
    }

    fn initiator_sign(
        &self,
        share: &KeyShare,
        message_hash: [u8; 32],
    ) -> Result<Box<dyn InitiatorSign>> {
        Ok(Box::new(ReferenceInitiatorSign::new(share, message_hash)?))
    }

    fn responder_sign(
        &self,
        share: &KeyShare,
        message_hash: [u8; 32],
    ) -> Result<Box<dyn ResponderSign>> {
        Ok(Box::new(ReferenceResponderSign::new(share, message_hash)?))
    }
}

/// Hash commitment to a point encoding under a random blinding value
pub(crate) fn commit(point: &[u8], blinding: &[u8; 32]) -> [u8; 32] {
    let mut preimage = Vec::with_capacity(point.len() + 32);
    preimage.extend_from_slice(point);
    preimage.extend_from_slice(blinding);
    keccak256_hash(&preimage)
}

/// Parse a 32-byte big-endian scalar, reducing modulo the curve order
pub(crate) fn scalar_from_slice(bytes: &[u8]) -> Result<Scalar> {
    let array: [u8; 32] = bytes
        .try_into()
        .map_err(|_| Error::Deserialization("Invalid scalar length".into()))?;
    Ok(<Scalar as Reduce<U256>>::reduce_bytes(&array.into()))
}
