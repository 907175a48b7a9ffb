//! Two-party key generation
//!
//! The key-generation sub-protocol takes three wire messages:
//!
//! | # | Sender | Producer |
//! |---|--------|----------|
//! | 1 | I→R | `I.step1()` |
//! | 2 | R→I | `R.step1(msg1)` |
//! | 3 | I→R | `I.step2(msg2)` |
//!
//! The responder consumes message 3 with `R.step2(msg3)`. Both sides then
//! export a [`KeyShare`] and derive the same funding address.

mod coordinator;
pub(crate) mod dkg;

pub use coordinator::{
    InitiatorKeygen, InitiatorKeygenState, ResponderKeygen, ResponderKeygenState,
};
pub use dkg::{ReferenceInitiatorDkg, ReferenceResponderDkg};

use crate::{KeyShare, Result};
use alloy_primitives::Address;

/// Result of distributed key generation
#[derive(Debug)]
pub struct KeygenResult {
    /// The generated key share for this party
    pub share: KeyShare,
    /// The joint public key (same for both parties)
    pub public_key: Vec<u8>,
    /// Address controlled by the joint key
    pub funding_address: Address,
}

impl KeygenResult {
    /// Create a new keygen result
    pub fn new(share: KeyShare) -> Result<Self> {
        let funding_address = share.funding_address()?;
        let public_key = share.public_key.clone();

        Ok(Self {
            share,
            public_key,
            funding_address,
        })
    }
}
