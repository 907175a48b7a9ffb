//! Offers and their content hash

use crate::types::keccak256_hash;
use crate::{Error, Result};
use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Terms of a swap as listed by a maker
///
/// The maker gives `gives_amount` of `gives_token` and receives
/// `gets_amount` of `gets_token`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Offer {
    pub gives_token: Address,
    pub gives_amount: U256,
    pub gets_token: Address,
    pub gets_amount: U256,
    pub maker: Address,
}

impl Offer {
    pub fn new(
        gives_token: Address,
        gives_amount: U256,
        gets_token: Address,
        gets_amount: U256,
        maker: Address,
    ) -> Self {
        Self {
            gives_token,
            gives_amount,
            gets_token,
            gets_amount,
            maker,
        }
    }

    /// Packed encoding: `givesToken ‖ givesAmount ‖ getsToken ‖ getsAmount ‖ maker`
    pub fn packed(&self) -> Vec<u8> {
        let mut packed = Vec::with_capacity(20 + 32 + 20 + 32 + 20);
        packed.extend_from_slice(self.gives_token.as_slice());
        packed.extend_from_slice(&self.gives_amount.to_be_bytes::<32>());
        packed.extend_from_slice(self.gets_token.as_slice());
        packed.extend_from_slice(&self.gets_amount.to_be_bytes::<32>());
        packed.extend_from_slice(self.maker.as_slice());
        packed
    }

    /// Content hash identifying this offer
    pub fn hash(&self) -> OfferHash {
        OfferHash(keccak256_hash(&self.packed()))
    }
}

/// Keccak-256 of an offer's packed encoding
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct OfferHash(pub [u8; 32]);

impl OfferHash {
    /// Parse the raw 32-byte wire form
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let array: [u8; 32] = bytes.try_into().map_err(|_| {
            Error::InvalidOfferHash(format!("expected 32 bytes, got {}", bytes.len()))
        })?;
        Ok(Self(array))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for OfferHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for OfferHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OfferHash({})", self)
    }
}

impl FromStr for OfferHash {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let bytes = hex::decode(s.trim_start_matches("0x"))
            .map_err(|e| Error::InvalidOfferHash(e.to_string()))?;
        Self::from_slice(&bytes)
    }
}

impl Serialize for OfferHash {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for OfferHash {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
