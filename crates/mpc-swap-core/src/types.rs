//! Core types for the trade handshake
//!
//! This module defines the fundamental types shared by the coordinators:
//! session roles, the exported key share with its funding address, and the
//! recoverable ECDSA signature produced by threshold signing.

use crate::{Error, Result};
use alloy_primitives::Address;
use k256::{
    AffinePoint, ProjectivePoint, Scalar,
    ecdsa::{self, RecoveryId, VerifyingKey},
    elliptic_curve::sec1::{FromEncodedPoint, ToEncodedPoint},
};
use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Unique identifier for a trade session
pub type SessionId = uuid::Uuid;

/// Role of a peer in a trade session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Opens the stream and leads the handshake (the taker)
    Initiator,
    /// Accepts the stream and follows (the maker)
    Responder,
}

impl Role {
    /// The other side of the session
    pub fn counterparty(&self) -> Role {
        match self {
            Role::Initiator => Role::Responder,
            Role::Responder => Role::Initiator,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Initiator => write!(f, "Initiator"),
            Role::Responder => write!(f, "Responder"),
        }
    }
}

/// Recoverable ECDSA signature (r, s, v)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    /// R component (32 bytes)
    pub r: [u8; 32],
    /// S component (32 bytes, low-s form)
    pub s: [u8; 32],
    /// Recovery ID (0 or 1)
    pub recovery_id: u8,
}

impl Signature {
    /// Create a new signature
    pub fn new(r: [u8; 32], s: [u8; 32], recovery_id: u8) -> Self {
        Self { r, s, recovery_id }
    }

    /// Convert to bytes (r || s)
    pub fn to_bytes(&self) -> [u8; 64] {
        let mut bytes = [0u8; 64];
        bytes[..32].copy_from_slice(&self.r);
        bytes[32..].copy_from_slice(&self.s);
        bytes
    }

    /// Get v value in the pre-EIP-155 convention
    pub fn v(&self) -> u8 {
        self.recovery_id + 27
    }

    /// Get v value for an EIP-155 legacy transaction
    pub fn eip155_v(&self, chain_id: u64) -> u64 {
        self.recovery_id as u64 + 35 + chain_id * 2
    }

    /// Recover the address that produced this signature over a 32-byte prehash
    pub fn recover_address(&self, prehash: &[u8; 32]) -> Result<Address> {
        let signature = ecdsa::Signature::from_slice(&self.to_bytes())
            .map_err(|e| Error::InvalidSignature(e.to_string()))?;
        let recovery_id = RecoveryId::from_byte(self.recovery_id)
            .ok_or_else(|| Error::InvalidSignature(format!("recovery id {}", self.recovery_id)))?;
        let key = VerifyingKey::recover_from_prehash(prehash, &signature, recovery_id)
            .map_err(|e| Error::InvalidSignature(e.to_string()))?;
        let encoded = key.to_encoded_point(false);
        Ok(address_from_uncompressed(encoded.as_bytes()))
    }
}

mod scalar_serde {
    use k256::{
        Scalar,
        elliptic_curve::{bigint::U256, ops::Reduce},
    };
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(scalar: &Scalar, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let bytes = scalar.to_bytes();
        serializer.serialize_bytes(bytes.as_slice())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Scalar, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bytes: Vec<u8> = Vec::deserialize(deserializer)?;
        let array: [u8; 32] = bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("Invalid scalar length"))?;
        Ok(<Scalar as Reduce<U256>>::reduce_bytes(&array.into()))
    }
}

/// One party's share of the jointly generated key
///
/// Produced once per session by the DKG engine. Both parties hold the same
/// joint public key, and therefore derive the same funding address.
#[derive(Clone, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct KeyShare {
    /// Role of the party holding this share
    #[zeroize(skip)]
    pub role: Role,

    /// This party's secret share
    #[serde(with = "scalar_serde")]
    pub secret_share: Scalar,

    /// Joint public key (compressed, 33 bytes)
    #[zeroize(skip)]
    pub public_key: Vec<u8>,

    /// Engine-specific material received from the counterparty during DKG
    pub counterparty_material: Vec<u8>,
}

impl KeyShare {
    /// Get the joint public key as a ProjectivePoint
    pub fn public_key_point(&self) -> Result<ProjectivePoint> {
        decode_point(&self.public_key)
    }

    /// Joint public key as an ECDSA verifying key
    pub fn verifying_key(&self) -> Result<VerifyingKey> {
        VerifyingKey::from_sec1_bytes(&self.public_key).map_err(|e| Error::Crypto(e.to_string()))
    }

    /// Derive the funding address: the account controlled by the joint key
    pub fn funding_address(&self) -> Result<Address> {
        let point = self.public_key_point()?;
        let encoded = point.to_affine().to_encoded_point(false);
        Ok(address_from_uncompressed(encoded.as_bytes()))
    }
}

impl fmt::Debug for KeyShare {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyShare")
            .field("role", &self.role)
            .field("secret_share", &"[REDACTED]")
            .field("public_key", &hex::encode(&self.public_key))
            .field("counterparty_material", &"[REDACTED]")
            .finish()
    }
}

/// Decode a SEC1-encoded secp256k1 point
pub(crate) fn decode_point(bytes: &[u8]) -> Result<ProjectivePoint> {
    let encoded =
        k256::EncodedPoint::from_bytes(bytes).map_err(|e| Error::Crypto(e.to_string()))?;
    let affine_opt = AffinePoint::from_encoded_point(&encoded);
    let affine: AffinePoint =
        Option::<AffinePoint>::from(affine_opt).ok_or(Error::Crypto("Invalid point".into()))?;
    Ok(ProjectivePoint::from(affine))
}

/// Compressed SEC1 encoding of a point
pub(crate) fn encode_point(point: &ProjectivePoint) -> Vec<u8> {
    point.to_affine().to_encoded_point(true).as_bytes().to_vec()
}

/// Ethereum address of an uncompressed SEC1 public key (65 bytes, 0x04 prefix)
fn address_from_uncompressed(encoded: &[u8]) -> Address {
    let hash = keccak256_hash(&encoded[1..]);
    Address::from_slice(&hash[12..])
}

/// Compute Keccak256 hash of data
pub fn keccak256_hash(data: &[u8]) -> [u8; 32] {
    use tiny_keccak::{Hasher, Keccak};
    let mut hasher = Keccak::v256();
    hasher.update(data);
    let mut hash = [0u8; 32];
    hasher.finalize(&mut hash);
    hash
}
