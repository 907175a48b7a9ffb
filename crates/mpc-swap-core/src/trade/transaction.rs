//! The trade transaction

use crate::chain::{LegacyTransaction, TxHash};
use crate::types::keccak256_hash;
use crate::{Error, Result, Signature};
use alloy_primitives::{Address, Bytes, U256};
use serde::{Deserialize, Serialize};

/// Contract-creation transaction sent from the funding address
///
/// Built unsigned by the initiator; once a signature is attached it can no
/// longer be changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// Trade contract init code
    pub data: Bytes,
    pub chain_id: u64,
    pub gas_price: U256,
    pub gas_limit: u64,
    pub nonce: u64,
    pub value: U256,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    signature: Option<Signature>,
}

impl Transaction {
    /// Unsigned transaction
    pub fn new(
        data: impl Into<Bytes>,
        chain_id: u64,
        gas_price: U256,
        gas_limit: u64,
        nonce: u64,
        value: U256,
    ) -> Self {
        Self {
            data: data.into(),
            chain_id,
            gas_price,
            gas_limit,
            nonce,
            value,
            signature: None,
        }
    }

    fn legacy(&self) -> LegacyTransaction {
        LegacyTransaction {
            nonce: self.nonce,
            gas_price: self.gas_price,
            gas_limit: self.gas_limit,
            to: None,
            value: self.value,
            data: self.data.clone(),
        }
    }

    /// EIP-155 hash the threshold signature is computed over
    pub fn signing_hash(&self) -> [u8; 32] {
        self.legacy().signing_hash(self.chain_id)
    }

    pub fn signature(&self) -> Option<&Signature> {
        self.signature.as_ref()
    }

    pub fn is_signed(&self) -> bool {
        self.signature.is_some()
    }

    /// Attach the signature; a transaction is signed at most once
    pub fn attach_signature(&mut self, signature: Signature) -> Result<()> {
        if self.signature.is_some() {
            return Err(Error::AlreadySigned);
        }
        self.signature = Some(signature);
        Ok(())
    }

    fn require_signature(&self) -> Result<&Signature> {
        self.signature
            .as_ref()
            .ok_or_else(|| Error::InvalidSignature("transaction is unsigned".into()))
    }

    /// Raw signed encoding for broadcast
    pub fn encode_signed(&self) -> Result<Vec<u8>> {
        let signature = self.require_signature()?;
        Ok(self.legacy().encode_signed(signature, self.chain_id))
    }

    /// Hash of the signed encoding
    pub fn tx_hash(&self) -> Result<TxHash> {
        Ok(TxHash::from(keccak256_hash(&self.encode_signed()?)))
    }

    /// Address that produced the attached signature
    pub fn recover_signer(&self) -> Result<Address> {
        let signature = self.require_signature()?;
        signature.recover_address(&self.signing_hash())
    }

    /// Address the contract will be deployed at when sent from `sender`
    pub fn contract_address(&self, sender: Address) -> Address {
        sender.create(self.nonce)
    }
}
