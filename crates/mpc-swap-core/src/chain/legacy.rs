//! Legacy (type-0) EIP-155 transaction encoding

use crate::Signature;
use crate::types::keccak256_hash;
use alloy_primitives::{Address, Bytes, U256};
use alloy_rlp::{EMPTY_STRING_CODE, Encodable};

/// Legacy transaction; `to == None` creates a contract
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyTransaction {
    pub nonce: u64,
    pub gas_price: U256,
    pub gas_limit: u64,
    pub to: Option<Address>,
    pub value: U256,
    pub data: Bytes,
}

impl LegacyTransaction {
    /// EIP-155 signing hash: `keccak256(rlp([nonce, gasPrice, gas, to, value, data, chainId, 0, 0]))`
    pub fn signing_hash(&self, chain_id: u64) -> [u8; 32] {
        let mut stream = alloy_rlp::BytesMut::new();

        alloy_rlp::Header {
            list: true,
            payload_length: self.rlp_payload_length()
                + chain_id.length()
                + 0u8.length()
                + 0u8.length(),
        }
        .encode(&mut stream);

        self.encode_fields(&mut stream);
        chain_id.encode(&mut stream);
        0u8.encode(&mut stream);
        0u8.encode(&mut stream);

        keccak256_hash(&stream)
    }

    /// Signed encoding with `v = recovery_id + 35 + 2·chainId`
    pub fn encode_signed(&self, signature: &Signature, chain_id: u64) -> Vec<u8> {
        let v = signature.eip155_v(chain_id);
        let r = U256::from_be_slice(&signature.r);
        let s = U256::from_be_slice(&signature.s);

        let mut stream = alloy_rlp::BytesMut::new();

        alloy_rlp::Header {
            list: true,
            payload_length: self.rlp_payload_length() + v.length() + r.length() + s.length(),
        }
        .encode(&mut stream);

        self.encode_fields(&mut stream);
        v.encode(&mut stream);
        r.encode(&mut stream);
        s.encode(&mut stream);

        stream.to_vec()
    }

    fn encode_fields(&self, out: &mut alloy_rlp::BytesMut) {
        self.nonce.encode(out);
        self.gas_price.encode(out);
        self.gas_limit.encode(out);
        match &self.to {
            Some(to) => to.encode(out),
            None => out.extend_from_slice(&[EMPTY_STRING_CODE]),
        }
        self.value.encode(out);
        self.data.encode(out);
    }

    fn rlp_payload_length(&self) -> usize {
        self.nonce.length()
            + self.gas_price.length()
            + self.gas_limit.length()
            + self.to.as_ref().map_or(1, |to| to.length())
            + self.value.length()
            + self.data.length()
    }
}
