//! ERC-20 call encoding

use alloy_primitives::{Address, U256};

/// `approve(address,uint256)`
pub const APPROVE_SELECTOR: [u8; 4] = [0x09, 0x5e, 0xa7, 0xb3];

/// `transferFrom(address,address,uint256)`
pub const TRANSFER_FROM_SELECTOR: [u8; 4] = [0x23, 0xb8, 0x72, 0xdd];

/// Calldata for `approve(spender, amount)`
pub fn approve_calldata(spender: Address, amount: U256) -> Vec<u8> {
    let mut encoded = APPROVE_SELECTOR.to_vec();
    encoded.extend_from_slice(&[0u8; 12]);
    encoded.extend_from_slice(spender.as_slice());
    encoded.extend_from_slice(&amount.to_be_bytes::<32>());
    encoded
}

/// Decode `approve` calldata into `(spender, amount)`
pub fn decode_approve(data: &[u8]) -> Option<(Address, U256)> {
    if data.len() != 4 + 64 || data[..4] != APPROVE_SELECTOR {
        return None;
    }
    if data[4..16].iter().any(|b| *b != 0) {
        return None;
    }
    let spender = Address::from_slice(&data[16..36]);
    let amount = U256::from_be_slice(&data[36..68]);
    Some((spender, amount))
}
