//! Trade contract assembly
//!
//! The trade contract never persists: its init code performs both token
//! transfers and self-destructs in the same deployment transaction.

use super::Offer;
use super::erc20::TRANSFER_FROM_SELECTOR;
use crate::Result;
use alloy_primitives::{Address, Bytes, U256};

/// Produces trade contract init code for an offer
pub trait ContractAssembler: Send + Sync {
    fn assemble(&self, offer: &Offer, maker: Address, taker: Address) -> Result<Bytes>;
}

// ============ Opcodes ============
const PUSH1: u8 = 0x60;
const PUSH2: u8 = 0x61;
const PUSH4: u8 = 0x63;
const PUSH20: u8 = 0x73;
const PUSH32: u8 = 0x7f;
const SHL: u8 = 0x1b;
const EQ: u8 = 0x14;
const ISZERO: u8 = 0x15;
const RETURNDATASIZE: u8 = 0x3d;
const MLOAD: u8 = 0x51;
const MSTORE: u8 = 0x52;
const JUMPI: u8 = 0x57;
const GAS: u8 = 0x5a;
const JUMPDEST: u8 = 0x5b;
const DUP1: u8 = 0x80;
const CALL: u8 = 0xf1;
const REVERT: u8 = 0xfd;
const SELFDESTRUCT: u8 = 0xff;

/// Atomic two-leg swap
///
/// 1. `givesToken.transferFrom(maker, taker, givesAmount)`
/// 2. `getsToken.transferFrom(taker, maker, getsAmount)`
/// 3. `selfdestruct(taker)`, refunding the swept value
///
/// Either call reverting, or returning anything but nothing or `true`,
/// reverts the whole deployment.
#[derive(Debug, Clone, Copy, Default)]
pub struct AtomicSwapContract;

impl AtomicSwapContract {
    pub fn new() -> Self {
        Self
    }
}

impl ContractAssembler for AtomicSwapContract {
    fn assemble(&self, offer: &Offer, maker: Address, taker: Address) -> Result<Bytes> {
        let mut code = InitCode::default();
        code.transfer_from(offer.gives_token, maker, taker, offer.gives_amount);
        code.transfer_from(offer.gets_token, taker, maker, offer.gets_amount);
        code.push_address(taker);
        code.op(SELFDESTRUCT);
        Ok(code.finish())
    }
}

#[derive(Default)]
struct InitCode {
    code: Vec<u8>,
    /// Offsets of PUSH2 operands that must point at the revert block
    fail_jumps: Vec<usize>,
}

impl InitCode {
    fn op(&mut self, opcode: u8) {
        self.code.push(opcode);
    }

    fn push_u8(&mut self, value: u8) {
        self.code.extend_from_slice(&[PUSH1, value]);
    }

    fn push_address(&mut self, address: Address) {
        self.code.push(PUSH20);
        self.code.extend_from_slice(address.as_slice());
    }

    fn push_word(&mut self, value: U256) {
        self.code.push(PUSH32);
        self.code.extend_from_slice(&value.to_be_bytes::<32>());
    }

    /// Store `value` at `offset` in memory
    fn store(&mut self, offset: u8) {
        self.push_u8(offset);
        self.op(MSTORE);
    }

    /// `token.transferFrom(from, to, amount)`, jumping to the revert block on failure
    fn transfer_from(&mut self, token: Address, from: Address, to: Address, amount: U256) {
        // Calldata at 0x00..0x64: selector, from, to, amount
        self.code.push(PUSH4);
        self.code.extend_from_slice(&TRANSFER_FROM_SELECTOR);
        self.push_u8(0xe0);
        self.op(SHL);
        self.store(0x00);
        self.push_address(from);
        self.store(0x04);
        self.push_address(to);
        self.store(0x24);
        self.push_word(amount);
        self.store(0x44);

        // call(gas, token, 0, 0x00, 0x64, 0x00, 0x20)
        self.push_u8(0x20);
        self.push_u8(0x00);
        self.push_u8(0x64);
        self.push_u8(0x00);
        self.push_u8(0x00);
        self.push_address(token);
        self.op(GAS);
        self.op(CALL);

        self.op(ISZERO);
        self.jump_if_failed();

        // Tokens that return nothing succeed by not reverting
        self.op(RETURNDATASIZE);
        self.op(ISZERO);
        self.op(PUSH2);
        let done = self.code.len();
        self.code.extend_from_slice(&[0, 0]);
        self.op(JUMPI);

        // Otherwise the return data must be a single word equal to 1
        self.op(RETURNDATASIZE);
        self.push_u8(0x20);
        self.op(EQ);
        self.op(ISZERO);
        self.jump_if_failed();
        self.push_u8(0x00);
        self.op(MLOAD);
        self.push_u8(0x01);
        self.op(EQ);
        self.op(ISZERO);
        self.jump_if_failed();

        let target = self.code.len() as u16;
        self.code[done..done + 2].copy_from_slice(&target.to_be_bytes());
        self.op(JUMPDEST);
    }

    /// Jump to the revert block if the top of the stack is nonzero
    fn jump_if_failed(&mut self) {
        self.op(PUSH2);
        self.fail_jumps.push(self.code.len());
        self.code.extend_from_slice(&[0, 0]);
        self.op(JUMPI);
    }

    /// Append the revert block and patch jumps to it
    fn finish(mut self) -> Bytes {
        let fail = self.code.len() as u16;
        self.op(JUMPDEST);
        self.push_u8(0x00);
        self.op(DUP1);
        self.op(REVERT);

        for offset in &self.fail_jumps {
            self.code[*offset..*offset + 2].copy_from_slice(&fail.to_be_bytes());
        }
        Bytes::from(self.code)
    }
}
