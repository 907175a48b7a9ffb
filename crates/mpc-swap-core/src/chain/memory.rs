//! In-memory chain for testing and local development

use super::{ChainProvider, ChainSigner, GasEstimateRequest, TxHash, TxRequest};
use crate::trade::erc20;
use crate::types::keccak256_hash;
use crate::{Error, Result};
use alloy_primitives::{Address, Bytes, U256};
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Default gas price (1 gwei)
const DEFAULT_GAS_PRICE: u64 = 1_000_000_000;

/// Default gas estimate for a trade contract deployment
const DEFAULT_GAS_ESTIMATE: u64 = 250_000;

/// Chain operations that can be observed and made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChainOperation {
    ChainId,
    GetBalance,
    GetNonce,
    GasPrice,
    EstimateGas,
    Broadcast,
    SendTransaction,
}

struct ChainState {
    chain_id: u64,
    gas_price: RwLock<U256>,
    gas_estimate: RwLock<u64>,
    balances: DashMap<Address, U256>,
    nonces: DashMap<Address, u64>,
    /// (token, owner, spender) -> amount
    allowances: DashMap<(Address, Address, Address), U256>,
    broadcasts: RwLock<Vec<Bytes>>,
    failures: DashMap<ChainOperation, String>,
    calls: Mutex<Vec<ChainOperation>>,
}

/// In-memory simulated chain
///
/// Tracks native balances, nonces and ERC-20 allowances set through
/// `approve` calls, records every raw broadcast, and logs the order of
/// provider calls. Any operation can be made to fail with
/// [`MemoryChain::fail_on`].
#[derive(Clone)]
pub struct MemoryChain {
    state: Arc<ChainState>,
}

impl MemoryChain {
    /// Create an empty chain
    pub fn new(chain_id: u64) -> Self {
        Self {
            state: Arc::new(ChainState {
                chain_id,
                gas_price: RwLock::new(U256::from(DEFAULT_GAS_PRICE)),
                gas_estimate: RwLock::new(DEFAULT_GAS_ESTIMATE),
                balances: DashMap::new(),
                nonces: DashMap::new(),
                allowances: DashMap::new(),
                broadcasts: RwLock::new(Vec::new()),
                failures: DashMap::new(),
                calls: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Set the gas price reported to callers
    pub fn with_gas_price(self, gas_price: U256) -> Self {
        *self.state.gas_price.write() = gas_price;
        self
    }

    /// Set the gas estimate reported for any deployment
    pub fn with_gas_estimate(self, gas: u64) -> Self {
        *self.state.gas_estimate.write() = gas;
        self
    }

    /// Credit an account
    pub fn set_balance(&self, address: Address, balance: U256) {
        self.state.balances.insert(address, balance);
    }

    pub fn balance_of(&self, address: Address) -> U256 {
        self.state
            .balances
            .get(&address)
            .map(|b| *b)
            .unwrap_or(U256::ZERO)
    }

    pub fn nonce_of(&self, address: Address) -> u64 {
        self.state.nonces.get(&address).map(|n| *n).unwrap_or(0)
    }

    /// ERC-20 allowance granted by `owner` to `spender` on `token`
    pub fn allowance(&self, token: Address, owner: Address, spender: Address) -> U256 {
        self.state
            .allowances
            .get(&(token, owner, spender))
            .map(|a| *a)
            .unwrap_or(U256::ZERO)
    }

    /// Raw transactions submitted through [`ChainProvider::broadcast`]
    pub fn broadcasts(&self) -> Vec<Bytes> {
        self.state.broadcasts.read().clone()
    }

    /// Operations invoked so far, in call order
    pub fn calls(&self) -> Vec<ChainOperation> {
        self.state.calls.lock().clone()
    }

    /// Make `operation` fail with `reason` until cleared
    pub fn fail_on(&self, operation: ChainOperation, reason: impl Into<String>) {
        self.state.failures.insert(operation, reason.into());
    }

    pub fn clear_failures(&self) {
        self.state.failures.clear();
    }

    /// Signer handle for an account on this chain
    pub fn wallet(&self, address: Address) -> MemoryWallet {
        MemoryWallet {
            chain: self.clone(),
            address,
        }
    }

    fn record(&self, operation: ChainOperation) -> Result<()> {
        self.state.calls.lock().push(operation);
        match self.state.failures.get(&operation) {
            Some(reason) => Err(Error::ChainError(format!(
                "{:?} failed: {}",
                operation,
                reason.value()
            ))),
            None => Ok(()),
        }
    }

    fn transfer(&self, from: Address, to: Address, value: U256) -> Result<()> {
        let available = self.balance_of(from);
        if available < value {
            return Err(Error::ChainError(format!(
                "insufficient funds: {} has {}, needs {}",
                from, available, value
            )));
        }
        self.state.balances.insert(from, available - value);
        *self.state.balances.entry(to).or_insert(U256::ZERO) += value;
        Ok(())
    }
}

impl fmt::Debug for MemoryChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryChain")
            .field("chain_id", &self.state.chain_id)
            .field("accounts", &self.state.balances.len())
            .field("broadcasts", &self.state.broadcasts.read().len())
            .finish()
    }
}

#[async_trait]
impl ChainProvider for MemoryChain {
    async fn chain_id(&self) -> Result<u64> {
        self.record(ChainOperation::ChainId)?;
        Ok(self.state.chain_id)
    }

    async fn get_balance(&self, address: Address) -> Result<U256> {
        self.record(ChainOperation::GetBalance)?;
        Ok(self.balance_of(address))
    }

    async fn get_nonce(&self, address: Address) -> Result<u64> {
        self.record(ChainOperation::GetNonce)?;
        Ok(self.nonce_of(address))
    }

    async fn gas_price(&self) -> Result<U256> {
        self.record(ChainOperation::GasPrice)?;
        Ok(*self.state.gas_price.read())
    }

    async fn estimate_gas(&self, request: &GasEstimateRequest) -> Result<u64> {
        self.record(ChainOperation::EstimateGas)?;
        if request.data.is_empty() {
            return Err(Error::ChainError("cannot deploy empty init code".into()));
        }
        Ok(*self.state.gas_estimate.read())
    }

    async fn broadcast(&self, raw: &[u8]) -> Result<TxHash> {
        self.record(ChainOperation::Broadcast)?;
        self.state.broadcasts.write().push(Bytes::copy_from_slice(raw));
        let hash = TxHash::from(keccak256_hash(raw));
        debug!(tx_hash = %hash, "Raw transaction accepted");
        Ok(hash)
    }
}

/// Signer for one account on a [`MemoryChain`]
#[derive(Debug, Clone)]
pub struct MemoryWallet {
    chain: MemoryChain,
    address: Address,
}

#[async_trait]
impl ChainSigner for MemoryWallet {
    fn address(&self) -> Address {
        self.address
    }

    async fn send_transaction(&self, request: TxRequest) -> Result<TxHash> {
        self.chain.record(ChainOperation::SendTransaction)?;

        if let Some(to) = request.to {
            if request.value > U256::ZERO {
                self.chain.transfer(self.address, to, request.value)?;
            }
            if let Some((spender, amount)) = erc20::decode_approve(&request.data) {
                self.chain
                    .state
                    .allowances
                    .insert((to, self.address, spender), amount);
            }
        }

        let nonce = {
            let mut entry = self.chain.state.nonces.entry(self.address).or_insert(0);
            let current = *entry;
            *entry += 1;
            current
        };

        let mut preimage = Vec::with_capacity(20 + 8 + request.data.len());
        preimage.extend_from_slice(self.address.as_slice());
        preimage.extend_from_slice(&nonce.to_be_bytes());
        preimage.extend_from_slice(&request.data);
        Ok(TxHash::from(keccak256_hash(&preimage)))
    }
}
