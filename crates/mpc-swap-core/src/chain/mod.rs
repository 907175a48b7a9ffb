//! # Chain Collaborators
//!
//! The handshake touches the chain through two capabilities:
//!
//! - [`ChainProvider`]: read side plus raw broadcast (chain id, balance,
//!   nonce, gas price, gas estimate, `eth_sendRawTransaction`)
//! - [`ChainSigner`]: the operator's own account, used for token approvals
//!   and for funding the shared address
//!
//! ## Implementations
//!
//! - **EVM** ([`evm`], feature `evm`): JSON-RPC provider with endpoint
//!   failover and a local secp256k1 wallet
//! - **Memory** ([`memory`]): in-process simulated chain for tests and local
//!   development, with per-operation failure injection
//!
//! ## Example
//!
//! ```rust,ignore
//! use mpc_swap_core::chain::{ChainProvider, evm::{EvmConfig, EvmProvider}};
//!
//! let provider = EvmProvider::new(EvmConfig::ethereum_sepolia())?;
//! let balance = provider.get_balance(address).await?;
//! ```

#[cfg(feature = "evm")]
pub mod evm;
pub mod legacy;
pub mod memory;
#[cfg(feature = "evm")]
pub mod rpc;

use crate::Result;
use alloy_primitives::{Address, B256, Bytes, U256};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

#[cfg(feature = "evm")]
pub use evm::{EvmConfig, EvmProvider, LocalWallet};
pub use legacy::LegacyTransaction;
pub use memory::{ChainOperation, MemoryChain, MemoryWallet};
#[cfg(feature = "evm")]
pub use rpc::RpcClient;

/// Transaction hash as returned by a broadcast
pub type TxHash = B256;

// ============================================================================
// Core Types
// ============================================================================

/// EVM chain identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChainId(pub u64);

impl ChainId {
    pub const ETHEREUM_MAINNET: ChainId = ChainId(1);
    pub const ETHEREUM_SEPOLIA: ChainId = ChainId(11155111);
    pub const ARBITRUM_ONE: ChainId = ChainId(42161);
    pub const OPTIMISM: ChainId = ChainId(10);
    pub const BASE: ChainId = ChainId(8453);
    pub const POLYGON: ChainId = ChainId(137);
    pub const LOCAL: ChainId = ChainId(31337);

    /// Get the name for this chain
    pub fn name(&self) -> &'static str {
        match self.0 {
            1 => "Ethereum Mainnet",
            11155111 => "Ethereum Sepolia",
            42161 => "Arbitrum One",
            10 => "Optimism",
            8453 => "Base",
            137 => "Polygon",
            31337 => "Local Devnet",
            _ => "Unknown Chain",
        }
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.0)
    }
}

impl From<u64> for ChainId {
    fn from(id: u64) -> Self {
        ChainId(id)
    }
}

/// Transaction sent from the operator's own account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxRequest {
    /// Recipient; `None` deploys a contract
    pub to: Option<Address>,
    /// Value in wei
    pub value: U256,
    /// Call data
    #[serde(default)]
    pub data: Bytes,
}

impl TxRequest {
    /// Plain value transfer
    pub fn transfer(to: Address, value: U256) -> Self {
        Self {
            to: Some(to),
            value,
            data: Bytes::new(),
        }
    }

    /// Contract call without value
    pub fn call(to: Address, data: impl Into<Bytes>) -> Self {
        Self {
            to: Some(to),
            value: U256::ZERO,
            data: data.into(),
        }
    }
}

/// Gas estimate for a contract creation sent from `from`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GasEstimateRequest {
    pub from: Address,
    pub data: Bytes,
    pub gas_price: U256,
}

// ============================================================================
// Capabilities
// ============================================================================

/// Read side of the chain plus raw transaction broadcast
#[async_trait]
pub trait ChainProvider: Send + Sync {
    /// Chain id used for EIP-155 signing
    async fn chain_id(&self) -> Result<u64>;

    /// Native balance in wei
    async fn get_balance(&self, address: Address) -> Result<U256>;

    /// Next nonce for an account
    async fn get_nonce(&self, address: Address) -> Result<u64>;

    /// Current legacy gas price in wei
    async fn gas_price(&self) -> Result<U256>;

    /// Gas needed to deploy `data` from `from`
    async fn estimate_gas(&self, request: &GasEstimateRequest) -> Result<u64>;

    /// Submit a signed, RLP-encoded transaction
    async fn broadcast(&self, raw: &[u8]) -> Result<TxHash>;
}

/// The operator's own signing account
#[async_trait]
pub trait ChainSigner: Send + Sync {
    /// Account address
    fn address(&self) -> Address;

    /// Sign and submit a transaction from this account
    async fn send_transaction(&self, request: TxRequest) -> Result<TxHash>;
}
