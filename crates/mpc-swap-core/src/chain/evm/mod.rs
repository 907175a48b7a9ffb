//! # EVM Chain Provider
//!
//! JSON-RPC implementation of the chain capabilities:
//! - [`EvmProvider`]: chain id, balances, nonces, legacy gas price, gas
//!   estimation and raw broadcast over HTTP with endpoint failover
//! - [`LocalWallet`]: the operator's account, holding a secp256k1 key and
//!   signing legacy EIP-155 transactions
//!
//! ## Example
//!
//! ```rust,ignore
//! use mpc_swap_core::chain::evm::{EvmConfig, EvmProvider, LocalWallet};
//!
//! let provider = EvmProvider::new(EvmConfig::ethereum_sepolia())?;
//! let wallet = LocalWallet::from_hex(&key_hex, provider.clone())?;
//! ```

use super::{
    ChainId, ChainProvider, ChainSigner, GasEstimateRequest, LegacyTransaction, RpcClient, TxHash,
    TxRequest,
};
use crate::types::keccak256_hash;
use crate::{Error, Result, Signature};
use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use k256::ecdsa::SigningKey;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, instrument};

// ============================================================================
// Configuration
// ============================================================================

fn default_request_timeout_secs() -> u64 {
    30
}

/// Configuration for the EVM provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvmConfig {
    /// Chain identifier
    pub chain_id: ChainId,
    /// RPC endpoint URLs (for failover)
    pub rpc_urls: Vec<String>,
    /// Block explorer URL (optional)
    #[serde(default)]
    pub explorer_url: Option<String>,
    /// Per-request HTTP timeout
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl EvmConfig {
    /// Create config for Ethereum Mainnet
    pub fn ethereum_mainnet() -> Self {
        Self {
            chain_id: ChainId::ETHEREUM_MAINNET,
            rpc_urls: vec![
                "https://eth.llamarpc.com".to_string(),
                "https://rpc.ankr.com/eth".to_string(),
            ],
            explorer_url: Some("https://etherscan.io".to_string()),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }

    /// Create config for Ethereum Sepolia testnet
    pub fn ethereum_sepolia() -> Self {
        Self {
            chain_id: ChainId::ETHEREUM_SEPOLIA,
            rpc_urls: vec![
                "https://rpc.sepolia.org".to_string(),
                "https://rpc.ankr.com/eth_sepolia".to_string(),
            ],
            explorer_url: Some("https://sepolia.etherscan.io".to_string()),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }

    /// Local development node (anvil/hardhat defaults)
    pub fn local() -> Self {
        Self::custom(ChainId::LOCAL.0, vec!["http://127.0.0.1:8545".to_string()])
    }

    /// Create a custom config
    pub fn custom(chain_id: u64, rpc_urls: Vec<String>) -> Self {
        Self {
            chain_id: ChainId(chain_id),
            rpc_urls,
            explorer_url: None,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }

    /// Set explorer URL
    pub fn with_explorer(mut self, url: impl Into<String>) -> Self {
        self.explorer_url = Some(url.into());
        self
    }

    /// Set per-request timeout
    pub fn with_request_timeout(mut self, secs: u64) -> Self {
        self.request_timeout_secs = secs;
        self
    }
}

// ============================================================================
// Provider
// ============================================================================

/// JSON-RPC chain provider
#[derive(Debug, Clone)]
pub struct EvmProvider {
    config: EvmConfig,
    rpc: RpcClient,
}

impl EvmProvider {
    /// Create a new provider
    pub fn new(config: EvmConfig) -> Result<Self> {
        let rpc = RpcClient::new(
            config.rpc_urls.clone(),
            Duration::from_secs(config.request_timeout_secs),
        )?;
        Ok(Self { config, rpc })
    }

    /// Get the configuration
    pub fn config(&self) -> &EvmConfig {
        &self.config
    }

    /// Explorer link for a transaction, if an explorer is configured
    pub fn explorer_tx_url(&self, tx_hash: &TxHash) -> Option<String> {
        self.config
            .explorer_url
            .as_ref()
            .map(|base| format!("{}/tx/{}", base.trim_end_matches('/'), tx_hash))
    }

    async fn estimate_call(&self, from: Address, request: &TxRequest, gas_price: U256) -> Result<u64> {
        let tx_object = serde_json::json!({
            "from": from,
            "to": request.to,
            "value": format!("0x{:x}", request.value),
            "data": format!("0x{}", hex::encode(&request.data)),
            "gasPrice": format!("0x{:x}", gas_price),
        });

        let result: String = self
            .rpc
            .request("eth_estimateGas", serde_json::json!([tx_object]))
            .await?;
        parse_hex_u64(&result)
    }
}

#[async_trait]
impl ChainProvider for EvmProvider {
    async fn chain_id(&self) -> Result<u64> {
        let result: String = self.rpc.request("eth_chainId", serde_json::json!([])).await?;
        let chain_id = parse_hex_u64(&result)?;
        if chain_id != self.config.chain_id.0 {
            return Err(Error::ChainError(format!(
                "endpoint reports chain {}, configured for {}",
                chain_id, self.config.chain_id
            )));
        }
        Ok(chain_id)
    }

    async fn get_balance(&self, address: Address) -> Result<U256> {
        let result: String = self
            .rpc
            .request("eth_getBalance", serde_json::json!([address, "latest"]))
            .await?;
        parse_hex_u256(&result)
    }

    async fn get_nonce(&self, address: Address) -> Result<u64> {
        let result: String = self
            .rpc
            .request(
                "eth_getTransactionCount",
                serde_json::json!([address, "pending"]),
            )
            .await?;
        parse_hex_u64(&result)
    }

    async fn gas_price(&self) -> Result<U256> {
        let result: String = self.rpc.request("eth_gasPrice", serde_json::json!([])).await?;
        parse_hex_u256(&result)
    }

    async fn estimate_gas(&self, request: &GasEstimateRequest) -> Result<u64> {
        let tx_object = serde_json::json!({
            "from": request.from,
            "data": format!("0x{}", hex::encode(&request.data)),
            "gasPrice": format!("0x{:x}", request.gas_price),
        });

        let result: String = self
            .rpc
            .request("eth_estimateGas", serde_json::json!([tx_object]))
            .await?;
        parse_hex_u64(&result)
    }

    async fn broadcast(&self, raw: &[u8]) -> Result<TxHash> {
        let raw_hex = format!("0x{}", hex::encode(raw));
        let result: String = self
            .rpc
            .request("eth_sendRawTransaction", serde_json::json!([raw_hex]))
            .await?;
        parse_tx_hash(&result)
    }
}

// ============================================================================
// Local Wallet
// ============================================================================

/// Operator account backed by a local secp256k1 key
pub struct LocalWallet {
    signing_key: SigningKey,
    address: Address,
    provider: EvmProvider,
}

impl LocalWallet {
    /// Wrap an existing signing key
    pub fn new(signing_key: SigningKey, provider: EvmProvider) -> Self {
        let encoded = signing_key.verifying_key().to_encoded_point(false);
        let hash = keccak256_hash(&encoded.as_bytes()[1..]);
        let address = Address::from_slice(&hash[12..]);
        Self {
            signing_key,
            address,
            provider,
        }
    }

    /// Parse a hex private key (with or without `0x`)
    pub fn from_hex(key: &str, provider: EvmProvider) -> Result<Self> {
        let bytes = hex::decode(key.trim().trim_start_matches("0x"))?;
        let signing_key = SigningKey::from_slice(&bytes)
            .map_err(|e| Error::InvalidConfig(format!("Invalid private key: {}", e)))?;
        Ok(Self::new(signing_key, provider))
    }

    fn sign_hash(&self, hash: &[u8; 32]) -> Result<Signature> {
        let (signature, recovery_id) = self
            .signing_key
            .sign_prehash_recoverable(hash)
            .map_err(|e| Error::Crypto(e.to_string()))?;
        let bytes = signature.to_bytes();
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&bytes[..32]);
        s.copy_from_slice(&bytes[32..]);
        Ok(Signature::new(r, s, recovery_id.to_byte()))
    }
}

impl std::fmt::Debug for LocalWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalWallet")
            .field("address", &self.address)
            .field("signing_key", &"[REDACTED]")
            .finish()
    }
}

#[async_trait]
impl ChainSigner for LocalWallet {
    fn address(&self) -> Address {
        self.address
    }

    #[instrument(skip(self, request), fields(from = %self.address, to = ?request.to))]
    async fn send_transaction(&self, request: TxRequest) -> Result<TxHash> {
        let gas_price = self.provider.gas_price().await?;
        let gas_limit = self
            .provider
            .estimate_call(self.address, &request, gas_price)
            .await?;
        let chain_id = self.provider.chain_id().await?;
        let nonce = self.provider.get_nonce(self.address).await?;

        let tx = LegacyTransaction {
            nonce,
            gas_price,
            gas_limit,
            to: request.to,
            value: request.value,
            data: request.data,
        };

        let signature = self.sign_hash(&tx.signing_hash(chain_id))?;
        let raw = tx.encode_signed(&signature, chain_id);
        debug!(nonce, gas_limit, "Submitting signed transaction");

        let tx_hash = self.provider.broadcast(&raw).await?;
        info!(tx_hash = %tx_hash, "Transaction submitted");
        Ok(tx_hash)
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

fn parse_hex_u64(s: &str) -> Result<u64> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    u64::from_str_radix(s, 16).map_err(|e| Error::Rpc(format!("Failed to parse hex: {}", e)))
}

fn parse_hex_u256(s: &str) -> Result<U256> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    U256::from_str_radix(s, 16).map_err(|e| Error::Rpc(format!("Failed to parse hex: {}", e)))
}

fn parse_tx_hash(s: &str) -> Result<TxHash> {
    s.parse::<TxHash>()
        .map_err(|e| Error::Rpc(format!("Invalid transaction hash {}: {}", s, e)))
}
