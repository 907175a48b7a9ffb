//! Trade transaction assembly

use super::{ContractAssembler, Offer, Transaction};
use crate::Result;
use crate::chain::{ChainProvider, GasEstimateRequest};
use alloy_primitives::{Address, U256};
use tracing::{debug, instrument};

/// Value swept into the trade: the whole balance net of gas, or zero
pub fn sweep_value(balance: U256, gas_price: U256, gas_limit: u64) -> U256 {
    let gas_cost = gas_price.saturating_mul(U256::from(gas_limit));
    if balance >= gas_cost {
        balance - gas_cost
    } else {
        U256::ZERO
    }
}

/// Assembles the unsigned trade transaction from chain state
pub struct TransactionBuilder<'a> {
    provider: &'a dyn ChainProvider,
    assembler: &'a dyn ContractAssembler,
}

impl<'a> TransactionBuilder<'a> {
    pub fn new(provider: &'a dyn ChainProvider, assembler: &'a dyn ContractAssembler) -> Self {
        Self {
            provider,
            assembler,
        }
    }

    /// Build the contract-creation transaction sent from `funding_address`
    ///
    /// The maker is `offer.maker`; the taker receives the maker's tokens and
    /// the self-destruct refund.
    #[instrument(skip(self, offer), fields(maker = %offer.maker))]
    pub async fn build(
        &self,
        offer: &Offer,
        taker: Address,
        funding_address: Address,
    ) -> Result<Transaction> {
        let data = self.assembler.assemble(offer, offer.maker, taker)?;

        let gas_price = self.provider.gas_price().await?;
        let gas_limit = self
            .provider
            .estimate_gas(&GasEstimateRequest {
                from: funding_address,
                data: data.clone(),
                gas_price,
            })
            .await?;
        let balance = self.provider.get_balance(funding_address).await?;
        let chain_id = self.provider.chain_id().await?;
        let nonce = self.provider.get_nonce(funding_address).await?;

        let value = sweep_value(balance, gas_price, gas_limit);
        debug!(
            %gas_price,
            gas_limit,
            %balance,
            %value,
            chain_id,
            nonce,
            "Trade transaction assembled"
        );

        Ok(Transaction::new(
            data, chain_id, gas_price, gas_limit, nonce, value,
        ))
    }
}
