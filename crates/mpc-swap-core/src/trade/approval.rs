//! On-chain side effects of the handshake
//!
//! Both approvals target the trade contract address, which is known before
//! deployment: it is the CREATE address of the funding account at its
//! current nonce.

use super::{Offer, OfferHash, OfferRegistry, erc20};
use crate::chain::{ChainProvider, ChainSigner, TxHash, TxRequest};
use crate::{Error, Result};
use alloy_primitives::{Address, U256};
use tracing::{info, instrument};

/// Address the trade contract will be deployed at
pub async fn trade_address(provider: &dyn ChainProvider, funding_address: Address) -> Result<Address> {
    let nonce = provider.get_nonce(funding_address).await?;
    Ok(funding_address.create(nonce))
}

/// Responder side: let the trade contract pull `givesAmount` of `givesToken`
#[instrument(skip_all, fields(token = %offer.gives_token, spender = %trade_address))]
pub async fn approve_as_maker(
    signer: &dyn ChainSigner,
    offer: &Offer,
    trade_address: Address,
) -> Result<TxHash> {
    approve(signer, offer.gives_token, trade_address, offer.gives_amount).await
}

/// Initiator side: let the trade contract pull `getsAmount` of `getsToken`
#[instrument(skip_all, fields(token = %offer.gets_token, spender = %trade_address))]
pub async fn approve_as_taker(
    signer: &dyn ChainSigner,
    offer: &Offer,
    trade_address: Address,
) -> Result<TxHash> {
    approve(signer, offer.gets_token, trade_address, offer.gets_amount).await
}

async fn approve(
    signer: &dyn ChainSigner,
    token: Address,
    spender: Address,
    amount: U256,
) -> Result<TxHash> {
    let calldata = erc20::approve_calldata(spender, amount);
    let hash = signer.send_transaction(TxRequest::call(token, calldata)).await?;
    info!(tx_hash = %hash, %amount, "Approval submitted");
    Ok(hash)
}

/// Send the bootstrap amount to the funding address
#[instrument(skip(signer))]
pub async fn fund_address(
    signer: &dyn ChainSigner,
    funding_address: Address,
    amount: U256,
) -> Result<TxHash> {
    let hash = signer
        .send_transaction(TxRequest::transfer(funding_address, amount))
        .await?;
    info!(tx_hash = %hash, "Funding address bootstrapped");
    Ok(hash)
}

/// Look up the offer referenced on the wire
pub fn resolve_offer<R: OfferRegistry + ?Sized>(registry: &R, hash: &OfferHash) -> Result<Offer> {
    registry
        .get(hash)
        .ok_or_else(|| Error::OfferNotFound(hash.to_string()))
}
