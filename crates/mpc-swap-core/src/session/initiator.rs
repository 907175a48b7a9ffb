//! Initiator (taker) side of the handshake

use super::{Session, SessionPhase, TradeContext};
use crate::chain::TxHash;
use crate::keygen::{InitiatorKeygen, KeygenResult};
use crate::protocol::HandshakeStep;
use crate::sign::InitiatorSigning;
use crate::trade::{
    Offer, OfferHash, Transaction, TransactionBuilder, approve_as_taker, fund_address,
    trade_address,
};
use crate::types::{Role, SessionId};
use crate::{Error, Result};
use alloy_primitives::Address;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{Span, field, info, instrument, warn};

/// Result of a completed initiator session
#[derive(Debug, Clone)]
pub struct InitiatorOutcome {
    pub session_id: SessionId,
    pub funding_address: Address,
    pub offer_hash: OfferHash,
    /// The signed transaction as broadcast
    pub transaction: Transaction,
    pub tx_hash: TxHash,
}

/// Drive a trade as initiator over `stream`
///
/// Succeeds only once the signed transaction has been broadcast and the
/// stream closed. On any error the session is aborted before returning.
#[instrument(skip_all, fields(role = %Role::Initiator, offer_hash = %offer.hash(), session_id = field::Empty))]
pub async fn run_initiator<S>(ctx: &TradeContext, stream: S, offer: &Offer) -> Result<InitiatorOutcome>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let mut session = Session::new(Role::Initiator, stream, &ctx.config)?;
    Span::current().record("session_id", field::display(session.id()));

    match drive(ctx, &mut session, offer).await {
        Ok(outcome) => {
            // The trade is on chain; a failed close must not hide the tx hash
            if let Err(error) = session.complete().await {
                warn!(tx_hash = %outcome.tx_hash, error = %error, "Session teardown failed after broadcast");
            }
            Ok(outcome)
        }
        Err(error) => {
            session.abort(&error);
            Err(error)
        }
    }
}

async fn drive<S>(ctx: &TradeContext, session: &mut Session<S>, offer: &Offer) -> Result<InitiatorOutcome>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let keys = keygen(ctx, session).await?;
    let funding_address = keys.funding_address;

    // Approval
    session.enter(SessionPhase::Approval);
    let offer_hash = offer.hash();
    session.send(HandshakeStep::OfferHash, offer_hash.as_bytes().to_vec())?;
    let spender = trade_address(ctx.provider.as_ref(), funding_address).await?;
    approve_as_taker(ctx.signer.as_ref(), offer, spender).await?;
    fund_address(
        ctx.signer.as_ref(),
        funding_address,
        ctx.config.bootstrap_funding,
    )
    .await?;

    // Building
    session.enter(SessionPhase::Building);
    let taker = ctx.signer.address();
    let mut transaction = TransactionBuilder::new(ctx.provider.as_ref(), ctx.assembler.as_ref())
        .build(offer, taker, funding_address)
        .await?;
    let signing_hash = transaction.signing_hash();

    // Signing
    session.enter(SessionPhase::Signing);
    let mut signing = InitiatorSigning::new(ctx.engine.as_ref(), &keys.share, signing_hash)?;
    session.send(HandshakeStep::TxHash, signing_hash.to_vec())?;
    session.send(HandshakeStep::Sign1, signing.start()?)?;

    let sign2 = session.recv(HandshakeStep::Sign2).await?;
    let sign3 = signing
        .handle(HandshakeStep::Sign2, sign2)?
        .ok_or_else(|| Error::Internal("Sign2 produced no reply".into()))?;
    session.send(HandshakeStep::Sign3, sign3)?;

    let sign4 = session.recv(HandshakeStep::Sign4).await?;
    signing.handle(HandshakeStep::Sign4, sign4)?;
    let signature = signing.finish()?;
    session.expect_end().await?;

    transaction.attach_signature(signature)?;
    let signer = transaction.recover_signer()?;
    if signer != funding_address {
        return Err(Error::SignatureExport(format!(
            "signature recovers {}, expected {}",
            signer, funding_address
        )));
    }

    let raw = transaction.encode_signed()?;
    let tx_hash = ctx.provider.broadcast(&raw).await?;
    info!(%tx_hash, %funding_address, value = %transaction.value, "Trade transaction broadcast");

    Ok(InitiatorOutcome {
        session_id: session.id(),
        funding_address,
        offer_hash,
        transaction,
        tx_hash,
    })
}

async fn keygen<S>(ctx: &TradeContext, session: &mut Session<S>) -> Result<KeygenResult>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    session.enter(SessionPhase::Keygen);
    let mut keygen = InitiatorKeygen::new(ctx.engine.as_ref());
    session.send(HandshakeStep::Keygen1, keygen.start()?)?;

    let keygen2 = session.recv(HandshakeStep::Keygen2).await?;
    session.send(HandshakeStep::Keygen3, keygen.handle(HandshakeStep::Keygen2, keygen2)?)?;

    let keys = keygen.finish()?;
    info!(funding_address = %keys.funding_address, "Joint key generated");
    Ok(keys)
}
