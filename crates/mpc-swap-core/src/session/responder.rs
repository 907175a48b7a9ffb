//! Responder (maker) side of the handshake

use super::{Session, SessionPhase, TradeContext};
use crate::keygen::{KeygenResult, ResponderKeygen};
use crate::protocol::HandshakeStep;
use crate::sign::ResponderSigning;
use crate::trade::{Offer, OfferHash, OfferRegistry, approve_as_maker, resolve_offer, trade_address};
use crate::types::{Role, SessionId};
use crate::{Error, Result};
use alloy_primitives::Address;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{Span, field, info, instrument};

/// Result of a completed responder session
#[derive(Debug, Clone)]
pub struct ResponderOutcome {
    pub session_id: SessionId,
    pub funding_address: Address,
    pub offer_hash: OfferHash,
    pub offer: Offer,
    /// Hash of the transaction co-signed for the initiator
    pub signed_hash: [u8; 32],
    /// Outbound messages left unwritten when the stream closed
    pub pending_outbound: usize,
}

/// Follow a trade as responder over `stream`
///
/// The responder never broadcasts; it is done once Sign4 is written and the
/// stream closed. An unknown offer hash aborts this session only.
#[instrument(skip_all, fields(role = %Role::Responder, session_id = field::Empty))]
pub async fn run_responder<S, R>(ctx: &TradeContext, stream: S, registry: &R) -> Result<ResponderOutcome>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
    R: OfferRegistry + ?Sized,
{
    let mut session = Session::new(Role::Responder, stream, &ctx.config)?;
    Span::current().record("session_id", field::display(session.id()));

    match drive(ctx, &mut session, registry).await {
        Ok(mut outcome) => {
            let gauge = session.outbound_gauge();
            session.complete().await?;
            outcome.pending_outbound = gauge.get();
            Ok(outcome)
        }
        Err(error) => {
            session.abort(&error);
            Err(error)
        }
    }
}

async fn drive<S, R>(ctx: &TradeContext, session: &mut Session<S>, registry: &R) -> Result<ResponderOutcome>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
    R: OfferRegistry + ?Sized,
{
    let keys = keygen(ctx, session).await?;
    let funding_address = keys.funding_address;

    // Approval
    session.enter(SessionPhase::Approval);
    let raw = session.recv(HandshakeStep::OfferHash).await?;
    let offer_hash = OfferHash::from_slice(raw.as_bytes()).map_err(|_| {
        Error::malformed(HandshakeStep::OfferHash, format!("expected 32 bytes, got {}", raw.len()))
    })?;
    let offer = resolve_offer(registry, &offer_hash)?;
    info!(%offer_hash, maker = %offer.maker, "Offer resolved");
    let spender = trade_address(ctx.provider.as_ref(), funding_address).await?;
    approve_as_maker(ctx.signer.as_ref(), &offer, spender).await?;

    // Signing
    session.enter(SessionPhase::Signing);
    let raw = session.recv(HandshakeStep::TxHash).await?;
    let signed_hash: [u8; 32] = raw.as_bytes().try_into().map_err(|_| {
        Error::malformed(HandshakeStep::TxHash, format!("expected 32 bytes, got {}", raw.len()))
    })?;
    let mut signing = ResponderSigning::new(ctx.engine.as_ref(), &keys.share, signed_hash)?;

    let sign1 = session.recv(HandshakeStep::Sign1).await?;
    session.send(HandshakeStep::Sign2, signing.handle(HandshakeStep::Sign1, sign1)?)?;

    let sign3 = session.recv(HandshakeStep::Sign3).await?;
    session.send(HandshakeStep::Sign4, signing.handle(HandshakeStep::Sign3, sign3)?)?;
    info!(%funding_address, signed_hash = %hex::encode(signed_hash), "Trade co-signed");

    Ok(ResponderOutcome {
        session_id: session.id(),
        funding_address,
        offer_hash,
        offer,
        signed_hash,
        pending_outbound: 0,
    })
}

async fn keygen<S>(ctx: &TradeContext, session: &mut Session<S>) -> Result<KeygenResult>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    session.enter(SessionPhase::Keygen);
    let mut keygen = ResponderKeygen::new(ctx.engine.as_ref());

    let keygen1 = session.recv(HandshakeStep::Keygen1).await?;
    let keygen2 = keygen
        .handle(HandshakeStep::Keygen1, keygen1)?
        .ok_or_else(|| Error::Internal("Keygen1 produced no reply".into()))?;
    session.send(HandshakeStep::Keygen2, keygen2)?;

    let keygen3 = session.recv(HandshakeStep::Keygen3).await?;
    keygen.handle(HandshakeStep::Keygen3, keygen3)?;

    let keys = keygen.finish()?;
    info!(funding_address = %keys.funding_address, "Joint key generated");
    Ok(keys)
}
