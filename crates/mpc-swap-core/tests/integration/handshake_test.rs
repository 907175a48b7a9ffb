//! Integration tests for the full trade handshake
//!
//! Each test runs two sessions over an in-memory loopback stream against a
//! shared [`MemoryChain`]. Abort paths replace one side with a scripted peer
//! built from the public coordinators.

use alloy_primitives::{Address, U256};
use mpc_swap_core::{
    ErrorKind, HandshakeStep, MessageChannel, Offer, OfferBook, OfferHash, ReferenceEngine,
    SessionConfig, TradeContext,
    chain::{ChainOperation, MemoryChain},
    keygen::{InitiatorKeygen, ResponderKeygen},
    mpc::EngineMessage,
    run_initiator, run_responder,
    sign::InitiatorSigning,
    transport::loopback,
};
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, DuplexStream, ReadBuf};

const TOKEN_A: Address = Address::repeat_byte(0xaa);
const TOKEN_B: Address = Address::repeat_byte(0xbb);
const MAKER: Address = Address::repeat_byte(0x4d);
const TAKER: Address = Address::repeat_byte(0x54);
const ONE_ETH: u64 = 1_000_000_000_000_000_000;

struct Fixture {
    chain: MemoryChain,
    book: OfferBook,
    offer: Offer,
    taker: TradeContext,
    maker: TradeContext,
}

fn fixture() -> Fixture {
    fixture_with(SessionConfig::default())
}

fn fixture_with(config: SessionConfig) -> Fixture {
    let chain = MemoryChain::new(31337);
    chain.set_balance(TAKER, U256::from(ONE_ETH));

    let offer = Offer::new(TOKEN_A, U256::from(100u64), TOKEN_B, U256::from(50u64), MAKER);
    let book = OfferBook::new();
    book.list(offer.clone());

    let provider = Arc::new(chain.clone());
    let taker = TradeContext::new(provider.clone(), Arc::new(chain.wallet(TAKER)))
        .with_config(config.clone());
    let maker = TradeContext::new(provider, Arc::new(chain.wallet(MAKER))).with_config(config);

    Fixture {
        chain,
        book,
        offer,
        taker,
        maker,
    }
}

/// Stream whose write half cannot be shut down cleanly
struct ResetOnClose(DuplexStream);

impl AsyncRead for ResetOnClose {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.0).poll_read(cx, buf)
    }
}

impl AsyncWrite for ResetOnClose {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.0).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.0).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset on close")))
    }
}

// ============================================================================
// Success Path
// ============================================================================

#[tokio::test]
async fn test_full_trade_over_loopback() {
    let f = fixture();
    let (a, b) = loopback(64 * 1024);

    let (initiator, responder) = tokio::join!(
        run_initiator(&f.taker, a, &f.offer),
        run_responder(&f.maker, b, &f.book),
    );
    let initiator = initiator.unwrap();
    let responder = responder.unwrap();

    // Both sides derived the same funding address
    assert_eq!(initiator.funding_address, responder.funding_address);
    assert_eq!(initiator.offer_hash, f.offer.hash());
    assert_eq!(responder.offer, f.offer);

    // The signature recovers the funding address
    let tx = &initiator.transaction;
    assert!(tx.is_signed());
    assert_eq!(tx.recover_signer().unwrap(), initiator.funding_address);
    assert_eq!(responder.signed_hash, tx.signing_hash());

    // Exactly one broadcast, of exactly this transaction
    let broadcasts = f.chain.broadcasts();
    assert_eq!(broadcasts.len(), 1);
    assert_eq!(broadcasts[0].to_vec(), tx.encode_signed().unwrap());
    assert_eq!(initiator.tx_hash, tx.tx_hash().unwrap());
}

#[tokio::test]
async fn test_failed_close_after_broadcast_keeps_outcome() {
    let f = fixture();
    let (a, b) = loopback(64 * 1024);

    let (initiator, responder) = tokio::join!(
        run_initiator(&f.taker, ResetOnClose(a), &f.offer),
        run_responder(&f.maker, b, &f.book),
    );
    responder.unwrap();

    // Closing the stream failed, yet the broadcast trade is still reported
    let initiator = initiator.unwrap();
    let broadcasts = f.chain.broadcasts();
    assert_eq!(broadcasts.len(), 1);
    assert_eq!(initiator.tx_hash, initiator.transaction.tx_hash().unwrap());
}

#[tokio::test]
async fn test_trade_side_effects_on_chain() {
    let f = fixture();
    let (a, b) = loopback(64 * 1024);

    let (initiator, responder) = tokio::join!(
        run_initiator(&f.taker, a, &f.offer),
        run_responder(&f.maker, b, &f.book),
    );
    let initiator = initiator.unwrap();
    responder.unwrap();

    let funding = initiator.funding_address;
    let trade_address = funding.create(0);
    assert_eq!(initiator.transaction.contract_address(funding), trade_address);

    // Both approvals target the not-yet-deployed trade contract
    assert_eq!(f.chain.allowance(TOKEN_A, MAKER, trade_address), U256::from(100u64));
    assert_eq!(f.chain.allowance(TOKEN_B, TAKER, trade_address), U256::from(50u64));

    // Bootstrap funding swept net of gas
    let bootstrap = SessionConfig::default().bootstrap_funding;
    assert_eq!(f.chain.balance_of(funding), bootstrap);
    let tx = &initiator.transaction;
    let gas_cost = tx.gas_price * U256::from(tx.gas_limit);
    assert_eq!(tx.value, bootstrap - gas_cost);
}

#[tokio::test]
async fn test_independent_sessions_run_concurrently() {
    let f = fixture();
    let (a1, b1) = loopback(64 * 1024);
    let (a2, b2) = loopback(64 * 1024);

    let (i1, r1, i2, r2) = tokio::join!(
        run_initiator(&f.taker, a1, &f.offer),
        run_responder(&f.maker, b1, &f.book),
        run_initiator(&f.taker, a2, &f.offer),
        run_responder(&f.maker, b2, &f.book),
    );
    let (i1, r1, i2, r2) = (i1.unwrap(), r1.unwrap(), i2.unwrap(), r2.unwrap());

    assert_eq!(i1.funding_address, r1.funding_address);
    assert_eq!(i2.funding_address, r2.funding_address);
    assert_ne!(i1.funding_address, i2.funding_address);
    assert_ne!(i1.session_id, i2.session_id);
    assert_eq!(f.chain.broadcasts().len(), 2);
}

#[tokio::test]
async fn test_responder_ends_with_closed_stream_and_empty_queue() {
    let f = fixture();
    let (a, b) = loopback(64 * 1024);
    let offer_hash = f.offer.hash();

    let engine = ReferenceEngine::new();
    let mut peer = MessageChannel::new(a);
    let mut keygen = InitiatorKeygen::new(&engine);

    let (drive, responder) = tokio::join!(
        async {
            peer.send(keygen.start().unwrap()).unwrap();
            let k2 = peer.recv().await.unwrap().unwrap();
            peer.send(keygen.handle(HandshakeStep::Keygen2, k2).unwrap())
                .unwrap();
            let keys = keygen.finish().unwrap();

            let hash = [0x42u8; 32];
            let mut signing = InitiatorSigning::new(&engine, &keys.share, hash).unwrap();
            peer.send(offer_hash.as_bytes().to_vec()).unwrap();
            peer.send(hash.to_vec()).unwrap();
            peer.send(signing.start().unwrap()).unwrap();

            let s2 = peer.recv().await.unwrap().unwrap();
            let s3 = signing.handle(HandshakeStep::Sign2, s2).unwrap().unwrap();
            peer.send(s3).unwrap();
            let s4 = peer.recv().await.unwrap().unwrap();
            assert!(signing.handle(HandshakeStep::Sign4, s4).unwrap().is_none());
            signing.finish().unwrap()
        },
        run_responder(&f.maker, b, &f.book),
    );
    let responder = responder.unwrap();
    assert_eq!(
        drive.recover_address(&responder.signed_hash).unwrap(),
        responder.funding_address
    );

    // Nothing left queued, and the responder's side reads as a clean end of stream
    assert_eq!(responder.pending_outbound, 0);
    assert!(peer.recv().await.unwrap().is_none());
    assert_eq!(peer.received(), 3);
}

// ============================================================================
// Abort Paths
// ============================================================================

#[tokio::test]
async fn test_signing_message_during_keygen_aborts_responder() {
    let f = fixture();
    let (a, b) = loopback(64 * 1024);
    let Fixture { maker, book, .. } = f;
    let responder = tokio::spawn(async move { run_responder(&maker, b, &book).await });

    let mut peer = MessageChannel::new(a);
    let mut keygen = InitiatorKeygen::new(&ReferenceEngine::new());
    peer.send(keygen.start().unwrap()).unwrap();
    peer.recv().await.unwrap().unwrap();

    // Sign1 where Keygen3 belongs
    let premature = EngineMessage::SignCommit {
        commitment: [7u8; 32],
    }
    .encode()
    .unwrap();
    peer.send(premature).unwrap();

    let err = responder.await.unwrap().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ProtocolOrderViolation);

    // The responder closed its side
    assert!(peer.recv().await.unwrap().is_none());
}

#[tokio::test]
async fn test_unknown_offer_aborts_only_that_session() {
    let f = fixture();
    let (a, b) = loopback(64 * 1024);

    let peer = async {
        let engine = ReferenceEngine::new();
        let mut peer = MessageChannel::new(a);
        let mut keygen = InitiatorKeygen::new(&engine);
        peer.send(keygen.start().unwrap()).unwrap();
        let k2 = peer.recv().await.unwrap().unwrap();
        peer.send(keygen.handle(HandshakeStep::Keygen2, k2).unwrap())
            .unwrap();
        peer.send(OfferHash([0x11; 32]).as_bytes().to_vec()).unwrap();
        peer.recv().await.unwrap()
    };

    let (trailing, responder) = tokio::join!(peer, run_responder(&f.maker, b, &f.book));
    assert!(trailing.is_none());
    assert_eq!(
        responder.unwrap_err().kind(),
        ErrorKind::OfferResolutionFailure
    );

    // The maker keeps serving other sessions
    let (a, b) = loopback(64 * 1024);
    let (initiator, responder) = tokio::join!(
        run_initiator(&f.taker, a, &f.offer),
        run_responder(&f.maker, b, &f.book),
    );
    assert!(initiator.is_ok());
    assert!(responder.is_ok());
}

#[tokio::test]
async fn test_short_offer_hash_is_protocol_error() {
    let f = fixture();
    let (a, b) = loopback(64 * 1024);

    let peer = async {
        let engine = ReferenceEngine::new();
        let mut peer = MessageChannel::new(a);
        let mut keygen = InitiatorKeygen::new(&engine);
        peer.send(keygen.start().unwrap()).unwrap();
        let k2 = peer.recv().await.unwrap().unwrap();
        peer.send(keygen.handle(HandshakeStep::Keygen2, k2).unwrap())
            .unwrap();
        peer.send(vec![0x11u8; 31]).unwrap();
        peer.recv().await.unwrap()
    };

    let (trailing, responder) = tokio::join!(peer, run_responder(&f.maker, b, &f.book));
    assert!(trailing.is_none());
    let err = responder.unwrap_err();
    assert!(matches!(err, mpc_swap_core::Error::MalformedMessage { .. }));
    assert_eq!(err.kind(), ErrorKind::ProtocolOrderViolation);
}

#[tokio::test]
async fn test_short_tx_hash_is_protocol_error() {
    let f = fixture();
    let (a, b) = loopback(64 * 1024);
    let offer_hash = f.offer.hash();

    let peer = async {
        let engine = ReferenceEngine::new();
        let mut peer = MessageChannel::new(a);
        let mut keygen = InitiatorKeygen::new(&engine);
        peer.send(keygen.start().unwrap()).unwrap();
        let k2 = peer.recv().await.unwrap().unwrap();
        peer.send(keygen.handle(HandshakeStep::Keygen2, k2).unwrap())
            .unwrap();
        peer.send(offer_hash.as_bytes().to_vec()).unwrap();
        peer.send(vec![0x42u8; 20]).unwrap();
        peer.recv().await.unwrap()
    };

    let (trailing, responder) = tokio::join!(peer, run_responder(&f.maker, b, &f.book));
    assert!(trailing.is_none());
    let err = responder.unwrap_err();
    assert!(matches!(err, mpc_swap_core::Error::MalformedMessage { .. }));
    assert_eq!(err.kind(), ErrorKind::ProtocolOrderViolation);
}

#[tokio::test]
async fn test_chain_failure_fails_both_sessions_without_broadcast() {
    let f = fixture();
    f.chain.fail_on(ChainOperation::EstimateGas, "execution reverted");
    let (a, b) = loopback(64 * 1024);

    let (initiator, responder) = tokio::join!(
        run_initiator(&f.taker, a, &f.offer),
        run_responder(&f.maker, b, &f.book),
    );

    assert_eq!(
        initiator.unwrap_err().kind(),
        ErrorKind::ChainInteractionFailure
    );
    assert_eq!(responder.unwrap_err().kind(), ErrorKind::Transport);
    assert!(f.chain.broadcasts().is_empty());
}

#[tokio::test]
async fn test_stream_closed_mid_signing_aborts_initiator() {
    let f = fixture();
    let (a, b) = loopback(64 * 1024);

    let peer = async {
        let engine = ReferenceEngine::new();
        let mut peer = MessageChannel::new(b);
        let mut keygen = ResponderKeygen::new(&engine);

        let k1 = peer.recv().await.unwrap().unwrap();
        peer.send(keygen.handle(HandshakeStep::Keygen1, k1).unwrap().unwrap())
            .unwrap();
        let k3 = peer.recv().await.unwrap().unwrap();
        keygen.handle(HandshakeStep::Keygen3, k3).unwrap();

        // OfferHash, TxHash, Sign1, then hang up
        for _ in 0..3 {
            peer.recv().await.unwrap().unwrap();
        }
        peer.abort()
    };

    let (discarded, initiator) = tokio::join!(peer, run_initiator(&f.taker, a, &f.offer));
    assert_eq!(discarded, 0);
    assert_eq!(initiator.unwrap_err().kind(), ErrorKind::Transport);
    assert!(f.chain.broadcasts().is_empty());
}

#[tokio::test]
async fn test_stream_closed_mid_signing_aborts_responder() {
    let f = fixture();
    let (a, b) = loopback(64 * 1024);
    let offer_hash = f.offer.hash();

    let peer = async {
        let engine = ReferenceEngine::new();
        let mut peer = MessageChannel::new(a);
        let mut keygen = InitiatorKeygen::new(&engine);

        peer.send(keygen.start().unwrap()).unwrap();
        let k2 = peer.recv().await.unwrap().unwrap();
        peer.send(keygen.handle(HandshakeStep::Keygen2, k2).unwrap())
            .unwrap();
        let keys = keygen.finish().unwrap();

        let hash = [0x42u8; 32];
        let mut signing = InitiatorSigning::new(&engine, &keys.share, hash).unwrap();
        peer.send(offer_hash.as_bytes().to_vec()).unwrap();
        peer.send(hash.to_vec()).unwrap();
        peer.send(signing.start().unwrap()).unwrap();

        // Take Sign2, then hang up instead of sending Sign3
        peer.recv().await.unwrap().unwrap();
        peer.abort();
    };

    let (_, responder) = tokio::join!(peer, run_responder(&f.maker, b, &f.book));
    assert_eq!(responder.unwrap_err().kind(), ErrorKind::Transport);
}

#[tokio::test(start_paused = true)]
async fn test_silent_peer_times_out() {
    let f = fixture_with(SessionConfig::default().with_inbound_timeout(Duration::from_secs(30)));
    let (a, b) = loopback(64 * 1024);

    let peer = async {
        let mut peer = MessageChannel::new(b);
        // Take Keygen1 and never answer
        peer.recv().await.unwrap().unwrap();
        peer.recv().await
    };

    let (trailing, initiator) = tokio::join!(peer, run_initiator(&f.taker, a, &f.offer));
    assert!(matches!(trailing, Ok(None)));
    let err = initiator.unwrap_err();
    assert!(matches!(err, mpc_swap_core::Error::Timeout(_)));
}

#[tokio::test]
async fn test_extra_message_after_sign4_is_rejected() {
    let f = fixture();
    let (a, b) = loopback(64 * 1024);

    // A responder that appends one message past the end of its sequence
    let peer = async {
        let engine = ReferenceEngine::new();
        let mut peer = MessageChannel::new(b);
        let mut keygen = ResponderKeygen::new(&engine);

        let k1 = peer.recv().await.unwrap().unwrap();
        peer.send(keygen.handle(HandshakeStep::Keygen1, k1).unwrap().unwrap())
            .unwrap();
        let k3 = peer.recv().await.unwrap().unwrap();
        keygen.handle(HandshakeStep::Keygen3, k3).unwrap();
        let keys = keygen.finish().unwrap();

        peer.recv().await.unwrap().unwrap();
        let tx_hash = peer.recv().await.unwrap().unwrap();
        let hash: [u8; 32] = tx_hash.as_bytes().try_into().unwrap();
        let mut signing =
            mpc_swap_core::sign::ResponderSigning::new(&engine, &keys.share, hash).unwrap();

        let s1 = peer.recv().await.unwrap().unwrap();
        peer.send(signing.handle(HandshakeStep::Sign1, s1).unwrap())
            .unwrap();
        let s3 = peer.recv().await.unwrap().unwrap();
        peer.send(signing.handle(HandshakeStep::Sign3, s3).unwrap())
            .unwrap();
        peer.send(b"one more".to_vec()).unwrap();
        let _ = peer.finish().await;
    };

    let (_, initiator) = tokio::join!(peer, run_initiator(&f.taker, a, &f.offer));
    assert_eq!(
        initiator.unwrap_err().kind(),
        ErrorKind::ProtocolOrderViolation
    );
    assert!(f.chain.broadcasts().is_empty());
}
