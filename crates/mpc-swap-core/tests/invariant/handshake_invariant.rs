//! Invariant tests for the trade handshake
//!
//! These tests verify invariants that must hold for every session:
//! - Both roles derive a byte-identical funding address
//! - The co-signed transaction recovers to the funding address
//! - Signatures are low-s

use alloy_primitives::{Address, U256};
use mpc_swap_core::{
    HandshakeStep, KeyShare, OfferBook, ReferenceEngine, TradeContext, Transaction,
    chain::MemoryChain,
    keygen::{InitiatorKeygen, ResponderKeygen},
    run_initiator, run_responder,
    sign::{InitiatorSigning, ResponderSigning},
    transport::loopback,
};
use std::sync::Arc;

/// Run the 3-message DKG in process
fn keygen(engine: &ReferenceEngine) -> (KeyShare, KeyShare) {
    let mut initiator = InitiatorKeygen::new(engine);
    let mut responder = ResponderKeygen::new(engine);

    let k1 = initiator.start().unwrap();
    let k2 = responder.handle(HandshakeStep::Keygen1, k1).unwrap().unwrap();
    let k3 = initiator.handle(HandshakeStep::Keygen2, k2).unwrap();
    responder.handle(HandshakeStep::Keygen3, k3).unwrap();

    (
        initiator.finish().unwrap().share,
        responder.finish().unwrap().share,
    )
}

// ============================================================================
// Key Share Invariants
// ============================================================================

/// INVARIANT: Both roles derive the same funding address
#[test]
fn invariant_funding_address_agreement() {
    let engine = ReferenceEngine::new();
    let mut seen = std::collections::HashSet::new();

    for _ in 0..20 {
        let (initiator, responder) = keygen(&engine);
        let address = initiator.funding_address().unwrap();
        assert_eq!(address, responder.funding_address().unwrap());

        // Fresh key per session
        assert!(seen.insert(address));
    }
}

// ============================================================================
// Signature Invariants
// ============================================================================

/// INVARIANT: The exported signature recovers the funding address
#[test]
fn invariant_signature_recovers_funding_address() {
    let engine = ReferenceEngine::new();

    for i in 0..10u64 {
        let (initiator_share, responder_share) = keygen(&engine);
        let funding = initiator_share.funding_address().unwrap();

        let mut tx = Transaction::new(vec![0x60, 0x00], 31337, U256::from(1u64), 21_000, i, U256::from(i));
        let hash = tx.signing_hash();

        let mut initiator = InitiatorSigning::new(&engine, &initiator_share, hash).unwrap();
        let mut responder = ResponderSigning::new(&engine, &responder_share, hash).unwrap();
        let s1 = initiator.start().unwrap();
        let s2 = responder.handle(HandshakeStep::Sign1, s1).unwrap();
        let s3 = initiator.handle(HandshakeStep::Sign2, s2).unwrap().unwrap();
        let s4 = responder.handle(HandshakeStep::Sign3, s3).unwrap();
        initiator.handle(HandshakeStep::Sign4, s4).unwrap();
        let signature = initiator.finish().unwrap();

        // Already in low-s form
        let ecdsa = k256::ecdsa::Signature::from_slice(&signature.to_bytes()).unwrap();
        assert!(ecdsa.normalize_s().is_none());

        tx.attach_signature(signature).unwrap();
        assert_eq!(tx.recover_signer().unwrap(), funding);
    }
}

/// INVARIANT: A full session's broadcast recovers the funding address both sides agreed on
#[tokio::test]
async fn invariant_end_to_end_agreement() {
    for _ in 0..3 {
        let chain = MemoryChain::new(1);
        let maker = Address::repeat_byte(0x4d);
        let taker = Address::repeat_byte(0x54);
        chain.set_balance(taker, U256::from(10u64).pow(U256::from(18u64)));

        let offer = mpc_swap_core::Offer::new(
            Address::repeat_byte(0xaa),
            U256::from(100u64),
            Address::repeat_byte(0xbb),
            U256::from(50u64),
            maker,
        );
        let book = OfferBook::new();
        book.list(offer.clone());

        let provider = Arc::new(chain.clone());
        let taker_ctx = TradeContext::new(provider.clone(), Arc::new(chain.wallet(taker)));
        let maker_ctx = TradeContext::new(provider, Arc::new(chain.wallet(maker)));

        let (a, b) = loopback(64 * 1024);
        let (initiator, responder) = tokio::join!(
            run_initiator(&taker_ctx, a, &offer),
            run_responder(&maker_ctx, b, &book),
        );
        let (initiator, responder) = (initiator.unwrap(), responder.unwrap());

        assert_eq!(initiator.funding_address, responder.funding_address);
        assert_eq!(
            initiator.transaction.recover_signer().unwrap(),
            responder.funding_address
        );
        assert_eq!(initiator.transaction.chain_id, 1);
    }
}
