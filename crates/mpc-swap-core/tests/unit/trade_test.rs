//! Unit tests for offers, contract assembly and transaction building

use alloy_primitives::{Address, U256};
use k256::ecdsa::SigningKey;
use mpc_swap_core::{
    Error, ErrorKind, Offer, OfferBook, OfferHash, OfferRegistry, Signature, Transaction,
    chain::{ChainOperation, MemoryChain},
    trade::{AtomicSwapContract, ContractAssembler, TransactionBuilder, sweep_value},
};
use rand::rngs::OsRng;

fn offer() -> Offer {
    Offer::new(
        Address::repeat_byte(0xaa),
        U256::from(100u64),
        Address::repeat_byte(0xbb),
        U256::from(50u64),
        Address::repeat_byte(0x4d),
    )
}

fn sign(tx: &Transaction, key: &SigningKey) -> Signature {
    let (sig, recovery_id) = key.sign_prehash_recoverable(&tx.signing_hash()).unwrap();
    let bytes = sig.to_bytes();
    Signature::new(
        bytes[..32].try_into().unwrap(),
        bytes[32..].try_into().unwrap(),
        recovery_id.to_byte(),
    )
}

// ============================================================================
// Offers
// ============================================================================

#[test]
fn test_offer_hash_is_stable() {
    assert_eq!(offer().hash(), offer().hash());

    let hash = offer().hash();
    let parsed: OfferHash = hash.to_string().parse().unwrap();
    assert_eq!(parsed, hash);
}

#[test]
fn test_offer_hash_changes_with_every_field() {
    let base = offer().hash();

    let mut changed = offer();
    changed.gives_amount = U256::from(101u64);
    assert_ne!(changed.hash(), base);

    let mut changed = offer();
    changed.maker = Address::repeat_byte(0x4e);
    assert_ne!(changed.hash(), base);

    // Swapping sides is a different offer
    let o = offer();
    let swapped = Offer::new(o.gets_token, o.gets_amount, o.gives_token, o.gives_amount, o.maker);
    assert_ne!(swapped.hash(), base);
}

#[test]
fn test_offer_hash_wire_form() {
    assert!(OfferHash::from_slice(&[0u8; 32]).is_ok());
    let err = OfferHash::from_slice(&[0u8; 31]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::OfferResolutionFailure);
}

#[test]
fn test_offer_book_lookup() {
    let book = OfferBook::new();
    let hash = book.list(offer());

    assert_eq!(book.len(), 1);
    assert_eq!(book.get(&hash), Some(offer()));
    assert_eq!(book.offers().len(), 1);

    assert!(book.remove(&hash).is_some());
    assert!(book.is_empty());
    assert!(book.get(&hash).is_none());
}

#[test]
fn test_offer_json_uses_camel_case() {
    let json = serde_json::to_value(offer()).unwrap();
    assert!(json.get("givesToken").is_some());
    assert!(json.get("getsAmount").is_some());
}

// ============================================================================
// Transaction
// ============================================================================

#[test]
fn test_transaction_signed_once() {
    let key = SigningKey::random(&mut OsRng);
    let mut tx = Transaction::new(vec![0x60, 0x00], 1, U256::from(1u64), 21_000, 0, U256::ZERO);

    assert!(matches!(tx.encode_signed(), Err(Error::InvalidSignature(_))));

    let signature = sign(&tx, &key);
    tx.attach_signature(signature).unwrap();
    assert!(tx.is_signed());
    assert!(matches!(
        tx.attach_signature(signature),
        Err(Error::AlreadySigned)
    ));
}

#[test]
fn test_transaction_recovers_signer() {
    let key = SigningKey::random(&mut OsRng);
    let expected = {
        use k256::elliptic_curve::sec1::ToEncodedPoint;
        let encoded = key.verifying_key().to_encoded_point(false);
        let hash = mpc_swap_core::keccak256_hash(&encoded.as_bytes()[1..]);
        Address::from_slice(&hash[12..])
    };

    let mut tx = Transaction::new(vec![0x60, 0x00], 31337, U256::from(2u64), 50_000, 3, U256::from(7u64));
    tx.attach_signature(sign(&tx, &key)).unwrap();

    assert_eq!(tx.recover_signer().unwrap(), expected);
    assert_eq!(tx.contract_address(expected), expected.create(3));
    assert!(tx.tx_hash().is_ok());
}

// ============================================================================
// Contract & Builder
// ============================================================================

#[test]
fn test_contract_embeds_both_legs() {
    let maker = Address::repeat_byte(0x4d);
    let taker = Address::repeat_byte(0x54);
    let code = AtomicSwapContract::new().assemble(&offer(), maker, taker).unwrap();

    let contains = |needle: &[u8]| code.windows(needle.len()).any(|w| w == needle);
    assert!(contains(Address::repeat_byte(0xaa).as_slice()));
    assert!(contains(Address::repeat_byte(0xbb).as_slice()));
    assert!(contains(&U256::from(100u64).to_be_bytes::<32>()));
    assert!(contains(&U256::from(50u64).to_be_bytes::<32>()));
}

#[test]
fn test_value_policy_examples() {
    assert_eq!(
        sweep_value(U256::from(100u64), U256::from(2u64), 10),
        U256::from(80u64)
    );
    assert_eq!(sweep_value(U256::from(5u64), U256::from(2u64), 10), U256::ZERO);
}

#[tokio::test]
async fn test_builder_sweeps_funding_balance() {
    let chain = MemoryChain::new(31337)
        .with_gas_price(U256::from(2u64))
        .with_gas_estimate(10);
    let funding = Address::repeat_byte(0xf0);
    chain.set_balance(funding, U256::from(100u64));

    let assembler = AtomicSwapContract::new();
    let tx = TransactionBuilder::new(&chain, &assembler)
        .build(&offer(), Address::repeat_byte(0x54), funding)
        .await
        .unwrap();

    assert_eq!(tx.value, U256::from(80u64));
    assert_eq!(tx.gas_price, U256::from(2u64));
    assert_eq!(tx.data, assembler.assemble(&offer(), offer().maker, Address::repeat_byte(0x54)).unwrap());
}

#[tokio::test]
async fn test_builder_surfaces_balance_failure() {
    let chain = MemoryChain::new(1);
    chain.fail_on(ChainOperation::GetBalance, "timeout");

    let assembler = AtomicSwapContract::new();
    let err = TransactionBuilder::new(&chain, &assembler)
        .build(&offer(), Address::ZERO, Address::repeat_byte(1))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ChainInteractionFailure);
}
