//! Fuzz tests for offer hashing

use alloy_primitives::{Address, U256};
use mpc_swap_core::{Offer, OfferHash};
use proptest::prelude::*;

// ============================================================================
// Strategies for generating test data
// ============================================================================

fn address_strategy() -> impl Strategy<Value = Address> {
    prop::array::uniform20(any::<u8>()).prop_map(Address::from)
}

fn amount_strategy() -> impl Strategy<Value = U256> {
    prop::array::uniform32(any::<u8>()).prop_map(|bytes| U256::from_be_bytes(bytes))
}

fn offer_strategy() -> impl Strategy<Value = Offer> {
    (
        address_strategy(),
        amount_strategy(),
        address_strategy(),
        amount_strategy(),
        address_strategy(),
    )
        .prop_map(|(gives_token, gives_amount, gets_token, gets_amount, maker)| {
            Offer::new(gives_token, gives_amount, gets_token, gets_amount, maker)
        })
}

proptest! {
    /// Hashing is a pure function of the fields
    #[test]
    fn offer_hash_deterministic(offer in offer_strategy()) {
        let copy = Offer::new(
            offer.gives_token,
            offer.gives_amount,
            offer.gets_token,
            offer.gets_amount,
            offer.maker,
        );
        prop_assert_eq!(offer.hash(), copy.hash());
        prop_assert_eq!(offer.packed().len(), 124);
    }

    /// Changing any single field changes the hash
    #[test]
    fn offer_hash_sensitive_to_each_field(
        offer in offer_strategy(),
        field in 0usize..5,
        flip in 1u8..=255,
    ) {
        let mut changed = offer.clone();
        match field {
            0 => changed.gives_token.0[0] ^= flip,
            1 => changed.gives_amount ^= U256::from(flip),
            2 => changed.gets_token.0[19] ^= flip,
            3 => changed.gets_amount ^= U256::from(flip) << 200,
            _ => changed.maker.0[10] ^= flip,
        }
        prop_assert_ne!(offer.hash(), changed.hash());
    }

    /// The displayed form parses back to the same hash
    #[test]
    fn offer_hash_display_parses(offer in offer_strategy()) {
        let hash = offer.hash();
        let parsed: OfferHash = hash.to_string().parse().unwrap();
        prop_assert_eq!(parsed, hash);
    }

    /// Only exactly 32 bytes are accepted on the wire
    #[test]
    fn offer_hash_wire_length(bytes in prop::collection::vec(any::<u8>(), 0..64)) {
        let parsed = OfferHash::from_slice(&bytes);
        prop_assert_eq!(parsed.is_ok(), bytes.len() == 32);
    }
}
