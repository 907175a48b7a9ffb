//! Integration tests for offer-list retrieval

use alloy_primitives::{Address, U256};
use mpc_swap_core::{
    Error, Offer, OfferBook,
    trade::{fetch_offer_list, serve_offer_list},
    transport::{DEFAULT_MAX_FRAME_LEN, encode_frame, loopback},
};
use tokio::io::AsyncWriteExt;

fn book_with(count: u64) -> OfferBook {
    let book = OfferBook::new();
    for i in 0..count {
        book.list(Offer::new(
            Address::repeat_byte(0xaa),
            U256::from(100 + i),
            Address::repeat_byte(0xbb),
            U256::from(50u64),
            Address::repeat_byte(0x4d),
        ));
    }
    book
}

#[tokio::test]
async fn test_fetch_returns_every_listed_offer() {
    let book = book_with(5);
    let (mut server, mut client) = loopback(64 * 1024);

    let (served, fetched) = tokio::join!(
        serve_offer_list(&book, &mut server),
        fetch_offer_list(&mut client, DEFAULT_MAX_FRAME_LEN),
    );
    assert_eq!(served.unwrap(), 5);

    let mut fetched = fetched.unwrap();
    fetched.sort_by_key(|offer| offer.gives_amount);
    let amounts: Vec<u64> = fetched.iter().map(|o| o.gives_amount.to::<u64>()).collect();
    assert_eq!(amounts, vec![100, 101, 102, 103, 104]);
}

#[tokio::test]
async fn test_empty_book_yields_empty_list() {
    let book = OfferBook::new();
    let (mut server, mut client) = loopback(1024);

    serve_offer_list(&book, &mut server).await.unwrap();
    assert!(fetch_offer_list(&mut client, DEFAULT_MAX_FRAME_LEN)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_malformed_offer_frame_is_rejected() {
    let (mut server, mut client) = loopback(1024);
    server.write_all(&encode_frame(b"{\"not\":\"an offer\"}")).await.unwrap();
    server.shutdown().await.unwrap();

    let err = fetch_offer_list(&mut client, DEFAULT_MAX_FRAME_LEN)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Deserialization(_)));
}
