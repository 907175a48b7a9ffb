//! # Trade
//!
//! Everything the handshake needs besides the cryptography:
//!
//! - [`Offer`] and its content hash
//! - the [`OfferRegistry`] capability and the in-memory [`OfferBook`]
//! - offer-list retrieval over a stream
//! - trade contract assembly and the unsigned [`Transaction`]
//! - approvals, funding and offer resolution

pub mod approval;
pub mod book;
pub mod builder;
pub mod contract;
pub mod erc20;
pub mod offer;
pub mod offer_list;
pub mod transaction;

pub use approval::{
    approve_as_maker, approve_as_taker, fund_address, resolve_offer, trade_address,
};
pub use book::{OfferBook, OfferRegistry};
pub use builder::{TransactionBuilder, sweep_value};
pub use contract::{AtomicSwapContract, ContractAssembler};
pub use offer::{Offer, OfferHash};
pub use offer_list::{fetch_offer_list, serve_offer_list};
pub use transaction::Transaction;
