//! # MPC Swap Core
//!
//! Trustless token swaps between two peers, settled by a two-party
//! threshold-ECDSA wallet that exists for exactly one transaction.
//!
//! ## Architecture
//!
//! This crate provides:
//! - **Message Channel**: ordered, length-framed duplex exchange over one stream
//! - **Key Generation**: the 3-message threshold DKG, driven per role
//! - **Signing**: the 4-message threshold signing round, driven per role
//! - **Trade**: offers, the offer book, contract assembly, transaction building
//!   and the approval side effects
//! - **Chain Collaborators**: JSON-RPC provider, local wallet and an in-memory chain
//! - **Session Driver**: the full 9-message handshake for both roles
//!
//! ## Handshake
//!
//! | # | Step | Sender |
//! |---|------|--------|
//! | 1 | Keygen1 | Initiator |
//! | 2 | Keygen2 | Responder |
//! | 3 | Keygen3 | Initiator |
//! | 4 | OfferHash | Initiator |
//! | 5 | TxHash | Initiator |
//! | 6 | Sign1 | Initiator |
//! | 7 | Sign2 | Responder |
//! | 8 | Sign3 | Initiator |
//! | 9 | Sign4 | Responder |
//!
//! Meaning is positional: a message is whatever its slot says it is. Any
//! message out of place aborts the session, and sessions are never resumed.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use mpc_swap_core::{Offer, OfferBook, TradeContext, run_initiator, run_responder};
//! use mpc_swap_core::chain::MemoryChain;
//! use mpc_swap_core::transport::loopback;
//!
//! let chain = MemoryChain::new(31337);
//! let book = OfferBook::new();
//! book.list(offer.clone());
//!
//! let taker = TradeContext::new(Arc::new(chain.clone()), Arc::new(chain.wallet(taker_address)));
//! let maker = TradeContext::new(Arc::new(chain.clone()), Arc::new(chain.wallet(offer.maker)));
//!
//! let (a, b) = loopback(64 * 1024);
//! let (outcome, _) = tokio::try_join!(
//!     run_initiator(&taker, a, &offer),
//!     run_responder(&maker, b, &book),
//! )?;
//! ```
//!
//! ## Security Model
//!
//! Neither party can move the funding address's balance alone. The only
//! transaction ever co-signed deploys the trade contract, which performs
//! both token legs atomically or reverts.
//!
//! The bundled [`ReferenceEngine`] is for tests and local development; it
//! does not hide the initiator's share from the responder.

pub mod chain;
pub mod error;
pub mod keygen;
pub mod mpc;
pub mod protocol;
pub mod session;
pub mod sign;
pub mod trade;
pub mod transport;
pub mod types;

pub use error::{Error, ErrorKind, Result};
pub use mpc::{ReferenceEngine, ThresholdEngine};
pub use protocol::{CREATE_TRADE_PROTOCOL, HandshakeStep, ORDERS_PROTOCOL};
pub use session::{
    InitiatorOutcome, ResponderOutcome, SessionConfig, SessionPhase, TradeContext, run_initiator,
    run_responder,
};
pub use trade::{Offer, OfferBook, OfferHash, OfferRegistry, Transaction};
pub use transport::{MessageChannel, ProtocolMessage};
pub use types::{KeyShare, Role, SessionId, Signature, keccak256_hash};

pub use chain::{ChainId, ChainProvider, ChainSigner, TxHash};
#[cfg(feature = "evm")]
pub use chain::{EvmConfig, EvmProvider, LocalWallet};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
