//! Offer registry

use super::{Offer, OfferHash};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;

/// Read-only view of listed offers, shared across sessions
pub trait OfferRegistry: Send + Sync {
    /// Offer listed under `hash`
    fn get(&self, hash: &OfferHash) -> Option<Offer>;

    /// Every listed offer
    fn offers(&self) -> Vec<Offer>;
}

/// Concurrent in-memory offer book
#[derive(Debug, Clone, Default)]
pub struct OfferBook {
    offers: Arc<DashMap<OfferHash, Offer>>,
}

impl OfferBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// List an offer, returning its hash
    pub fn list(&self, offer: Offer) -> OfferHash {
        let hash = offer.hash();
        debug!(offer_hash = %hash, maker = %offer.maker, "Offer listed");
        self.offers.insert(hash, offer);
        hash
    }

    /// Withdraw an offer
    pub fn remove(&self, hash: &OfferHash) -> Option<Offer> {
        self.offers.remove(hash).map(|(_, offer)| offer)
    }

    pub fn len(&self) -> usize {
        self.offers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offers.is_empty()
    }
}

impl OfferRegistry for OfferBook {
    fn get(&self, hash: &OfferHash) -> Option<Offer> {
        self.offers.get(hash).map(|entry| entry.value().clone())
    }

    fn offers(&self) -> Vec<Offer> {
        self.offers.iter().map(|entry| entry.value().clone()).collect()
    }
}
