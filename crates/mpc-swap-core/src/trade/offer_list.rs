//! Offer-list retrieval
//!
//! A peer opening an offer-list stream receives every listed offer as one
//! length-prefixed JSON frame, followed by end of stream. The request
//! carries no parameters.

use super::{Offer, OfferRegistry};
use crate::transport::{encode_frame, read_frame};
use crate::{Error, Result};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tracing::{debug, instrument};

/// Write the registry's offers onto `stream` and close it
#[instrument(skip_all)]
pub async fn serve_offer_list<R, S>(registry: &R, stream: &mut S) -> Result<usize>
where
    R: OfferRegistry + ?Sized,
    S: AsyncWrite + Unpin,
{
    let offers = registry.offers();
    for offer in &offers {
        let json = serde_json::to_vec(offer)?;
        stream.write_all(&encode_frame(&json)).await?;
    }
    stream.flush().await?;
    stream.shutdown().await?;

    debug!(count = offers.len(), "Offer list served");
    Ok(offers.len())
}

/// Read offers from `stream` until the peer ends it
#[instrument(skip_all)]
pub async fn fetch_offer_list<S>(stream: &mut S, max_frame_len: usize) -> Result<Vec<Offer>>
where
    S: AsyncRead + Unpin,
{
    let mut offers = Vec::new();
    while let Some(frame) = read_frame(stream, max_frame_len).await? {
        let offer: Offer = serde_json::from_slice(&frame)
            .map_err(|e| Error::Deserialization(format!("offer: {}", e)))?;
        offers.push(offer);
    }

    debug!(count = offers.len(), "Offer list fetched");
    Ok(offers)
}
