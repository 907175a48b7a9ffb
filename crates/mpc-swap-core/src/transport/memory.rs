//! In-memory stream pair for testing and local development

use super::MessageChannel;
use tokio::io::DuplexStream;

/// Default in-memory pipe capacity
const LOOPBACK_BUFFER: usize = 64 * 1024;

/// Connected pair of in-memory byte streams
pub fn loopback(buffer: usize) -> (DuplexStream, DuplexStream) {
    tokio::io::duplex(buffer)
}

/// Two message channels joined by an in-memory stream
///
/// Must be called from within a tokio runtime.
pub fn channel_pair(
    max_frame_len: usize,
) -> (MessageChannel<DuplexStream>, MessageChannel<DuplexStream>) {
    let (left, right) = loopback(LOOPBACK_BUFFER);
    (
        MessageChannel::with_max_frame_len(left, max_frame_len),
        MessageChannel::with_max_frame_len(right, max_frame_len),
    )
}
