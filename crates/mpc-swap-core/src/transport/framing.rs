//! Unsigned-varint length-prefixed framing

use crate::{Error, Result};
use tokio::io::{AsyncRead, AsyncReadExt};

/// Longest varint accepted for a length prefix (enough for any `u32`)
const MAX_PREFIX_LEN: usize = 5;

/// Encode `len` as an unsigned LEB128 varint
pub fn encode_varint(mut len: usize, out: &mut Vec<u8>) {
    loop {
        let byte = (len & 0x7f) as u8;
        len >>= 7;
        if len == 0 {
            out.push(byte);
            return;
        }
        out.push(byte | 0x80);
    }
}

/// Prefix `payload` with its varint length
pub fn encode_frame(payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(payload.len() + MAX_PREFIX_LEN);
    encode_varint(payload.len(), &mut frame);
    frame.extend_from_slice(payload);
    frame
}

/// Read one frame
///
/// Returns `Ok(None)` when the stream ends cleanly on a frame boundary. A
/// stream ending inside the prefix or the payload is a framing error.
pub async fn read_frame<R>(reader: &mut R, max_len: usize) -> Result<Option<Vec<u8>>>
where
    R: AsyncRead + Unpin,
{
    let mut len: usize = 0;
    let mut shift = 0;
    let mut prefix_bytes = 0;

    loop {
        let mut byte = [0u8; 1];
        let n = reader.read(&mut byte).await?;
        if n == 0 {
            if prefix_bytes == 0 {
                return Ok(None);
            }
            return Err(Error::Framing("stream ended inside length prefix".into()));
        }

        prefix_bytes += 1;
        len |= ((byte[0] & 0x7f) as usize) << shift;
        if byte[0] & 0x80 == 0 {
            break;
        }

        shift += 7;
        if prefix_bytes == MAX_PREFIX_LEN {
            return Err(Error::Framing("length prefix too long".into()));
        }
    }

    if len > max_len {
        return Err(Error::FrameTooLarge { len, max: max_len });
    }

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::UnexpectedEof => {
            Error::Framing(format!("stream ended inside {} byte frame", len))
        }
        _ => Error::Io(e),
    })?;

    Ok(Some(payload))
}
