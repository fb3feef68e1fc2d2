//! Transport framing
//!
//! Every frame on a courier TCP stream is prefixed with a 4-byte big-endian
//! length. A zero length is a valid empty frame that readers skip.

use bytes::{BufMut, Bytes, BytesMut};

use crate::{LENGTH_PREFIX_SIZE, MAX_FRAME_SIZE, ProtocolError, Result};

/// Prefix `body` with its 4-byte big-endian length
pub fn encode_frame(body: &[u8]) -> Result<Bytes> {
    if body.len() > MAX_FRAME_SIZE {
        return Err(ProtocolError::unencodable("frame", body.len(), MAX_FRAME_SIZE));
    }

    let mut buf = BytesMut::with_capacity(LENGTH_PREFIX_SIZE + body.len());
    buf.put_u32(body.len() as u32);
    buf.put_slice(body);
    Ok(buf.freeze())
}

/// Peek at a buffered stream and return the body length of the next frame
///
/// Returns `Ok(None)` until the prefix and the whole body are buffered.
/// A declared length above `max` is an error as soon as the prefix is seen.
pub fn peek_frame_len(buf: &[u8], max: usize) -> Result<Option<usize>> {
    if buf.len() < LENGTH_PREFIX_SIZE {
        return Ok(None);
    }

    let len = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize;
    if len > max {
        return Err(ProtocolError::too_large("frame", len, max));
    }

    if buf.len() < LENGTH_PREFIX_SIZE + len {
        return Ok(None);
    }

    Ok(Some(len))
}
