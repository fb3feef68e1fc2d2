//! Tests for transport framing

use crate::{LENGTH_PREFIX_SIZE, ProtocolError, encode_frame, peek_frame_len};

#[test]
fn test_encode_frame_prefix() {
    let frame = encode_frame(b"abc").unwrap();
    assert_eq!(&frame[..LENGTH_PREFIX_SIZE], &[0, 0, 0, 3]);
    assert_eq!(&frame[LENGTH_PREFIX_SIZE..], b"abc");
}

#[test]
fn test_encode_empty_frame() {
    let frame = encode_frame(&[]).unwrap();
    assert_eq!(frame.as_ref(), &[0, 0, 0, 0]);
    assert_eq!(peek_frame_len(&frame, 16).unwrap(), Some(0));
}

#[test]
fn test_peek_needs_prefix() {
    assert_eq!(peek_frame_len(&[0, 0], 16).unwrap(), None);
}

#[test]
fn test_peek_needs_full_body() {
    assert_eq!(peek_frame_len(&[0, 0, 0, 5, b'a'], 16).unwrap(), None);
    assert_eq!(
        peek_frame_len(&[0, 0, 0, 5, b'a', b'b', b'c', b'd', b'e'], 16).unwrap(),
        Some(5)
    );
}

#[test]
fn test_peek_rejects_oversize_from_prefix_alone() {
    let err = peek_frame_len(&[0, 0, 1, 0], 16).unwrap_err();
    assert_eq!(err, ProtocolError::too_large("frame", 256, 16));
}
