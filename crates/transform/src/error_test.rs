//! Tests for transform error types

use std::io;
use std::time::Duration;

use super::*;

#[test]
fn test_error_creation() {
    let err = TransformError::write("127.0.0.1:9000", io::Error::from(io::ErrorKind::BrokenPipe));
    assert!(matches!(err, TransformError::Write { .. }));

    let err = TransformError::read(
        "127.0.0.1:9000",
        io::Error::from(io::ErrorKind::UnexpectedEof),
    );
    assert!(matches!(err, TransformError::Read { .. }));

    let err = TransformError::timeout("127.0.0.1:9000", Duration::from_millis(50));
    assert!(matches!(err, TransformError::Timeout { .. }));
    assert!(!err.is_dial());
}

#[test]
fn test_error_display() {
    let err = TransformError::timeout("127.0.0.1:9000", Duration::from_secs(2));
    assert_eq!(
        err.to_string(),
        "transformer 127.0.0.1:9000 timed out after 2s"
    );
}

#[test]
fn test_dial_error_is_transparent() {
    let pool_err = PoolError::Cancelled {
        address: "127.0.0.1:1".into(),
    };
    let expected = pool_err.to_string();
    let err = TransformError::from(pool_err);
    assert!(err.is_dial());
    assert_eq!(err.to_string(), expected);
}
