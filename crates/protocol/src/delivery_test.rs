//! Tests for Delivery

use bytes::Bytes;

use crate::{CommandType, Delivery, ObjectType, PROTOCOL_VERSION};

#[test]
fn test_builder_sets_arg_slots() {
    let d = Delivery::builder(ObjectType::Subscriber, CommandType::Add)
        .route("orders")
        .channel("primary")
        .target("127.0.0.1:9000")
        .key("k")
        .build();

    assert_eq!(d.version(), PROTOCOL_VERSION);
    assert_eq!(d.arg(0), Some("orders"));
    assert_eq!(d.arg(1), Some("primary"));
    assert_eq!(d.arg(2), Some("127.0.0.1:9000"));
    assert_eq!(d.arg(3), Some("k"));
    assert_eq!(d.arg(4), None);
}

#[test]
fn test_with_payload_keeps_metadata() {
    let original = Delivery::builder(ObjectType::Delivery, CommandType::Send)
        .uid("u1")
        .sender("client")
        .route("orders")
        .channel("primary")
        .key("c1")
        .payload(Bytes::from_static(b"x"))
        .build();

    let transformed = original.with_payload(Bytes::from_static(b"A:x"));

    assert_eq!(transformed.uid(), "u1");
    assert_eq!(transformed.sender(), "client");
    assert_eq!(transformed.args(), original.args());
    assert_eq!(transformed.object(), original.object());
    assert_eq!(transformed.command(), original.command());
    assert_eq!(transformed.payload_str(), "A:x");
    // Original is untouched
    assert_eq!(original.payload_str(), "x");
}
