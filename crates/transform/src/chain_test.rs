//! Tests for transformer chain

use super::*;
use crate::{TransformError, TransformFuture};
use bytes::Bytes;
use courier_protocol::{CommandType, ObjectType};
use std::time::Duration;

/// In-memory transformer that prefixes the payload
struct Prefix {
    address: String,
    prefix: &'static str,
}

impl Prefix {
    fn arc(address: &str, prefix: &'static str) -> Arc<dyn Transformer> {
        Arc::new(Self {
            address: address.into(),
            prefix,
        })
    }
}

impl Transformer for Prefix {
    fn apply<'a>(&'a self, delivery: &'a Arc<Delivery>) -> TransformFuture<'a> {
        Box::pin(async move {
            let mut body = self.prefix.as_bytes().to_vec();
            body.extend_from_slice(delivery.payload());
            Ok(Arc::new(delivery.with_payload(Bytes::from(body))))
        })
    }

    fn address(&self) -> &str {
        &self.address
    }
}

/// Transformer that always times out
struct Failing(String);

impl Failing {
    fn arc(address: &str) -> Arc<dyn Transformer> {
        Arc::new(Self(address.into()))
    }
}

impl Transformer for Failing {
    fn apply<'a>(&'a self, _delivery: &'a Arc<Delivery>) -> TransformFuture<'a> {
        Box::pin(async move { Err(TransformError::timeout(&self.0, Duration::from_millis(1))) })
    }

    fn address(&self) -> &str {
        &self.0
    }
}

fn delivery(payload: &'static str) -> Arc<Delivery> {
    Arc::new(
        Delivery::builder(ObjectType::Delivery, CommandType::Send)
            .uid("u1")
            .route("orders")
            .channel("primary")
            .payload(Bytes::from_static(payload.as_bytes()))
            .build(),
    )
}

// ============================================================================
// Application
// ============================================================================

#[tokio::test]
async fn test_empty_chain_returns_same_delivery() {
    let chain = Chain::empty();
    assert!(chain.is_empty());

    let input = delivery("x");
    let output = chain.apply(Arc::clone(&input)).await;

    assert!(Arc::ptr_eq(&input, &output.delivery));
    assert_eq!(output.applied, 0);
    assert_eq!(output.skipped, 0);
}

#[tokio::test]
async fn test_sequential_application_order() {
    let chain = Chain::new(vec![Prefix::arc("a", "A:"), Prefix::arc("b", "B:")]);

    let output = chain.apply(delivery("x")).await;

    assert_eq!(output.delivery.payload().as_ref(), b"B:A:x");
    assert_eq!(output.applied, 2);
    // Metadata carried through
    assert_eq!(output.delivery.uid(), "u1");
    assert_eq!(output.delivery.route(), "orders");
}

#[tokio::test]
async fn test_failed_stage_is_skipped() {
    let chain = Chain::new(vec![
        Failing::arc("dead"),
        Prefix::arc("ok", "OK:"),
    ]);

    let output = chain.apply(delivery("x")).await;

    assert_eq!(output.delivery.payload().as_ref(), b"OK:x");
    assert_eq!(output.applied, 1);
    assert_eq!(output.skipped, 1);
}

#[tokio::test]
async fn test_all_stages_failing_keeps_original_reference() {
    let chain = Chain::new(vec![
        Failing::arc("one"),
        Failing::arc("two"),
    ]);

    let input = delivery("x");
    let output = chain.apply(Arc::clone(&input)).await;

    assert!(Arc::ptr_eq(&input, &output.delivery));
    assert_eq!(output.skipped, 2);
}

// ============================================================================
// Copy-on-write edits
// ============================================================================

#[test]
fn test_new_drops_duplicate_addresses() {
    let chain = Chain::new(vec![
        Prefix::arc("a", "A:"),
        Prefix::arc("b", "B:"),
        Prefix::arc("a", "Z:"),
    ]);
    assert_eq!(chain.addresses(), vec!["a", "b"]);
}

#[test]
fn test_with_is_idempotent_by_address() {
    let chain = Chain::empty().with(Prefix::arc("a", "A:")).unwrap();
    assert!(chain.with(Prefix::arc("a", "other")).is_none());

    let chain = chain.with(Prefix::arc("b", "B:")).unwrap();
    assert_eq!(chain.addresses(), vec!["a", "b"]);
}

#[test]
fn test_without_absent_is_none() {
    let chain = Chain::new(vec![Prefix::arc("a", "A:"), Prefix::arc("b", "B:")]);

    assert!(chain.without("zzz").is_none());

    let smaller = chain.without("a").unwrap();
    assert_eq!(smaller.addresses(), vec!["b"]);
    // Source chain unchanged
    assert_eq!(chain.len(), 2);
}
