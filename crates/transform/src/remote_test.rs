//! Tests for the TCP transformer

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use bytes::Bytes;
use courier_client::test::{PrefixServer, SilentServer, closed_address};
use courier_config::{RuntimeConfig, RuntimeHandle};
use courier_pool::{ConnectionPool, PoolConfig};
use courier_protocol::{CommandType, ObjectType};

use super::*;

fn delivery(payload: &'static [u8]) -> Arc<Delivery> {
    Arc::new(
        Delivery::builder(ObjectType::Delivery, CommandType::Send)
            .uid("u-7")
            .route("orders")
            .channel("primary")
            .key("c-1")
            .payload(Bytes::from_static(payload))
            .build(),
    )
}

fn runtime_with_timeout(timeout: Duration) -> RuntimeHandle {
    RuntimeHandle::new(RuntimeConfig {
        transform_timeout: timeout,
        ..RuntimeConfig::default()
    })
}

fn transformer(address: &str, pool: &ConnectionPool, runtime: &RuntimeHandle) -> RemoteTransformer {
    RemoteTransformer::new(
        address,
        pool.clone(),
        runtime.clone(),
        CancellationToken::new(),
    )
}

/// Answers the first `answered` frames on each connection with `H:` + body,
/// then reads one more frame and hangs up without replying
async fn hangup_server(answered: usize) -> (String, Arc<AtomicUsize>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    let accepted = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&accepted);

    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            counter.fetch_add(1, Ordering::SeqCst);
            tokio::spawn(async move {
                for _ in 0..=answered {
                    let Ok(len) = stream.read_u32().await else { return };
                    let mut body = vec![0u8; len as usize];
                    if stream.read_exact(&mut body).await.is_err() {
                        return;
                    }
                    if answered == 0 {
                        return;
                    }
                    let mut reply = b"H:".to_vec();
                    reply.extend_from_slice(&body);
                    if stream.write_all(&encode_frame(&reply).unwrap()).await.is_err() {
                        return;
                    }
                }
            });
        }
    });

    (addr, accepted)
}

// ============================================================================
// Success
// ============================================================================

#[tokio::test]
async fn test_apply_replaces_payload_keeps_metadata() {
    let server = PrefixServer::start("X:").await.unwrap();
    let pool = ConnectionPool::new(PoolConfig::default());
    let runtime = runtime_with_timeout(Duration::from_secs(2));
    let t = transformer(server.addr(), &pool, &runtime);

    let input = delivery(b"payload");
    let output = t.apply(&input).await.unwrap();

    assert!(!Arc::ptr_eq(&input, &output));
    assert_eq!(output.payload().as_ref(), b"X:payload");
    assert_eq!(output.uid(), "u-7");
    assert_eq!(output.args(), input.args());
    assert_eq!(input.payload().as_ref(), b"payload");
}

#[tokio::test]
async fn test_connection_returned_to_pool() {
    let server = PrefixServer::start("A:").await.unwrap();
    let pool = ConnectionPool::new(PoolConfig::default());
    let runtime = runtime_with_timeout(Duration::from_secs(2));
    let t = transformer(server.addr(), &pool, &runtime);

    t.apply(&delivery(b"1")).await.unwrap();
    t.apply(&delivery(b"2")).await.unwrap();

    assert_eq!(server.requests(), 2);
    let stats = pool.stats();
    assert_eq!(stats.dials, 1);
    assert_eq!(stats.reuses, 1);
    assert_eq!(pool.idle_count(server.addr()), 1);
}

#[tokio::test]
async fn test_empty_payload_round_trip() {
    let server = PrefixServer::start("").await.unwrap();
    let pool = ConnectionPool::new(PoolConfig::default());
    let runtime = runtime_with_timeout(Duration::from_secs(2));
    let t = transformer(server.addr(), &pool, &runtime);

    let output = t.apply(&delivery(b"")).await.unwrap();
    assert!(output.payload().is_empty());
}

// ============================================================================
// Peer-closed connections
// ============================================================================

#[tokio::test]
async fn test_transformer_that_closed_its_connection_still_applies() {
    let server = PrefixServer::start_with_limit("A:", 1).await.unwrap();
    let pool = ConnectionPool::new(PoolConfig::default());
    let runtime = runtime_with_timeout(Duration::from_secs(2));
    let t = transformer(server.addr(), &pool, &runtime);

    let first = t.apply(&delivery(b"x")).await.unwrap();
    assert_eq!(first.payload().as_ref(), b"A:x");

    tokio::time::sleep(Duration::from_millis(100)).await;

    let second = t.apply(&delivery(b"y")).await.unwrap();
    assert_eq!(second.payload().as_ref(), b"A:y");
    assert_eq!(server.requests(), 2);
    assert_eq!(server.connections(), 2);
    assert_eq!(pool.stats().evictions, 1);
}

#[tokio::test]
async fn test_back_to_back_applies_survive_closing_transformer() {
    let server = PrefixServer::start_with_limit("A:", 1).await.unwrap();
    let pool = ConnectionPool::new(PoolConfig::default());
    let runtime = runtime_with_timeout(Duration::from_secs(2));
    let t = transformer(server.addr(), &pool, &runtime);

    for body in [&b"1"[..], b"2", b"3"] {
        let input = Arc::new(delivery(b"").with_payload(Bytes::copy_from_slice(body)));
        let output = t.apply(&input).await.unwrap();
        assert_eq!(&output.payload()[2..], body);
    }
    assert_eq!(server.requests(), 3);
}

#[tokio::test]
async fn test_reused_connection_closed_mid_request_is_redialed() {
    let (addr, accepted) = hangup_server(1).await;
    let pool = ConnectionPool::new(PoolConfig::default());
    let runtime = runtime_with_timeout(Duration::from_secs(2));
    let t = transformer(&addr, &pool, &runtime);

    t.apply(&delivery(b"x")).await.unwrap();

    // The cached connection looks open until the second request hits it
    let output = t.apply(&delivery(b"y")).await.unwrap();
    assert_eq!(output.payload().as_ref(), b"H:y");
    assert_eq!(accepted.load(Ordering::SeqCst), 2);

    let stats = pool.stats();
    assert_eq!(stats.reuses, 1);
    assert_eq!(stats.dials, 2);
    assert_eq!(stats.discards, 1);
}

#[tokio::test]
async fn test_fresh_connection_closed_before_reply_is_not_retried() {
    let (addr, accepted) = hangup_server(0).await;
    let pool = ConnectionPool::new(PoolConfig::default());
    let runtime = runtime_with_timeout(Duration::from_secs(2));
    let t = transformer(&addr, &pool, &runtime);

    let err = t.apply(&delivery(b"x")).await.unwrap_err();

    assert!(matches!(
        err,
        TransformError::Read { .. } | TransformError::Write { .. }
    ));
    assert_eq!(accepted.load(Ordering::SeqCst), 1);
    assert_eq!(pool.stats().dials, 1);
}

// ============================================================================
// Failures
// ============================================================================

#[tokio::test]
async fn test_unreachable_address_is_dial_error() {
    let address = closed_address().await.unwrap();
    let pool = ConnectionPool::new(PoolConfig::default());
    let runtime = runtime_with_timeout(Duration::from_secs(2));
    let t = transformer(&address, &pool, &runtime);

    let err = t.apply(&delivery(b"x")).await.unwrap_err();
    assert!(err.is_dial());
}

#[tokio::test]
async fn test_silent_server_times_out_and_discards_connection() {
    let server = SilentServer::start().await.unwrap();
    let pool = ConnectionPool::new(PoolConfig::default());
    let runtime = runtime_with_timeout(Duration::from_millis(100));
    let t = transformer(server.addr(), &pool, &runtime);

    let err = t.apply(&delivery(b"x")).await.unwrap_err();

    assert!(matches!(err, TransformError::Timeout { .. }));
    assert_eq!(pool.idle_count(server.addr()), 0);
    assert_eq!(pool.stats().discards, 1);
}

#[tokio::test]
async fn test_timeout_follows_runtime_updates() {
    let server = SilentServer::start().await.unwrap();
    let pool = ConnectionPool::new(PoolConfig::default());
    let runtime = runtime_with_timeout(Duration::from_secs(30));
    let t = transformer(server.addr(), &pool, &runtime);

    runtime.apply_update("transform_timeout", "50ms").unwrap();

    let started = tokio::time::Instant::now();
    let err = t.apply(&delivery(b"x")).await.unwrap_err();
    assert!(matches!(
        err,
        TransformError::Timeout { timeout, .. } if timeout == Duration::from_millis(50)
    ));
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[test]
fn test_equality_by_address() {
    let pool = ConnectionPool::new(PoolConfig::default());
    let runtime = RuntimeHandle::default();
    let a = transformer("127.0.0.1:9000", &pool, &runtime);
    let b = transformer("127.0.0.1:9000", &pool, &runtime);
    let c = transformer("127.0.0.1:9001", &pool, &runtime);

    assert_eq!(a, b);
    assert_ne!(a, c);
}
