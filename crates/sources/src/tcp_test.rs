//! TCP source tests

use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use courier_auth::TokenStore;
use courier_client::test::RecordingServer;
use courier_client::{Client, command};
use courier_config::{RuntimeHandle, ServerConfig};
use courier_pipeline::Broker;
use courier_pool::{ConnectionPool, PoolConfig};

use crate::error::TcpSourceError;
use crate::tcp::{TcpSource, TcpSourceConfig, TcpSourceMetricsHandle};

const WAIT: Duration = Duration::from_secs(3);

// ============================================================================
// Helper Functions
// ============================================================================

struct Running {
    addr: String,
    broker: Arc<Broker>,
    metrics: TcpSourceMetricsHandle,
    cancel: CancellationToken,
    task: JoinHandle<Result<(), TcpSourceError>>,
}

fn local_config() -> TcpSourceConfig {
    TcpSourceConfig {
        address: "127.0.0.1".into(),
        port: 0,
        ..Default::default()
    }
}

async fn start(config: TcpSourceConfig) -> Running {
    let tokens = TokenStore::from_tokens(["token"]).unwrap();
    let broker = Broker::new(
        RuntimeHandle::default(),
        ConnectionPool::new(PoolConfig::default()),
        Arc::new(tokens),
    );

    let source = TcpSource::bind(config, Arc::clone(&broker)).await.unwrap();
    let addr = source.local_addr().to_string();
    let metrics = source.metrics_handle();
    let cancel = CancellationToken::new();
    let task = tokio::spawn(source.run(cancel.clone()));

    Running {
        addr,
        broker,
        metrics,
        cancel,
        task,
    }
}

async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + WAIT;
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    check()
}

/// Wait until the peer closes `stream`
async fn closed_by_peer(stream: &mut TcpStream) -> bool {
    let mut byte = [0u8; 1];
    matches!(
        timeout(WAIT, stream.read(&mut byte)).await,
        Ok(Ok(0) | Err(_))
    )
}

// ============================================================================
// Configuration Tests
// ============================================================================

#[test]
fn test_config_default() {
    let config = TcpSourceConfig::default();

    assert_eq!(config.address, "0.0.0.0");
    assert_eq!(config.port, 7070);
    assert_eq!(config.workers, 64);
    assert!(config.keepalive);
    assert!(config.nodelay);
    assert!(config.socket_buffer_size.is_none());
}

#[test]
fn test_config_from_server_section() {
    let server = ServerConfig {
        address: "127.0.0.1".into(),
        port: 9000,
        workers: 4,
        no_delay: false,
        socket_buffer_size: Some(65536),
        ..Default::default()
    };

    let config = TcpSourceConfig::from_server(&server);
    assert_eq!(config.bind_address(), "127.0.0.1:9000");
    assert_eq!(config.workers, 4);
    assert!(!config.nodelay);
    assert_eq!(config.socket_buffer_size, Some(65536));
}

#[tokio::test]
async fn test_bind_failure_names_address() {
    let taken = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = taken.local_addr().unwrap().port();

    let config = TcpSourceConfig {
        port,
        ..local_config()
    };
    let broker = Broker::new(
        RuntimeHandle::default(),
        ConnectionPool::new(PoolConfig::default()),
        Arc::new(TokenStore::from_tokens(["token"]).unwrap()),
    );

    let err = TcpSource::bind(config, broker).await.err().unwrap();
    assert!(matches!(err, TcpSourceError::Bind { .. }));
    assert!(err.to_string().contains(&port.to_string()));
}

// ============================================================================
// Frame Handling Tests
// ============================================================================

#[tokio::test]
async fn test_frames_reach_broker_in_order() {
    let sink = RecordingServer::start().await.unwrap();
    let running = start(local_config()).await;

    let mut client = Client::connect(&running.addr).await.unwrap();
    client
        .send(&command::add_channel("orders", "primary", "", ""))
        .await
        .unwrap();
    client
        .send(&command::add_subscriber("orders", "primary", sink.addr()))
        .await
        .unwrap();
    client
        .send(&command::deliver("orders", "k", "hello"))
        .await
        .unwrap();

    let got = sink.wait_for(1, WAIT).await;
    assert_eq!(got.len(), 1);
    assert_eq!(got[0].as_ref(), b"hello");

    let snapshot = running.metrics.snapshot();
    assert_eq!(snapshot.frames_received, 3);
    assert_eq!(snapshot.connections_total, 1);
}

#[tokio::test]
async fn test_empty_frame_is_skipped() {
    let running = start(local_config()).await;

    let mut client = Client::connect(&running.addr).await.unwrap();
    client.send_raw(&[]).await.unwrap();
    client.send(&command::add_route("orders")).await.unwrap();

    assert!(eventually(|| running.broker.get_route("orders").is_some()).await);
    let snapshot = running.metrics.snapshot();
    assert_eq!(snapshot.frames_empty, 1);
    assert_eq!(snapshot.frames_received, 1);
}

#[tokio::test]
async fn test_malformed_frame_keeps_connection_open() {
    let running = start(local_config()).await;

    let mut client = Client::connect(&running.addr).await.unwrap();
    client.send_raw(b"not a command").await.unwrap();
    client
        .send(&command::runtime_update("verbosity", "debug", "wrong"))
        .await
        .unwrap();
    client.send(&command::add_route("orders")).await.unwrap();

    assert!(eventually(|| running.broker.get_route("orders").is_some()).await);
    let snapshot = running.metrics.snapshot();
    assert_eq!(snapshot.frames_malformed, 1);
    assert_eq!(snapshot.frames_rejected, 1);
    assert_eq!(snapshot.connections_active, 1);
}

#[tokio::test]
async fn test_oversized_frame_closes_connection() {
    let running = start(TcpSourceConfig {
        max_frame_size: 1024,
        ..local_config()
    })
    .await;

    let mut stream = TcpStream::connect(&running.addr).await.unwrap();
    tokio::io::AsyncWriteExt::write_all(&mut stream, &u32::MAX.to_be_bytes())
        .await
        .unwrap();

    assert!(closed_by_peer(&mut stream).await);
    assert!(eventually(|| running.metrics.snapshot().oversized == 1).await);
    assert_eq!(running.metrics.snapshot().frames_received, 0);
}

#[tokio::test]
async fn test_truncated_frame_at_eof() {
    let running = start(local_config()).await;

    let mut client = Client::connect(&running.addr).await.unwrap();
    client.write_unframed(&[0, 0, 0, 10, 1, 2, 3]).await.unwrap();
    client.close().await.unwrap();

    assert!(eventually(|| running.metrics.snapshot().truncated == 1).await);
    assert!(eventually(|| running.metrics.snapshot().connections_active == 0).await);
    assert_eq!(running.metrics.snapshot().frames_received, 0);
}

// ============================================================================
// Worker Limit and Shutdown Tests
// ============================================================================

#[tokio::test]
async fn test_worker_limit_queues_extra_connections() {
    let running = start(TcpSourceConfig {
        workers: 1,
        ..local_config()
    })
    .await;

    let first = Client::connect(&running.addr).await.unwrap();
    assert!(eventually(|| running.metrics.snapshot().connections_active == 1).await);

    let mut second = Client::connect(&running.addr).await.unwrap();
    second.send(&command::add_route("orders")).await.unwrap();

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(running.broker.get_route("orders").is_none());

    first.close().await.unwrap();
    assert!(eventually(|| running.broker.get_route("orders").is_some()).await);
}

#[tokio::test]
async fn test_cancel_stops_listener_and_connections() {
    let running = start(local_config()).await;

    let mut idle = TcpStream::connect(&running.addr).await.unwrap();
    assert!(eventually(|| running.metrics.snapshot().connections_active == 1).await);

    running.cancel.cancel();
    let result = timeout(WAIT, running.task).await.unwrap().unwrap();
    assert!(result.is_ok());

    assert!(closed_by_peer(&mut idle).await);
    assert_eq!(running.metrics.snapshot().connections_active, 0);
    assert!(TcpStream::connect(&running.addr).await.is_err());
}
