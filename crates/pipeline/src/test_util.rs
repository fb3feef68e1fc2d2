//! Shared helpers for engine tests

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::Semaphore;

use courier_auth::TokenStore;
use courier_config::{RuntimeConfig, RuntimeHandle};
use courier_pool::{ConnectionPool, PoolConfig};
use courier_protocol::{CommandType, Delivery, ObjectType};
use courier_transform::{TransformFuture, Transformer};

use crate::Broker;

pub const WAIT: Duration = Duration::from_secs(3);

pub const TOKEN: &str = "s3cret";

pub fn runtime() -> RuntimeConfig {
    RuntimeConfig {
        transform_timeout: Duration::from_secs(2),
        ..RuntimeConfig::default()
    }
}

pub fn broker() -> Arc<Broker> {
    broker_with(runtime())
}

pub fn broker_with(config: RuntimeConfig) -> Arc<Broker> {
    let tokens = TokenStore::from_tokens([TOKEN]).unwrap();
    Broker::new(
        RuntimeHandle::new(config),
        ConnectionPool::new(PoolConfig::default()),
        Arc::new(tokens),
    )
}

pub fn send(route: &str, key: &str, payload: &str) -> Arc<Delivery> {
    Arc::new(
        Delivery::builder(ObjectType::Delivery, CommandType::Send)
            .uid(format!("uid-{payload}"))
            .route(route)
            .key(key)
            .payload(Bytes::copy_from_slice(payload.as_bytes()))
            .build(),
    )
}

/// Poll `check` until it holds or `WAIT` elapses
pub async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + WAIT;
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    check()
}

// ============================================================================
// In-memory transformers
// ============================================================================

/// Records every payload it sees and passes it through unchanged
pub struct Recorder {
    address: String,
    seen: Mutex<Vec<Bytes>>,
    delay: Duration,
}

impl Recorder {
    pub fn new(address: &str) -> Arc<Self> {
        Self::with_delay(address, Duration::ZERO)
    }

    pub fn with_delay(address: &str, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            address: address.to_owned(),
            seen: Mutex::new(Vec::new()),
            delay,
        })
    }

    pub fn seen(&self) -> Vec<String> {
        self.seen
            .lock()
            .iter()
            .map(|b| String::from_utf8_lossy(b).into_owned())
            .collect()
    }
}

impl Transformer for Recorder {
    fn apply<'a>(&'a self, delivery: &'a Arc<Delivery>) -> TransformFuture<'a> {
        Box::pin(async move {
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.seen.lock().push(delivery.payload().clone());
            Ok(Arc::clone(delivery))
        })
    }

    fn address(&self) -> &str {
        &self.address
    }
}

/// Holds each delivery until a permit is released
pub struct Gate {
    address: String,
    permits: Arc<Semaphore>,
}

impl Gate {
    pub fn new(address: &str) -> (Arc<Self>, Arc<Semaphore>) {
        let permits = Arc::new(Semaphore::new(0));
        let gate = Arc::new(Self {
            address: address.to_owned(),
            permits: Arc::clone(&permits),
        });
        (gate, permits)
    }
}

impl Transformer for Gate {
    fn apply<'a>(&'a self, delivery: &'a Arc<Delivery>) -> TransformFuture<'a> {
        Box::pin(async move {
            if let Ok(permit) = self.permits.acquire().await {
                permit.forget();
            }
            Ok(Arc::clone(delivery))
        })
    }

    fn address(&self) -> &str {
        &self.address
    }
}
