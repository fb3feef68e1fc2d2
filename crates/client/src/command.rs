//! Command constructors
//!
//! Thin wrappers over [`Delivery::builder`] that put each argument in the
//! slot the broker reads it from.

use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;

use courier_protocol::{CommandType, Delivery, ObjectType};

static NEXT_UID: AtomicU64 = AtomicU64::new(1);

/// Process-unique delivery id
pub fn next_uid() -> String {
    let seq = NEXT_UID.fetch_add(1, Ordering::Relaxed);
    format!("{}-{}", std::process::id(), seq)
}

/// Data delivery into a route's first channel
///
/// `key` is the correlation key; deliveries sharing a key stay ordered.
pub fn deliver(route: &str, key: &str, payload: impl Into<Bytes>) -> Delivery {
    Delivery::builder(ObjectType::Delivery, CommandType::Send)
        .uid(next_uid())
        .route(route)
        .key(key)
        .payload(payload)
        .build()
}

pub fn add_route(route: &str) -> Delivery {
    Delivery::builder(ObjectType::Route, CommandType::Add)
        .route(route)
        .build()
}

pub fn remove_route(route: &str) -> Delivery {
    Delivery::builder(ObjectType::Route, CommandType::Remove)
        .route(route)
        .build()
}

/// Add a channel with a selection strategy and partition key selector
///
/// Empty strings select the broker defaults.
pub fn add_channel(route: &str, channel: &str, strategy: &str, partition_key: &str) -> Delivery {
    Delivery::builder(ObjectType::Channel, CommandType::Add)
        .route(route)
        .channel(channel)
        .target(strategy)
        .key(partition_key)
        .build()
}

/// Add a channel with an explicit partition count
pub fn add_channel_with_partitions(
    route: &str,
    channel: &str,
    strategy: &str,
    partition_key: &str,
    partitions: usize,
) -> Delivery {
    Delivery::builder(ObjectType::Channel, CommandType::Add)
        .route(route)
        .channel(channel)
        .target(strategy)
        .key(partition_key)
        .payload(partitions.to_string())
        .build()
}

pub fn remove_channel(route: &str, channel: &str) -> Delivery {
    Delivery::builder(ObjectType::Channel, CommandType::Remove)
        .route(route)
        .channel(channel)
        .build()
}

pub fn add_transformer(route: &str, channel: &str, address: &str) -> Delivery {
    member(
        ObjectType::Transformer,
        CommandType::Add,
        route,
        channel,
        address,
    )
}

pub fn remove_transformer(route: &str, channel: &str, address: &str) -> Delivery {
    member(
        ObjectType::Transformer,
        CommandType::Remove,
        route,
        channel,
        address,
    )
}

pub fn add_subscriber(route: &str, channel: &str, address: &str) -> Delivery {
    member(
        ObjectType::Subscriber,
        CommandType::Add,
        route,
        channel,
        address,
    )
}

pub fn remove_subscriber(route: &str, channel: &str, address: &str) -> Delivery {
    member(
        ObjectType::Subscriber,
        CommandType::Remove,
        route,
        channel,
        address,
    )
}

/// Change one runtime setting; `token` must be on the broker's allow-list
pub fn runtime_update(key: &str, value: &str, token: &str) -> Delivery {
    Delivery::builder(ObjectType::RuntimeUpdate, CommandType::Update)
        .target(key)
        .key(token)
        .payload(value.to_owned())
        .build()
}

fn member(
    object: ObjectType,
    command: CommandType,
    route: &str,
    channel: &str,
    address: &str,
) -> Delivery {
    Delivery::builder(object, command)
        .route(route)
        .channel(channel)
        .target(address)
        .build()
}

#[cfg(test)]
#[path = "command_test.rs"]
mod tests;
