use std::sync::Arc;

use courier_client::test::{PrefixServer, RecordingServer};
use courier_config::RuntimeConfig;

use crate::ChannelOptions;
use crate::test_util::{Recorder, WAIT, broker, broker_with, eventually, runtime, send};

fn options() -> ChannelOptions {
    ChannelOptions::new(&runtime())
}

#[tokio::test]
async fn test_channels_keep_insertion_order() {
    let broker = broker();
    let route = broker.route("orders");

    for name in ["validate", "enrich", "publish"] {
        let (_, created) = route.add_channel(name, options()).unwrap();
        assert!(created);
    }
    let (_, created) = route
        .add_channel("enrich", options().with_partitions(9))
        .unwrap();
    assert!(!created);

    assert_eq!(route.channel_names(), vec!["validate", "enrich", "publish"]);
    assert_eq!(route.len(), 3);
    // Options of a duplicate add are ignored
    assert_eq!(route.channel("enrich").unwrap().partition_count(), 4);
}

#[tokio::test]
async fn test_next_channel() {
    let broker = broker();
    let route = broker.route("orders");
    route.add_channel("a", options());
    route.add_channel("b", options());

    assert_eq!(route.next_channel("a").unwrap().name(), "b");
    assert!(route.next_channel("b").is_none());
    assert!(route.next_channel("missing").is_none());
}

#[tokio::test]
async fn test_delivery_without_channels_is_dropped() {
    let broker = broker();
    let route = broker.route("orders");

    assert!(route.is_empty());
    assert!(!route.process_delivery(send("orders", "k", "x")).await);
}

#[tokio::test]
async fn test_delivery_flows_through_channels_in_order() {
    let prefix = PrefixServer::start("X:").await.unwrap();
    let sink = RecordingServer::start().await.unwrap();

    let broker = broker();
    let route = broker.route("orders");
    let (first, _) = route.add_channel("transform", options()).unwrap();
    let (second, _) = route.add_channel("publish", options()).unwrap();
    first.add_transformer(prefix.addr());
    second.add_subscriber(sink.addr());

    assert!(route.process_delivery(send("orders", "k", "payload")).await);

    let got = sink.wait_for(1, WAIT).await;
    assert_eq!(got.len(), 1);
    assert_eq!(got[0].as_ref(), b"X:payload");
    assert!(eventually(|| first.stats().forwarded == 1).await);
    assert!(eventually(|| second.stats().processed == 1).await);
    assert_eq!(second.stats().forwarded, 0);
}

#[tokio::test]
async fn test_channel_added_later_joins_the_pipeline() {
    let broker = broker();
    let route = broker.route("orders");
    let (first, _) = route.add_channel("a", options()).unwrap();

    assert!(route.process_delivery(send("orders", "k", "early")).await);
    assert!(eventually(|| first.stats().processed == 1).await);
    assert_eq!(first.stats().forwarded, 0);

    let (second, _) = route.add_channel("b", options()).unwrap();
    let recorder = Recorder::new("mem:recorder");
    second.add_transformer_stage(recorder.clone());

    assert!(route.process_delivery(send("orders", "k", "late")).await);
    assert!(eventually(|| recorder.seen() == vec!["late"]).await);
}

#[tokio::test]
async fn test_remove_last_channel_consolidates_route() {
    let broker = broker();
    let route = broker.route("orders");
    route.add_channel("a", options());
    route.add_channel("b", options());

    assert!(route.remove_channel("a"));
    assert!(!route.remove_channel("a"));
    assert_eq!(broker.route_names(), vec!["orders"]);

    assert!(route.remove_channel("b"));
    assert!(broker.get_route("orders").is_none());
}

#[tokio::test]
async fn test_remove_last_channel_keeps_route_without_consolidation() {
    let broker = broker_with(RuntimeConfig {
        auto_consolidate: false,
        ..runtime()
    });
    let route = broker.route("orders");
    route.add_channel("a", options());

    assert!(route.remove_channel("a"));
    assert!(route.is_empty());
    assert!(broker.get_route("orders").is_some());
}

#[tokio::test]
async fn test_removed_channel_stops_accepting() {
    let broker = broker();
    let route = broker.route("orders");
    let (channel, _) = route.add_channel("a", options()).unwrap();
    route.add_channel("b", options());

    route.remove_channel("a");
    assert!(!channel.enqueue(send("orders", "k", "x")).await);
    tokio::time::timeout(WAIT, channel.drain()).await.unwrap();
}

#[tokio::test]
async fn test_removed_route_refuses_new_channels() {
    let broker = broker();
    let route = broker.route("orders");
    route.add_channel("a", options());

    assert!(broker.remove_route("orders"));
    assert!(route.is_detached());
    assert!(route.add_channel("b", options()).is_none());
    assert!(broker.get_route("orders").is_none());
}

#[tokio::test]
async fn test_stale_channel_does_not_touch_recreated_channel() {
    let broker = broker();
    let route = broker.route("orders");
    route.add_channel("b", options());
    let (stale, _) = route.add_channel("a", options()).unwrap();
    stale.add_subscriber("127.0.0.1:9001");

    assert!(route.remove_channel("a"));
    assert!(stale.is_detached());
    let (fresh, created) = route.add_channel("a", options()).unwrap();
    assert!(created);
    fresh.add_subscriber("127.0.0.1:9002");

    assert!(!stale.add_subscriber("127.0.0.1:9003"));
    assert!(!stale.remove_subscriber("127.0.0.1:9001"));
    assert!(!fresh.remove_subscriber("127.0.0.1:9001"));

    let current = route.channel("a").unwrap();
    assert!(Arc::ptr_eq(&current, &fresh));
    assert_eq!(current.subscribers(), vec!["127.0.0.1:9002"]);
}

#[tokio::test]
async fn test_consolidated_channel_is_detached() {
    let broker = broker();
    let route = broker.route("orders");
    route.add_channel("b", options());
    let (channel, _) = route.add_channel("a", options()).unwrap();
    channel.add_transformer("127.0.0.1:7001");

    assert!(channel.remove_transformer("127.0.0.1:7001"));
    assert!(channel.is_detached());
    assert!(route.channel("a").is_none());
    assert!(!channel.add_transformer("127.0.0.1:7001"));
    assert_eq!(route.channel_names(), vec!["b"]);
}

#[tokio::test]
async fn test_shutdown_drains_every_channel() {
    let broker = broker();
    let route = broker.route("orders");
    let (first, _) = route.add_channel("a", options()).unwrap();
    let (second, _) = route.add_channel("b", options()).unwrap();
    let recorder = Recorder::with_delay("mem:recorder", std::time::Duration::from_millis(2));
    second.add_transformer_stage(recorder.clone());

    for i in 0..10 {
        let delivery = send("orders", "k", &format!("m{i}"));
        assert!(route.process_delivery(delivery).await);
    }

    tokio::time::timeout(WAIT, route.shutdown()).await.unwrap();

    assert_eq!(first.stats().processed, 10);
    assert_eq!(recorder.seen().len(), 10);
    assert!(route.is_empty());
}
