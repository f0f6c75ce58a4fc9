/// Integration tests for the real-time channel registry
///
/// These exercise the registry the way the WebSocket layer uses it: many
/// concurrent connections subscribing, publishing, and disconnecting. No
/// database is required.

use serde_json::json;
use taskcrew_shared::realtime::{ChannelRegistry, EventKind, TeamEvent};
use uuid::Uuid;

fn numbered_event(team_id: Uuid, n: u32) -> TeamEvent {
    TeamEvent::new(EventKind::TaskCreated, team_id, json!({ "n": n }))
}

#[tokio::test]
async fn subscribers_see_publish_order_under_a_single_publisher() {
    let registry = ChannelRegistry::new();
    let team_id = Uuid::new_v4();

    let mut rx = registry.subscribe(team_id).await;

    for n in 0..100 {
        registry.publish(team_id, numbered_event(team_id, n)).await;
    }

    for n in 0..100 {
        assert_eq!(rx.recv().await.unwrap().payload["n"], n);
    }
}

#[tokio::test]
async fn every_subscriber_of_a_team_gets_every_event() {
    let registry = std::sync::Arc::new(ChannelRegistry::new());
    let team_id = Uuid::new_v4();

    let mut receivers = Vec::new();
    for _ in 0..8 {
        receivers.push(registry.subscribe(team_id).await);
    }

    for n in 0..10 {
        let delivered = registry.publish(team_id, numbered_event(team_id, n)).await;
        assert_eq!(delivered, 8);
    }

    for mut rx in receivers {
        for n in 0..10 {
            assert_eq!(rx.recv().await.unwrap().payload["n"], n);
        }
    }
}

#[tokio::test]
async fn channels_are_isolated_between_teams() {
    let registry = ChannelRegistry::new();
    let team_a = Uuid::new_v4();
    let team_b = Uuid::new_v4();

    let mut rx_a = registry.subscribe(team_a).await;
    let mut rx_b = registry.subscribe(team_b).await;

    for n in 0..5 {
        registry.publish(team_a, numbered_event(team_a, n)).await;
    }
    registry.publish(team_b, numbered_event(team_b, 99)).await;

    for n in 0..5 {
        let event = rx_a.recv().await.unwrap();
        assert_eq!(event.team_id, team_a);
        assert_eq!(event.payload["n"], n);
    }

    let event = rx_b.recv().await.unwrap();
    assert_eq!(event.team_id, team_b);
    assert_eq!(event.payload["n"], 99);
}

#[tokio::test]
async fn a_disconnected_subscriber_does_not_block_the_rest() {
    let registry = ChannelRegistry::new();
    let team_id = Uuid::new_v4();

    let gone = registry.subscribe(team_id).await;
    let mut alive = registry.subscribe(team_id).await;
    drop(gone);

    let delivered = registry.publish(team_id, numbered_event(team_id, 1)).await;
    assert_eq!(delivered, 1);
    assert_eq!(alive.recv().await.unwrap().payload["n"], 1);
}

#[tokio::test]
async fn concurrent_subscribe_and_publish_from_many_tasks() {
    let registry = std::sync::Arc::new(ChannelRegistry::new());
    let team_id = Uuid::new_v4();

    let mut rx = registry.subscribe(team_id).await;

    let mut handles = Vec::new();
    for n in 0..20u32 {
        let registry = registry.clone();
        handles.push(tokio::spawn(async move {
            registry.publish(team_id, numbered_event(team_id, n)).await
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    // Concurrent publishers have no cross-publisher ordering guarantee;
    // every event still arrives exactly once.
    let mut seen = Vec::new();
    for _ in 0..20 {
        seen.push(rx.recv().await.unwrap().payload["n"].as_u64().unwrap());
    }
    seen.sort_unstable();
    assert_eq!(seen, (0..20).collect::<Vec<u64>>());
}
