/// Per-team broadcast channel registry
///
/// The registry maps team IDs to `tokio::sync::broadcast` senders. A
/// connection subscribes to a team by taking a receiver; dropping the
/// receiver unsubscribes it, so a disconnecting socket sheds all its
/// subscriptions by dropping its receiver tasks.
///
/// Broadcast channels give exactly the delivery contract required here:
/// every receiver subscribed at publish time sees events in publish order,
/// late subscribers see nothing from before they joined, and a slow
/// receiver that overruns the channel capacity loses oldest events rather
/// than blocking the publisher or other receivers.

use std::collections::HashMap;

use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

use super::events::TeamEvent;

/// Buffered events per channel before a lagging receiver starts losing the
/// oldest ones
const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Registry of live team channels
///
/// Safe for concurrent use from many connections; constructed once at
/// process start and shared through the application state.
#[derive(Debug)]
pub struct ChannelRegistry {
    channels: RwLock<HashMap<Uuid, broadcast::Sender<TeamEvent>>>,
    capacity: usize,
}

impl Default for ChannelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
            capacity,
        }
    }

    /// Subscribes to a team's channel, creating the channel on first use
    ///
    /// The returned receiver yields every event published to the team after
    /// this call, in publish order. Dropping it unsubscribes.
    pub async fn subscribe(&self, team_id: Uuid) -> broadcast::Receiver<TeamEvent> {
        let mut channels = self.channels.write().await;

        channels
            .entry(team_id)
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Publishes an event to a team's channel
    ///
    /// Fire-and-forget: returns the number of live subscribers the event
    /// was handed to, which is zero when nobody is listening. A channel
    /// whose last receiver has gone away is removed on the next publish.
    pub async fn publish(&self, team_id: Uuid, event: TeamEvent) -> usize {
        let delivered = {
            let channels = self.channels.read().await;
            match channels.get(&team_id) {
                Some(sender) => sender.send(event).unwrap_or(0),
                None => 0,
            }
        };

        if delivered == 0 {
            // Drop the channel if it has no subscribers left.
            let mut channels = self.channels.write().await;
            if let Some(sender) = channels.get(&team_id) {
                if sender.receiver_count() == 0 {
                    channels.remove(&team_id);
                }
            }
        }

        delivered
    }

    /// Number of live subscribers on a team's channel
    pub async fn subscriber_count(&self, team_id: Uuid) -> usize {
        let channels = self.channels.read().await;
        channels
            .get(&team_id)
            .map(|s| s.receiver_count())
            .unwrap_or(0)
    }

    /// Number of teams with an open channel
    pub async fn channel_count(&self) -> usize {
        self.channels.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::realtime::events::EventKind;
    use serde_json::json;

    fn event(team_id: Uuid, n: u32) -> TeamEvent {
        TeamEvent::new(EventKind::TaskUpdated, team_id, json!({ "n": n }))
    }

    #[tokio::test]
    async fn test_subscriber_receives_in_publish_order() {
        let registry = ChannelRegistry::new();
        let team_id = Uuid::new_v4();

        let mut rx = registry.subscribe(team_id).await;

        for n in 0..5 {
            registry.publish(team_id, event(team_id, n)).await;
        }

        for n in 0..5 {
            let received = rx.recv().await.unwrap();
            assert_eq!(received.payload["n"], n);
        }
    }

    #[tokio::test]
    async fn test_no_cross_channel_delivery() {
        let registry = ChannelRegistry::new();
        let team_a = Uuid::new_v4();
        let team_b = Uuid::new_v4();

        let mut rx_a = registry.subscribe(team_a).await;
        let mut rx_b = registry.subscribe(team_b).await;

        registry.publish(team_a, event(team_a, 1)).await;

        assert_eq!(rx_a.recv().await.unwrap().team_id, team_a);
        assert!(matches!(
            rx_b.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_a_noop() {
        let registry = ChannelRegistry::new();
        let delivered = registry.publish(Uuid::new_v4(), event(Uuid::new_v4(), 0)).await;
        assert_eq!(delivered, 0);
    }

    #[tokio::test]
    async fn test_late_subscriber_sees_nothing_from_before() {
        let registry = ChannelRegistry::new();
        let team_id = Uuid::new_v4();

        let _keepalive = registry.subscribe(team_id).await;
        registry.publish(team_id, event(team_id, 1)).await;

        let mut late = registry.subscribe(team_id).await;
        registry.publish(team_id, event(team_id, 2)).await;

        let received = late.recv().await.unwrap();
        assert_eq!(received.payload["n"], 2);
    }

    #[tokio::test]
    async fn test_dropped_receivers_release_the_channel() {
        let registry = ChannelRegistry::new();
        let team_id = Uuid::new_v4();

        let rx = registry.subscribe(team_id).await;
        assert_eq!(registry.subscriber_count(team_id).await, 1);
        assert_eq!(registry.channel_count().await, 1);

        drop(rx);
        registry.publish(team_id, event(team_id, 0)).await;
        assert_eq!(registry.channel_count().await, 0);
    }

    #[tokio::test]
    async fn test_fanout_reaches_all_subscribers() {
        let registry = ChannelRegistry::new();
        let team_id = Uuid::new_v4();

        let mut rx1 = registry.subscribe(team_id).await;
        let mut rx2 = registry.subscribe(team_id).await;

        let delivered = registry.publish(team_id, event(team_id, 7)).await;
        assert_eq!(delivered, 2);

        assert_eq!(rx1.recv().await.unwrap().payload["n"], 7);
        assert_eq!(rx2.recv().await.unwrap().payload["n"], 7);
    }
}
