//! In-process notification fan-out.
//!
//! A single broadcast channel carries notifications for every account;
//! subscribers filter by account. Slow subscribers lose messages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;
use utoipa::ToSchema;
use uuid::Uuid;

const DEFAULT_CAPACITY: usize = 256;

/// Event pushed to connected clients of an account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Notification {
    pub account_id: Uuid,
    /// Dotted event kind, e.g. `integration.connected`
    pub kind: String,
    #[schema(value_type = Object)]
    pub payload: Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NotificationHub {
    sender: broadcast::Sender<Notification>,
}

impl Default for NotificationHub {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl NotificationHub {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish to current subscribers; returns how many received it
    pub fn publish(&self, account_id: Uuid, kind: &str, payload: Value) -> usize {
        let notification = Notification {
            account_id,
            kind: kind.to_string(),
            payload,
            created_at: Utc::now(),
        };

        match self.sender.send(notification) {
            Ok(receivers) => receivers,
            // No subscribers
            Err(_) => 0,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn subscribers_receive_published_notifications() {
        let hub = NotificationHub::new(8);
        let mut rx = hub.subscribe();
        let account_id = Uuid::new_v4();

        assert_eq!(hub.publish(account_id, "team.invite_created", json!({"email": "a@b.co"})), 1);

        let received = rx.recv().await.unwrap();
        assert_eq!(received.account_id, account_id);
        assert_eq!(received.kind, "team.invite_created");
    }

    #[test]
    fn publish_without_subscribers_is_a_noop() {
        let hub = NotificationHub::default();
        assert_eq!(hub.publish(Uuid::new_v4(), "billing.payment_failed", json!({})), 0);
    }

    #[tokio::test]
    async fn lagging_subscriber_drops_messages() {
        let hub = NotificationHub::new(2);
        let mut rx = hub.subscribe();
        let account_id = Uuid::new_v4();

        for i in 0..5 {
            hub.publish(account_id, "tick", json!({ "i": i }));
        }

        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Lagged(_))
        ));
        // Oldest retained message follows the lag report
        assert_eq!(rx.recv().await.unwrap().payload, json!({ "i": 3 }));
    }
}
