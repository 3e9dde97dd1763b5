//! Push notifications to staff/admin sessions. Two named broadcast groups;
//! publishing is best-effort with no persistence of missed messages, so a
//! group without subscribers is not an error.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationGroup {
    Staff,
    Admin,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            message: message.into(),
            created_at: Utc::now(),
        }
    }
}

/// In-process pub/sub hub for the staff and admin groups.
#[derive(Clone)]
pub struct NotificationHub {
    staff: broadcast::Sender<Notification>,
    admin: broadcast::Sender<Notification>,
}

impl NotificationHub {
    pub fn new(capacity: usize) -> Self {
        let (staff, _) = broadcast::channel(capacity);
        let (admin, _) = broadcast::channel(capacity);
        Self { staff, admin }
    }

    fn channel(&self, group: NotificationGroup) -> &broadcast::Sender<Notification> {
        match group {
            NotificationGroup::Staff => &self.staff,
            NotificationGroup::Admin => &self.admin,
        }
    }

    /// Publishes to one group. Returns the number of live subscribers;
    /// zero subscribers is normal, not a failure.
    pub fn publish(&self, group: NotificationGroup, notification: Notification) -> usize {
        match self.channel(group).send(notification) {
            Ok(n) => n,
            Err(_) => {
                debug!(?group, "notification published with no subscribers");
                0
            }
        }
    }

    pub fn subscribe(&self, group: NotificationGroup) -> broadcast::Receiver<Notification> {
        self.channel(group).subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_reaches_subscribers_of_that_group_only() {
        let hub = NotificationHub::new(16);
        let mut staff_rx = hub.subscribe(NotificationGroup::Staff);
        let mut admin_rx = hub.subscribe(NotificationGroup::Admin);

        hub.publish(NotificationGroup::Staff, Notification::new("new message"));

        let got = staff_rx.recv().await.expect("staff subscriber receives");
        assert_eq!(got.message, "new message");
        assert!(admin_rx.try_recv().is_err());
    }

    #[test]
    fn publish_without_subscribers_is_a_no_op() {
        let hub = NotificationHub::new(4);
        assert_eq!(
            hub.publish(NotificationGroup::Admin, Notification::new("unheard")),
            0
        );
    }
}
