use serde::Serialize;
use std::collections::VecDeque;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationLevel {
    Success,
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub id: Uuid,
    pub level: NotificationLevel,
    pub message: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Bounded operator log, newest first. The oldest entry is dropped once full.
#[derive(Debug)]
pub struct Notifications {
    capacity: usize,
    entries: RwLock<VecDeque<Notification>>,
}

impl Notifications {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: RwLock::new(VecDeque::with_capacity(capacity)),
        }
    }

    pub async fn push(&self, level: NotificationLevel, message: impl Into<String>) -> Notification {
        let notification = Notification {
            id: Uuid::now_v7(),
            level,
            message: message.into(),
            created_at: OffsetDateTime::now_utc(),
        };

        let mut entries = self.entries.write().await;
        entries.push_front(notification.clone());
        entries.truncate(self.capacity);

        notification
    }

    pub async fn list(&self) -> Vec<Notification> {
        self.entries.read().await.iter().cloned().collect()
    }

    /// Returns false when nothing with that id is held.
    pub async fn dismiss(&self, id: Uuid) -> bool {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|notification| notification.id != id);
        entries.len() != before
    }
}
