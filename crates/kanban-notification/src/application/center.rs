//! Notification creation: persist, then push to the recipient.

use std::sync::Arc;

use async_trait::async_trait;
use kanban_core::clock::Clock;
use kanban_core::error::DomainError;
use kanban_core::notification::{
    NewNotification, Notification, NotificationRepository, NotificationService,
};
use kanban_core::realtime::{RealtimeGroup, RealtimeMessage, RealtimeSink};
use tracing::{debug, warn};
use uuid::Uuid;

/// Real-time method clients listen on for new notifications.
pub const RECEIVE_NOTIFICATION: &str = "ReceiveNotification";

/// Stores notifications and pushes them to `user_{id}`.
///
/// A failed push is logged; the stored notification still counts as created.
pub struct NotificationCenter {
    repository: Arc<dyn NotificationRepository>,
    realtime: Arc<dyn RealtimeSink>,
    clock: Arc<dyn Clock>,
}

impl NotificationCenter {
    #[must_use]
    pub fn new(
        repository: Arc<dyn NotificationRepository>,
        realtime: Arc<dyn RealtimeSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repository,
            realtime,
            clock,
        }
    }

    async fn push(&self, notification: &Notification) {
        let payload = match serde_json::to_value(notification) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(notification_id = %notification.id, error = %err, "notification not pushable");
                return;
            }
        };
        let group = RealtimeGroup::User(notification.user_id);
        let message = RealtimeMessage {
            method: RECEIVE_NOTIFICATION,
            payload,
        };
        if let Err(err) = self.realtime.push(group, message).await {
            warn!(
                channel = %group.channel_name(),
                notification_id = %notification.id,
                error = %err,
                "real-time push failed"
            );
        }
    }
}

#[async_trait]
impl NotificationService for NotificationCenter {
    async fn create_notification(
        &self,
        notification: NewNotification,
    ) -> Result<Notification, DomainError> {
        let notification = notification.into_notification(Uuid::now_v7(), self.clock.now());
        let stored = self.repository.add_notification(notification).await?;
        debug!(
            notification_id = %stored.id,
            user_id = %stored.user_id,
            notification_type = stored.notification_type.as_str(),
            "notification stored"
        );
        self.push(&stored).await;
        Ok(stored)
    }
}
