//! `NotificationRepository` doubles.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use kanban_core::error::DomainError;
use kanban_core::notification::{Notification, NotificationRepository};

/// Keeps every stored notification.
#[derive(Debug, Default)]
pub struct RecordingNotificationRepository {
    stored: Mutex<Vec<Notification>>,
}

impl RecordingNotificationRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of all stored notifications, in call order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn notifications(&self) -> Vec<Notification> {
        self.stored.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationRepository for RecordingNotificationRepository {
    async fn add_notification(
        &self,
        notification: Notification,
    ) -> Result<Notification, DomainError> {
        self.stored.lock().unwrap().push(notification.clone());
        Ok(notification)
    }
}

#[derive(Debug)]
pub struct FailingNotificationRepository;

#[async_trait]
impl NotificationRepository for FailingNotificationRepository {
    async fn add_notification(
        &self,
        _notification: Notification,
    ) -> Result<Notification, DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }
}

/// Fails exactly one call, the `failing_call`-th (1-based), and records the
/// rest like [`RecordingNotificationRepository`].
#[derive(Debug)]
pub struct FlakyNotificationRepository {
    failing_call: usize,
    calls: AtomicUsize,
    inner: RecordingNotificationRepository,
}

impl FlakyNotificationRepository {
    #[must_use]
    pub fn failing_on(failing_call: usize) -> Self {
        Self {
            failing_call,
            calls: AtomicUsize::new(0),
            inner: RecordingNotificationRepository::new(),
        }
    }

    /// Total `add_notification` calls, the failed one included.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Notifications that were stored successfully.
    pub fn notifications(&self) -> Vec<Notification> {
        self.inner.notifications()
    }
}

#[async_trait]
impl NotificationRepository for FlakyNotificationRepository {
    async fn add_notification(
        &self,
        notification: Notification,
    ) -> Result<Notification, DomainError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call == self.failing_call {
            return Err(DomainError::Infrastructure(format!(
                "insert {call} timed out"
            )));
        }
        self.inner.add_notification(notification).await
    }
}
