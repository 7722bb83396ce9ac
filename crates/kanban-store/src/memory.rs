//! In-process implementations of the projection ports.
//!
//! Used when the worker runs without `DATABASE_URL`. Nothing survives a
//! restart.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use uuid::Uuid;

use kanban_core::activity::{Activity, ActivityRepository};
use kanban_core::error::DomainError;
use kanban_core::membership::{MembershipDirectory, WorkspaceMember, WorkspaceRole};
use kanban_core::notification::{Notification, NotificationRepository};

/// Append-only activity log held in memory.
#[derive(Debug, Default)]
pub struct InMemoryActivityStore {
    activities: RwLock<Vec<Activity>>,
}

impl InMemoryActivityStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Activities recorded for a workspace, oldest first.
    #[must_use]
    pub fn for_workspace(&self, workspace_id: Uuid) -> Vec<Activity> {
        self.activities
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|a| a.workspace_id == workspace_id)
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.activities
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ActivityRepository for InMemoryActivityStore {
    async fn add_activity(&self, activity: Activity) -> Result<Activity, DomainError> {
        self.activities
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(activity.clone());
        Ok(activity)
    }
}

/// Notifications held in memory, keyed by recipient.
#[derive(Debug, Default)]
pub struct InMemoryNotificationStore {
    by_user: RwLock<HashMap<Uuid, Vec<Notification>>>,
}

impl InMemoryNotificationStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Notifications addressed to `user_id`, oldest first.
    #[must_use]
    pub fn for_user(&self, user_id: Uuid) -> Vec<Notification> {
        self.by_user
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&user_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Total notifications across all users.
    #[must_use]
    pub fn total(&self) -> usize {
        self.by_user
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(Vec::len)
            .sum()
    }
}

#[async_trait]
impl NotificationRepository for InMemoryNotificationStore {
    async fn add_notification(
        &self,
        notification: Notification,
    ) -> Result<Notification, DomainError> {
        self.by_user
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(notification.user_id)
            .or_default()
            .push(notification.clone());
        Ok(notification)
    }
}

/// Mutable roster held in memory.
#[derive(Debug, Default)]
pub struct InMemoryMembershipDirectory {
    members: RwLock<HashMap<Uuid, Vec<WorkspaceMember>>>,
}

impl InMemoryMembershipDirectory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or updates a member.
    pub fn upsert(&self, workspace_id: Uuid, user_id: Uuid, role: WorkspaceRole) {
        let mut members = self
            .members
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let roster = members.entry(workspace_id).or_default();
        match roster.iter_mut().find(|m| m.user_id == user_id) {
            Some(existing) => existing.role = role,
            None => roster.push(WorkspaceMember {
                user_id,
                workspace_id,
                role,
            }),
        }
    }

    /// Removes a member; returns whether they were present.
    pub fn remove(&self, workspace_id: Uuid, user_id: Uuid) -> bool {
        let mut members = self
            .members
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let Some(roster) = members.get_mut(&workspace_id) else {
            return false;
        };
        let before = roster.len();
        roster.retain(|m| m.user_id != user_id);
        roster.len() != before
    }
}

#[async_trait]
impl MembershipDirectory for InMemoryMembershipDirectory {
    async fn get_workspace_members(
        &self,
        workspace_id: Uuid,
    ) -> Result<Vec<WorkspaceMember>, DomainError> {
        Ok(self
            .members
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&workspace_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use kanban_core::notification::{NewNotification, NotificationType};

    use super::*;

    #[tokio::test]
    async fn test_upsert_updates_role_without_duplicating() {
        // Arrange
        let directory = InMemoryMembershipDirectory::new();
        let workspace_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();

        // Act
        directory.upsert(workspace_id, user_id, WorkspaceRole::Member);
        directory.upsert(workspace_id, user_id, WorkspaceRole::Admin);

        // Assert
        let members = directory.get_workspace_members(workspace_id).await.unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].role, WorkspaceRole::Admin);
    }

    #[tokio::test]
    async fn test_removed_member_is_no_longer_listed() {
        let directory = InMemoryMembershipDirectory::new();
        let workspace_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();
        directory.upsert(workspace_id, user_id, WorkspaceRole::Member);

        assert!(directory.remove(workspace_id, user_id));
        assert!(!directory.remove(workspace_id, user_id));
        assert!(directory.get_workspace_members(workspace_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_notifications_are_grouped_by_recipient() {
        let store = InMemoryNotificationStore::new();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        for user_id in [alice, alice, bob] {
            let notification = NewNotification::new(user_id, NotificationType::CardCreated, "t", "m")
                .into_notification(Uuid::new_v4(), Utc::now());
            store.add_notification(notification).await.unwrap();
        }

        assert_eq!(store.for_user(alice).len(), 2);
        assert_eq!(store.for_user(bob).len(), 1);
        assert_eq!(store.total(), 3);
    }
}
