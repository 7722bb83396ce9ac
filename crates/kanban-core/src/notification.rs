//! Notification records, the persistence port and the creation service.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// What a notification is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NotificationType {
    WorkspaceUpdated,
    WorkspaceDeleted,
    BoardCreated,
    BoardUpdated,
    BoardDeleted,
    BoardArchived,
    BoardMemberAdded,
    BoardMemberRemoved,
    ListCreated,
    ListDeleted,
    CardCreated,
    CardMoved,
    CardAssigned,
    CardUnassigned,
    CardDueDateChanged,
    CommentAdded,
    MemberInvited,
    MemberJoined,
    MemberRemoved,
    MemberLeft,
    RoleChanged,
}

impl NotificationType {
    /// Returns the stored name of this notification type.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::WorkspaceUpdated => "WorkspaceUpdated",
            Self::WorkspaceDeleted => "WorkspaceDeleted",
            Self::BoardCreated => "BoardCreated",
            Self::BoardUpdated => "BoardUpdated",
            Self::BoardDeleted => "BoardDeleted",
            Self::BoardArchived => "BoardArchived",
            Self::BoardMemberAdded => "BoardMemberAdded",
            Self::BoardMemberRemoved => "BoardMemberRemoved",
            Self::ListCreated => "ListCreated",
            Self::ListDeleted => "ListDeleted",
            Self::CardCreated => "CardCreated",
            Self::CardMoved => "CardMoved",
            Self::CardAssigned => "CardAssigned",
            Self::CardUnassigned => "CardUnassigned",
            Self::CardDueDateChanged => "CardDueDateChanged",
            Self::CommentAdded => "CommentAdded",
            Self::MemberInvited => "MemberInvited",
            Self::MemberJoined => "MemberJoined",
            Self::MemberRemoved => "MemberRemoved",
            Self::MemberLeft => "MemberLeft",
            Self::RoleChanged => "RoleChanged",
        }
    }
}

/// A notification addressed to one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    /// Unique notification identifier.
    pub id: Uuid,
    /// Recipient.
    pub user_id: Uuid,
    /// Notification kind.
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    /// Short headline.
    pub title: String,
    /// Body text.
    pub message: String,
    /// Structured detail for the client.
    pub data: serde_json::Value,
    /// Workspace scope, if any.
    pub workspace_id: Option<Uuid>,
    /// Board scope, if any.
    pub board_id: Option<Uuid>,
    /// List scope, if any.
    pub list_id: Option<Uuid>,
    /// Card scope, if any.
    pub card_id: Option<Uuid>,
    /// The user whose action triggered this notification.
    pub related_user_id: Option<Uuid>,
    /// Whether the recipient has read it.
    pub is_read: bool,
    /// When it was read.
    pub read_at: Option<DateTime<Utc>>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// Input to [`NotificationService::create_notification`].
#[derive(Debug, Clone, PartialEq)]
pub struct NewNotification {
    pub user_id: Uuid,
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
    pub data: serde_json::Value,
    pub workspace_id: Option<Uuid>,
    pub board_id: Option<Uuid>,
    pub list_id: Option<Uuid>,
    pub card_id: Option<Uuid>,
    pub related_user_id: Option<Uuid>,
}

impl NewNotification {
    /// Starts a notification for `user_id` with no scope and empty data.
    #[must_use]
    pub fn new(
        user_id: Uuid,
        notification_type: NotificationType,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            user_id,
            notification_type,
            title: title.into(),
            message: message.into(),
            data: serde_json::Value::Object(serde_json::Map::new()),
            workspace_id: None,
            board_id: None,
            list_id: None,
            card_id: None,
            related_user_id: None,
        }
    }

    #[must_use]
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = data;
        self
    }

    #[must_use]
    pub fn in_workspace(mut self, workspace_id: Uuid) -> Self {
        self.workspace_id = Some(workspace_id);
        self
    }

    #[must_use]
    pub fn on_board(mut self, board_id: Option<Uuid>) -> Self {
        self.board_id = board_id;
        self
    }

    #[must_use]
    pub fn on_list(mut self, list_id: Option<Uuid>) -> Self {
        self.list_id = list_id;
        self
    }

    #[must_use]
    pub fn on_card(mut self, card_id: Option<Uuid>) -> Self {
        self.card_id = card_id;
        self
    }

    #[must_use]
    pub fn related_to(mut self, user_id: Uuid) -> Self {
        self.related_user_id = Some(user_id);
        self
    }

    /// Materializes the unread notification record.
    #[must_use]
    pub fn into_notification(self, id: Uuid, created_at: DateTime<Utc>) -> Notification {
        Notification {
            id,
            user_id: self.user_id,
            notification_type: self.notification_type,
            title: self.title,
            message: self.message,
            data: self.data,
            workspace_id: self.workspace_id,
            board_id: self.board_id,
            list_id: self.list_id,
            card_id: self.card_id,
            related_user_id: self.related_user_id,
            is_read: false,
            read_at: None,
            created_at,
        }
    }
}

/// Persistence port for notifications.
#[async_trait]
pub trait NotificationRepository: Send + Sync {
    /// Inserts a notification and returns the stored record.
    async fn add_notification(&self, notification: Notification)
    -> Result<Notification, DomainError>;
}

/// Creates a notification: persists it and pushes it to the recipient.
#[async_trait]
pub trait NotificationService: Send + Sync {
    /// Persists the notification and pushes it to the recipient's channel.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if persistence fails.
    async fn create_notification(
        &self,
        notification: NewNotification,
    ) -> Result<Notification, DomainError>;
}
