//! Activity records and their persistence port.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// The kind of change an activity records. One value per event type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActivityType {
    WorkspaceCreated,
    WorkspaceUpdated,
    WorkspaceDeleted,
    BoardCreated,
    BoardUpdated,
    BoardDeleted,
    BoardArchived,
    BoardMemberAssigned,
    BoardMemberUnassigned,
    ListCreated,
    ListUpdated,
    ListDeleted,
    ListMoved,
    CardCreated,
    CardUpdated,
    CardDeleted,
    CardMoved,
    CardMemberAssigned,
    CardMemberUnassigned,
    CardDueDateChanged,
    MemberInvited,
    MemberJoined,
    MemberRemoved,
    MemberLeft,
    MemberRoleChanged,
    CommentCreated,
    CommentUpdated,
    CommentDeleted,
}

impl ActivityType {
    /// Returns the stored name of this activity type.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::WorkspaceCreated => "WorkspaceCreated",
            Self::WorkspaceUpdated => "WorkspaceUpdated",
            Self::WorkspaceDeleted => "WorkspaceDeleted",
            Self::BoardCreated => "BoardCreated",
            Self::BoardUpdated => "BoardUpdated",
            Self::BoardDeleted => "BoardDeleted",
            Self::BoardArchived => "BoardArchived",
            Self::BoardMemberAssigned => "BoardMemberAssigned",
            Self::BoardMemberUnassigned => "BoardMemberUnassigned",
            Self::ListCreated => "ListCreated",
            Self::ListUpdated => "ListUpdated",
            Self::ListDeleted => "ListDeleted",
            Self::ListMoved => "ListMoved",
            Self::CardCreated => "CardCreated",
            Self::CardUpdated => "CardUpdated",
            Self::CardDeleted => "CardDeleted",
            Self::CardMoved => "CardMoved",
            Self::CardMemberAssigned => "CardMemberAssigned",
            Self::CardMemberUnassigned => "CardMemberUnassigned",
            Self::CardDueDateChanged => "CardDueDateChanged",
            Self::MemberInvited => "MemberInvited",
            Self::MemberJoined => "MemberJoined",
            Self::MemberRemoved => "MemberRemoved",
            Self::MemberLeft => "MemberLeft",
            Self::MemberRoleChanged => "MemberRoleChanged",
            Self::CommentCreated => "CommentCreated",
            Self::CommentUpdated => "CommentUpdated",
            Self::CommentDeleted => "CommentDeleted",
        }
    }
}

/// The kind of entity an activity points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityType {
    Workspace,
    Board,
    List,
    Card,
    Comment,
    Member,
}

impl EntityType {
    /// Returns the stored name of this entity type.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Workspace => "Workspace",
            Self::Board => "Board",
            Self::List => "List",
            Self::Card => "Card",
            Self::Comment => "Comment",
            Self::Member => "Member",
        }
    }
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An immutable audit record derived from exactly one domain event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    /// Unique activity identifier.
    pub id: Uuid,
    /// Tenant scope.
    pub workspace_id: Uuid,
    /// Board scope, if any.
    pub board_id: Option<Uuid>,
    /// List scope, if any.
    pub list_id: Option<Uuid>,
    /// Card scope, if any.
    pub card_id: Option<Uuid>,
    /// The acting user.
    pub user_id: Option<Uuid>,
    /// What happened.
    #[serde(rename = "type")]
    pub activity_type: ActivityType,
    /// Human-readable summary.
    pub description: String,
    /// Polymorphic reference to the affected entity; nil when there is none.
    pub entity_id: Uuid,
    /// Kind of the affected entity.
    pub entity_type: EntityType,
    /// Projection-specific detail copied from the event.
    pub metadata: Option<serde_json::Value>,
    /// When the underlying change occurred.
    pub created_at: DateTime<Utc>,
}

/// Persistence port for activities. Append-only.
#[async_trait]
pub trait ActivityRepository: Send + Sync {
    /// Inserts an activity and returns the stored record.
    async fn add_activity(&self, activity: Activity) -> Result<Activity, DomainError>;
}
