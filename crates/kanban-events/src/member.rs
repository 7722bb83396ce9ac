//! Workspace membership events.

use kanban_core::activity::EntityType;
use kanban_core::event::EventContext;
use kanban_core::membership::WorkspaceRole;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::target::{EntityRef, EventScope, Targeted};

/// Emitted when a user is invited to a workspace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MemberInvitedEvent {
    #[serde(flatten)]
    pub context: EventContext,
    pub invited_user_id: Uuid,
    pub invited_email: String,
    pub workspace_name: String,
    pub role: WorkspaceRole,
}

/// Emitted when an invited user accepts and joins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MemberJoinedEvent {
    #[serde(flatten)]
    pub context: EventContext,
    pub joined_user_id: Uuid,
    pub workspace_name: String,
}

/// Emitted when an admin removes a member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MemberRemovedEvent {
    #[serde(flatten)]
    pub context: EventContext,
    pub removed_user_id: Uuid,
    pub workspace_name: String,
}

/// Emitted when a member leaves of their own accord.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MemberLeftEvent {
    #[serde(flatten)]
    pub context: EventContext,
    pub left_user_id: Uuid,
    pub workspace_name: String,
}

/// Emitted when a member's role changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MemberRoleChangedEvent {
    #[serde(flatten)]
    pub context: EventContext,
    pub target_user_id: Uuid,
    pub workspace_name: String,
    pub old_role: WorkspaceRole,
    pub new_role: WorkspaceRole,
}

macro_rules! member_targeted {
    ($($ty:ty => $field:ident),+) => {
        $(impl Targeted for $ty {
            fn target(&self) -> EntityRef {
                EntityRef::new(EntityType::Member, self.$field)
            }

            fn scope(&self) -> EventScope {
                EventScope::workspace(self.context.workspace_id)
            }
        })+
    };
}

member_targeted!(
    MemberInvitedEvent => invited_user_id,
    MemberJoinedEvent => joined_user_id,
    MemberRemovedEvent => removed_user_id,
    MemberLeftEvent => left_user_id,
    MemberRoleChangedEvent => target_user_id
);
