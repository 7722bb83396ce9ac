//! Board aggregate events.

use kanban_core::activity::EntityType;
use kanban_core::event::EventContext;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::target::{EntityRef, EventScope, Targeted};

/// Emitted when a board is created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BoardCreatedEvent {
    #[serde(flatten)]
    pub context: EventContext,
    pub board_id: Uuid,
    pub board_title: String,
}

/// Emitted when a board's title or settings change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BoardUpdatedEvent {
    #[serde(flatten)]
    pub context: EventContext,
    pub board_id: Uuid,
    pub board_title: String,
}

/// Emitted when a board is deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BoardDeletedEvent {
    #[serde(flatten)]
    pub context: EventContext,
    pub board_id: Uuid,
    pub board_title: String,
}

/// Emitted when a board is archived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BoardArchivedEvent {
    #[serde(flatten)]
    pub context: EventContext,
    pub board_id: Uuid,
    pub board_title: String,
}

/// Emitted when a user is added to a board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BoardMemberAssignedEvent {
    #[serde(flatten)]
    pub context: EventContext,
    pub board_id: Uuid,
    pub board_title: String,
    pub assigned_user_id: Uuid,
}

/// Emitted when a user is removed from a board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BoardMemberUnassignedEvent {
    #[serde(flatten)]
    pub context: EventContext,
    pub board_id: Uuid,
    pub board_title: String,
    pub unassigned_user_id: Uuid,
}

macro_rules! board_targeted {
    ($($ty:ty),+) => {
        $(impl Targeted for $ty {
            fn target(&self) -> EntityRef {
                EntityRef::new(EntityType::Board, self.board_id)
            }

            fn scope(&self) -> EventScope {
                EventScope::board(self.context.workspace_id, self.board_id)
            }
        })+
    };
}

board_targeted!(
    BoardCreatedEvent,
    BoardUpdatedEvent,
    BoardDeletedEvent,
    BoardArchivedEvent
);

impl Targeted for BoardMemberAssignedEvent {
    fn target(&self) -> EntityRef {
        EntityRef::new(EntityType::Member, self.assigned_user_id)
    }

    fn scope(&self) -> EventScope {
        EventScope::board(self.context.workspace_id, self.board_id)
    }
}

impl Targeted for BoardMemberUnassignedEvent {
    fn target(&self) -> EntityRef {
        EntityRef::new(EntityType::Member, self.unassigned_user_id)
    }

    fn scope(&self) -> EventScope {
        EventScope::board(self.context.workspace_id, self.board_id)
    }
}
