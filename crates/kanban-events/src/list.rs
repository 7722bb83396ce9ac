//! List aggregate events.

use kanban_core::activity::EntityType;
use kanban_core::event::EventContext;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::target::{EntityRef, EventScope, Targeted};

/// Emitted when a list is added to a board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ListCreatedEvent {
    #[serde(flatten)]
    pub context: EventContext,
    pub list_id: Uuid,
    pub board_id: Uuid,
    pub list_title: String,
}

/// Emitted when a list is renamed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ListUpdatedEvent {
    #[serde(flatten)]
    pub context: EventContext,
    pub list_id: Uuid,
    pub board_id: Uuid,
    pub list_title: String,
}

/// Emitted when a list is deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ListDeletedEvent {
    #[serde(flatten)]
    pub context: EventContext,
    pub list_id: Uuid,
    pub board_id: Uuid,
    pub list_title: String,
}

/// Emitted when a list changes position on its board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ListMovedEvent {
    #[serde(flatten)]
    pub context: EventContext,
    pub list_id: Uuid,
    pub board_id: Uuid,
    pub list_title: String,
    pub old_position: i32,
    pub new_position: i32,
}

macro_rules! list_targeted {
    ($($ty:ty),+) => {
        $(impl Targeted for $ty {
            fn target(&self) -> EntityRef {
                EntityRef::new(EntityType::List, self.list_id)
            }

            fn scope(&self) -> EventScope {
                EventScope::list(self.context.workspace_id, self.board_id, self.list_id)
            }
        })+
    };
}

list_targeted!(
    ListCreatedEvent,
    ListUpdatedEvent,
    ListDeletedEvent,
    ListMovedEvent
);
