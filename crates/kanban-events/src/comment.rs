//! Card comment events.

use kanban_core::activity::EntityType;
use kanban_core::event::EventContext;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::target::{EntityRef, EventScope, Targeted};

/// Emitted when a comment is posted on a card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CommentCreatedEvent {
    #[serde(flatten)]
    pub context: EventContext,
    pub comment_id: Uuid,
    pub card_id: Uuid,
    pub list_id: Uuid,
    pub board_id: Uuid,
    pub card_title: String,
    pub content: String,
}

/// Emitted when a comment is edited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CommentUpdatedEvent {
    #[serde(flatten)]
    pub context: EventContext,
    pub comment_id: Uuid,
    pub card_id: Uuid,
    pub list_id: Uuid,
    pub board_id: Uuid,
    pub card_title: String,
    pub content: String,
}

/// Emitted when a comment is deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CommentDeletedEvent {
    #[serde(flatten)]
    pub context: EventContext,
    pub comment_id: Uuid,
    pub card_id: Uuid,
    pub list_id: Uuid,
    pub board_id: Uuid,
    pub card_title: String,
}

macro_rules! comment_targeted {
    ($($ty:ty),+) => {
        $(impl Targeted for $ty {
            fn target(&self) -> EntityRef {
                EntityRef::new(EntityType::Comment, self.comment_id)
            }

            fn scope(&self) -> EventScope {
                EventScope::card(
                    self.context.workspace_id,
                    self.board_id,
                    self.list_id,
                    self.card_id,
                )
            }
        })+
    };
}

comment_targeted!(CommentCreatedEvent, CommentUpdatedEvent, CommentDeletedEvent);
