//! Card aggregate events.

use chrono::{DateTime, Utc};
use kanban_core::activity::EntityType;
use kanban_core::event::EventContext;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::target::{EntityRef, EventScope, Targeted};

/// Emitted when a card is added to a list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CardCreatedEvent {
    #[serde(flatten)]
    pub context: EventContext,
    pub card_id: Uuid,
    pub list_id: Uuid,
    pub board_id: Uuid,
    pub card_title: String,
}

/// Emitted when a card's title or description changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CardUpdatedEvent {
    #[serde(flatten)]
    pub context: EventContext,
    pub card_id: Uuid,
    pub list_id: Uuid,
    pub board_id: Uuid,
    pub card_title: String,
}

/// Emitted when a card is deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CardDeletedEvent {
    #[serde(flatten)]
    pub context: EventContext,
    pub card_id: Uuid,
    pub list_id: Uuid,
    pub board_id: Uuid,
    pub card_title: String,
}

/// Emitted when a card moves between lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CardMovedEvent {
    #[serde(flatten)]
    pub context: EventContext,
    pub card_id: Uuid,
    pub board_id: Uuid,
    pub from_list_id: Uuid,
    pub to_list_id: Uuid,
    pub card_title: String,
}

/// Emitted when a user is assigned to a card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CardMemberAssignedEvent {
    #[serde(flatten)]
    pub context: EventContext,
    pub card_id: Uuid,
    pub list_id: Uuid,
    pub board_id: Uuid,
    pub card_title: String,
    pub assigned_user_id: Uuid,
}

/// Emitted when a user is unassigned from a card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CardMemberUnassignedEvent {
    #[serde(flatten)]
    pub context: EventContext,
    pub card_id: Uuid,
    pub list_id: Uuid,
    pub board_id: Uuid,
    pub card_title: String,
    pub unassigned_user_id: Uuid,
}

/// Emitted when a card's due date is set, changed or cleared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CardDueDateChangedEvent {
    #[serde(flatten)]
    pub context: EventContext,
    pub card_id: Uuid,
    pub list_id: Uuid,
    pub board_id: Uuid,
    pub card_title: String,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
}

macro_rules! card_targeted {
    ($($ty:ty),+) => {
        $(impl Targeted for $ty {
            fn target(&self) -> EntityRef {
                EntityRef::new(EntityType::Card, self.card_id)
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

card_targeted!(
    CardCreatedEvent,
    CardUpdatedEvent,
    CardDeletedEvent,
    CardDueDateChangedEvent
);

impl Targeted for CardMovedEvent {
    fn target(&self) -> EntityRef {
        EntityRef::new(EntityType::Card, self.card_id)
    }

    // The card now lives in the destination list.
    fn scope(&self) -> EventScope {
        EventScope::card(
            self.context.workspace_id,
            self.board_id,
            self.to_list_id,
            self.card_id,
        )
    }
}

impl Targeted for CardMemberAssignedEvent {
    fn target(&self) -> EntityRef {
        EntityRef::new(EntityType::Member, self.assigned_user_id)
    }

    fn scope(&self) -> EventScope {
        EventScope::card(
            self.context.workspace_id,
            self.board_id,
            self.list_id,
            self.card_id,
        )
    }
}

impl Targeted for CardMemberUnassignedEvent {
    fn target(&self) -> EntityRef {
        EntityRef::new(EntityType::Member, self.unassigned_user_id)
    }

    fn scope(&self) -> EventScope {
        EventScope::card(
            self.context.workspace_id,
            self.board_id,
            self.list_id,
            self.card_id,
        )
    }
}
