//! Explicit entity and scope descriptors for events.

use kanban_core::activity::EntityType;
use uuid::Uuid;

/// The entity an event is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityRef {
    /// Kind of entity.
    pub entity_type: EntityType,
    /// Its identifier, when the event names one.
    pub entity_id: Option<Uuid>,
}

impl EntityRef {
    #[must_use]
    pub fn new(entity_type: EntityType, entity_id: Uuid) -> Self {
        Self {
            entity_type,
            entity_id: Some(entity_id),
        }
    }
}

/// Where in the workspace hierarchy an event happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EventScope {
    pub workspace_id: Uuid,
    pub board_id: Option<Uuid>,
    pub list_id: Option<Uuid>,
    pub card_id: Option<Uuid>,
}

impl EventScope {
    #[must_use]
    pub fn workspace(workspace_id: Uuid) -> Self {
        Self {
            workspace_id,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn board(workspace_id: Uuid, board_id: Uuid) -> Self {
        Self {
            workspace_id,
            board_id: Some(board_id),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn list(workspace_id: Uuid, board_id: Uuid, list_id: Uuid) -> Self {
        Self {
            workspace_id,
            board_id: Some(board_id),
            list_id: Some(list_id),
            card_id: None,
        }
    }

    #[must_use]
    pub fn card(workspace_id: Uuid, board_id: Uuid, list_id: Uuid, card_id: Uuid) -> Self {
        Self {
            workspace_id,
            board_id: Some(board_id),
            list_id: Some(list_id),
            card_id: Some(card_id),
        }
    }
}

/// Implemented by every concrete event: declares what it targets and where.
pub trait Targeted {
    /// The entity this event is about.
    fn target(&self) -> EntityRef;

    /// The workspace/board/list/card scope of this event.
    fn scope(&self) -> EventScope;
}
