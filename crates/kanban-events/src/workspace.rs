//! Workspace aggregate events.

use kanban_core::activity::EntityType;
use kanban_core::event::EventContext;
use serde::{Deserialize, Serialize};

use crate::target::{EntityRef, EventScope, Targeted};

/// Emitted when a workspace is created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WorkspaceCreatedEvent {
    #[serde(flatten)]
    pub context: EventContext,
    pub workspace_name: String,
}

/// Emitted when a workspace's name or settings change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WorkspaceUpdatedEvent {
    #[serde(flatten)]
    pub context: EventContext,
    pub workspace_name: String,
}

/// Emitted when a workspace is deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WorkspaceDeletedEvent {
    #[serde(flatten)]
    pub context: EventContext,
    pub workspace_name: String,
}

macro_rules! workspace_targeted {
    ($($ty:ty),+) => {
        $(impl Targeted for $ty {
            fn target(&self) -> EntityRef {
                EntityRef::new(EntityType::Workspace, self.context.workspace_id)
            }

            fn scope(&self) -> EventScope {
                EventScope::workspace(self.context.workspace_id)
            }
        })+
    };
}

workspace_targeted!(
    WorkspaceCreatedEvent,
    WorkspaceUpdatedEvent,
    WorkspaceDeletedEvent
);
