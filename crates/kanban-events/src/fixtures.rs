//! Ready-made events for tests: one instance of every event type.

use chrono::{TimeZone, Utc};
use kanban_core::event::EventContext;
use kanban_core::membership::WorkspaceRole;
use uuid::Uuid;

use crate::board::{
    BoardArchivedEvent, BoardCreatedEvent, BoardDeletedEvent, BoardMemberAssignedEvent,
    BoardMemberUnassignedEvent, BoardUpdatedEvent,
};
use crate::card::{
    CardCreatedEvent, CardDeletedEvent, CardDueDateChangedEvent, CardMemberAssignedEvent,
    CardMemberUnassignedEvent, CardMovedEvent, CardUpdatedEvent,
};
use crate::catalog::{EventType, KanbanEvent};
use crate::comment::{CommentCreatedEvent, CommentDeletedEvent, CommentUpdatedEvent};
use crate::list::{ListCreatedEvent, ListDeletedEvent, ListMovedEvent, ListUpdatedEvent};
use crate::member::{
    MemberInvitedEvent, MemberJoinedEvent, MemberLeftEvent, MemberRemovedEvent,
    MemberRoleChangedEvent,
};
use crate::workspace::{WorkspaceCreatedEvent, WorkspaceDeletedEvent, WorkspaceUpdatedEvent};

/// A context with a fixed timestamp and fresh actor/workspace ids.
///
/// # Panics
///
/// Never in practice; the fixed timestamp is a valid date.
#[must_use]
pub fn sample_context() -> EventContext {
    EventContext {
        occurred_at: Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap(),
        user_id: Uuid::new_v4(),
        workspace_id: Uuid::new_v4(),
        description: "sample event".to_owned(),
        metadata: Some(serde_json::json!({ "source": "fixture" })),
    }
}

/// Builds one event of `event_type` carrying `context`; every id field is a
/// fresh random UUID.
#[must_use]
#[allow(clippy::too_many_lines)]
pub fn sample(event_type: EventType, context: EventContext) -> KanbanEvent {
    let id = Uuid::new_v4;
    match event_type {
        EventType::WorkspaceCreated => WorkspaceCreatedEvent {
            context,
            workspace_name: "Acme".to_owned(),
        }
        .into(),
        EventType::WorkspaceUpdated => WorkspaceUpdatedEvent {
            context,
            workspace_name: "Acme Inc".to_owned(),
        }
        .into(),
        EventType::WorkspaceDeleted => WorkspaceDeletedEvent {
            context,
            workspace_name: "Acme".to_owned(),
        }
        .into(),
        EventType::BoardCreated => BoardCreatedEvent {
            context,
            board_id: id(),
            board_title: "Sprint".to_owned(),
        }
        .into(),
        EventType::BoardUpdated => BoardUpdatedEvent {
            context,
            board_id: id(),
            board_title: "Sprint 2".to_owned(),
        }
        .into(),
        EventType::BoardDeleted => BoardDeletedEvent {
            context,
            board_id: id(),
            board_title: "Sprint".to_owned(),
        }
        .into(),
        EventType::BoardArchived => BoardArchivedEvent {
            context,
            board_id: id(),
            board_title: "Sprint".to_owned(),
        }
        .into(),
        EventType::BoardMemberAssigned => BoardMemberAssignedEvent {
            context,
            board_id: id(),
            board_title: "Sprint".to_owned(),
            assigned_user_id: id(),
        }
        .into(),
        EventType::BoardMemberUnassigned => BoardMemberUnassignedEvent {
            context,
            board_id: id(),
            board_title: "Sprint".to_owned(),
            unassigned_user_id: id(),
        }
        .into(),
        EventType::ListCreated => ListCreatedEvent {
            context,
            list_id: id(),
            board_id: id(),
            list_title: "Backlog".to_owned(),
        }
        .into(),
        EventType::ListUpdated => ListUpdatedEvent {
            context,
            list_id: id(),
            board_id: id(),
            list_title: "Ready".to_owned(),
        }
        .into(),
        EventType::ListDeleted => ListDeletedEvent {
            context,
            list_id: id(),
            board_id: id(),
            list_title: "Backlog".to_owned(),
        }
        .into(),
        EventType::ListMoved => ListMovedEvent {
            context,
            list_id: id(),
            board_id: id(),
            list_title: "Backlog".to_owned(),
            old_position: 0,
            new_position: 2,
        }
        .into(),
        EventType::CardCreated => CardCreatedEvent {
            context,
            card_id: id(),
            list_id: id(),
            board_id: id(),
            card_title: "Write docs".to_owned(),
        }
        .into(),
        EventType::CardUpdated => CardUpdatedEvent {
            context,
            card_id: id(),
            list_id: id(),
            board_id: id(),
            card_title: "Write more docs".to_owned(),
        }
        .into(),
        EventType::CardDeleted => CardDeletedEvent {
            context,
            card_id: id(),
            list_id: id(),
            board_id: id(),
            card_title: "Write docs".to_owned(),
        }
        .into(),
        EventType::CardMoved => CardMovedEvent {
            context,
            card_id: id(),
            board_id: id(),
            from_list_id: id(),
            to_list_id: id(),
            card_title: "Write docs".to_owned(),
        }
        .into(),
        EventType::CardMemberAssigned => CardMemberAssignedEvent {
            context,
            card_id: id(),
            list_id: id(),
            board_id: id(),
            card_title: "Write docs".to_owned(),
            assigned_user_id: id(),
        }
        .into(),
        EventType::CardMemberUnassigned => CardMemberUnassignedEvent {
            context,
            card_id: id(),
            list_id: id(),
            board_id: id(),
            card_title: "Write docs".to_owned(),
            unassigned_user_id: id(),
        }
        .into(),
        EventType::CardDueDateChanged => CardDueDateChangedEvent {
            context,
            card_id: id(),
            list_id: id(),
            board_id: id(),
            card_title: "Write docs".to_owned(),
            due_date: Some(Utc.with_ymd_and_hms(2026, 2, 1, 17, 0, 0).unwrap()),
        }
        .into(),
        EventType::MemberInvited => MemberInvitedEvent {
            context,
            invited_user_id: id(),
            invited_email: "new@example.com".to_owned(),
            workspace_name: "Acme".to_owned(),
            role: WorkspaceRole::Member,
        }
        .into(),
        EventType::MemberJoined => MemberJoinedEvent {
            joined_user_id: context.user_id,
            context,
            workspace_name: "Acme".to_owned(),
        }
        .into(),
        EventType::MemberRemoved => MemberRemovedEvent {
            context,
            removed_user_id: id(),
            workspace_name: "Acme".to_owned(),
        }
        .into(),
        EventType::MemberLeft => MemberLeftEvent {
            left_user_id: context.user_id,
            context,
            workspace_name: "Acme".to_owned(),
        }
        .into(),
        EventType::MemberRoleChanged => MemberRoleChangedEvent {
            context,
            target_user_id: id(),
            workspace_name: "Acme".to_owned(),
            old_role: WorkspaceRole::Member,
            new_role: WorkspaceRole::Admin,
        }
        .into(),
        EventType::CommentCreated => CommentCreatedEvent {
            context,
            comment_id: id(),
            card_id: id(),
            list_id: id(),
            board_id: id(),
            card_title: "Write docs".to_owned(),
            content: "Looks good".to_owned(),
        }
        .into(),
        EventType::CommentUpdated => CommentUpdatedEvent {
            context,
            comment_id: id(),
            card_id: id(),
            list_id: id(),
            board_id: id(),
            card_title: "Write docs".to_owned(),
            content: "Looks great".to_owned(),
        }
        .into(),
        EventType::CommentDeleted => CommentDeletedEvent {
            context,
            comment_id: id(),
            card_id: id(),
            list_id: id(),
            board_id: id(),
            card_title: "Write docs".to_owned(),
        }
        .into(),
    }
}
