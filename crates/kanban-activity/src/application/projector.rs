//! Activity projector.
//!
//! Every event becomes one `Activity`. The entity reference comes from the
//! event's declared target; scope, actor, description, metadata and time are
//! copied from the event as-is. There is no deduplication: the same event
//! delivered twice yields two activities.

use std::sync::Arc;

use async_trait::async_trait;
use kanban_core::activity::{Activity, ActivityRepository, ActivityType};
use kanban_core::error::DomainError;
use kanban_core::event::DomainEvent;
use kanban_events::{EventType, KanbanEvent};
use kanban_messaging::{DeliveryInfo, EventHandler};
use tracing::debug;
use uuid::Uuid;

/// The activity type recorded for an event type.
#[must_use]
pub fn activity_type_for(event_type: EventType) -> ActivityType {
    match event_type {
        EventType::WorkspaceCreated => ActivityType::WorkspaceCreated,
        EventType::WorkspaceUpdated => ActivityType::WorkspaceUpdated,
        EventType::WorkspaceDeleted => ActivityType::WorkspaceDeleted,
        EventType::BoardCreated => ActivityType::BoardCreated,
        EventType::BoardUpdated => ActivityType::BoardUpdated,
        EventType::BoardDeleted => ActivityType::BoardDeleted,
        EventType::BoardArchived => ActivityType::BoardArchived,
        EventType::BoardMemberAssigned => ActivityType::BoardMemberAssigned,
        EventType::BoardMemberUnassigned => ActivityType::BoardMemberUnassigned,
        EventType::ListCreated => ActivityType::ListCreated,
        EventType::ListUpdated => ActivityType::ListUpdated,
        EventType::ListDeleted => ActivityType::ListDeleted,
        EventType::ListMoved => ActivityType::ListMoved,
        EventType::CardCreated => ActivityType::CardCreated,
        EventType::CardUpdated => ActivityType::CardUpdated,
        EventType::CardDeleted => ActivityType::CardDeleted,
        EventType::CardMoved => ActivityType::CardMoved,
        EventType::CardMemberAssigned => ActivityType::CardMemberAssigned,
        EventType::CardMemberUnassigned => ActivityType::CardMemberUnassigned,
        EventType::CardDueDateChanged => ActivityType::CardDueDateChanged,
        EventType::MemberInvited => ActivityType::MemberInvited,
        EventType::MemberJoined => ActivityType::MemberJoined,
        EventType::MemberRemoved => ActivityType::MemberRemoved,
        EventType::MemberLeft => ActivityType::MemberLeft,
        EventType::MemberRoleChanged => ActivityType::MemberRoleChanged,
        EventType::CommentCreated => ActivityType::CommentCreated,
        EventType::CommentUpdated => ActivityType::CommentUpdated,
        EventType::CommentDeleted => ActivityType::CommentDeleted,
    }
}

/// Builds the activity for `event` under the given id.
#[must_use]
pub fn to_activity(event: &KanbanEvent, id: Uuid) -> Activity {
    let context = event.context();
    let target = event.target();
    let scope = event.scope();

    Activity {
        id,
        workspace_id: context.workspace_id,
        board_id: scope.board_id,
        list_id: scope.list_id,
        card_id: scope.card_id,
        user_id: Some(context.user_id),
        activity_type: activity_type_for(event.kind()),
        description: context.description.clone(),
        entity_id: target.entity_id.unwrap_or_else(Uuid::nil),
        entity_type: target.entity_type,
        metadata: context.metadata.clone(),
        created_at: context.occurred_at,
    }
}

/// Consumer handler that appends one activity per event.
pub struct ActivityProjector {
    repository: Arc<dyn ActivityRepository>,
}

impl ActivityProjector {
    #[must_use]
    pub fn new(repository: Arc<dyn ActivityRepository>) -> Self {
        Self { repository }
    }

    /// Projects and stores one event.
    ///
    /// # Errors
    ///
    /// Returns the repository's error if the activity cannot be stored.
    pub async fn project(&self, event: &KanbanEvent) -> Result<Activity, DomainError> {
        let activity = to_activity(event, Uuid::now_v7());
        let stored = self.repository.add_activity(activity).await?;
        debug!(
            activity_id = %stored.id,
            activity_type = stored.activity_type.as_str(),
            entity_type = %stored.entity_type,
            "activity recorded"
        );
        Ok(stored)
    }
}

#[async_trait]
impl EventHandler for ActivityProjector {
    fn handler_name(&self) -> &str {
        "activity-projector"
    }

    async fn handle(
        &self,
        event: &KanbanEvent,
        _delivery: &DeliveryInfo,
    ) -> Result<(), DomainError> {
        self.project(event).await.map(|_| ())
    }
}
