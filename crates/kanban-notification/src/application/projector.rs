//! Notification projector.
//!
//! Each event type maps to a plan: which notification type to create, who
//! gets it directly, who gets the workspace broadcast and which users the
//! broadcast skips. Events with nothing to tell anyone map to no plan.
//!
//! After the notifications are created the event is also pushed to the
//! workspace or board group so open views can refresh.
//!
//! A retried delivery resumes where the failed attempt stopped: recipients
//! it already notified are not notified again. Two separate publishes of the
//! same event still notify everyone twice.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use kanban_core::error::DomainError;
use kanban_core::event::{DomainEvent, EventContext};
use kanban_core::membership::MembershipDirectory;
use kanban_core::notification::{NewNotification, NotificationService, NotificationType};
use kanban_core::realtime::{RealtimeGroup, RealtimeMessage, RealtimeSink};
use kanban_events::target::EventScope;
use kanban_events::KanbanEvent;
use kanban_messaging::{DeliveryInfo, EventHandler};
use serde_json::{Value, json};
use tracing::{debug, warn};
use uuid::Uuid;

/// Real-time method used for workspace and board group pushes.
pub const RECEIVE_EVENT: &str = "ReceiveEvent";

const EXCERPT_CHARS: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Notice {
    title: String,
    message: String,
}

fn notice(title: &str, message: String) -> Notice {
    Notice {
        title: title.to_owned(),
        message,
    }
}

/// What to create for one event.
#[derive(Debug, Clone, PartialEq)]
struct Plan {
    notification_type: NotificationType,
    direct: Option<(Uuid, Notice)>,
    broadcast: Option<(Notice, Vec<Uuid>)>,
    data: Value,
    group: RealtimeGroup,
}

impl Plan {
    /// Everyone in the workspace except `exclude`.
    fn broadcast(
        notification_type: NotificationType,
        notice: Notice,
        exclude: Vec<Uuid>,
        data: Value,
        group: RealtimeGroup,
    ) -> Self {
        Self {
            notification_type,
            direct: None,
            broadcast: Some((notice, exclude)),
            data,
            group,
        }
    }

    /// One user only.
    fn direct(
        notification_type: NotificationType,
        user_id: Uuid,
        notice: Notice,
        data: Value,
        group: RealtimeGroup,
    ) -> Self {
        Self {
            notification_type,
            direct: Some((user_id, notice)),
            broadcast: None,
            data,
            group,
        }
    }

    /// Adds a broadcast to a direct plan. The direct recipient and the actor
    /// are always skipped.
    fn and_others(mut self, actor: Uuid, notice: Notice) -> Self {
        let mut exclude = vec![actor];
        if let Some((target, _)) = &self.direct {
            exclude.push(*target);
        }
        self.broadcast = Some((notice, exclude));
        self
    }
}

fn excerpt(content: &str) -> String {
    if content.chars().count() <= EXCERPT_CHARS {
        return content.to_owned();
    }
    let cut: String = content.chars().take(EXCERPT_CHARS).collect();
    format!("{cut}...")
}

#[allow(clippy::too_many_lines)]
fn plan(event: &KanbanEvent) -> Option<Plan> {
    let context = event.context();
    let actor = context.user_id;
    let workspace = RealtimeGroup::Workspace(context.workspace_id);

    let plan = match event {
        KanbanEvent::WorkspaceCreated(_)
        | KanbanEvent::ListUpdated(_)
        | KanbanEvent::ListMoved(_)
        | KanbanEvent::CardUpdated(_)
        | KanbanEvent::CardDeleted(_)
        | KanbanEvent::CommentUpdated(_)
        | KanbanEvent::CommentDeleted(_) => return None,

        KanbanEvent::WorkspaceUpdated(e) => Plan::broadcast(
            NotificationType::WorkspaceUpdated,
            notice("Workspace updated", format!("\"{}\" was updated", e.workspace_name)),
            vec![actor],
            json!({ "workspaceName": e.workspace_name }),
            workspace,
        ),
        KanbanEvent::WorkspaceDeleted(e) => Plan::broadcast(
            NotificationType::WorkspaceDeleted,
            notice("Workspace deleted", format!("\"{}\" was deleted", e.workspace_name)),
            vec![actor],
            json!({ "workspaceName": e.workspace_name }),
            workspace,
        ),

        KanbanEvent::BoardCreated(e) => Plan::broadcast(
            NotificationType::BoardCreated,
            notice("New board", format!("Board \"{}\" was created", e.board_title)),
            vec![actor],
            json!({ "boardId": e.board_id, "boardTitle": e.board_title }),
            RealtimeGroup::Board(e.board_id),
        ),
        KanbanEvent::BoardUpdated(e) => Plan::broadcast(
            NotificationType::BoardUpdated,
            notice("Board updated", format!("Board \"{}\" was updated", e.board_title)),
            vec![actor],
            json!({ "boardId": e.board_id, "boardTitle": e.board_title }),
            RealtimeGroup::Board(e.board_id),
        ),
        KanbanEvent::BoardDeleted(e) => Plan::broadcast(
            NotificationType::BoardDeleted,
            notice("Board deleted", format!("Board \"{}\" was deleted", e.board_title)),
            vec![actor],
            json!({ "boardId": e.board_id, "boardTitle": e.board_title }),
            RealtimeGroup::Board(e.board_id),
        ),
        KanbanEvent::BoardArchived(e) => Plan::broadcast(
            NotificationType::BoardArchived,
            notice("Board archived", format!("Board \"{}\" was archived", e.board_title)),
            vec![actor],
            json!({ "boardId": e.board_id, "boardTitle": e.board_title }),
            RealtimeGroup::Board(e.board_id),
        ),
        KanbanEvent::BoardMemberAssigned(e) => Plan::direct(
            NotificationType::BoardMemberAdded,
            e.assigned_user_id,
            notice("Added to board", format!("You were added to board \"{}\"", e.board_title)),
            json!({ "boardId": e.board_id, "boardTitle": e.board_title }),
            RealtimeGroup::Board(e.board_id),
        ),
        KanbanEvent::BoardMemberUnassigned(e) => Plan::direct(
            NotificationType::BoardMemberRemoved,
            e.unassigned_user_id,
            notice(
                "Removed from board",
                format!("You were removed from board \"{}\"", e.board_title),
            ),
            json!({ "boardId": e.board_id, "boardTitle": e.board_title }),
            RealtimeGroup::Board(e.board_id),
        ),

        KanbanEvent::ListCreated(e) => Plan::broadcast(
            NotificationType::ListCreated,
            notice("New list", format!("List \"{}\" was created", e.list_title)),
            vec![actor],
            json!({ "boardId": e.board_id, "listId": e.list_id, "listTitle": e.list_title }),
            RealtimeGroup::Board(e.board_id),
        ),
        KanbanEvent::ListDeleted(e) => Plan::broadcast(
            NotificationType::ListDeleted,
            notice("List deleted", format!("List \"{}\" was deleted", e.list_title)),
            vec![actor],
            json!({ "boardId": e.board_id, "listId": e.list_id, "listTitle": e.list_title }),
            RealtimeGroup::Board(e.board_id),
        ),

        KanbanEvent::CardCreated(e) => Plan::broadcast(
            NotificationType::CardCreated,
            notice("New card", format!("Card \"{}\" was created", e.card_title)),
            vec![actor],
            json!({ "boardId": e.board_id, "listId": e.list_id, "cardId": e.card_id, "cardTitle": e.card_title }),
            RealtimeGroup::Board(e.board_id),
        ),
        KanbanEvent::CardMoved(e) => Plan::broadcast(
            NotificationType::CardMoved,
            notice("Card moved", format!("Card \"{}\" was moved", e.card_title)),
            vec![actor],
            json!({
                "boardId": e.board_id,
                "cardId": e.card_id,
                "cardTitle": e.card_title,
                "fromListId": e.from_list_id,
                "toListId": e.to_list_id,
            }),
            RealtimeGroup::Board(e.board_id),
        ),
        KanbanEvent::CardMemberAssigned(e) => {
            if e.assigned_user_id == actor {
                return None;
            }
            Plan::direct(
                NotificationType::CardAssigned,
                e.assigned_user_id,
                notice("Assigned to card", format!("You were assigned to \"{}\"", e.card_title)),
                json!({ "boardId": e.board_id, "cardId": e.card_id, "cardTitle": e.card_title }),
                RealtimeGroup::Board(e.board_id),
            )
        }
        KanbanEvent::CardMemberUnassigned(e) => {
            if e.unassigned_user_id == actor {
                return None;
            }
            Plan::direct(
                NotificationType::CardUnassigned,
                e.unassigned_user_id,
                notice(
                    "Unassigned from card",
                    format!("You were unassigned from \"{}\"", e.card_title),
                ),
                json!({ "boardId": e.board_id, "cardId": e.card_id, "cardTitle": e.card_title }),
                RealtimeGroup::Board(e.board_id),
            )
        }
        KanbanEvent::CardDueDateChanged(e) => {
            let message = match e.due_date {
                Some(due) => format!(
                    "\"{}\" is now due {}",
                    e.card_title,
                    due.format("%Y-%m-%d %H:%M UTC")
                ),
                None => format!("The due date of \"{}\" was removed", e.card_title),
            };
            Plan::broadcast(
                NotificationType::CardDueDateChanged,
                notice("Due date changed", message),
                vec![actor],
                json!({
                    "boardId": e.board_id,
                    "cardId": e.card_id,
                    "cardTitle": e.card_title,
                    "dueDate": e.due_date,
                }),
                RealtimeGroup::Board(e.board_id),
            )
        }

        KanbanEvent::CommentCreated(e) => Plan::broadcast(
            NotificationType::CommentAdded,
            notice(
                "New comment",
                format!("New comment on \"{}\": {}", e.card_title, excerpt(&e.content)),
            ),
            vec![actor],
            json!({
                "boardId": e.board_id,
                "cardId": e.card_id,
                "commentId": e.comment_id,
                "cardTitle": e.card_title,
            }),
            RealtimeGroup::Board(e.board_id),
        ),

        KanbanEvent::MemberInvited(e) => Plan::direct(
            NotificationType::MemberInvited,
            e.invited_user_id,
            notice(
                "Workspace invitation",
                format!("You were invited to join \"{}\" as {}", e.workspace_name, e.role),
            ),
            json!({ "workspaceName": e.workspace_name, "role": e.role, "invitedEmail": e.invited_email }),
            workspace,
        )
        .and_others(
            actor,
            notice(
                "Member invited",
                format!("{} was invited to \"{}\"", e.invited_email, e.workspace_name),
            ),
        ),
        KanbanEvent::MemberJoined(e) => Plan::broadcast(
            NotificationType::MemberJoined,
            notice("New member", format!("A new member joined \"{}\"", e.workspace_name)),
            vec![e.joined_user_id],
            json!({ "workspaceName": e.workspace_name, "userId": e.joined_user_id }),
            workspace,
        ),
        KanbanEvent::MemberRemoved(e) => Plan::direct(
            NotificationType::MemberRemoved,
            e.removed_user_id,
            notice(
                "Removed from workspace",
                format!("You were removed from \"{}\"", e.workspace_name),
            ),
            json!({ "workspaceName": e.workspace_name, "userId": e.removed_user_id }),
            workspace,
        )
        .and_others(
            actor,
            notice(
                "Member removed",
                format!("A member was removed from \"{}\"", e.workspace_name),
            ),
        ),
        KanbanEvent::MemberLeft(e) => Plan::broadcast(
            NotificationType::MemberLeft,
            notice("Member left", format!("A member left \"{}\"", e.workspace_name)),
            vec![e.left_user_id],
            json!({ "workspaceName": e.workspace_name, "userId": e.left_user_id }),
            workspace,
        ),
        KanbanEvent::MemberRoleChanged(e) => Plan::direct(
            NotificationType::RoleChanged,
            e.target_user_id,
            notice(
                "Role changed",
                format!(
                    "Your role in \"{}\" changed from {} to {}",
                    e.workspace_name, e.old_role, e.new_role
                ),
            ),
            json!({
                "workspaceName": e.workspace_name,
                "userId": e.target_user_id,
                "oldRole": e.old_role,
                "newRole": e.new_role,
            }),
            workspace,
        )
        .and_others(
            actor,
            notice(
                "Role changed",
                format!(
                    "A member's role in \"{}\" changed to {}",
                    e.workspace_name, e.new_role
                ),
            ),
        ),
    };
    Some(plan)
}

fn compose(
    context: &EventContext,
    scope: &EventScope,
    plan: &Plan,
    user_id: Uuid,
    notice: &Notice,
) -> NewNotification {
    NewNotification::new(
        user_id,
        plan.notification_type,
        notice.title.clone(),
        notice.message.clone(),
    )
    .with_data(plan.data.clone())
    .in_workspace(context.workspace_id)
    .on_board(scope.board_id)
    .on_list(scope.list_id)
    .on_card(scope.card_id)
    .related_to(context.user_id)
}

/// One notification a plan produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Recipient {
    Direct,
    Member(Uuid),
}

/// Consumer handler that notifies the people an event concerns.
pub struct NotificationProjector {
    notifications: Arc<dyn NotificationService>,
    members: Arc<dyn MembershipDirectory>,
    realtime: Arc<dyn RealtimeSink>,
    /// Recipients already notified, per message still being retried.
    in_flight: Mutex<HashMap<Uuid, HashSet<Recipient>>>,
}

impl NotificationProjector {
    #[must_use]
    pub fn new(
        notifications: Arc<dyn NotificationService>,
        members: Arc<dyn MembershipDirectory>,
        realtime: Arc<dyn RealtimeSink>,
    ) -> Self {
        Self {
            notifications,
            members,
            realtime,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Creates the notifications for one event delivered once.
    ///
    /// # Errors
    ///
    /// See [`NotificationProjector::project_delivery`].
    pub async fn project(&self, event: &KanbanEvent) -> Result<usize, DomainError> {
        self.project_delivery(event, &DeliveryInfo::single()).await
    }

    /// Creates the notifications for one delivery attempt and returns how
    /// many this attempt created.
    ///
    /// Recipients notified by an earlier failed attempt at the same
    /// `delivery.message_id` are skipped. The group push happens once, after
    /// every notification exists.
    ///
    /// # Errors
    ///
    /// Returns the first membership lookup or notification creation error.
    pub async fn project_delivery(
        &self,
        event: &KanbanEvent,
        delivery: &DeliveryInfo,
    ) -> Result<usize, DomainError> {
        let Some(plan) = plan(event) else {
            debug!(event_type = %event.kind(), "no notification for event");
            return Ok(0);
        };

        let result = self.create_all(event, &plan, delivery.message_id).await;
        if result.is_ok() || delivery.final_attempt {
            self.lock_in_flight().remove(&delivery.message_id);
        }
        let created = result?;

        self.push_group(event, &plan).await;
        debug!(
            event_type = %event.kind(),
            message_id = %delivery.message_id,
            attempt = delivery.attempt,
            created,
            "notifications created"
        );
        Ok(created)
    }

    async fn create_all(
        &self,
        event: &KanbanEvent,
        plan: &Plan,
        message_id: Uuid,
    ) -> Result<usize, DomainError> {
        let context = event.context();
        let scope = event.scope();
        let mut created = 0;

        if let Some((user_id, notice)) = &plan.direct {
            let notification = compose(context, &scope, plan, *user_id, notice);
            created += self
                .create_once(message_id, Recipient::Direct, notification)
                .await?;
        }

        if let Some((notice, exclude)) = &plan.broadcast {
            let members = self.members.get_workspace_members(context.workspace_id).await?;
            let mut seen = HashSet::new();
            for member in members {
                if exclude.contains(&member.user_id) || !seen.insert(member.user_id) {
                    continue;
                }
                let notification = compose(context, &scope, plan, member.user_id, notice);
                created += self
                    .create_once(message_id, Recipient::Member(member.user_id), notification)
                    .await?;
            }
        }
        Ok(created)
    }

    async fn create_once(
        &self,
        message_id: Uuid,
        recipient: Recipient,
        notification: NewNotification,
    ) -> Result<usize, DomainError> {
        if self.already_notified(message_id, recipient) {
            return Ok(0);
        }
        self.notifications.create_notification(notification).await?;
        self.lock_in_flight()
            .entry(message_id)
            .or_default()
            .insert(recipient);
        Ok(1)
    }

    fn already_notified(&self, message_id: Uuid, recipient: Recipient) -> bool {
        self.lock_in_flight()
            .get(&message_id)
            .is_some_and(|done| done.contains(&recipient))
    }

    fn lock_in_flight(&self) -> MutexGuard<'_, HashMap<Uuid, HashSet<Recipient>>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn push_group(&self, event: &KanbanEvent, plan: &Plan) {
        let message = RealtimeMessage {
            method: RECEIVE_EVENT,
            payload: json!({
                "eventType": event.event_type(),
                "notificationType": plan.notification_type,
                "userId": event.context().user_id,
                "data": plan.data,
            }),
        };
        if let Err(err) = self.realtime.push(plan.group, message).await {
            warn!(
                channel = %plan.group.channel_name(),
                error = %err,
                "group push failed"
            );
        }
    }
}

#[async_trait]
impl EventHandler for NotificationProjector {
    fn handler_name(&self) -> &str {
        "notification-projector"
    }

    async fn handle(
        &self,
        event: &KanbanEvent,
        delivery: &DeliveryInfo,
    ) -> Result<(), DomainError> {
        self.project_delivery(event, delivery).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use kanban_core::membership::WorkspaceRole;
    use kanban_core::notification::Notification;
    use kanban_events::EventType;
    use kanban_events::board::{BoardCreatedEvent, BoardMemberAssignedEvent};
    use kanban_events::card::CardMemberAssignedEvent;
    use kanban_events::fixtures::{sample, sample_context};
    use kanban_events::member::{
        MemberInvitedEvent, MemberJoinedEvent, MemberLeftEvent, MemberRemovedEvent,
        MemberRoleChangedEvent,
    };
    use kanban_events::workspace::{WorkspaceDeletedEvent, WorkspaceUpdatedEvent};
    use kanban_test_support::{
        FailingMembershipDirectory, FixedClock, FlakyNotificationRepository,
        RecordingNotificationRepository, RecordingRealtimeSink, StaticMembershipDirectory,
    };

    use super::*;
    use crate::application::center::NotificationCenter;

    struct Harness {
        repo: Arc<RecordingNotificationRepository>,
        sink: Arc<RecordingRealtimeSink>,
        projector: NotificationProjector,
    }

    fn harness(directory: StaticMembershipDirectory) -> Harness {
        let repo = Arc::new(RecordingNotificationRepository::new());
        let sink = Arc::new(RecordingRealtimeSink::new());
        let center = NotificationCenter::new(
            repo.clone(),
            sink.clone(),
            Arc::new(FixedClock::on(2026, 5, 20)),
        );
        let projector = NotificationProjector::new(Arc::new(center), Arc::new(directory), sink.clone());
        Harness {
            repo,
            sink,
            projector,
        }
    }

    fn recipients(notifications: &[Notification]) -> HashSet<Uuid> {
        notifications.iter().map(|n| n.user_id).collect()
    }

    #[tokio::test]
    async fn test_board_created_notifies_every_member_but_the_actor() {
        // Arrange
        let context = sample_context();
        let (actor, workspace_id) = (context.user_id, context.workspace_id);
        let (alice, bob) = (Uuid::new_v4(), Uuid::new_v4());
        let h = harness(StaticMembershipDirectory::new().with_members(workspace_id, &[actor, alice, bob]));
        let board_id = Uuid::new_v4();
        let event = KanbanEvent::from(BoardCreatedEvent {
            context,
            board_id,
            board_title: "Sprint".to_owned(),
        });

        // Act
        let created = h.projector.project(&event).await.unwrap();

        // Assert
        assert_eq!(created, 2);
        let stored = h.repo.notifications();
        assert_eq!(recipients(&stored), HashSet::from([alice, bob]));
        for notification in &stored {
            assert_eq!(notification.notification_type, NotificationType::BoardCreated);
            assert_eq!(notification.board_id, Some(board_id));
            assert_eq!(notification.workspace_id, Some(workspace_id));
            assert_eq!(notification.related_user_id, Some(actor));
            assert!(notification.message.contains("Sprint"));
        }
        assert_eq!(h.sink.pushes_to(RealtimeGroup::User(alice)).len(), 1);
        assert!(h.sink.pushes_to(RealtimeGroup::User(actor)).is_empty());
        let board_pushes = h.sink.pushes_to(RealtimeGroup::Board(board_id));
        assert_eq!(board_pushes.len(), 1);
        assert_eq!(board_pushes[0].method, RECEIVE_EVENT);
        assert_eq!(board_pushes[0].payload["eventType"], "BoardCreatedEvent");
    }

    #[tokio::test]
    async fn test_board_member_assigned_notifies_only_the_target() {
        let context = sample_context();
        let workspace_id = context.workspace_id;
        let target = Uuid::new_v4();
        let h = harness(
            StaticMembershipDirectory::new().with_members(workspace_id, &[Uuid::new_v4(), target]),
        );
        let event = KanbanEvent::from(BoardMemberAssignedEvent {
            context,
            board_id: Uuid::new_v4(),
            board_title: "Roadmap".to_owned(),
            assigned_user_id: target,
        });

        h.projector.project(&event).await.unwrap();

        let stored = h.repo.notifications();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].user_id, target);
        assert_eq!(stored[0].notification_type, NotificationType::BoardMemberAdded);
    }

    #[tokio::test]
    async fn test_self_assignment_to_card_is_silent() {
        let context = sample_context();
        let actor = context.user_id;
        let h = harness(StaticMembershipDirectory::new());
        let event = KanbanEvent::from(CardMemberAssignedEvent {
            context,
            card_id: Uuid::new_v4(),
            list_id: Uuid::new_v4(),
            board_id: Uuid::new_v4(),
            card_title: "Write docs".to_owned(),
            assigned_user_id: actor,
        });

        let created = h.projector.project(&event).await.unwrap();

        assert_eq!(created, 0);
        assert!(h.sink.pushes().is_empty());
    }

    #[tokio::test]
    async fn test_card_assignment_of_someone_else_notifies_them() {
        let context = sample_context();
        let assignee = Uuid::new_v4();
        let card_id = Uuid::new_v4();
        let h = harness(StaticMembershipDirectory::new());
        let event = KanbanEvent::from(CardMemberAssignedEvent {
            context,
            card_id,
            list_id: Uuid::new_v4(),
            board_id: Uuid::new_v4(),
            card_title: "Write docs".to_owned(),
            assigned_user_id: assignee,
        });

        h.projector.project(&event).await.unwrap();

        let stored = h.repo.notifications();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].user_id, assignee);
        assert_eq!(stored[0].notification_type, NotificationType::CardAssigned);
        assert_eq!(stored[0].card_id, Some(card_id));
    }

    #[tokio::test]
    async fn test_member_invited_notifies_target_directly_and_others_separately() {
        // Arrange
        let context = sample_context();
        let (actor, workspace_id) = (context.user_id, context.workspace_id);
        let invited = Uuid::new_v4();
        let colleague = Uuid::new_v4();
        let h = harness(
            StaticMembershipDirectory::new()
                .with_members(workspace_id, &[actor, invited, colleague]),
        );
        let event = KanbanEvent::from(MemberInvitedEvent {
            context,
            invited_user_id: invited,
            invited_email: "new@example.com".to_owned(),
            workspace_name: "Acme".to_owned(),
            role: WorkspaceRole::Admin,
        });

        // Act
        let created = h.projector.project(&event).await.unwrap();

        // Assert
        assert_eq!(created, 2);
        let stored = h.repo.notifications();
        let to_invited: Vec<_> = stored.iter().filter(|n| n.user_id == invited).collect();
        let to_colleague: Vec<_> = stored.iter().filter(|n| n.user_id == colleague).collect();
        assert_eq!(to_invited.len(), 1);
        assert_eq!(to_colleague.len(), 1);
        assert!(to_invited[0].message.contains("as Admin"));
        assert!(to_colleague[0].message.contains("new@example.com"));
        assert_ne!(to_invited[0].title, to_colleague[0].title);
        assert_eq!(h.sink.pushes_to(RealtimeGroup::Workspace(workspace_id)).len(), 1);
    }

    #[tokio::test]
    async fn test_member_joined_skips_the_new_member() {
        let context = sample_context();
        let workspace_id = context.workspace_id;
        let joined = Uuid::new_v4();
        let existing = Uuid::new_v4();
        let h = harness(StaticMembershipDirectory::new().with_members(workspace_id, &[joined, existing]));
        let event = KanbanEvent::from(MemberJoinedEvent {
            context,
            joined_user_id: joined,
            workspace_name: "Acme".to_owned(),
        });

        h.projector.project(&event).await.unwrap();

        assert_eq!(recipients(&h.repo.notifications()), HashSet::from([existing]));
    }

    #[tokio::test]
    async fn test_role_change_notifies_target_once_and_others() {
        let context = sample_context();
        let (actor, workspace_id) = (context.user_id, context.workspace_id);
        let target = Uuid::new_v4();
        let other = Uuid::new_v4();
        let h = harness(
            StaticMembershipDirectory::new().with_members(workspace_id, &[actor, target, other]),
        );
        let event = KanbanEvent::from(MemberRoleChangedEvent {
            context,
            target_user_id: target,
            workspace_name: "Acme".to_owned(),
            old_role: WorkspaceRole::Member,
            new_role: WorkspaceRole::Admin,
        });

        h.projector.project(&event).await.unwrap();

        let stored = h.repo.notifications();
        assert_eq!(stored.len(), 2);
        assert_eq!(recipients(&stored), HashSet::from([target, other]));
        assert!(stored.iter().all(|n| n.notification_type == NotificationType::RoleChanged));
    }

    #[tokio::test]
    async fn test_silent_event_types_create_nothing() {
        for event_type in [
            EventType::WorkspaceCreated,
            EventType::ListUpdated,
            EventType::ListMoved,
            EventType::CardUpdated,
            EventType::CardDeleted,
            EventType::CommentUpdated,
            EventType::CommentDeleted,
        ] {
            let context = sample_context();
            let h = harness(
                StaticMembershipDirectory::new()
                    .with_members(context.workspace_id, &[Uuid::new_v4(), Uuid::new_v4()]),
            );

            let created = h.projector.project(&sample(event_type, context)).await.unwrap();

            assert_eq!(created, 0, "{event_type}");
            assert!(h.sink.pushes().is_empty(), "{event_type}");
        }
    }

    #[tokio::test]
    async fn test_every_notifying_type_reaches_someone() {
        for &event_type in EventType::ALL {
            let event = sample(event_type, sample_context());
            let Some(plan) = plan(&event) else {
                continue;
            };
            assert!(
                plan.direct.is_some() || plan.broadcast.is_some(),
                "{event_type} plans no recipients"
            );
        }
    }

    #[tokio::test]
    async fn test_membership_lookup_failure_fails_the_event() {
        let repo = Arc::new(RecordingNotificationRepository::new());
        let sink = Arc::new(RecordingRealtimeSink::new());
        let center = NotificationCenter::new(
            repo.clone(),
            sink.clone(),
            Arc::new(FixedClock::on(2026, 5, 20)),
        );
        let projector =
            NotificationProjector::new(Arc::new(center), Arc::new(FailingMembershipDirectory), sink);

        let result = projector
            .handle(&sample(EventType::ListCreated, sample_context()), &DeliveryInfo::single())
            .await;

        assert!(matches!(result, Err(DomainError::Infrastructure(_))));
        assert!(repo.notifications().is_empty());
    }

    fn flaky_projector(
        repo: &Arc<FlakyNotificationRepository>,
        sink: &Arc<RecordingRealtimeSink>,
        directory: StaticMembershipDirectory,
    ) -> NotificationProjector {
        let center = NotificationCenter::new(
            repo.clone(),
            sink.clone(),
            Arc::new(FixedClock::on(2026, 5, 20)),
        );
        NotificationProjector::new(Arc::new(center), Arc::new(directory), sink.clone())
    }

    fn board_created(context: EventContext, board_id: Uuid) -> KanbanEvent {
        KanbanEvent::from(BoardCreatedEvent {
            context,
            board_id,
            board_title: "Sprint".to_owned(),
        })
    }

    #[tokio::test]
    async fn test_retry_after_partial_broadcast_notifies_each_member_once() {
        // Arrange
        let context = sample_context();
        let (actor, workspace_id) = (context.user_id, context.workspace_id);
        let (alice, bob) = (Uuid::new_v4(), Uuid::new_v4());
        let repo = Arc::new(FlakyNotificationRepository::failing_on(2));
        let sink = Arc::new(RecordingRealtimeSink::new());
        let projector = flaky_projector(
            &repo,
            &sink,
            StaticMembershipDirectory::new().with_members(workspace_id, &[actor, alice, bob]),
        );
        let board_id = Uuid::new_v4();
        let event = board_created(context, board_id);
        let first = DeliveryInfo::first_attempt(None, 3);

        // Act
        let failed = projector.project_delivery(&event, &first).await;
        let retried = projector.project_delivery(&event, &first.next(3)).await;

        // Assert
        assert!(matches!(failed, Err(DomainError::Infrastructure(_))));
        assert_eq!(retried.unwrap(), 1);
        let stored = repo.notifications();
        assert_eq!(stored.iter().filter(|n| n.user_id == alice).count(), 1);
        assert_eq!(stored.iter().filter(|n| n.user_id == bob).count(), 1);
        assert_eq!(stored.len(), 2);
        assert_eq!(repo.calls(), 3);
        assert_eq!(sink.pushes_to(RealtimeGroup::Board(board_id)).len(), 1);
        assert!(projector.lock_in_flight().is_empty());
    }

    #[tokio::test]
    async fn test_failed_final_attempt_forgets_progress() {
        let context = sample_context();
        let (actor, workspace_id) = (context.user_id, context.workspace_id);
        let repo = Arc::new(FlakyNotificationRepository::failing_on(2));
        let sink = Arc::new(RecordingRealtimeSink::new());
        let projector = flaky_projector(
            &repo,
            &sink,
            StaticMembershipDirectory::new()
                .with_members(workspace_id, &[actor, Uuid::new_v4(), Uuid::new_v4()]),
        );
        let board_id = Uuid::new_v4();

        let result = projector
            .project_delivery(&board_created(context, board_id), &DeliveryInfo::single())
            .await;

        assert!(result.is_err());
        assert!(projector.lock_in_flight().is_empty());
        assert!(sink.pushes_to(RealtimeGroup::Board(board_id)).is_empty());
    }

    #[tokio::test]
    async fn test_same_event_published_twice_notifies_twice() {
        // Arrange
        let context = sample_context();
        let (actor, workspace_id) = (context.user_id, context.workspace_id);
        let (alice, bob) = (Uuid::new_v4(), Uuid::new_v4());
        let h = harness(StaticMembershipDirectory::new().with_members(workspace_id, &[actor, alice, bob]));
        let event = board_created(context, Uuid::new_v4());

        // Act
        let first = h.projector.project(&event).await.unwrap();
        let second = h.projector.project(&event).await.unwrap();

        // Assert
        assert_eq!((first, second), (2, 2));
        let stored = h.repo.notifications();
        assert_eq!(stored.iter().filter(|n| n.user_id == alice).count(), 2);
        assert_eq!(stored.iter().filter(|n| n.user_id == bob).count(), 2);
        assert_ne!(stored[0].id, stored[2].id);
    }

    #[tokio::test]
    async fn test_member_removed_tells_target_and_remaining_members_apart() {
        // Arrange
        let context = sample_context();
        let (actor, workspace_id) = (context.user_id, context.workspace_id);
        let removed = Uuid::new_v4();
        let colleague = Uuid::new_v4();
        let h = harness(
            StaticMembershipDirectory::new()
                .with_members(workspace_id, &[actor, removed, colleague]),
        );
        let event = KanbanEvent::from(MemberRemovedEvent {
            context,
            removed_user_id: removed,
            workspace_name: "Acme".to_owned(),
        });

        // Act
        let created = h.projector.project(&event).await.unwrap();

        // Assert
        assert_eq!(created, 2);
        let stored = h.repo.notifications();
        assert_eq!(recipients(&stored), HashSet::from([removed, colleague]));
        let to_removed: Vec<_> = stored.iter().filter(|n| n.user_id == removed).collect();
        let to_colleague: Vec<_> = stored.iter().filter(|n| n.user_id == colleague).collect();
        assert_eq!(to_removed.len(), 1);
        assert_eq!(to_colleague.len(), 1);
        assert_eq!(to_removed[0].title, "Removed from workspace");
        assert_eq!(to_colleague[0].title, "Member removed");
        assert!(
            stored
                .iter()
                .all(|n| n.notification_type == NotificationType::MemberRemoved)
        );
        assert_eq!(h.sink.pushes_to(RealtimeGroup::Workspace(workspace_id)).len(), 1);
    }

    #[tokio::test]
    async fn test_member_left_notifies_everyone_but_the_leaver() {
        // Arrange
        let context = sample_context();
        let (actor, workspace_id) = (context.user_id, context.workspace_id);
        let leaver = Uuid::new_v4();
        let colleague = Uuid::new_v4();
        let h = harness(
            StaticMembershipDirectory::new()
                .with_members(workspace_id, &[actor, leaver, colleague]),
        );
        let event = KanbanEvent::from(MemberLeftEvent {
            context,
            left_user_id: leaver,
            workspace_name: "Acme".to_owned(),
        });

        // Act
        h.projector.project(&event).await.unwrap();

        // Assert
        let stored = h.repo.notifications();
        assert_eq!(recipients(&stored), HashSet::from([actor, colleague]));
        assert_eq!(stored.len(), 2);
        assert!(stored.iter().all(|n| n.data["userId"] == leaver.to_string()));
    }

    #[tokio::test]
    async fn test_workspace_changes_broadcast_and_push_to_workspace_group() {
        for (event, expected) in [
            (
                KanbanEvent::from(WorkspaceUpdatedEvent {
                    context: sample_context(),
                    workspace_name: "Acme".to_owned(),
                }),
                NotificationType::WorkspaceUpdated,
            ),
            (
                KanbanEvent::from(WorkspaceDeletedEvent {
                    context: sample_context(),
                    workspace_name: "Acme".to_owned(),
                }),
                NotificationType::WorkspaceDeleted,
            ),
        ] {
            // Arrange
            let context = event.context().clone();
            let (alice, bob) = (Uuid::new_v4(), Uuid::new_v4());
            let h = harness(
                StaticMembershipDirectory::new()
                    .with_members(context.workspace_id, &[context.user_id, alice, bob]),
            );

            // Act
            let created = h.projector.project(&event).await.unwrap();

            // Assert
            assert_eq!(created, 2, "{expected:?}");
            let stored = h.repo.notifications();
            assert_eq!(recipients(&stored), HashSet::from([alice, bob]));
            assert!(stored.iter().all(|n| n.notification_type == expected));
            assert!(stored.iter().all(|n| n.data["workspaceName"] == "Acme"));
            let pushes = h.sink.pushes_to(RealtimeGroup::Workspace(context.workspace_id));
            assert_eq!(pushes.len(), 1, "{expected:?}");
            assert_eq!(pushes[0].method, RECEIVE_EVENT);
            assert_eq!(pushes[0].payload["userId"], context.user_id.to_string());
        }
    }

    #[test]
    fn test_long_comment_is_truncated_in_message() {
        let content = "x".repeat(250);

        let short = excerpt(&content);

        assert_eq!(short.chars().count(), EXCERPT_CHARS + 3);
        assert!(short.ends_with("..."));
        assert_eq!(excerpt("short"), "short");
    }
}
