//! End-to-end event flow through the in-process broker.

mod common;

use std::sync::Arc;

use async_trait::async_trait;
use kanban_core::activity::{ActivityType, EntityType};
use kanban_core::error::DomainError;
use kanban_core::event::EventContext;
use kanban_core::membership::{MembershipDirectory, WorkspaceMember};
use kanban_core::realtime::RealtimeGroup;
use kanban_events::KanbanEvent;
use kanban_events::board::BoardCreatedEvent;
use kanban_events::card::CardMemberAssignedEvent;
use kanban_events::fixtures::sample_context;
use kanban_events::workspace::WorkspaceCreatedEvent;
use kanban_messaging::consumer::dead_letter_queue_name;
use kanban_test_support::StaticMembershipDirectory;
use kanban_worker::config::Service;
use uuid::Uuid;

const BOTH: &[Service] = &[Service::Activity, Service::Notification];

fn context_for(workspace_id: Uuid, user_id: Uuid) -> EventContext {
    EventContext {
        workspace_id,
        user_id,
        ..sample_context()
    }
}

fn board_created(workspace_id: Uuid, user_id: Uuid, board_id: Uuid) -> KanbanEvent {
    BoardCreatedEvent {
        context: context_for(workspace_id, user_id),
        board_id,
        board_title: "Sprint".to_owned(),
    }
    .into()
}

/// Fails lookups for one workspace and delegates the rest.
struct PoisonedWorkspace {
    poisoned: Uuid,
    inner: StaticMembershipDirectory,
}

#[async_trait]
impl MembershipDirectory for PoisonedWorkspace {
    async fn get_workspace_members(
        &self,
        workspace_id: Uuid,
    ) -> Result<Vec<WorkspaceMember>, DomainError> {
        if workspace_id == self.poisoned {
            return Err(DomainError::Infrastructure("member store offline".into()));
        }
        self.inner.get_workspace_members(workspace_id).await
    }
}

#[tokio::test]
async fn test_board_created_reaches_activity_feed_and_other_members() {
    // Arrange
    let workspace = Uuid::new_v4();
    let creator = Uuid::new_v4();
    let teammate_a = Uuid::new_v4();
    let teammate_b = Uuid::new_v4();
    let members = StaticMembershipDirectory::new()
        .with_members(workspace, &[creator, teammate_a, teammate_b]);
    let harness = common::Harness::start(BOTH, Arc::new(members)).await;
    let board = Uuid::new_v4();

    // Act
    harness
        .publisher
        .publish(&board_created(workspace, creator, board))
        .await
        .unwrap();
    common::eventually(|| {
        harness.activities.activities().len() == 1 && harness.notifications.notifications().len() == 2
    })
    .await;

    // Assert
    let activity = &harness.activities.activities()[0];
    assert_eq!(activity.activity_type, ActivityType::BoardCreated);
    assert_eq!(activity.entity_type, EntityType::Board);
    assert_eq!(activity.entity_id, board);
    assert_eq!(activity.workspace_id, workspace);

    let notifications = harness.notifications.notifications();
    let mut recipients: Vec<Uuid> = notifications.iter().map(|n| n.user_id).collect();
    recipients.sort();
    let mut expected = vec![teammate_a, teammate_b];
    expected.sort();
    assert_eq!(recipients, expected);
    assert!(notifications.iter().all(|n| n.board_id == Some(board)));

    common::eventually(|| {
        !harness
            .realtime
            .pushes_to(RealtimeGroup::Board(board))
            .is_empty()
    })
    .await;
    harness.stop().await;
}

#[tokio::test]
async fn test_card_assignment_activity_targets_assignee() {
    // Arrange
    let workspace = Uuid::new_v4();
    let actor = Uuid::new_v4();
    let assignee = Uuid::new_v4();
    let card = Uuid::new_v4();
    let harness = common::Harness::start(BOTH, common::no_members()).await;
    let event = KanbanEvent::from(CardMemberAssignedEvent {
        context: context_for(workspace, actor),
        card_id: card,
        list_id: Uuid::new_v4(),
        board_id: Uuid::new_v4(),
        card_title: "Fix login".to_owned(),
        assigned_user_id: assignee,
    });

    // Act
    harness.publisher.publish(&event).await.unwrap();
    common::eventually(|| {
        harness.activities.activities().len() == 1 && harness.notifications.notifications().len() == 1
    })
    .await;

    // Assert
    let activity = &harness.activities.activities()[0];
    assert_eq!(activity.entity_id, assignee);
    assert_ne!(activity.entity_id, actor);
    assert_ne!(activity.entity_id, card);
    assert_eq!(activity.card_id, Some(card));
    assert_eq!(harness.notifications.notifications()[0].user_id, assignee);
    assert_eq!(
        harness.realtime.pushes_to(RealtimeGroup::User(assignee)).len(),
        1
    );
    harness.stop().await;
}

#[tokio::test]
async fn test_failed_notification_is_dead_lettered_and_queue_keeps_flowing() {
    // Arrange
    let broken_workspace = Uuid::new_v4();
    let healthy_workspace = Uuid::new_v4();
    let actor = Uuid::new_v4();
    let teammate = Uuid::new_v4();
    let members = PoisonedWorkspace {
        poisoned: broken_workspace,
        inner: StaticMembershipDirectory::new().with_members(healthy_workspace, &[actor, teammate]),
    };
    let harness = common::Harness::start(BOTH, Arc::new(members)).await;
    let queue = "notification.BoardCreatedEvent.queue";
    let dead_letters = dead_letter_queue_name("notification");

    // Act
    harness
        .publisher
        .publish(&board_created(broken_workspace, actor, Uuid::new_v4()))
        .await
        .unwrap();
    common::eventually(|| harness.stats(queue).rejected == 1).await;
    let board = Uuid::new_v4();
    harness
        .publisher
        .publish(&board_created(healthy_workspace, actor, board))
        .await
        .unwrap();
    common::eventually(|| harness.stats(queue).acked == 1).await;

    // Assert
    let notifications = harness.notifications.notifications();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].user_id, teammate);
    assert_eq!(notifications[0].board_id, Some(board));
    assert_eq!(harness.broker.queue_depth(&dead_letters), Some(1));
    assert_eq!(harness.broker.unacked_count(queue), Some(0));

    // The activity service never saw the failure.
    common::eventually(|| harness.activities.activities().len() == 2).await;
    assert_eq!(harness.stats("activity.BoardCreatedEvent.queue").rejected, 0);
    harness.stop().await;
}

#[tokio::test]
async fn test_each_service_gets_its_own_copy_of_an_event() {
    // Arrange
    let harness = common::Harness::start(BOTH, common::no_members()).await;
    let workspace = Uuid::new_v4();
    let event = KanbanEvent::from(WorkspaceCreatedEvent {
        context: context_for(workspace, Uuid::new_v4()),
        workspace_name: "Acme".to_owned(),
    });

    // Act
    harness.publisher.publish(&event).await.unwrap();
    common::eventually(|| {
        harness.stats("activity.WorkspaceCreatedEvent.queue").acked == 1
            && harness.stats("notification.WorkspaceCreatedEvent.queue").acked == 1
    })
    .await;

    // Assert
    let activities = harness.activities.activities();
    assert_eq!(activities.len(), 1);
    assert_eq!(activities[0].activity_type, ActivityType::WorkspaceCreated);
    assert_eq!(activities[0].entity_id, workspace);
    assert!(harness.notifications.notifications().is_empty());
    for queue in [
        "activity.WorkspaceCreatedEvent.queue",
        "notification.WorkspaceCreatedEvent.queue",
    ] {
        assert_eq!(harness.broker.queue_depth(queue), Some(0));
        assert_eq!(harness.stats(queue).rejected, 0);
    }
    harness.stop().await;
}

#[tokio::test]
async fn test_single_service_worker_binds_only_its_prefix() {
    let harness = common::Harness::start(&[Service::Activity], common::no_members()).await;

    let queues = harness.broker.bound_queues(common::EXCHANGE);

    assert_eq!(queues.len(), kanban_events::EventType::ALL.len());
    assert!(queues.iter().all(|q| q.starts_with("activity.")));
}
