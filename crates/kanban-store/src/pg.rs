//! `PostgreSQL` implementations of the projection ports.

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use tracing::instrument;
use uuid::Uuid;

use kanban_core::activity::{Activity, ActivityRepository};
use kanban_core::error::DomainError;
use kanban_core::membership::{MembershipDirectory, WorkspaceMember};
use kanban_core::notification::{Notification, NotificationRepository};

fn infrastructure(context: &str, err: &sqlx::Error) -> DomainError {
    DomainError::Infrastructure(format!("{context}: {err}"))
}

/// Appends activities to the `activities` table.
#[derive(Debug, Clone)]
pub struct PgActivityRepository {
    pool: PgPool,
}

impl PgActivityRepository {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ActivityRepository for PgActivityRepository {
    #[instrument(skip(self, activity), fields(activity_id = %activity.id))]
    async fn add_activity(&self, activity: Activity) -> Result<Activity, DomainError> {
        sqlx::query(
            r"
            INSERT INTO activities (
                id, workspace_id, board_id, list_id, card_id, user_id,
                activity_type, description, entity_id, entity_type, metadata, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ",
        )
        .bind(activity.id)
        .bind(activity.workspace_id)
        .bind(activity.board_id)
        .bind(activity.list_id)
        .bind(activity.card_id)
        .bind(activity.user_id)
        .bind(activity.activity_type.as_str())
        .bind(&activity.description)
        .bind(activity.entity_id)
        .bind(activity.entity_type.as_str())
        .bind(&activity.metadata)
        .bind(activity.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| infrastructure("failed to insert activity", &e))?;

        Ok(activity)
    }
}

/// Stores notifications in the `notifications` table.
#[derive(Debug, Clone)]
pub struct PgNotificationRepository {
    pool: PgPool,
}

impl PgNotificationRepository {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationRepository for PgNotificationRepository {
    #[instrument(skip(self, notification), fields(notification_id = %notification.id))]
    async fn add_notification(
        &self,
        notification: Notification,
    ) -> Result<Notification, DomainError> {
        sqlx::query(
            r"
            INSERT INTO notifications (
                id, user_id, notification_type, title, message, data,
                workspace_id, board_id, list_id, card_id, related_user_id,
                is_read, read_at, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            ",
        )
        .bind(notification.id)
        .bind(notification.user_id)
        .bind(notification.notification_type.as_str())
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(&notification.data)
        .bind(notification.workspace_id)
        .bind(notification.board_id)
        .bind(notification.list_id)
        .bind(notification.card_id)
        .bind(notification.related_user_id)
        .bind(notification.is_read)
        .bind(notification.read_at)
        .bind(notification.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| infrastructure("failed to insert notification", &e))?;

        Ok(notification)
    }
}

/// Reads workspace rosters from `workspace_members`.
#[derive(Debug, Clone)]
pub struct PgMembershipDirectory {
    pool: PgPool,
}

impl PgMembershipDirectory {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MembershipDirectory for PgMembershipDirectory {
    #[instrument(skip(self))]
    async fn get_workspace_members(
        &self,
        workspace_id: Uuid,
    ) -> Result<Vec<WorkspaceMember>, DomainError> {
        let rows = sqlx::query(
            r"
            SELECT user_id, role
            FROM workspace_members
            WHERE workspace_id = $1
            ORDER BY joined_at, user_id
            ",
        )
        .bind(workspace_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| infrastructure("failed to load workspace members", &e))?;

        rows.iter()
            .map(|row| -> Result<WorkspaceMember, DomainError> {
                let user_id: Uuid = row
                    .try_get("user_id")
                    .map_err(|e| infrastructure("bad user_id column", &e))?;
                let role: String = row
                    .try_get("role")
                    .map_err(|e| infrastructure("bad role column", &e))?;
                Ok(WorkspaceMember {
                    user_id,
                    workspace_id,
                    role: role.parse()?,
                })
            })
            .collect()
    }
}
