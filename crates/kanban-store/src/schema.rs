//! Database schema for the projection tables.
//!
//! The DDL lives in the workspace `migrations/` directory and is embedded at
//! compile time.

use sqlx::PgPool;
use sqlx::migrate::{MigrateError, Migrator};

/// Embedded migrations creating `workspace_members`, `activities` and
/// `notifications`.
pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

/// Applies any pending migrations.
///
/// # Errors
///
/// Returns the migrator's error if a migration fails or was edited after
/// being applied.
pub async fn migrate(pool: &PgPool) -> Result<(), MigrateError> {
    MIGRATOR.run(pool).await
}
