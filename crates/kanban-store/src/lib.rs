//! Persistence adapters for the projection ports.
//!
//! `pg` writes to PostgreSQL through `sqlx`; `memory` keeps everything in
//! process for local runs without a database.

pub mod memory;
pub mod pg;
pub mod schema;

pub use memory::{InMemoryActivityStore, InMemoryMembershipDirectory, InMemoryNotificationStore};
pub use pg::{PgActivityRepository, PgMembershipDirectory, PgNotificationRepository};
