//! Kanban — activity feed projection.
//!
//! Turns every domain event into exactly one append-only `Activity` record.

pub mod application;

/// Queue prefix under which the activity service binds its consumers.
pub const QUEUE_PREFIX: &str = "activity";
