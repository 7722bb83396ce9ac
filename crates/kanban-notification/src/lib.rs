//! Kanban — user notification projection.
//!
//! Decides who hears about each domain event, stores one notification per
//! recipient and pushes it to the recipient's real-time channel.

pub mod application;
pub mod realtime;

/// Queue prefix under which the notification service binds its consumers.
pub const QUEUE_PREFIX: &str = "notification";
