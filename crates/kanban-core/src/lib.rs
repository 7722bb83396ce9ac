//! Kanban Core — shared domain abstractions.
//!
//! This crate defines the event context, the records the projectors derive
//! from events, and the collaborator ports they write through. It contains
//! no infrastructure code.

pub mod activity;
pub mod clock;
pub mod error;
pub mod event;
pub mod membership;
pub mod notification;
pub mod realtime;
