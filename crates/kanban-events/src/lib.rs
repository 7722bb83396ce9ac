//! Kanban Events — the domain event catalog.
//!
//! One module per aggregate (workspace, board, list, card, member, comment)
//! holds the concrete event structs. Each struct carries the shared
//! [`EventContext`](kanban_core::event::EventContext) flattened into its JSON
//! body and declares its target entity explicitly via [`target::Targeted`].

pub mod board;
pub mod card;
pub mod catalog;
pub mod comment;
#[cfg(any(test, feature = "fixtures"))]
pub mod fixtures;
pub mod list;
pub mod member;
pub mod target;
pub mod workspace;

pub use catalog::{EventType, KanbanEvent};
