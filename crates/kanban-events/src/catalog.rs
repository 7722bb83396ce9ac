//! The closed event catalog.
//!
//! `EventType` is the static registry of every concrete event type and
//! `KanbanEvent` is the tagged union consumers decode into. Adding an event
//! means adding one line to the `event_catalog!` invocation below; every
//! exhaustive match downstream then fails to compile until it is handled.

use kanban_core::event::{DomainEvent, EventContext};

use crate::board::{
    BoardArchivedEvent, BoardCreatedEvent, BoardDeletedEvent, BoardMemberAssignedEvent,
    BoardMemberUnassignedEvent, BoardUpdatedEvent,
};
use crate::card::{
    CardCreatedEvent, CardDeletedEvent, CardDueDateChangedEvent, CardMemberAssignedEvent,
    CardMemberUnassignedEvent, CardMovedEvent, CardUpdatedEvent,
};
use crate::comment::{CommentCreatedEvent, CommentDeletedEvent, CommentUpdatedEvent};
use crate::list::{ListCreatedEvent, ListDeletedEvent, ListMovedEvent, ListUpdatedEvent};
use crate::member::{
    MemberInvitedEvent, MemberJoinedEvent, MemberLeftEvent, MemberRemovedEvent,
    MemberRoleChangedEvent,
};
use crate::target::{EntityRef, EventScope, Targeted};
use crate::workspace::{WorkspaceCreatedEvent, WorkspaceDeletedEvent, WorkspaceUpdatedEvent};

macro_rules! event_catalog {
    ($($variant:ident => $ty:ident),+ $(,)?) => {
        /// Every concrete event type, as a fieldless discriminator.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum EventType {
            $($variant,)+
        }

        impl EventType {
            /// Every registered event type, in declaration order.
            pub const ALL: &'static [EventType] = &[$(EventType::$variant,)+];

            /// The concrete type name carried in the message-type property.
            #[must_use]
            pub fn name(self) -> &'static str {
                match self {
                    $(Self::$variant => stringify!($ty),)+
                }
            }

            /// Looks up an event type by its concrete type name.
            #[must_use]
            pub fn from_name(name: &str) -> Option<Self> {
                match name {
                    $(stringify!($ty) => Some(Self::$variant),)+
                    _ => None,
                }
            }
        }

        /// A decoded domain event of any registered type.
        #[derive(Debug, Clone, PartialEq)]
        pub enum KanbanEvent {
            $($variant($ty),)+
        }

        impl KanbanEvent {
            /// Returns the discriminator of this event.
            #[must_use]
            pub fn kind(&self) -> EventType {
                match self {
                    $(Self::$variant(_) => EventType::$variant,)+
                }
            }

            /// Decodes a wire body as the given event type.
            ///
            /// # Errors
            ///
            /// Returns the `serde_json` error when the body is not a valid
            /// encoding of that type. A JSON `null` body is an error.
            pub fn decode(event_type: EventType, body: &[u8]) -> Result<Self, serde_json::Error> {
                match event_type {
                    $(EventType::$variant => serde_json::from_slice::<$ty>(body).map(Self::$variant),)+
                }
            }

            /// The entity this event is about.
            #[must_use]
            pub fn target(&self) -> EntityRef {
                match self {
                    $(Self::$variant(e) => e.target(),)+
                }
            }

            /// The workspace/board/list/card scope of this event.
            #[must_use]
            pub fn scope(&self) -> EventScope {
                match self {
                    $(Self::$variant(e) => e.scope(),)+
                }
            }
        }

        impl DomainEvent for KanbanEvent {
            fn event_type(&self) -> &'static str {
                self.kind().name()
            }

            fn context(&self) -> &EventContext {
                match self {
                    $(Self::$variant(e) => &e.context,)+
                }
            }

            fn to_body(&self) -> Result<Vec<u8>, serde_json::Error> {
                match self {
                    $(Self::$variant(e) => serde_json::to_vec(e),)+
                }
            }
        }

        $(
            impl From<$ty> for KanbanEvent {
                fn from(event: $ty) -> Self {
                    Self::$variant(event)
                }
            }

            impl DomainEvent for $ty {
                fn event_type(&self) -> &'static str {
                    stringify!($ty)
                }

                fn context(&self) -> &EventContext {
                    &self.context
                }

                fn to_body(&self) -> Result<Vec<u8>, serde_json::Error> {
                    serde_json::to_vec(self)
                }
            }
        )+
    };
}

event_catalog! {
    WorkspaceCreated => WorkspaceCreatedEvent,
    WorkspaceUpdated => WorkspaceUpdatedEvent,
    WorkspaceDeleted => WorkspaceDeletedEvent,
    BoardCreated => BoardCreatedEvent,
    BoardUpdated => BoardUpdatedEvent,
    BoardDeleted => BoardDeletedEvent,
    BoardArchived => BoardArchivedEvent,
    BoardMemberAssigned => BoardMemberAssignedEvent,
    BoardMemberUnassigned => BoardMemberUnassignedEvent,
    ListCreated => ListCreatedEvent,
    ListUpdated => ListUpdatedEvent,
    ListDeleted => ListDeletedEvent,
    ListMoved => ListMovedEvent,
    CardCreated => CardCreatedEvent,
    CardUpdated => CardUpdatedEvent,
    CardDeleted => CardDeletedEvent,
    CardMoved => CardMovedEvent,
    CardMemberAssigned => CardMemberAssignedEvent,
    CardMemberUnassigned => CardMemberUnassignedEvent,
    CardDueDateChanged => CardDueDateChangedEvent,
    MemberInvited => MemberInvitedEvent,
    MemberJoined => MemberJoinedEvent,
    MemberRemoved => MemberRemovedEvent,
    MemberLeft => MemberLeftEvent,
    MemberRoleChanged => MemberRoleChangedEvent,
    CommentCreated => CommentCreatedEvent,
    CommentUpdated => CommentUpdatedEvent,
    CommentDeleted => CommentDeletedEvent,
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
