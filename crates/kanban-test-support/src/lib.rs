//! Shared test doubles for the Kanban event distribution layer.
//!
//! Every collaborator port in `kanban-core` has a recording implementation
//! that keeps what it was given and a failing one that always errors.

mod activity;
mod clock;
mod membership;
mod notification;
mod realtime;

pub use activity::{FailingActivityRepository, FlakyActivityRepository, RecordingActivityRepository};
pub use clock::FixedClock;
pub use membership::{FailingMembershipDirectory, StaticMembershipDirectory};
pub use notification::{
    FailingNotificationRepository, FlakyNotificationRepository, RecordingNotificationRepository,
};
pub use realtime::{FailingRealtimeSink, RecordingRealtimeSink};
