//! Application layer of the notification projection.

pub mod center;
pub mod projector;
