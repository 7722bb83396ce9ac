//! Application layer of the activity projection.

pub mod projector;
