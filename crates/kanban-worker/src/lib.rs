//! Kanban event worker.
//!
//! Hosts the activity and notification consumers behind one process, with a
//! small health API. The binary in `main.rs` only reads configuration and
//! calls into this library.

pub mod app;
pub mod config;
pub mod error;
pub mod routes;
pub mod state;
