//! HTTP routes exposed by the worker.

pub mod health;
