//! Core data models — push events and persisted build outcomes.

pub mod build;
pub mod push_event;
