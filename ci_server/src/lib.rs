//! Relay CI — minimal continuous-integration orchestrator.
//!
//! Receives GitHub push webhooks, runs a three-stage pipeline
//! (install → compile → test) against the pushed commit, appends the
//! outcome to a durable build history, and reports pending/success/failure
//! commit statuses back to GitHub. History is served over a read-only
//! JSON API.

pub mod config;
pub mod intake;
pub mod metrics;
pub mod models;
pub mod routes;
pub mod services;
pub mod store;
