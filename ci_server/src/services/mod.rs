//! Orchestration services — pipeline execution, status reporting,
//! per-event build coordination.

pub mod github_service;
pub mod orchestrator;
pub mod runner;
