// src/matching/mod.rs
pub mod aggregation;
pub mod manager;
pub mod orchestrator;
pub mod pagination;
pub mod scoring;
pub mod specialty;

// Re-export the search entry point for a clean API
pub use manager::{build_cache_key, request_from_json, LookalikeEngine};
pub use orchestrator::{ScoringOrchestrator, ScoringStrategy, WorkerPolicy};
