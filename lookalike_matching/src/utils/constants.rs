// src/utils/constants.rs

/// Query type prefix for lookalike result cache keys.
pub const LOOKALIKE_QUERY_TYPE: &str = "find_lookalikes";

/// Effective score floor when the target has LLM-expanded specialties, so
/// similar-specialty tiers (55/75) can surface.
pub const EXPANDED_EFFECTIVE_THRESHOLD: u8 = 55;

/// Effective score floor without expansions: city-only (65) and above.
pub const DEFAULT_EFFECTIVE_THRESHOLD: u8 = 65;

/// Scores live on a 0-100 scale; thresholds above this are rejected.
pub const MAX_SIMILARITY_THRESHOLD: u8 = 100;
