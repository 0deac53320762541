// src/utils/config.rs

use log::debug;
use std::env;
use std::str::FromStr;

/// Tunables for the lookalike engine, resolved once at start-up.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Seconds a cached result set stays readable
    pub cache_ttl_secs: i64,
    /// Maximum number of distinct queries kept in the result cache
    pub cache_capacity: usize,
    /// Hard cap on scoring workers regardless of core count
    pub max_workers: usize,
    /// Candidate count that must be exceeded before scoring goes parallel
    pub parallel_threshold: usize,
    /// Hardware parallelism visible to the process
    pub available_parallelism: usize,
    /// Seconds a successful specialty expansion stays cached
    pub expansion_ttl_secs: i64,
    /// Seconds a failed specialty expansion is remembered as empty
    pub expansion_failure_ttl_secs: i64,
    /// Most related specialties kept per input specialty
    pub max_expansions_per_specialty: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: 3600,
            cache_capacity: 1000,
            max_workers: 8,
            parallel_threshold: 10,
            available_parallelism: num_cpus::get(),
            expansion_ttl_secs: 86_400,
            expansion_failure_ttl_secs: 300,
            max_expansions_per_specialty: 2,
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

impl EngineConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let config = Self {
            cache_ttl_secs: env_or("LOOKALIKE_CACHE_TTL_SECS", defaults.cache_ttl_secs),
            cache_capacity: env_or("LOOKALIKE_CACHE_SIZE", defaults.cache_capacity),
            max_workers: env_or("LOOKALIKE_MAX_WORKERS", defaults.max_workers),
            parallel_threshold: env_or(
                "LOOKALIKE_PARALLEL_THRESHOLD",
                defaults.parallel_threshold,
            ),
            available_parallelism: env_or(
                "LOOKALIKE_AVAILABLE_PARALLELISM",
                defaults.available_parallelism,
            ),
            expansion_ttl_secs: env_or("LOOKALIKE_EXPANSION_TTL_SECS", defaults.expansion_ttl_secs),
            expansion_failure_ttl_secs: env_or(
                "LOOKALIKE_EXPANSION_FAILURE_TTL_SECS",
                defaults.expansion_failure_ttl_secs,
            ),
            max_expansions_per_specialty: env_or(
                "LOOKALIKE_MAX_EXPANSIONS",
                defaults.max_expansions_per_specialty,
            ),
        };
        debug!("Engine config: {:?}", config);
        config
    }

    /// Forces a specific core count, e.g. to pin the scoring path in tests.
    pub fn with_available_parallelism(mut self, available_parallelism: usize) -> Self {
        self.available_parallelism = available_parallelism;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.cache_ttl_secs, 3600);
        assert_eq!(config.max_workers, 8);
        assert_eq!(config.parallel_threshold, 10);
        assert_eq!(config.expansion_ttl_secs, 86_400);
        assert_eq!(config.expansion_failure_ttl_secs, 300);
        assert_eq!(config.max_expansions_per_specialty, 2);
        assert!(config.available_parallelism >= 1);
    }

    #[test]
    fn test_env_config() {
        env::set_var("LOOKALIKE_CACHE_TTL_SECS", "120");
        env::set_var("LOOKALIKE_CACHE_SIZE", "50");
        env::set_var("LOOKALIKE_MAX_WORKERS", "4");
        env::set_var("LOOKALIKE_PARALLEL_THRESHOLD", "not-a-number");
        env::set_var("LOOKALIKE_AVAILABLE_PARALLELISM", "2");

        let config = EngineConfig::from_env();
        assert_eq!(config.cache_ttl_secs, 120);
        assert_eq!(config.cache_capacity, 50);
        assert_eq!(config.max_workers, 4);
        assert_eq!(config.parallel_threshold, 10);
        assert_eq!(config.available_parallelism, 2);

        // Clean up
        env::remove_var("LOOKALIKE_CACHE_TTL_SECS");
        env::remove_var("LOOKALIKE_CACHE_SIZE");
        env::remove_var("LOOKALIKE_MAX_WORKERS");
        env::remove_var("LOOKALIKE_PARALLEL_THRESHOLD");
        env::remove_var("LOOKALIKE_AVAILABLE_PARALLELISM");
    }

    #[test]
    fn test_with_available_parallelism() {
        let config = EngineConfig::default().with_available_parallelism(1);
        assert_eq!(config.available_parallelism, 1);
    }
}
