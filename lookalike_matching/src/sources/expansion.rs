// src/sources/expansion.rs
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use log::{debug, warn};
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use crate::sources::SpecialtyExpander;
use crate::utils::config::EngineConfig;

struct ExpansionEntry {
    related: Vec<String>,
    cached_at: DateTime<Utc>,
    ttl: Duration,
}

impl ExpansionEntry {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now - self.cached_at < self.ttl
    }
}

/// Wraps an expander with TTL caching, vocabulary validation and a result cap.
///
/// Successful expansions live for the success TTL. A failing inner expander
/// is remembered as "no expansions" for the shorter failure TTL, so an
/// unavailable service is asked again only after that window.
pub struct CachingSpecialtyExpander<E> {
    inner: E,
    entries: Mutex<HashMap<String, ExpansionEntry>>,
    success_ttl: Duration,
    failure_ttl: Duration,
    max_expansions: usize,
    /// Lower-cased allowed specialties; `None` accepts anything.
    vocabulary: Option<HashSet<String>>,
}

impl<E: SpecialtyExpander> CachingSpecialtyExpander<E> {
    pub fn new(inner: E, config: &EngineConfig) -> Self {
        Self {
            inner,
            entries: Mutex::new(HashMap::new()),
            success_ttl: Duration::seconds(config.expansion_ttl_secs),
            failure_ttl: Duration::seconds(config.expansion_failure_ttl_secs),
            max_expansions: config.max_expansions_per_specialty,
            vocabulary: None,
        }
    }

    /// Restricts results to a controlled list of known specialties.
    pub fn with_vocabulary<I, S>(mut self, vocabulary: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let vocabulary: HashSet<String> = vocabulary
            .into_iter()
            .map(|s| s.as_ref().trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();
        debug!("Specialty vocabulary loaded with {} entries", vocabulary.len());
        self.vocabulary = Some(vocabulary);
        self
    }

    fn lock_entries(&self) -> MutexGuard<'_, HashMap<String, ExpansionEntry>> {
        self.entries.lock().unwrap_or_else(|poisoned| {
            warn!("Expansion cache lock poisoned, recovering");
            poisoned.into_inner()
        })
    }

    pub fn cached_len(&self) -> usize {
        self.lock_entries().len()
    }

    /// Expands `specialty` as of `now`.
    pub async fn expand_at(&self, specialty: &str, now: DateTime<Utc>) -> Vec<String> {
        let key = specialty.trim().to_lowercase();
        if key.is_empty() {
            return Vec::new();
        }

        if let Some(related) = self.lookup(&key, now) {
            debug!("Expansion cache hit for '{}'", key);
            return related;
        }

        let (related, ttl) = match self.inner.expand(specialty.trim()).await {
            Ok(raw) => (self.clean(&key, raw), self.success_ttl),
            Err(e) => {
                warn!(
                    "Specialty expansion failed for '{}', caching empty result: {:#}",
                    key, e
                );
                (Vec::new(), self.failure_ttl)
            }
        };

        self.store(key, related.clone(), ttl, now);
        related
    }

    fn lookup(&self, key: &str, now: DateTime<Utc>) -> Option<Vec<String>> {
        self.lock_entries()
            .get(key)
            .filter(|entry| entry.is_fresh(now))
            .map(|entry| entry.related.clone())
    }

    fn store(&self, key: String, related: Vec<String>, ttl: Duration, now: DateTime<Utc>) {
        self.lock_entries().insert(
            key,
            ExpansionEntry {
                related,
                cached_at: now,
                ttl,
            },
        );
    }

    /// Trims, drops the input itself and unknown terms, de-duplicates
    /// case-insensitively, then caps.
    fn clean(&self, key: &str, raw: Vec<String>) -> Vec<String> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut related = Vec::new();

        for candidate in raw {
            if related.len() >= self.max_expansions {
                break;
            }
            let candidate = candidate.trim().to_string();
            let lowered = candidate.to_lowercase();
            if lowered.is_empty() || lowered == key {
                continue;
            }
            if let Some(vocabulary) = &self.vocabulary {
                if !vocabulary.contains(&lowered) {
                    debug!("Dropping '{}': not in specialty vocabulary", candidate);
                    continue;
                }
            }
            if seen.insert(lowered) {
                related.push(candidate);
            }
        }
        related
    }
}

#[async_trait]
impl<E: SpecialtyExpander> SpecialtyExpander for CachingSpecialtyExpander<E> {
    async fn expand(&self, specialty: &str) -> Result<Vec<String>> {
        Ok(self.expand_at(specialty, Utc::now()).await)
    }
}
