// src/sources/mod.rs
//! Boundaries between the engine and the systems that feed it: where
//! organization rows come from, and who knows which specialties are related.
pub mod expansion;
pub mod postgres;

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{debug, info};
use std::collections::HashMap;
use std::path::Path;

use crate::models::organization::JoinedRow;

pub use expansion::CachingSpecialtyExpander;
pub use postgres::PostgresOrganizationSource;

/// What the engine asks a data source for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrganizationQuery {
    /// Upper-cased state code. Always set.
    pub state: String,
    /// Lower-cased substrings; a row qualifies if its specialty contains any
    /// of them. Empty means no specialty restriction.
    pub specialty_filters: Vec<String>,
    pub include_contacts: bool,
}

impl OrganizationQuery {
    pub fn new(state: &str, include_contacts: bool) -> Self {
        Self {
            state: state.trim().to_uppercase(),
            specialty_filters: Vec::new(),
            include_contacts,
        }
    }

    /// Adds filters, skipping blanks and case-insensitive duplicates.
    pub fn with_specialty_filters<I, S>(mut self, filters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for filter in filters {
            let filter = filter.as_ref().trim().to_lowercase();
            if !filter.is_empty() && !self.specialty_filters.contains(&filter) {
                self.specialty_filters.push(filter);
            }
        }
        self
    }

    /// `%filter%` patterns for a `LIKE ANY` clause.
    pub fn like_patterns(&self) -> Vec<String> {
        self.specialty_filters
            .iter()
            .map(|f| format!("%{}%", f))
            .collect()
    }

    /// Applies the query's filters to one specialty value.
    pub fn matches_specialty(&self, specialty: Option<&str>) -> bool {
        if self.specialty_filters.is_empty() {
            return true;
        }
        let specialty = specialty.unwrap_or("").to_lowercase();
        self.specialty_filters.iter().any(|f| specialty.contains(f.as_str()))
    }
}

/// Produces flat organization × physician × executive rows for a state.
///
/// The engine never builds queries itself; it only depends on this row shape.
#[async_trait]
pub trait OrganizationDataSource: Send + Sync {
    async fn fetch_organizations(&self, query: &OrganizationQuery) -> Result<Vec<JoinedRow>>;
}

/// Returns medically related specialties for one specialty string.
///
/// An empty list means "no similar-specialty signal", never an error.
#[async_trait]
pub trait SpecialtyExpander: Send + Sync {
    async fn expand(&self, specialty: &str) -> Result<Vec<String>>;
}

/// A fixed set of rows held in memory, filtered the same way the Postgres
/// source filters.
#[derive(Debug, Clone, Default)]
pub struct InMemoryOrganizationSource {
    rows: Vec<JoinedRow>,
}

impl InMemoryOrganizationSource {
    pub fn new(rows: Vec<JoinedRow>) -> Self {
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[async_trait]
impl OrganizationDataSource for InMemoryOrganizationSource {
    async fn fetch_organizations(&self, query: &OrganizationQuery) -> Result<Vec<JoinedRow>> {
        let rows: Vec<JoinedRow> = self
            .rows
            .iter()
            .filter(|row| {
                let state = row.organization.state.as_deref().unwrap_or("").trim();
                state.eq_ignore_ascii_case(&query.state)
                    && query.matches_specialty(row.organization.combined_main_specialty.as_deref())
            })
            .map(|row| {
                if query.include_contacts {
                    row.clone()
                } else {
                    JoinedRow::organization_only(row.organization.clone())
                }
            })
            .collect();
        debug!(
            "In-memory source returned {} of {} rows for state {}",
            rows.len(),
            self.rows.len(),
            query.state
        );
        Ok(rows)
    }
}

/// Expander used when no expansion service is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSpecialtyExpansion;

#[async_trait]
impl SpecialtyExpander for NoSpecialtyExpansion {
    async fn expand(&self, _specialty: &str) -> Result<Vec<String>> {
        Ok(Vec::new())
    }
}

/// Lookup-table expander keyed by lower-cased specialty.
#[derive(Debug, Clone, Default)]
pub struct StaticSpecialtyExpander {
    related: HashMap<String, Vec<String>>,
}

impl StaticSpecialtyExpander {
    pub fn new<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, Vec<V>)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let related = entries
            .into_iter()
            .map(|(k, v)| {
                (
                    k.as_ref().trim().to_lowercase(),
                    v.into_iter().map(Into::into).collect(),
                )
            })
            .collect();
        Self { related }
    }

    /// Loads a JSON object of `{ "specialty": ["related", ...] }`.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read expansion map {}", path.display()))?;
        let entries: HashMap<String, Vec<String>> = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse expansion map {}", path.display()))?;
        info!(
            "Loaded {} specialty expansions from {}",
            entries.len(),
            path.display()
        );
        Ok(Self::new(entries))
    }
}

#[async_trait]
impl SpecialtyExpander for StaticSpecialtyExpander {
    async fn expand(&self, specialty: &str) -> Result<Vec<String>> {
        Ok(self
            .related
            .get(&specialty.trim().to_lowercase())
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::organization::{Organization, Physician};

    fn row(id: &str, state: &str, specialty: &str) -> JoinedRow {
        JoinedRow {
            organization: Organization {
                definitive_id: id.to_string(),
                state: Some(state.to_string()),
                combined_main_specialty: Some(specialty.to_string()),
                ..Default::default()
            },
            physician: Some(Physician {
                first_name: Some("Ann".to_string()),
                mobile_phone_primary: Some("512-555-0100".to_string()),
                ..Default::default()
            }),
            executive: None,
        }
    }

    #[test]
    fn test_query_filters_are_normalized_and_deduplicated() {
        let query = OrganizationQuery::new(" tx ", true)
            .with_specialty_filters(["Cardiology", " cardiology ", "", "Internal Medicine"]);
        assert_eq!(query.state, "TX");
        assert_eq!(query.specialty_filters, vec!["cardiology", "internal medicine"]);
        assert_eq!(query.like_patterns(), vec!["%cardiology%", "%internal medicine%"]);
    }

    #[test]
    fn test_matches_specialty() {
        let open = OrganizationQuery::new("TX", true);
        assert!(open.matches_specialty(None));

        let filtered = open.with_specialty_filters(["cardio"]);
        assert!(filtered.matches_specialty(Some("Pediatric Cardiology")));
        assert!(!filtered.matches_specialty(Some("Dermatology")));
        assert!(!filtered.matches_specialty(None));
    }

    #[tokio::test]
    async fn test_in_memory_source_filters_state_and_specialty() {
        let source = InMemoryOrganizationSource::new(vec![
            row("1", "TX", "Cardiology"),
            row("2", "tx", "Dermatology"),
            row("3", "CA", "Cardiology"),
        ]);

        let all_tx = source
            .fetch_organizations(&OrganizationQuery::new("TX", true))
            .await
            .unwrap();
        assert_eq!(all_tx.len(), 2);

        let cardio = source
            .fetch_organizations(&OrganizationQuery::new("TX", true).with_specialty_filters(["cardiology"]))
            .await
            .unwrap();
        assert_eq!(cardio.len(), 1);
        assert_eq!(cardio[0].organization.definitive_id, "1");
        assert!(cardio[0].physician.is_some());
    }

    #[tokio::test]
    async fn test_in_memory_source_drops_contact_columns_when_not_requested() {
        let source = InMemoryOrganizationSource::new(vec![row("1", "TX", "Cardiology")]);
        let rows = source
            .fetch_organizations(&OrganizationQuery::new("TX", false))
            .await
            .unwrap();
        assert!(rows[0].physician.is_none());
    }

    #[tokio::test]
    async fn test_static_expander_is_case_insensitive() {
        let expander = StaticSpecialtyExpander::new(vec![(
            "Cardiology",
            vec!["Internal Medicine", "Vascular Surgery"],
        )]);
        assert_eq!(
            expander.expand(" CARDIOLOGY ").await.unwrap(),
            vec!["Internal Medicine", "Vascular Surgery"]
        );
        assert!(expander.expand("Dermatology").await.unwrap().is_empty());
        assert!(NoSpecialtyExpansion.expand("Cardiology").await.unwrap().is_empty());
    }
}
