// src/models/results.rs
use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::sync::Arc;

use crate::models::organization::Organization;
use crate::utils::constants::MAX_SIMILARITY_THRESHOLD;

/// One rung of the fixed similarity table. Exactly one tier applies to any
/// (target, candidate) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SimilarityTier {
    /// State-only or state mismatch; not a useful signal on its own.
    NoMatch,
    SimilarSpecialty,
    SameCity,
    SameCitySimilarSpecialty,
    SameSpecialty,
    SameCitySameSpecialty,
}

impl SimilarityTier {
    pub fn score(&self) -> u8 {
        match self {
            SimilarityTier::SameCitySameSpecialty => 95,
            SimilarityTier::SameSpecialty => 85,
            SimilarityTier::SameCitySimilarSpecialty => 75,
            SimilarityTier::SameCity => 65,
            SimilarityTier::SimilarSpecialty => 55,
            SimilarityTier::NoMatch => 0,
        }
    }

    pub fn label(&self) -> Option<&'static str> {
        match self {
            SimilarityTier::SameCitySameSpecialty => Some("Same city, same state, same specialty"),
            SimilarityTier::SameSpecialty => Some("Same state, same specialty"),
            SimilarityTier::SameCitySimilarSpecialty => Some("Same city, same state, similar specialty"),
            SimilarityTier::SameCity => Some("Same city, same state"),
            SimilarityTier::SimilarSpecialty => Some("Same state, similar specialty"),
            SimilarityTier::NoMatch => None,
        }
    }

    pub fn from_score(score: u8) -> Self {
        match score {
            95 => SimilarityTier::SameCitySameSpecialty,
            85 => SimilarityTier::SameSpecialty,
            75 => SimilarityTier::SameCitySimilarSpecialty,
            65 => SimilarityTier::SameCity,
            55 => SimilarityTier::SimilarSpecialty,
            _ => SimilarityTier::NoMatch,
        }
    }
}

/// A candidate with its similarity score and reasons attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredOrganization {
    #[serde(flatten)]
    pub organization: Organization,
    /// Bare website host, derived once when the result is created.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    pub similarity_score: u8,
    pub match_reasons: Vec<String>,
}

impl ScoredOrganization {
    pub fn new(organization: Organization, similarity_score: u8, match_reasons: Vec<String>) -> Self {
        let domain = organization.domain();
        Self {
            organization,
            domain,
            similarity_score,
            match_reasons,
        }
    }
}

/// The full, sorted, unpaginated outcome of one scoring run. This is what
/// the result cache stores; every page request slices it.
#[derive(Debug, Clone, PartialEq)]
pub struct LookalikeResultSet {
    pub organizations: Vec<ScoredOrganization>,
}

impl LookalikeResultSet {
    pub fn total_matches(&self) -> usize {
        self.organizations.len()
    }
}

pub type SharedResultSet = Arc<LookalikeResultSet>;

fn default_threshold() -> u8 {
    85
}

fn bounded_threshold<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let threshold = u8::deserialize(deserializer)?;
    if threshold > MAX_SIMILARITY_THRESHOLD {
        return Err(de::Error::custom(format!(
            "similarity_threshold must be at most {}, got {}",
            MAX_SIMILARITY_THRESHOLD, threshold
        )));
    }
    Ok(threshold)
}

fn default_true() -> bool {
    true
}

fn default_page() -> usize {
    1
}

fn default_page_size() -> usize {
    10
}

/// Caller-facing parameters of a lookalike search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookalikeRequest {
    /// Any deal/company properties; state is resolved from them.
    pub company_data: Map<String, JsonValue>,
    #[serde(default = "default_threshold", deserialize_with = "bounded_threshold")]
    pub similarity_threshold: u8,
    #[serde(default)]
    pub max_results: Option<usize>,
    #[serde(default = "default_true")]
    pub include_contacts: bool,
    #[serde(default = "default_page")]
    pub page: usize,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default = "default_true")]
    pub use_cache: bool,
}

impl LookalikeRequest {
    pub fn new(company_data: Map<String, JsonValue>) -> Self {
        Self {
            company_data,
            similarity_threshold: default_threshold(),
            max_results: None,
            include_contacts: true,
            page: default_page(),
            page_size: default_page_size(),
            use_cache: true,
        }
    }

    pub fn with_page(mut self, page: usize, page_size: usize) -> Self {
        self.page = page;
        self.page_size = page_size;
        self
    }

    pub fn with_max_results(mut self, max_results: Option<usize>) -> Self {
        self.max_results = max_results;
        self
    }

    /// Values above 100 are clamped.
    pub fn with_threshold(mut self, similarity_threshold: u8) -> Self {
        self.similarity_threshold = similarity_threshold.min(MAX_SIMILARITY_THRESHOLD);
        self
    }

    pub fn with_contacts(mut self, include_contacts: bool) -> Self {
        self.include_contacts = include_contacts;
        self
    }

    pub fn with_cache(mut self, use_cache: bool) -> Self {
        self.use_cache = use_cache;
        self
    }
}

/// One page of lookalike results.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LookalikeResponse {
    pub source_company: Map<String, JsonValue>,
    pub total_matches: usize,
    /// The caller's nominal threshold, not the effective one used for filtering.
    pub similarity_threshold: u8,
    pub page: usize,
    pub page_size: usize,
    pub total_pages: usize,
    pub lookalike_organizations: Vec<ScoredOrganization>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tier_scores_are_strictly_ordered() {
        let tiers = [
            SimilarityTier::SameCitySameSpecialty,
            SimilarityTier::SameSpecialty,
            SimilarityTier::SameCitySimilarSpecialty,
            SimilarityTier::SameCity,
            SimilarityTier::SimilarSpecialty,
            SimilarityTier::NoMatch,
        ];
        let scores: Vec<u8> = tiers.iter().map(|t| t.score()).collect();
        assert_eq!(scores, vec![95, 85, 75, 65, 55, 0]);
        for window in tiers.windows(2) {
            assert!(window[0] > window[1]);
        }
        for tier in tiers {
            assert_eq!(SimilarityTier::from_score(tier.score()), tier);
        }
    }

    #[test]
    fn test_request_defaults_from_json() {
        let request: LookalikeRequest =
            serde_json::from_value(json!({ "company_data": { "state": "TX" } })).unwrap();
        assert_eq!(request.similarity_threshold, 85);
        assert_eq!(request.max_results, None);
        assert!(request.include_contacts);
        assert_eq!(request.page, 1);
        assert_eq!(request.page_size, 10);
        assert!(request.use_cache);
    }

    #[test]
    fn test_threshold_above_one_hundred_is_rejected() {
        let ok: LookalikeRequest = serde_json::from_value(json!({
            "company_data": {},
            "similarity_threshold": 100,
        }))
        .unwrap();
        assert_eq!(ok.similarity_threshold, 100);

        let err = serde_json::from_value::<LookalikeRequest>(json!({
            "company_data": {},
            "similarity_threshold": 150,
        }))
        .unwrap_err();
        assert!(err.to_string().contains("at most 100"));
    }

    #[test]
    fn test_builder_clamps_threshold() {
        let request = LookalikeRequest::new(Map::new()).with_threshold(250);
        assert_eq!(request.similarity_threshold, 100);
        assert_eq!(LookalikeRequest::new(Map::new()).with_threshold(70).similarity_threshold, 70);
    }

    #[test]
    fn test_scored_organization_flattens_fields() {
        let scored = ScoredOrganization::new(
            Organization::new("D-1"),
            85,
            vec!["Same state, same specialty".to_string()],
        );
        let value = serde_json::to_value(&scored).unwrap();
        assert_eq!(value["definitive_id"], "D-1");
        assert_eq!(value["similarity_score"], 85);
        assert!(value["physicians"].as_array().unwrap().is_empty());
        assert!(value.get("domain").is_none());
    }

    #[test]
    fn test_scored_organization_derives_domain_from_website() {
        let mut organization = Organization::new("D-2");
        organization.website = Some("www.AustinHeart.com".to_string());
        let scored = ScoredOrganization::new(organization, 95, Vec::new());
        assert_eq!(scored.domain.as_deref(), Some("austinheart.com"));
        let value = serde_json::to_value(&scored).unwrap();
        assert_eq!(value["domain"], "austinheart.com");
        assert_eq!(value["website"], "www.AustinHeart.com");
    }
}
