// src/matching/scoring.rs
//! Tiered similarity between a target profile and one candidate organization.
//!
//! | Tier | Condition                                   | Score |
//! |------|---------------------------------------------|-------|
//! | 1    | same city + same state + same specialty     | 95    |
//! | 2    | same state + same specialty                 | 85    |
//! | 3    | same city + same state + similar specialty  | 75    |
//! | 4    | same city + same state                      | 65    |
//! | 5    | same state + similar specialty              | 55    |
//! | -    | anything else                               | 0     |
//!
//! A state mismatch is always 0. "Same" specialty means a substring or
//! specialty-matcher hit against the target's own specialties; "similar"
//! means the same test against its expanded specialties.

use crate::matching::specialty::is_related;
use crate::models::organization::Organization;
use crate::models::results::SimilarityTier;
use crate::models::target::ScoringContext;

/// Separator between the city, state and specialty parts of a reason line.
pub const REASON_DETAIL_SEPARATOR: &str = " · ";

fn field_lower(value: &Option<String>) -> String {
    value.as_deref().unwrap_or("").trim().to_lowercase()
}

fn specialty_hit(target_specialty: &str, candidate_specialty: &str) -> bool {
    candidate_specialty.contains(target_specialty)
        || target_specialty.contains(candidate_specialty)
        || is_related(target_specialty, candidate_specialty)
}

/// Determines which tier a candidate falls into.
pub fn classify(ctx: &ScoringContext, candidate: &Organization) -> SimilarityTier {
    let candidate_state = field_lower(&candidate.state).to_uppercase();
    if ctx.state.is_empty() || candidate_state.is_empty() || ctx.state != candidate_state {
        return SimilarityTier::NoMatch;
    }

    let candidate_city = field_lower(&candidate.city);
    let city_match = match ctx.city.as_deref() {
        Some(city) => !candidate_city.is_empty() && candidate_city.contains(city),
        None => false,
    };

    let candidate_specialty = field_lower(&candidate.combined_main_specialty);
    let mut same_specialty = false;
    let mut similar_specialty = false;
    if !candidate_specialty.is_empty() {
        same_specialty = ctx
            .specialties
            .iter()
            .any(|spec| specialty_hit(spec, &candidate_specialty));

        if !same_specialty {
            similar_specialty = ctx
                .expanded_specialties
                .iter()
                .any(|spec| specialty_hit(spec, &candidate_specialty));
        }
    }

    match (city_match, same_specialty, similar_specialty) {
        (true, true, _) => SimilarityTier::SameCitySameSpecialty,
        (false, true, _) => SimilarityTier::SameSpecialty,
        (true, false, true) => SimilarityTier::SameCitySimilarSpecialty,
        (true, false, false) => SimilarityTier::SameCity,
        (false, false, true) => SimilarityTier::SimilarSpecialty,
        (false, false, false) => SimilarityTier::NoMatch,
    }
}

/// Similarity score in 0..=100 for one (target, candidate) pair.
pub fn calculate_similarity_score(ctx: &ScoringContext, candidate: &Organization) -> u8 {
    classify(ctx, candidate).score()
}

/// Human-readable reasons for a score: the tier label (if any), then a
/// "city · state · specialty" line built from the candidate's non-empty fields.
pub fn get_match_reasons(candidate: &Organization, score: u8) -> Vec<String> {
    let mut reasons = Vec::new();

    if let Some(label) = SimilarityTier::from_score(score).label() {
        reasons.push(label.to_string());
    }

    let city = candidate.city.as_deref().unwrap_or("").trim().to_string();
    let state = candidate.state.as_deref().unwrap_or("").trim().to_uppercase();
    let specialty = candidate
        .combined_main_specialty
        .as_deref()
        .unwrap_or("")
        .trim()
        .to_string();

    let details: Vec<String> = [city, state, specialty]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect();
    if !details.is_empty() {
        reasons.push(details.join(REASON_DETAIL_SEPARATOR));
    }

    reasons
}

/// Scores one candidate and builds its reasons in a single call.
pub fn score_single_org(ctx: &ScoringContext, candidate: &Organization) -> (u8, Vec<String>) {
    let score = calculate_similarity_score(ctx, candidate);
    let reasons = get_match_reasons(candidate, score);
    (score, reasons)
}
