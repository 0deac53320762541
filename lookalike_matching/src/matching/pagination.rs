// src/matching/pagination.rs
use crate::models::results::ScoredOrganization;
use crate::models::target::ScoringContext;
use crate::utils::constants::{DEFAULT_EFFECTIVE_THRESHOLD, EXPANDED_EFFECTIVE_THRESHOLD};

/// One slice of a full result set.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub page_size: usize,
    pub total: usize,
    pub total_pages: usize,
}

/// `ceil(total / page_size)`, or 0 for an empty set.
pub fn total_pages(total: usize, page_size: usize) -> usize {
    let page_size = page_size.max(1);
    if total == 0 {
        0
    } else {
        (total + page_size - 1) / page_size
    }
}

/// Slices page `page` (1-indexed) out of `items`. Pages past the end are
/// empty; `page` and `page_size` below 1 are treated as 1.
pub fn paginate<T: Clone>(items: &[T], page: usize, page_size: usize) -> Page<T> {
    let page = page.max(1);
    let page_size = page_size.max(1);
    let total = items.len();
    let start = (page - 1).saturating_mul(page_size).min(total);
    let end = start.saturating_add(page_size).min(total);

    Page {
        items: items[start..end].to_vec(),
        page,
        page_size,
        total,
        total_pages: total_pages(total, page_size),
    }
}

/// Internal score floor: lowered when expanded specialties are in play so
/// similar-specialty matches are not discarded.
pub fn effective_threshold(ctx: &ScoringContext) -> u8 {
    if ctx.has_expansions() {
        EXPANDED_EFFECTIVE_THRESHOLD
    } else {
        DEFAULT_EFFECTIVE_THRESHOLD
    }
}

pub fn filter_by_threshold(scored: Vec<ScoredOrganization>, threshold: u8) -> Vec<ScoredOrganization> {
    scored
        .into_iter()
        .filter(|s| s.similarity_score >= threshold)
        .collect()
}

/// Highest score first. The sort is stable, so equal scores keep their
/// incoming order.
pub fn sort_by_score(scored: &mut [ScoredOrganization]) {
    scored.sort_by(|a, b| b.similarity_score.cmp(&a.similarity_score));
}

/// Truncates an already-sorted set to at most `max_results` entries.
pub fn apply_max_results(scored: &mut Vec<ScoredOrganization>, max_results: Option<usize>) {
    if let Some(max) = max_results {
        scored.truncate(max);
    }
}

/// Filter, sort, then cap: the order every fresh result set goes through
/// before it is cached.
pub fn finalize_results(
    scored: Vec<ScoredOrganization>,
    threshold: u8,
    max_results: Option<usize>,
) -> Vec<ScoredOrganization> {
    let mut kept = filter_by_threshold(scored, threshold);
    sort_by_score(&mut kept);
    apply_max_results(&mut kept, max_results);
    kept
}
