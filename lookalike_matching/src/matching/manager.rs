// src/matching/manager.rs - Lookalike search entry point
use log::{debug, warn};
use serde_json::Value as JsonValue;
use std::panic;
use std::sync::Arc;

use crate::cache::result_cache::{CacheKeyBuilder, SharedResultCache};
use crate::matching::aggregation::{aggregate_rows, retain_valid_contacts};
use crate::matching::orchestrator::{ScoringOrchestrator, WorkerPolicy};
use crate::matching::pagination::{effective_threshold, finalize_results, paginate};
use crate::models::errors::LookalikeError;
use crate::models::results::{LookalikeRequest, LookalikeResponse, LookalikeResultSet, SharedResultSet};
use crate::models::target::{ScoringContext, TargetProfile};
use crate::sources::{OrganizationDataSource, OrganizationQuery, SpecialtyExpander};
use crate::utils::config::EngineConfig;
use crate::utils::constants::LOOKALIKE_QUERY_TYPE;
use crate::utils::logging::LookalikeLogger;

/// Cache key over everything that changes the full result set. Page and
/// page size are left out so one entry serves every page.
pub fn build_cache_key(ctx: &ScoringContext, request: &LookalikeRequest) -> String {
    let mut expanded = ctx.expanded_specialties.clone();
    expanded.sort();

    CacheKeyBuilder::new(LOOKALIKE_QUERY_TYPE)
        .param("state", ctx.state.as_str())
        .param("city", ctx.city.clone())
        .param("specialties", ctx.specialties.clone())
        .param("expanded_specialties", expanded)
        .param("threshold", request.similarity_threshold)
        .param("max_results", request.max_results)
        .param("include_contacts", request.include_contacts)
        .build()
}

/// Slices a full result set for one request. The echoed company data is the
/// caller's, even when the set came from an equivalent cached query.
fn build_response(result_set: &LookalikeResultSet, request: &LookalikeRequest) -> LookalikeResponse {
    let slice = paginate(&result_set.organizations, request.page, request.page_size);
    LookalikeResponse {
        source_company: request.company_data.clone(),
        total_matches: slice.total,
        similarity_threshold: request.similarity_threshold,
        page: slice.page,
        page_size: slice.page_size,
        total_pages: slice.total_pages,
        lookalike_organizations: slice.items,
    }
}

/// Finds organizations that resemble a target by geography and specialty.
///
/// The result cache is injected so several engines (or tests) can share or
/// isolate it explicitly.
pub struct LookalikeEngine<D, E> {
    data_source: D,
    expander: E,
    cache: SharedResultCache<SharedResultSet>,
    orchestrator: Arc<ScoringOrchestrator>,
}

impl<D, E> LookalikeEngine<D, E>
where
    D: OrganizationDataSource,
    E: SpecialtyExpander,
{
    pub fn new(
        data_source: D,
        expander: E,
        cache: SharedResultCache<SharedResultSet>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            data_source,
            expander,
            cache,
            orchestrator: Arc::new(ScoringOrchestrator::new(WorkerPolicy::from_config(config))),
        }
    }

    pub fn cache(&self) -> &SharedResultCache<SharedResultSet> {
        &self.cache
    }

    /// Related specialties for every target specialty, minus the target's own
    /// specialties, de-duplicated case-insensitively in first-seen order.
    /// A failing expander contributes nothing.
    pub async fn resolve_expanded_specialties(&self, target: &TargetProfile) -> Vec<String> {
        let own: Vec<String> = target.specialties.iter().map(|s| s.to_lowercase()).collect();
        let mut seen: Vec<String> = Vec::new();
        let mut expanded = Vec::new();

        for specialty in &target.specialties {
            let related = match self.expander.expand(specialty).await {
                Ok(related) => related,
                Err(e) => {
                    warn!("Specialty expansion failed for '{}': {:#}", specialty, e);
                    Vec::new()
                }
            };
            for candidate in related {
                let candidate = candidate.trim().to_string();
                let lowered = candidate.to_lowercase();
                if lowered.is_empty() || own.contains(&lowered) || seen.contains(&lowered) {
                    continue;
                }
                seen.push(lowered);
                expanded.push(candidate);
            }
        }
        expanded
    }

    pub async fn find_lookalikes(&self, request: &LookalikeRequest) -> Result<LookalikeResponse, LookalikeError> {
        let logger = LookalikeLogger::new();

        let target = match TargetProfile::from_company_data(&request.company_data) {
            Ok(target) => target,
            Err(e) => {
                logger.log_error(&e.to_string());
                return Err(e);
            }
        };

        let expanded = self.resolve_expanded_specialties(&target).await;
        let ctx = ScoringContext::new(&target, &expanded);
        logger.log_resolved_parameters(&ctx, &target.specialties);

        let cache_key = build_cache_key(&ctx, request);
        if request.use_cache {
            if let Some(cached) = self.cache.get(&cache_key) {
                logger.log_cache_hit(cached.total_matches(), request.page, request.page_size);
                return Ok(build_response(&cached, request));
            }
            logger.log_cache_miss();
        }

        let query = OrganizationQuery::new(&ctx.state, request.include_contacts)
            .with_specialty_filters(target.specialties.iter().chain(expanded.iter()));
        logger.log_phase(
            "Fetching",
            Some(format!("{} specialty filters", query.specialty_filters.len()).as_str()),
        );

        let rows = match self.data_source.fetch_organizations(&query).await {
            Ok(rows) => rows,
            Err(e) => {
                logger.log_error(&format!("Organization query failed: {:#}", e));
                return Err(LookalikeError::data_source(&e, &request.company_data));
            }
        };
        logger.log_data_loaded(rows.len(), "organization");

        let (mut organizations, stats) = aggregate_rows(rows, request.include_contacts);
        organizations.iter_mut().for_each(retain_valid_contacts);
        logger.log_aggregation(stats.rows, stats.organizations, stats.physicians, stats.executives);
        if stats.contacts_rejected > 0 {
            logger.log_debug(&format!("{} contacts without a reachable channel dropped", stats.contacts_rejected));
        }

        // Scoring is CPU-bound; keep it off the async workers.
        let orchestrator = Arc::clone(&self.orchestrator);
        let scoring_ctx = ctx.clone();
        let scoring = tokio::task::spawn_blocking(move || orchestrator.score_all(&scoring_ctx, organizations));
        let outcome = match scoring.await {
            Ok(outcome) => outcome,
            Err(e) if e.is_panic() => panic::resume_unwind(e.into_panic()),
            Err(e) => {
                logger.log_error(&format!("Scoring task did not complete: {}", e));
                return Err(LookalikeError::data_source(&anyhow::Error::new(e), &request.company_data));
            }
        };
        logger.log_phase("Scoring", Some(format!("{:?}", outcome.strategy).as_str()));
        if outcome.fell_back_to_serial {
            logger.log_warning("Parallel scoring unavailable, scored serially");
        }

        let scored_count = outcome.scored.len();
        let threshold = effective_threshold(&ctx);
        let kept = finalize_results(outcome.scored, threshold, request.max_results);
        logger.log_filtering_results(scored_count, kept.len(), threshold);

        let result_set: SharedResultSet = Arc::new(LookalikeResultSet { organizations: kept });
        if request.use_cache {
            debug!("Caching {} matches", result_set.total_matches());
            self.cache.put(cache_key, result_set.clone());
        }

        let response = build_response(&result_set, request);
        logger.log_completion(response.total_matches, response.total_pages);
        Ok(response)
    }
}

/// Convenience for callers holding raw JSON rather than a typed request.
pub fn request_from_json(value: JsonValue) -> anyhow::Result<LookalikeRequest> {
    Ok(serde_json::from_value(value)?)
}
