// src/matching/orchestrator.rs
use anyhow::{anyhow, Context, Result};
use log::{debug, info, warn};
use rayon::prelude::*;
use rayon::ThreadPool;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::matching::scoring::score_single_org;
use crate::models::organization::Organization;
use crate::models::results::ScoredOrganization;
use crate::models::target::ScoringContext;
use crate::utils::config::EngineConfig;

/// How a batch of candidates was (or will be) scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoringStrategy {
    Serial,
    Parallel { workers: usize },
}

/// Decides between the serial path and a bounded worker pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerPolicy {
    pub available_parallelism: usize,
    pub max_workers: usize,
    /// Parallel scoring needs strictly more candidates than this.
    pub parallel_threshold: usize,
}

impl WorkerPolicy {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            available_parallelism: config.available_parallelism,
            max_workers: config.max_workers,
            parallel_threshold: config.parallel_threshold,
        }
    }

    /// `min(available parallelism, candidate count, cap)`
    pub fn worker_count(&self, candidate_count: usize) -> usize {
        self.available_parallelism
            .min(candidate_count)
            .min(self.max_workers)
    }

    pub fn strategy_for(&self, candidate_count: usize) -> ScoringStrategy {
        let workers = self.worker_count(candidate_count);
        if workers > 1 && candidate_count > self.parallel_threshold {
            ScoringStrategy::Parallel { workers }
        } else {
            ScoringStrategy::Serial
        }
    }
}

impl Default for WorkerPolicy {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

/// Result of one scoring run.
#[derive(Debug, Clone)]
pub struct ScoringOutcome {
    /// One entry per input candidate, in input order.
    pub scored: Vec<ScoredOrganization>,
    /// The strategy that actually produced `scored`.
    pub strategy: ScoringStrategy,
    /// True when the parallel path failed and everything was re-scored serially.
    pub fell_back_to_serial: bool,
}

type PoolBuilder = fn(usize) -> Result<ThreadPool>;

fn build_scoring_pool(workers: usize) -> Result<ThreadPool> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("lookalike-scorer-{}", i))
        .build()
        .context("Failed to build scoring worker pool")
}

/// Fans candidate scoring out across a bounded worker pool.
///
/// Every (target, candidate) pair is independent, so workers share nothing
/// but read-only references. If the parallel path fails in any way (pool
/// construction, worker panic) the whole batch is re-scored serially.
///
/// The pool is built lazily and reused until a run needs a different
/// worker count.
#[derive(Debug)]
pub struct ScoringOrchestrator {
    policy: WorkerPolicy,
    build_pool: PoolBuilder,
    pool: Mutex<Option<Arc<ThreadPool>>>,
    pools_built: AtomicUsize,
}

impl Default for ScoringOrchestrator {
    fn default() -> Self {
        Self::new(WorkerPolicy::default())
    }
}

impl ScoringOrchestrator {
    pub fn new(policy: WorkerPolicy) -> Self {
        Self::with_pool_builder(policy, build_scoring_pool)
    }

    pub(crate) fn with_pool_builder(policy: WorkerPolicy, build_pool: PoolBuilder) -> Self {
        Self {
            policy,
            build_pool,
            pool: Mutex::new(None),
            pools_built: AtomicUsize::new(0),
        }
    }

    fn pool_for(&self, workers: usize) -> Result<Arc<ThreadPool>> {
        let mut cached = self.pool.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(pool) = cached.as_ref() {
            if pool.current_num_threads() == workers {
                return Ok(Arc::clone(pool));
            }
        }
        let pool = Arc::new((self.build_pool)(workers)?);
        self.pools_built.fetch_add(1, Ordering::Relaxed);
        debug!("Built scoring pool with {} workers", workers);
        *cached = Some(Arc::clone(&pool));
        Ok(pool)
    }

    pub fn score_all(&self, ctx: &ScoringContext, candidates: Vec<Organization>) -> ScoringOutcome {
        self.score_all_with(ctx, candidates, score_single_org)
    }

    /// Same as [`score_all`](Self::score_all) with a caller-supplied scorer.
    pub fn score_all_with<F>(
        &self,
        ctx: &ScoringContext,
        candidates: Vec<Organization>,
        scorer: F,
    ) -> ScoringOutcome
    where
        F: Fn(&ScoringContext, &Organization) -> (u8, Vec<String>) + Sync,
    {
        let planned = self.policy.strategy_for(candidates.len());
        let mut fell_back_to_serial = false;

        let (scores, strategy) = match planned {
            ScoringStrategy::Parallel { workers } => {
                info!(
                    "Scoring {} candidates in parallel with {} workers",
                    candidates.len(),
                    workers
                );
                let attempt = self
                    .pool_for(workers)
                    .and_then(|pool| score_parallel(&pool, ctx, &candidates, &scorer));
                match attempt {
                    Ok(scores) => (scores, planned),
                    Err(e) => {
                        warn!("Parallel scoring failed, using serial: {:#}", e);
                        fell_back_to_serial = true;
                        (score_serial(ctx, &candidates, &scorer), ScoringStrategy::Serial)
                    }
                }
            }
            ScoringStrategy::Serial => {
                debug!("Scoring {} candidates serially", candidates.len());
                (score_serial(ctx, &candidates, &scorer), ScoringStrategy::Serial)
            }
        };

        let scored = candidates
            .into_iter()
            .zip(scores)
            .map(|(organization, (similarity_score, match_reasons))| {
                ScoredOrganization::new(organization, similarity_score, match_reasons)
            })
            .collect();

        ScoringOutcome {
            scored,
            strategy,
            fell_back_to_serial,
        }
    }
}

fn score_serial<F>(ctx: &ScoringContext, candidates: &[Organization], scorer: &F) -> Vec<(u8, Vec<String>)>
where
    F: Fn(&ScoringContext, &Organization) -> (u8, Vec<String>),
{
    candidates.iter().map(|c| scorer(ctx, c)).collect()
}

fn score_parallel<F>(
    pool: &ThreadPool,
    ctx: &ScoringContext,
    candidates: &[Organization],
    scorer: &F,
) -> Result<Vec<(u8, Vec<String>)>>
where
    F: Fn(&ScoringContext, &Organization) -> (u8, Vec<String>) + Sync,
{
    // Indexed collect keeps input order regardless of which worker ran what.
    panic::catch_unwind(AssertUnwindSafe(|| {
        pool.install(|| {
            candidates
                .par_iter()
                .map(|candidate| scorer(ctx, candidate))
                .collect::<Vec<_>>()
        })
    }))
    .map_err(|payload| anyhow!("scoring worker panicked: {}", panic_message(payload.as_ref())))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
