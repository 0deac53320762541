// src/utils/logging.rs - Phase logging helpers for lookalike searches
use log::{debug, error, info, warn};
use std::time::Instant;

use crate::models::target::ScoringContext;

#[derive(Clone)]
pub struct LookalikeLogger {
    tag: &'static str,
    emoji: &'static str,
    start_time: Instant,
}

impl LookalikeLogger {
    pub fn new() -> Self {
        Self::with_tag("LOOKALIKES", "🔎")
    }

    pub fn with_tag(tag: &'static str, emoji: &'static str) -> Self {
        Self {
            tag,
            emoji,
            start_time: Instant::now(),
        }
    }

    pub fn log_resolved_parameters(&self, ctx: &ScoringContext, raw_specialties: &[String]) {
        info!(
            "[{}] {} 🚀 Resolved search parameters: state={:?}, city={:?}",
            self.tag, self.emoji, ctx.state, ctx.city
        );
        info!(
            "[{}] {} ⚙️  Specialties: {:?}, expanded: {:?}",
            self.tag, self.emoji, raw_specialties, ctx.expanded_specialties
        );
    }

    pub fn log_phase(&self, phase: &str, details: Option<&str>) {
        let elapsed = self.start_time.elapsed();
        let msg = if let Some(details) = details {
            format!(
                "[{}] {} 🔄 Phase: {} - {} [+{:.3}s]",
                self.tag, self.emoji, phase, details, elapsed.as_secs_f32()
            )
        } else {
            format!(
                "[{}] {} 🔄 Phase: {} [+{:.3}s]",
                self.tag, self.emoji, phase, elapsed.as_secs_f32()
            )
        };
        info!("{}", msg);
    }

    pub fn log_cache_hit(&self, total_matches: usize, page: usize, page_size: usize) {
        info!(
            "[{}] {} 💾 Cache hit: serving page {} (size {}) from {} cached matches",
            self.tag, self.emoji, page, page_size, total_matches
        );
    }

    pub fn log_cache_miss(&self) {
        info!(
            "[{}] {} 💾 Cache miss: computing fresh result set",
            self.tag, self.emoji
        );
    }

    pub fn log_data_loaded(&self, count: usize, data_type: &str) {
        info!(
            "[{}] {} 📊 Found {} {} rows from data source",
            self.tag, self.emoji, count, data_type
        );
    }

    pub fn log_aggregation(&self, row_count: usize, org_count: usize, physicians: usize, executives: usize) {
        info!(
            "[{}] {} ✅ Aggregated {} rows → {} organizations ({} physicians, {} executives)",
            self.tag, self.emoji, row_count, org_count, physicians, executives
        );
    }

    pub fn log_filtering_results(&self, scored: usize, kept: usize, effective_threshold: u8) {
        let percent_kept = if scored > 0 {
            (kept as f64 / scored as f64) * 100.0
        } else {
            0.0
        };
        info!(
            "[{}] {} 🎯 Threshold filter (effective {}): {} scored → {} kept ({:.1}% kept)",
            self.tag, self.emoji, effective_threshold, scored, kept, percent_kept
        );
    }

    pub fn log_completion(&self, total_matches: usize, total_pages: usize) {
        let duration = self.start_time.elapsed();
        info!(
            "[{}] {} 🎉 COMPLETED: {} lookalike organizations across {} pages in {:.2?}",
            self.tag, self.emoji, total_matches, total_pages, duration
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!("[{}] {} ⚠️  {}", self.tag, self.emoji, message);
    }

    pub fn log_error(&self, message: &str) {
        error!("[{}] {} ❌ {}", self.tag, self.emoji, message);
    }

    pub fn log_debug(&self, message: &str) {
        debug!("[{}] {} {}", self.tag, self.emoji, message);
    }
}

impl Default for LookalikeLogger {
    fn default() -> Self {
        Self::new()
    }
}
