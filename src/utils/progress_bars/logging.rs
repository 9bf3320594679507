// src/utils/progress_bars/logging.rs - Logging helpers for generation and merge runs
use log::{debug, error, info, warn};
use std::time::Instant;

use crate::models::{GenerationReport, MergeRunReport};

#[derive(Clone)]
pub struct ResolutionLogger {
    dimension: String,
    stage: &'static str,
    start_time: Instant,
}

impl ResolutionLogger {
    pub fn new(dimension: &str, stage: &'static str) -> Self {
        Self {
            dimension: dimension.to_uppercase(),
            stage,
            start_time: Instant::now(),
        }
    }

    pub fn log_start(&self, run_id: &str, dry_run: bool) {
        info!(
            "[{}/{}] 🚀 Starting (run ID: {}){}",
            self.dimension,
            self.stage,
            run_id,
            if dry_run { " in dry-run mode" } else { "" }
        );
    }

    pub fn log_phase(&self, phase: &str, details: Option<&str>) {
        let elapsed = self.start_time.elapsed();
        match details {
            Some(details) => info!(
                "[{}/{}] 🔄 Phase: {} - {} [+{:.1}s]",
                self.dimension,
                self.stage,
                phase,
                details,
                elapsed.as_secs_f32()
            ),
            None => info!(
                "[{}/{}] 🔄 Phase: {} [+{:.1}s]",
                self.dimension,
                self.stage,
                phase,
                elapsed.as_secs_f32()
            ),
        }
    }

    pub fn log_data_loaded(&self, count: usize, non_comparable: usize) {
        info!(
            "[{}/{}] 📊 Loaded {} entities ({} with an empty match value, skipped)",
            self.dimension, self.stage, count, non_comparable
        );
    }

    pub fn log_pair_generation(&self, total_pairs: usize, blocks: usize) {
        info!(
            "[{}/{}] 📈 Candidate pairs to score: {} (from {} blocks)",
            self.dimension, self.stage, total_pairs, blocks
        );
    }

    pub fn log_batch_processing_start(&self, total_pairs: usize, batch_size: usize) {
        let batch_count = (total_pairs + batch_size - 1) / batch_size.max(1);
        info!(
            "[{}/{}] ⚙️  Scoring {} pairs in {} batches (batch size: {})",
            self.dimension, self.stage, total_pairs, batch_count, batch_size
        );
    }

    pub fn log_generation_summary(&self, report: &GenerationReport) {
        info!(
            "[{}/{}] 🎉 COMPLETED in {:.2?}: {} auto-merge, {} steward review, {} discarded",
            self.dimension,
            self.stage,
            self.start_time.elapsed(),
            report.auto_merge,
            report.steward_review,
            report.discarded
        );
        info!(
            "[{}/{}] 📊 Queue: {} enqueued, {} duplicates of OPEN entries skipped, {} DEPRECATED entities excluded",
            self.dimension,
            self.stage,
            report.enqueued,
            report.duplicates_skipped,
            report.retired_excluded
        );
    }

    pub fn log_merge_summary(&self, report: &MergeRunReport) {
        info!(
            "[{}/{}] 🎉 COMPLETED in {:.2?}: {} merged, {} skipped, {} failed",
            self.dimension,
            self.stage,
            self.start_time.elapsed(),
            report.merged(),
            report.skipped(),
            report.failed()
        );
        for (kind, count) in report.failures_by_kind() {
            warn!(
                "[{}/{}] ⚠️  {} entries failed with {}",
                self.dimension, self.stage, count, kind
            );
        }
    }

    pub fn log_warning(&self, message: &str) {
        warn!("[{}/{}] ⚠️  {}", self.dimension, self.stage, message);
    }

    pub fn log_error(&self, message: &str) {
        error!("[{}/{}] ❌ {}", self.dimension, self.stage, message);
    }

    pub fn log_debug(&self, message: &str) {
        debug!("[{}/{}] {}", self.dimension, self.stage, message);
    }
}
