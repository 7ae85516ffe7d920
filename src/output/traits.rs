//! Output types shared by the stats printer, markdown summary, and CSV
//! export.

use crate::storage::{CrawlStats, RunRecord};
use thiserror::Error;

/// Errors that can occur while producing output.
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("failed to write output: {0}")]
    Write(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage error: {0}")]
    Storage(#[from] crate::storage::StorageError),
}

pub type OutputResult<T> = Result<T, OutputError>;

/// Everything the markdown summary and console `stats` command report:
/// the run's metadata plus its current aggregate counts.
#[derive(Debug, Clone)]
pub struct CrawlSummary {
    pub run_id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub status: String,
    pub config_hash: String,
    pub stats: CrawlStats,
}

impl CrawlSummary {
    pub fn from_run(run: &RunRecord, stats: CrawlStats) -> Self {
        CrawlSummary {
            run_id: run.id,
            started_at: run.started_at.clone(),
            finished_at: run.finished_at.clone(),
            status: run.status.to_db_string().to_string(),
            config_hash: run.config_hash.clone(),
            stats,
        }
    }

    /// Fraction of fetched pages that did not end up disallowed, as a
    /// rough health signal for the console report.
    pub fn success_rate(&self) -> f64 {
        let total = self.stats.total_pages + self.stats.disallowed_urls;
        if total == 0 {
            return 0.0;
        }
        (self.stats.total_pages as f64 / total as f64) * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::RunStatus;

    fn run() -> RunRecord {
        RunRecord {
            id: 1,
            started_at: "2026-01-01T00:00:00Z".to_string(),
            finished_at: None,
            config_hash: "abc123".to_string(),
            status: RunStatus::Running,
        }
    }

    #[test]
    fn builds_summary_from_run_and_stats() {
        let stats = CrawlStats {
            total_pages: 90,
            disallowed_urls: 10,
            ..Default::default()
        };
        let summary = CrawlSummary::from_run(&run(), stats);
        assert_eq!(summary.run_id, 1);
        assert_eq!(summary.status, "running");
    }

    #[test]
    fn success_rate_accounts_for_disallowed() {
        let stats = CrawlStats {
            total_pages: 90,
            disallowed_urls: 10,
            ..Default::default()
        };
        let summary = CrawlSummary::from_run(&run(), stats);
        assert!((summary.success_rate() - 90.0).abs() < 0.01);
    }

    #[test]
    fn success_rate_zero_when_nothing_seen() {
        let summary = CrawlSummary::from_run(&run(), CrawlStats::default());
        assert_eq!(summary.success_rate(), 0.0);
    }
}
