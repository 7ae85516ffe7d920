//! Persistent storage for a crawl run.
//!
//! Everything learned during a run — fetched pages, the frontier, hosts
//! and URLs ruled out, and the error history behind those decisions —
//! lives in one SQLite database so a run can be interrupted and resumed.

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::TueRippleError;
use std::path::Path;

/// Opens (or creates) the SQLite-backed storage at `path`.
pub fn open_storage(path: &Path) -> Result<SqliteStorage, TueRippleError> {
    SqliteStorage::new(path)
}

/// A page that has been successfully fetched at least once.
#[derive(Debug, Clone)]
pub struct PageRecord {
    pub url: String,
    pub domain: String,
    pub title: Option<String>,
    pub text: Option<String>,
    pub score: f64,
    pub linking_depth: u32,
    pub domain_linking_depth: u32,
    pub parent_url: Option<String>,
    pub status_code: Option<u16>,
    pub content_type: Option<String>,
    pub last_modified: Option<String>,
    pub etag: Option<String>,
    pub last_fetch: String,
    pub discovered_run: i64,
}

/// A URL admitted to the frontier but not yet fetched.
#[derive(Debug, Clone)]
pub struct FrontierRecord {
    pub url: String,
    pub domain: String,
    pub priority: f64,
    /// `(incoming URL, incoming URL's score)` pairs, used by the scorer's
    /// above-mean incoming-link aggregate.
    pub incoming_links: Vec<(String, f64)>,
    pub linking_depth: u32,
    pub domain_linking_depth: u32,
    pub parent_url: Option<String>,
    /// Earliest instant (RFC3339) this URL may be dispensed for fetching.
    pub scheduled_at: String,
    /// Current per-URL delay, in milliseconds (grows via backoff).
    pub delay_ms: f64,
    pub discovered_at: String,
}

/// A crawl run.
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
}

/// Status of a crawl run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Interrupted,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Interrupted => "interrupted",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "interrupted" => Some(Self::Interrupted),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// Aggregate counts used by the `stats` console command and the run
/// summary.
#[derive(Debug, Clone, Default)]
pub struct CrawlStats {
    pub total_pages: u64,
    pub unique_domains: u64,
    pub total_links: u64,
    pub frontier_size: u64,
    pub disallowed_urls: u64,
    pub disallowed_domains: u64,
    pub total_errors: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_status_roundtrip() {
        for status in &[
            RunStatus::Running,
            RunStatus::Completed,
            RunStatus::Interrupted,
            RunStatus::Failed,
        ] {
            let db_str = status.to_db_string();
            let parsed = RunStatus::from_db_string(db_str);
            assert_eq!(Some(*status), parsed);
        }
    }

    #[test]
    fn test_run_status_invalid() {
        assert_eq!(RunStatus::from_db_string("invalid"), None);
    }
}
