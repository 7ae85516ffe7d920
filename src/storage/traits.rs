//! The storage trait and its error type.

use crate::storage::{CrawlStats, FrontierRecord, PageRecord, RunRecord, RunStatus};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(String),

    #[error("run not found: {0}")]
    RunNotFound(i64),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Everything the coordinator, scheduler, classifier, and CLI need from
/// persistent storage.
pub trait Storage {
    // ===== Run management =====

    /// Creates a new crawl run.
    ///
    /// # Arguments
    ///
    /// * `config_hash` - Hash of the configuration file in effect for this run
    ///
    /// # Returns
    ///
    /// The ID of the newly created run.
    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64>;

    /// Gets a run by ID.
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recently created run, if any runs exist.
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    /// Updates the status of a run.
    fn update_run_status(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()>;

    /// Marks a run as completed with a finish timestamp.
    fn complete_run(&mut self, run_id: i64) -> StorageResult<()>;

    // ===== Pages =====

    /// Inserts a page, or overwrites it if it already exists (a page is
    /// re-fetched and re-scored every time it's crawled again).
    ///
    /// # Arguments
    ///
    /// * `page` - The page record to persist
    fn upsert_page(&mut self, page: &PageRecord) -> StorageResult<()>;

    /// Gets a page by its normalized URL.
    fn get_page(&self, url: &str) -> StorageResult<Option<PageRecord>>;

    /// Whether a URL has already been fetched successfully.
    fn is_crawled(&self, url: &str) -> StorageResult<bool>;

    /// Counts the total number of fetched pages.
    fn count_total_pages(&self) -> StorageResult<u64>;

    /// Counts the number of distinct domains among fetched pages.
    fn count_unique_domains(&self) -> StorageResult<u64>;

    /// Most recently fetched pages, newest first.
    ///
    /// # Arguments
    ///
    /// * `limit` - Maximum number of pages to return
    fn recent_pages(&self, limit: u32) -> StorageResult<Vec<PageRecord>>;

    /// Every fetched page, for a full CSV export.
    fn all_pages(&self) -> StorageResult<Vec<PageRecord>>;

    // ===== Links =====

    /// Records a discovered link between two URLs.
    ///
    /// # Arguments
    ///
    /// * `from_url` - The page the link was found on
    /// * `to_url` - The linked URL
    /// * `run_id` - The run ID that discovered this link
    fn insert_link(&mut self, from_url: &str, to_url: &str, run_id: i64) -> StorageResult<()>;

    /// Counts the total number of recorded links.
    fn count_links(&self) -> StorageResult<u64>;

    // ===== Frontier =====

    /// Adds a URL to the crawl frontier.
    ///
    /// # Arguments
    ///
    /// * `entry` - The frontier entry, including its computed priority
    fn add_to_frontier(&mut self, entry: &FrontierRecord) -> StorageResult<()>;

    /// Gets a single frontier entry by URL.
    fn get_frontier_entry(&self, url: &str) -> StorageResult<Option<FrontierRecord>>;

    /// Loads the whole frontier, highest priority first. Used to rebuild
    /// the in-memory scheduler on resume.
    fn load_frontier(&self) -> StorageResult<Vec<FrontierRecord>>;

    /// Removes a URL from the frontier, e.g. once it has been dispensed
    /// and fetched.
    fn remove_from_frontier(&mut self, url: &str) -> StorageResult<()>;

    /// Clears the entire frontier.
    fn clear_frontier(&mut self) -> StorageResult<()>;

    /// Counts the number of entries currently in the frontier.
    fn frontier_size(&self) -> StorageResult<u64>;

    /// Most recently discovered frontier entries, newest first.
    ///
    /// # Arguments
    ///
    /// * `limit` - Maximum number of entries to return
    fn recent_frontier(&self, limit: u32) -> StorageResult<Vec<FrontierRecord>>;

    // ===== Disallow lists =====

    /// Records a URL as disallowed (won't be retried).
    ///
    /// # Arguments
    ///
    /// * `url` - The disallowed URL
    /// * `reason` - Short machine-readable reason code
    fn add_disallowed_url(&mut self, url: &str, reason: &str) -> StorageResult<()>;

    /// Records a host as domain-banned.
    ///
    /// # Arguments
    ///
    /// * `host` - The banned host
    /// * `data_json` - Serialized distress state at the time of the ban
    fn add_disallowed_domain(&mut self, host: &str, data_json: &str) -> StorageResult<()>;

    /// Whether a URL is on the disallow list.
    fn is_disallowed_url(&self, url: &str) -> StorageResult<bool>;

    /// Whether a host is domain-banned.
    fn is_disallowed_domain(&self, host: &str) -> StorageResult<bool>;

    /// Counts disallowed URLs.
    fn count_disallowed_urls(&self) -> StorageResult<u64>;

    /// Counts domain-banned hosts.
    fn count_disallowed_domains(&self) -> StorageResult<u64>;

    // ===== Errors =====

    /// Logs a fetch or processing error against a URL.
    ///
    /// # Arguments
    ///
    /// * `url` - The URL the error occurred on
    /// * `error_type` - Short machine-readable error category
    /// * `message` - Optional human-readable detail
    /// * `status` - HTTP status code, if one was received
    fn log_error(
        &mut self,
        url: &str,
        error_type: &str,
        message: Option<&str>,
        status: Option<u16>,
    ) -> StorageResult<()>;

    /// Counts logged errors.
    fn count_errors(&self) -> StorageResult<u64>;

    // ===== Per-host runtime state =====

    /// Loads a host's last persisted politeness delay, in milliseconds.
    fn load_domain_delay(&self, host: &str) -> StorageResult<Option<f64>>;

    /// Persists a host's current politeness delay, in milliseconds.
    fn save_domain_delay(&mut self, host: &str, delay_ms: f64) -> StorageResult<()>;

    /// Loads a host's persisted distress/error runtime state.
    ///
    /// # Returns
    ///
    /// `(ring+UTEMA JSON, per-url error/redirect JSON)`, or `None` if the
    /// host has no persisted state yet.
    fn load_error_storage(&self, host: &str) -> StorageResult<Option<(String, String)>>;

    /// Persists a host's distress/error runtime state.
    ///
    /// # Arguments
    ///
    /// * `host` - The host the state belongs to
    /// * `data_json` - Serialized ring buffer and UTEMA state
    /// * `url_data_json` - Serialized per-URL error/redirect counters
    fn save_error_storage(
        &mut self,
        host: &str,
        data_json: &str,
        url_data_json: &str,
    ) -> StorageResult<()>;

    // ===== Statistics and export =====

    /// Gathers summary statistics for the whole crawl (pages, domains,
    /// links, errors, frontier size).
    fn stats(&self) -> StorageResult<CrawlStats>;

    /// Writes the full `pages` table to `path` as CSV.
    fn export_pages_csv(&self, path: &Path) -> StorageResult<()>;

    /// Writes the `limit` most recently fetched pages to `path` as CSV.
    ///
    /// # Arguments
    ///
    /// * `path` - Output file path
    /// * `limit` - Maximum number of rows to write
    fn export_recent_pages_csv(&self, path: &Path, limit: u32) -> StorageResult<()>;

    /// Writes the `limit` most recently discovered frontier entries to
    /// `path` as CSV.
    ///
    /// # Arguments
    ///
    /// * `path` - Output file path
    /// * `limit` - Maximum number of rows to write
    fn export_recent_frontier_csv(&self, path: &Path, limit: u32) -> StorageResult<()>;
}
