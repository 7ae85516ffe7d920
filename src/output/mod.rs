//! Crawl reporting: the console `stats` command, the shutdown/on-request
//! CSV exports, and the end-of-run markdown summary. All three read from
//! [`crate::storage::Storage`] rather than tracking state of their own.

mod csv;
mod markdown;
mod stats;
mod traits;

pub use csv::{write_full_pages_export, write_shutdown_exports};
pub use markdown::generate_markdown_summary;
pub use stats::{load_statistics, print_statistics};
pub use traits::{CrawlSummary, OutputError, OutputResult};

use crate::storage::Storage;
use crate::TueRippleError;

/// Builds a [`CrawlSummary`] for `run_id` from storage's current
/// aggregate counts.
pub fn generate_summary(storage: &dyn Storage, run_id: i64) -> Result<CrawlSummary, TueRippleError> {
    let run = storage.get_run(run_id)?;
    let stats = storage.stats()?;
    Ok(CrawlSummary::from_run(&run, stats))
}
