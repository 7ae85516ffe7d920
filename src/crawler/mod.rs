//! The crawl engine: fetching, classifying, scoring, extracting, and
//! scheduling, wired together by [`coordinator`] into the main crawl loop.

pub mod classifier;
mod coordinator;
pub mod extractor;
pub mod fetcher;
pub mod scheduler;
pub mod scorer;

pub use coordinator::{run_crawl, run_fresh_crawl, CrawlOutcome};

use crate::config::Config;
use crate::TueRippleError;

/// Runs a complete crawl: opens storage, resumes or seeds the frontier,
/// drives the fetch/classify/score/extract loop to a budget or stop
/// signal, and writes the final reports.
pub async fn crawl(config: Config) -> Result<CrawlOutcome, TueRippleError> {
    run_crawl(config, None).await
}
