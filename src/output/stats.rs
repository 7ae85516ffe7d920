//! Console statistics printer, used by the `stats` interactive command
//! and at the end of a run.

use crate::storage::{CrawlStats, Storage};
use crate::TueRippleError;

pub fn load_statistics(storage: &dyn Storage) -> Result<CrawlStats, TueRippleError> {
    Ok(storage.stats()?)
}

pub fn print_statistics(stats: &CrawlStats) {
    println!("=== Crawl Statistics ===\n");
    println!("Pages fetched:        {}", stats.total_pages);
    println!("Unique domains:       {}", stats.unique_domains);
    println!("Links discovered:     {}", stats.total_links);
    println!("Frontier remaining:   {}", stats.frontier_size);
    println!("Disallowed URLs:      {}", stats.disallowed_urls);
    println!("Disallowed domains:   {}", stats.disallowed_domains);
    println!("Errors logged:        {}", stats.total_errors);

    let total = stats.total_pages + stats.disallowed_urls;
    let success_rate = if total > 0 {
        (stats.total_pages as f64 / total as f64) * 100.0
    } else {
        0.0
    };
    println!("\nSuccess rate: {:.1}%", success_rate);
}
