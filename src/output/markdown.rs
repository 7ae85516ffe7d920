//! Markdown summary generation.
//!
//! Writes a short human-readable report of a run's final counts, meant to
//! sit alongside the database and CSV exports rather than duplicate them.

use crate::output::traits::{CrawlSummary, OutputResult};
use std::fs::File;
use std::io::Write;
use std::path::Path;

pub fn generate_markdown_summary(summary: &CrawlSummary, output_path: &Path) -> OutputResult<()> {
    let markdown = format_markdown_summary(summary);
    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;
    Ok(())
}

pub fn format_markdown_summary(summary: &CrawlSummary) -> String {
    let mut md = String::new();

    md.push_str("# tue-ripple Crawl Summary\n\n");

    md.push_str("## Run Information\n\n");
    md.push_str(&format!("- **Run ID**: {}\n", summary.run_id));
    md.push_str(&format!("- **Started**: {}\n", summary.started_at));
    if let Some(finished) = &summary.finished_at {
        md.push_str(&format!("- **Finished**: {}\n", finished));
    }
    md.push_str(&format!("- **Status**: {}\n", summary.status));
    md.push_str(&format!("- **Config Hash**: {}\n\n", summary.config_hash));

    md.push_str("## Overall Statistics\n\n");
    md.push_str("| Metric | Count |\n");
    md.push_str("|--------|-------|\n");
    md.push_str(&format!("| Pages fetched | {} |\n", summary.stats.total_pages));
    md.push_str(&format!(
        "| Unique domains | {} |\n",
        summary.stats.unique_domains
    ));
    md.push_str(&format!("| Links discovered | {} |\n", summary.stats.total_links));
    md.push_str(&format!(
        "| Frontier remaining | {} |\n",
        summary.stats.frontier_size
    ));
    md.push_str(&format!(
        "| Disallowed URLs | {} |\n",
        summary.stats.disallowed_urls
    ));
    md.push_str(&format!(
        "| Disallowed domains | {} |\n",
        summary.stats.disallowed_domains
    ));
    md.push_str(&format!("| Errors logged | {} |\n", summary.stats.total_errors));
    md.push_str(&format!(
        "| Success rate | {:.2}% |\n\n",
        summary.success_rate()
    ));

    md
}
