//! Shutdown-time CSV export: the last 10 frontier rows and last 100 page
//! rows get written alongside the database on every clean stop, independent
//! of the `--csv` full-table export.

use crate::output::traits::OutputResult;
use crate::storage::Storage;
use std::path::Path;

const SHUTDOWN_FRONTIER_ROWS: u32 = 10;
const SHUTDOWN_PAGE_ROWS: u32 = 100;

/// Writes `<stem>.frontier.csv` and `<stem>.pages.csv` next to `base_path`.
pub fn write_shutdown_exports(storage: &dyn Storage, base_path: &Path) -> OutputResult<()> {
    let frontier_path = sibling_path(base_path, "frontier");
    let pages_path = sibling_path(base_path, "pages");

    storage.export_recent_frontier_csv(&frontier_path, SHUTDOWN_FRONTIER_ROWS)?;
    storage.export_recent_pages_csv(&pages_path, SHUTDOWN_PAGE_ROWS)?;
    Ok(())
}

/// Writes the full `pages` table to `path`, for an explicit `--csv` request.
pub fn write_full_pages_export(storage: &dyn Storage, path: &Path) -> OutputResult<()> {
    storage.export_pages_csv(path)?;
    Ok(())
}

fn sibling_path(base_path: &Path, suffix: &str) -> std::path::PathBuf {
    let stem = base_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("export");
    let extension = format!("{suffix}.csv");
    base_path.with_file_name(format!("{stem}.{extension}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SqliteStorage;

    #[test]
    fn writes_both_shutdown_files() {
        let storage = SqliteStorage::new_in_memory().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("crawl.db");

        write_shutdown_exports(&storage, &base).unwrap();

        assert!(dir.path().join("crawl.frontier.csv").exists());
        assert!(dir.path().join("crawl.pages.csv").exists());
    }

    #[test]
    fn writes_full_export() {
        let storage = SqliteStorage::new_in_memory().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("all_pages.csv");
        write_full_pages_export(&storage, &path).unwrap();
        assert!(path.exists());
    }
}
