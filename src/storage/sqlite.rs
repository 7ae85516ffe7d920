//! SQLite implementation of [`Storage`].

use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{CrawlStats, FrontierRecord, PageRecord, RunRecord, RunStatus};
use crate::TueRippleError;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

/// SQLite storage backend.
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    pub fn new(path: &Path) -> Result<Self, TueRippleError> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
            PRAGMA mmap_size = 268435456;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    #[cfg(test)]
    pub fn new_in_memory() -> Result<Self, TueRippleError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    fn row_to_page(row: &rusqlite::Row) -> rusqlite::Result<PageRecord> {
        Ok(PageRecord {
            url: row.get(0)?,
            domain: row.get(1)?,
            title: row.get(2)?,
            text: row.get(3)?,
            score: row.get(4)?,
            linking_depth: row.get(5)?,
            domain_linking_depth: row.get(6)?,
            parent_url: row.get(7)?,
            status_code: row.get(8)?,
            content_type: row.get(9)?,
            last_modified: row.get(10)?,
            etag: row.get(11)?,
            last_fetch: row.get(12)?,
            discovered_run: row.get(13)?,
        })
    }

    fn row_to_frontier(row: &rusqlite::Row) -> rusqlite::Result<FrontierRecord> {
        let incoming_links_json: String = row.get(3)?;
        let incoming_links: Vec<(String, f64)> =
            serde_json::from_str(&incoming_links_json).unwrap_or_default();
        Ok(FrontierRecord {
            url: row.get(0)?,
            domain: row.get(1)?,
            priority: row.get(2)?,
            incoming_links,
            linking_depth: row.get(4)?,
            domain_linking_depth: row.get(5)?,
            parent_url: row.get(6)?,
            scheduled_at: row.get(7)?,
            delay_ms: row.get(8)?,
            discovered_at: row.get(9)?,
        })
    }

    fn write_pages_csv(
        pages: Vec<PageRecord>,
        path: &Path,
    ) -> StorageResult<()> {
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record([
            "url",
            "domain",
            "title",
            "score",
            "linking_depth",
            "domain_linking_depth",
            "parent_url",
            "status_code",
            "content_type",
            "last_fetch",
        ])?;
        for page in pages {
            writer.write_record([
                page.url.as_str(),
                page.domain.as_str(),
                page.title.as_deref().unwrap_or(""),
                &page.score.to_string(),
                &page.linking_depth.to_string(),
                &page.domain_linking_depth.to_string(),
                page.parent_url.as_deref().unwrap_or(""),
                &page
                    .status_code
                    .map(|c| c.to_string())
                    .unwrap_or_default(),
                page.content_type.as_deref().unwrap_or(""),
                page.last_fetch.as_str(),
            ])?;
        }
        writer.flush()?;
        Ok(())
    }
}

impl Storage for SqliteStorage {
    // ===== Run management =====

    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        self.conn
            .query_row(
                "SELECT id, started_at, finished_at, config_hash, status FROM runs WHERE id = ?1",
                params![run_id],
                |row| {
                    Ok(RunRecord {
                        id: row.get(0)?,
                        started_at: row.get(1)?,
                        finished_at: row.get(2)?,
                        config_hash: row.get(3)?,
                        status: RunStatus::from_db_string(&row.get::<_, String>(4)?)
                            .unwrap_or(RunStatus::Running),
                    })
                },
            )
            .map_err(|_| StorageError::RunNotFound(run_id))
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        self.conn
            .query_row(
                "SELECT id, started_at, finished_at, config_hash, status FROM runs ORDER BY id DESC LIMIT 1",
                [],
                |row| {
                    Ok(RunRecord {
                        id: row.get(0)?,
                        started_at: row.get(1)?,
                        finished_at: row.get(2)?,
                        config_hash: row.get(3)?,
                        status: RunStatus::from_db_string(&row.get::<_, String>(4)?)
                            .unwrap_or(RunStatus::Running),
                    })
                },
            )
            .optional()
            .map_err(StorageError::from)
    }

    fn update_run_status(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()> {
        self.conn.execute(
            "UPDATE runs SET status = ?1 WHERE id = ?2",
            params![status.to_db_string(), run_id],
        )?;
        Ok(())
    }

    fn complete_run(&mut self, run_id: i64) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2 WHERE id = ?3",
            params![RunStatus::Completed.to_db_string(), now, run_id],
        )?;
        Ok(())
    }

    // ===== Pages =====

    fn upsert_page(&mut self, page: &PageRecord) -> StorageResult<()> {
        self.conn.execute(
            "INSERT INTO pages (url, domain, title, text, score, linking_depth,
             domain_linking_depth, parent_url, status_code, content_type, last_modified,
             etag, last_fetch, discovered_run)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
             ON CONFLICT(url) DO UPDATE SET
                domain = excluded.domain,
                title = excluded.title,
                text = excluded.text,
                score = excluded.score,
                linking_depth = excluded.linking_depth,
                domain_linking_depth = excluded.domain_linking_depth,
                parent_url = excluded.parent_url,
                status_code = excluded.status_code,
                content_type = excluded.content_type,
                last_modified = excluded.last_modified,
                etag = excluded.etag,
                last_fetch = excluded.last_fetch",
            params![
                page.url,
                page.domain,
                page.title,
                page.text,
                page.score,
                page.linking_depth,
                page.domain_linking_depth,
                page.parent_url,
                page.status_code,
                page.content_type,
                page.last_modified,
                page.etag,
                page.last_fetch,
                page.discovered_run,
            ],
        )?;
        Ok(())
    }

    fn get_page(&self, url: &str) -> StorageResult<Option<PageRecord>> {
        self.conn
            .query_row(
                "SELECT url, domain, title, text, score, linking_depth, domain_linking_depth,
                 parent_url, status_code, content_type, last_modified, etag, last_fetch,
                 discovered_run FROM pages WHERE url = ?1",
                params![url],
                Self::row_to_page,
            )
            .optional()
            .map_err(StorageError::from)
    }

    fn is_crawled(&self, url: &str) -> StorageResult<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM pages WHERE url = ?1",
            params![url],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn count_total_pages(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM pages", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_unique_domains(&self) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(DISTINCT domain) FROM pages",
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn recent_pages(&self, limit: u32) -> StorageResult<Vec<PageRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT url, domain, title, text, score, linking_depth, domain_linking_depth,
             parent_url, status_code, content_type, last_modified, etag, last_fetch,
             discovered_run FROM pages ORDER BY last_fetch DESC LIMIT ?1",
        )?;
        let pages = stmt
            .query_map(params![limit], Self::row_to_page)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(pages)
    }

    fn all_pages(&self) -> StorageResult<Vec<PageRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT url, domain, title, text, score, linking_depth, domain_linking_depth,
             parent_url, status_code, content_type, last_modified, etag, last_fetch,
             discovered_run FROM pages ORDER BY last_fetch DESC",
        )?;
        let pages = stmt
            .query_map([], Self::row_to_page)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(pages)
    }

    // ===== Links =====

    fn insert_link(&mut self, from_url: &str, to_url: &str, run_id: i64) -> StorageResult<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO links (from_url, to_url, discovered_run) VALUES (?1, ?2, ?3)",
            params![from_url, to_url, run_id],
        )?;
        Ok(())
    }

    fn count_links(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM links", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    // ===== Frontier =====

    fn add_to_frontier(&mut self, entry: &FrontierRecord) -> StorageResult<()> {
        let incoming_links_json = serde_json::to_string(&entry.incoming_links)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.conn.execute(
            "INSERT OR REPLACE INTO frontier (url, domain, priority, incoming_links,
             linking_depth, domain_linking_depth, parent_url, scheduled_at, delay_ms, discovered_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                entry.url,
                entry.domain,
                entry.priority,
                incoming_links_json,
                entry.linking_depth,
                entry.domain_linking_depth,
                entry.parent_url,
                entry.scheduled_at,
                entry.delay_ms,
                entry.discovered_at,
            ],
        )?;
        Ok(())
    }

    fn get_frontier_entry(&self, url: &str) -> StorageResult<Option<FrontierRecord>> {
        self.conn
            .query_row(
                "SELECT url, domain, priority, incoming_links, linking_depth,
                 domain_linking_depth, parent_url, scheduled_at, delay_ms, discovered_at
                 FROM frontier WHERE url = ?1",
                params![url],
                Self::row_to_frontier,
            )
            .optional()
            .map_err(StorageError::from)
    }

    fn load_frontier(&self) -> StorageResult<Vec<FrontierRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT url, domain, priority, incoming_links, linking_depth,
             domain_linking_depth, parent_url, scheduled_at, delay_ms, discovered_at
             FROM frontier ORDER BY priority DESC",
        )?;
        let entries = stmt
            .query_map([], Self::row_to_frontier)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    fn remove_from_frontier(&mut self, url: &str) -> StorageResult<()> {
        self.conn
            .execute("DELETE FROM frontier WHERE url = ?1", params![url])?;
        Ok(())
    }

    fn clear_frontier(&mut self) -> StorageResult<()> {
        self.conn.execute("DELETE FROM frontier", [])?;
        Ok(())
    }

    fn frontier_size(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM frontier", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn recent_frontier(&self, limit: u32) -> StorageResult<Vec<FrontierRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT url, domain, priority, incoming_links, linking_depth,
             domain_linking_depth, parent_url, scheduled_at, delay_ms, discovered_at FROM frontier
             ORDER BY discovered_at DESC LIMIT ?1",
        )?;
        let entries = stmt
            .query_map(params![limit], Self::row_to_frontier)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    // ===== Disallow lists =====

    fn add_disallowed_url(&mut self, url: &str, reason: &str) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT OR REPLACE INTO disallowed_urls (url, reason, received) VALUES (?1, ?2, ?3)",
            params![url, reason, now],
        )?;
        Ok(())
    }

    fn add_disallowed_domain(&mut self, host: &str, data_json: &str) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT OR REPLACE INTO disallowed_domains (host, data, received) VALUES (?1, ?2, ?3)",
            params![host, data_json, now],
        )?;
        Ok(())
    }

    fn is_disallowed_url(&self, url: &str) -> StorageResult<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM disallowed_urls WHERE url = ?1",
            params![url],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn is_disallowed_domain(&self, host: &str) -> StorageResult<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM disallowed_domains WHERE host = ?1",
            params![host],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn count_disallowed_urls(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM disallowed_urls", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_disallowed_domains(&self) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM disallowed_domains",
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    // ===== Errors =====

    fn log_error(
        &mut self,
        url: &str,
        error_type: &str,
        message: Option<&str>,
        status: Option<u16>,
    ) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO errors (url, type, message, status, timestamp) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![url, error_type, message, status, now],
        )?;
        Ok(())
    }

    fn count_errors(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM errors", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    // ===== Per-host runtime state =====

    fn load_domain_delay(&self, host: &str) -> StorageResult<Option<f64>> {
        self.conn
            .query_row(
                "SELECT delay FROM domain_delays WHERE host = ?1",
                params![host],
                |row| row.get(0),
            )
            .optional()
            .map_err(StorageError::from)
    }

    fn save_domain_delay(&mut self, host: &str, delay_ms: f64) -> StorageResult<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO domain_delays (host, delay) VALUES (?1, ?2)",
            params![host, delay_ms],
        )?;
        Ok(())
    }

    fn load_error_storage(&self, host: &str) -> StorageResult<Option<(String, String)>> {
        self.conn
            .query_row(
                "SELECT data, url_data FROM error_storage WHERE host = ?1",
                params![host],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .map_err(StorageError::from)
    }

    fn save_error_storage(
        &mut self,
        host: &str,
        data_json: &str,
        url_data_json: &str,
    ) -> StorageResult<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO error_storage (host, data, url_data) VALUES (?1, ?2, ?3)",
            params![host, data_json, url_data_json],
        )?;
        Ok(())
    }

    // ===== Statistics and export =====

    fn stats(&self) -> StorageResult<CrawlStats> {
        Ok(CrawlStats {
            total_pages: self.count_total_pages()?,
            unique_domains: self.count_unique_domains()?,
            total_links: self.count_links()?,
            frontier_size: self.frontier_size()?,
            disallowed_urls: self.count_disallowed_urls()?,
            disallowed_domains: self.count_disallowed_domains()?,
            total_errors: self.count_errors()?,
        })
    }

    fn export_pages_csv(&self, path: &Path) -> StorageResult<()> {
        Self::write_pages_csv(self.all_pages()?, path)
    }

    fn export_recent_pages_csv(&self, path: &Path, limit: u32) -> StorageResult<()> {
        Self::write_pages_csv(self.recent_pages(limit)?, path)
    }

    fn export_recent_frontier_csv(&self, path: &Path, limit: u32) -> StorageResult<()> {
        let entries = self.recent_frontier(limit)?;
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record([
            "url",
            "domain",
            "priority",
            "linking_depth",
            "domain_linking_depth",
            "parent_url",
            "discovered_at",
        ])?;
        for entry in entries {
            writer.write_record([
                entry.url.as_str(),
                entry.domain.as_str(),
                &entry.priority.to_string(),
                &entry.linking_depth.to_string(),
                &entry.domain_linking_depth.to_string(),
                entry.parent_url.as_deref().unwrap_or(""),
                entry.discovered_at.as_str(),
            ])?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// Opens (or creates) a raw connection at `path` with the schema applied.
/// Exposed for tooling that needs direct SQL access outside the `Storage`
/// trait (e.g. one-off maintenance scripts).
pub fn init_database(path: &Path) -> Result<Connection, rusqlite::Error> {
    let conn = Connection::open(path)?;
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA foreign_keys = ON;
    ",
    )?;
    initialize_schema(&conn)?;
    Ok(conn)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_page(url: &str, run_id: i64) -> PageRecord {
        PageRecord {
            url: url.to_string(),
            domain: "example.com".to_string(),
            title: Some("Example".to_string()),
            text: Some("some body text".to_string()),
            score: 0.75,
            linking_depth: 1,
            domain_linking_depth: 1,
            parent_url: Some("https://example.com/".to_string()),
            status_code: Some(200),
            content_type: Some("text/html".to_string()),
            last_modified: None,
            etag: None,
            last_fetch: Utc::now().to_rfc3339(),
            discovered_run: run_id,
        }
    }

    fn sample_frontier(url: &str) -> FrontierRecord {
        FrontierRecord {
            url: url.to_string(),
            domain: "example.com".to_string(),
            priority: 0.5,
            incoming_links: vec![("https://example.com/".to_string(), 0.6)],
            linking_depth: 1,
            domain_linking_depth: 1,
            parent_url: Some("https://example.com/".to_string()),
            scheduled_at: Utc::now().to_rfc3339(),
            delay_ms: 1000.0,
            discovered_at: Utc::now().to_rfc3339(),
        }
    }

    #[test]
    fn test_create_in_memory() {
        assert!(SqliteStorage::new_in_memory().is_ok());
    }

    #[test]
    fn test_create_run() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let run_id = storage.create_run("test_hash").unwrap();
        assert!(run_id > 0);
    }

    #[test]
    fn test_upsert_and_get_page() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let run_id = storage.create_run("test_hash").unwrap();
        let page = sample_page("https://example.com/page", run_id);
        storage.upsert_page(&page).unwrap();

        let loaded = storage.get_page("https://example.com/page").unwrap();
        assert!(loaded.is_some());
        assert_eq!(loaded.unwrap().title, Some("Example".to_string()));
        assert!(storage.is_crawled("https://example.com/page").unwrap());
        assert!(!storage.is_crawled("https://example.com/other").unwrap());
    }

    #[test]
    fn test_upsert_page_overwrites() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let run_id = storage.create_run("test_hash").unwrap();
        let mut page = sample_page("https://example.com/page", run_id);
        storage.upsert_page(&page).unwrap();

        page.score = 0.9;
        page.title = Some("Updated".to_string());
        storage.upsert_page(&page).unwrap();

        let loaded = storage.get_page("https://example.com/page").unwrap().unwrap();
        assert_eq!(loaded.title, Some("Updated".to_string()));
        assert!((loaded.score - 0.9).abs() < 1e-9);
        assert_eq!(storage.count_total_pages().unwrap(), 1);
    }

    #[test]
    fn test_frontier_roundtrip() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        storage
            .add_to_frontier(&sample_frontier("https://example.com/next"))
            .unwrap();

        assert_eq!(storage.frontier_size().unwrap(), 1);
        let loaded = storage.get_frontier_entry("https://example.com/next").unwrap();
        assert!(loaded.is_some());
        assert_eq!(loaded.unwrap().incoming_links.len(), 1);

        storage.remove_from_frontier("https://example.com/next").unwrap();
        assert_eq!(storage.frontier_size().unwrap(), 0);
    }

    #[test]
    fn test_disallow_lists() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        storage
            .add_disallowed_url("https://example.com/loop", "redirect_loop")
            .unwrap();
        storage
            .add_disallowed_domain("bad-host.example", "{\"reason\":\"distress\"}")
            .unwrap();

        assert!(storage.is_disallowed_url("https://example.com/loop").unwrap());
        assert!(!storage.is_disallowed_url("https://example.com/other").unwrap());
        assert!(storage.is_disallowed_domain("bad-host.example").unwrap());
        assert_eq!(storage.count_disallowed_urls().unwrap(), 1);
        assert_eq!(storage.count_disallowed_domains().unwrap(), 1);
    }

    #[test]
    fn test_domain_delay_and_error_storage_persistence() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        assert_eq!(storage.load_domain_delay("example.com").unwrap(), None);

        storage.save_domain_delay("example.com", 2500.0).unwrap();
        assert_eq!(
            storage.load_domain_delay("example.com").unwrap(),
            Some(2500.0)
        );

        storage
            .save_error_storage("example.com", "{\"utema\":0.1}", "{}")
            .unwrap();
        let loaded = storage.load_error_storage("example.com").unwrap().unwrap();
        assert_eq!(loaded.0, "{\"utema\":0.1}");
    }

    #[test]
    fn test_log_error_and_count() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        storage
            .log_error("https://example.com/x", "timeout", Some("timed out"), None)
            .unwrap();
        assert_eq!(storage.count_errors().unwrap(), 1);
    }

    #[test]
    fn test_stats_aggregates_counts() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let run_id = storage.create_run("test_hash").unwrap();
        storage
            .upsert_page(&sample_page("https://example.com/a", run_id))
            .unwrap();
        storage
            .add_to_frontier(&sample_frontier("https://example.com/b"))
            .unwrap();

        let stats = storage.stats().unwrap();
        assert_eq!(stats.total_pages, 1);
        assert_eq!(stats.frontier_size, 1);
    }

    #[test]
    fn test_export_pages_csv() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let run_id = storage.create_run("test_hash").unwrap();
        storage
            .upsert_page(&sample_page("https://example.com/a", run_id))
            .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let csv_path = dir.path().join("pages.csv");
        storage.export_pages_csv(&csv_path).unwrap();

        let content = std::fs::read_to_string(&csv_path).unwrap();
        assert!(content.contains("https://example.com/a"));
    }
}
