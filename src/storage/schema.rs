//! Database schema definitions.
//!
//! All persisted state for a run lives in one SQLite file, keyed by URL or
//! host string rather than surrogate IDs, matching the frontier/page/
//! disallowed-list data model.

/// SQL schema for the database.
pub const SCHEMA_SQL: &str = r#"
-- Track crawl runs, for resumption and config-hash drift detection.
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL
);

-- Pages that have been successfully fetched at least once.
CREATE TABLE IF NOT EXISTS pages (
    url TEXT PRIMARY KEY,
    domain TEXT NOT NULL,
    title TEXT,
    text TEXT,
    score REAL NOT NULL DEFAULT 0,
    linking_depth INTEGER NOT NULL DEFAULT 0,
    domain_linking_depth INTEGER NOT NULL DEFAULT 0,
    parent_url TEXT,
    status_code INTEGER,
    content_type TEXT,
    last_modified TEXT,
    etag TEXT,
    last_fetch TEXT NOT NULL,
    discovered_run INTEGER NOT NULL REFERENCES runs(id)
);

CREATE INDEX IF NOT EXISTS idx_pages_domain ON pages(domain);
CREATE INDEX IF NOT EXISTS idx_pages_last_fetch ON pages(last_fetch);

-- Link graph between fetched/queued URLs.
CREATE TABLE IF NOT EXISTS links (
    from_url TEXT NOT NULL,
    to_url TEXT NOT NULL,
    discovered_run INTEGER NOT NULL REFERENCES runs(id),
    UNIQUE(from_url, to_url)
);

CREATE INDEX IF NOT EXISTS idx_links_from ON links(from_url);
CREATE INDEX IF NOT EXISTS idx_links_to ON links(to_url);

-- The crawl frontier: URLs admitted but not yet fetched.
CREATE TABLE IF NOT EXISTS frontier (
    url TEXT PRIMARY KEY,
    domain TEXT NOT NULL,
    priority REAL NOT NULL,
    incoming_links TEXT NOT NULL DEFAULT '[]',
    linking_depth INTEGER NOT NULL DEFAULT 0,
    domain_linking_depth INTEGER NOT NULL DEFAULT 0,
    parent_url TEXT,
    scheduled_at TEXT NOT NULL DEFAULT '1970-01-01T00:00:00Z',
    delay_ms REAL NOT NULL DEFAULT 0,
    discovered_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_frontier_priority ON frontier(priority DESC);
CREATE INDEX IF NOT EXISTS idx_frontier_domain ON frontier(domain);

-- URLs individually disallowed (e.g. a redirect loop, or an error-counter
-- threshold crossed for that specific URL).
CREATE TABLE IF NOT EXISTS disallowed_urls (
    url TEXT PRIMARY KEY,
    reason TEXT NOT NULL,
    received TEXT NOT NULL
);

-- Whole hosts disallowed (domain-distress UTEMA ban).
CREATE TABLE IF NOT EXISTS disallowed_domains (
    host TEXT PRIMARY KEY,
    data TEXT NOT NULL,
    received TEXT NOT NULL
);

-- Flat error log, for diagnostics and the `stats` command.
CREATE TABLE IF NOT EXISTS errors (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT NOT NULL,
    type TEXT NOT NULL,
    message TEXT,
    status INTEGER,
    timestamp TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_errors_url ON errors(url);

-- Adaptive per-host politeness delay (baseline, robots Crawl-delay, and
-- backoff all folded into one effective value), so a resumed run doesn't
-- forget that a host has been slow or throttling.
CREATE TABLE IF NOT EXISTS domain_delays (
    host TEXT PRIMARY KEY,
    delay REAL NOT NULL
);

-- Per-host runtime state: the distress UTEMA plus a bounded ring of recent
-- outcomes (`data`), and per-URL error counters and redirect trails
-- (`url_data`), both stored as JSON so the shape can evolve without a
-- migration.
CREATE TABLE IF NOT EXISTS error_storage (
    host TEXT PRIMARY KEY,
    data TEXT NOT NULL,
    url_data TEXT NOT NULL
);
"#;

/// Initializes the database schema, migrating older `frontier` tables in
/// place first if they predate the `scheduled_at`/`delay_ms` columns.
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    migrate_frontier_if_needed(conn)?;
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

/// Current schema version, bumped whenever `SCHEMA_SQL` changes shape.
pub fn get_schema_version() -> u32 {
    3
}

/// Detects a pre-v3 `frontier` table (missing `scheduled_at`) and migrates
/// it in place: copy rows into a side table, drop and recreate `frontier`
/// with the current schema, restore the rows (new columns default to their
/// `DEFAULT`), then drop the side table. All within one transaction, per
/// the store's migration contract.
fn migrate_frontier_if_needed(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    let table_exists: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='frontier'",
        [],
        |row| row.get(0),
    )?;
    if table_exists == 0 {
        return Ok(());
    }

    let has_scheduled_at = conn
        .prepare("SELECT scheduled_at FROM frontier LIMIT 1")
        .is_ok();
    if has_scheduled_at {
        return Ok(());
    }

    conn.execute_batch(
        "BEGIN;
         ALTER TABLE frontier RENAME TO frontier_old_migration;
         CREATE TABLE frontier (
             url TEXT PRIMARY KEY,
             domain TEXT NOT NULL,
             priority REAL NOT NULL,
             incoming_links TEXT NOT NULL DEFAULT '[]',
             linking_depth INTEGER NOT NULL DEFAULT 0,
             domain_linking_depth INTEGER NOT NULL DEFAULT 0,
             parent_url TEXT,
             scheduled_at TEXT NOT NULL DEFAULT '1970-01-01T00:00:00Z',
             delay_ms REAL NOT NULL DEFAULT 0,
             discovered_at TEXT NOT NULL
         );
         INSERT INTO frontier (url, domain, priority, incoming_links, linking_depth,
             domain_linking_depth, parent_url, discovered_at)
         SELECT url, domain, priority, incoming_links, linking_depth,
             domain_linking_depth, parent_url, discovered_at FROM frontier_old_migration;
         DROP TABLE frontier_old_migration;
         COMMIT;",
    )?;
    Ok(())
}
