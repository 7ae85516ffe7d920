//! Crawl coordinator (C8): drives the main loop described in spec.md
//! §4.8 — pull a batch, fetch it concurrently, classify each response,
//! score and persist accepted pages, extract and admit their outbound
//! links, and repeat until the frontier runs dry, a page budget is hit,
//! or the caller asks for a graceful stop.

use crate::config::Config;
use crate::crawler::classifier::{self, FetchOutcome, Verdict};
use crate::crawler::extractor;
use crate::crawler::fetcher::{self, VerificationState};
use crate::crawler::scheduler::{Discovery, Scheduler};
use crate::crawler::scorer::{ScoreInputs, Scorer};
use crate::output;
use crate::robots;
use crate::state::{HostState, Utema, UrlErrorState};
use crate::storage::{self, FrontierRecord, PageRecord, RunStatus, SqliteStorage, Storage};
use crate::url::{classify_domain, extract_domain, normalize_url};
use crate::TueRippleError;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// A page is only worth propagating further once it's been fetched
/// `FLUSH_EVERY` times, per spec.md §4.8 step 7 ("every K iterations,
/// flush in-memory caches to the Store and emit stats").
const FLUSH_EVERY: u32 = 5;

/// Horizon within which a fetched page's own outbound links are still
/// worth admitting (spec.md §4.8 step 5's example, "linking_depth < 5 AND
/// domain_linking_depth < 5"), tighter than the frontier's hard ceiling of
/// 8 enforced at admission time.
const LINK_ADMISSION_DEPTH_HORIZON: u32 = 5;

/// How long a `next_batch` probe waits before retrying when nothing is
/// eligible yet (spec.md §4.7: "caller sleeps briefly").
const EMPTY_BATCH_SLEEP: std::time::Duration = std::time::Duration::from_millis(200);

/// Summary of a completed (or interrupted) run, returned to the caller.
#[derive(Debug, Clone)]
pub struct CrawlOutcome {
    pub run_id: i64,
    pub pages_crawled: u64,
    pub status: RunStatus,
}

/// The acceptance threshold a page's final score must clear to be
/// persisted and have its outbound links admitted. Lower at greater
/// depth, since a deep page needs less evidence of relevance to still be
/// worth keeping once it's already this far from a seed — spec.md leaves
/// the exact curve unspecified beyond "depth-dependent"; this is this
/// rewrite's choice, recorded in DESIGN.md.
fn acceptance_threshold(linking_depth: u32) -> f64 {
    (0.15 - 0.01 * linking_depth as f64).max(0.02)
}

/// Runs a crawl to completion (or until `stop_rx` signals true), opening
/// or resuming `config.output.database_path`.
pub async fn run_crawl(
    config: Config,
    mut stop_rx: Option<watch::Receiver<bool>>,
) -> Result<CrawlOutcome, TueRippleError> {
    run_crawl_inner(config, &mut stop_rx, false).await
}

/// As [`run_crawl`], but ignores any interrupted run and starts over with
/// an empty frontier and store tables cleared of prior frontier state.
pub async fn run_fresh_crawl(
    config: Config,
    mut stop_rx: Option<watch::Receiver<bool>>,
) -> Result<CrawlOutcome, TueRippleError> {
    run_crawl_inner(config, &mut stop_rx, true).await
}

async fn run_crawl_inner(
    config: Config,
    stop_rx: &mut Option<watch::Receiver<bool>>,
    fresh_start: bool,
) -> Result<CrawlOutcome, TueRippleError> {
    let db_path = std::path::Path::new(&config.output.database_path);
    let mut store = storage::open_storage(db_path)?;

    if fresh_start {
        store.clear_frontier()?;
    }

    let config_hash = config_hash_for(&config);
    let run_id = store.create_run(&config_hash)?;

    let user_agent = fetcher::default_user_agent(&config.user_agent);
    let http_client = fetcher::build_http_client(
        &config.user_agent,
        config.crawler.request_timeout_secs,
        config.crawler.proxy.as_deref(),
    )?;
    let verification = Arc::new(VerificationState::new());

    let mut scheduler = Scheduler::new(
        config.crawler.domain_crawl_ceiling,
        config.crawler.domain_delay_ms,
    )
    .with_priority_domains(config.vocabulary.priority_domains.clone());
    let mut hosts: HashMap<String, HostState> = HashMap::new();

    if !fresh_start {
        resume_frontier(&store, &mut scheduler)?;
    }
    seed_frontier(&config, &store, &mut scheduler, &mut hosts, &http_client, &user_agent).await;

    let scorer = Scorer::new(config.crawler.scorer_utema_beta);
    let mut domain_score_utema: HashMap<String, Utema> = HashMap::new();

    let batch_size = if config.crawler.multiprocessing {
        config.crawler.max_workers as usize
    } else {
        config.crawler.max_parallel as usize
    };

    let mut pages_crawled: u64 = 0;
    let mut iterations_since_flush: u32 = 0;
    let mut empty_polls = 0u32;

    let status = loop {
        if stop_requested(stop_rx) {
            info!(run_id, "stop requested, shutting down");
            break RunStatus::Interrupted;
        }
        if config.crawler.max_pages > 0 && pages_crawled >= config.crawler.max_pages as u64 {
            info!(run_id, pages_crawled, "page budget reached");
            break RunStatus::Completed;
        }

        let now = Utc::now();
        let batch = scheduler.next_batch(batch_size, now, |domain| {
            hosts
                .get(domain)
                .map_or(true, |h| h.can_request(Instant::now()))
        });

        if batch.is_empty() {
            if scheduler.frontier_len() == 0 {
                info!(run_id, "frontier exhausted");
                break RunStatus::Completed;
            }
            empty_polls += 1;
            if empty_polls > 600 {
                warn!(run_id, "frontier stalled with no eligible entries; stopping");
                break RunStatus::Completed;
            }
            tokio::time::sleep(EMPTY_BATCH_SLEEP).await;
            continue;
        }
        empty_polls = 0;

        let urls: Vec<String> = batch.iter().map(|e| e.url.clone()).collect();
        let responses = fetcher::fetch_batch(&http_client, &urls, &verification).await;

        for (entry, response) in batch.into_iter().zip(responses.into_iter()) {
            let Some(domain) = extract_domain_str(&entry.url) else {
                continue;
            };
            let host = get_or_restore_host(
                &mut hosts,
                &store,
                &domain,
                config.crawler.domain_delay_ms,
                config.crawler.utema_beta,
            );
            host.record_access(Instant::now());

            let outcome = FetchOutcome {
                status: response.status,
                location: response.location.clone(),
                retry_after: response.retry_after.clone(),
            };
            let mut url_state = host.urls.remove(&entry.url).unwrap_or_default();
            let verdict = classifier::classify(
                host,
                &mut url_state,
                &outcome,
                entry.delay_ms,
                now,
                config.crawler.ban_threshold,
                config.crawler.ban_min_observations,
            );
            host.urls.insert(entry.url.clone(), url_state);

            match verdict {
                Verdict::Accept => {
                    scheduler.mark_crawled(&entry.url, &domain);
                    pages_crawled += 1;

                    let body = response.body.unwrap_or_default();
                    let base = match url::Url::parse(&entry.url) {
                        Ok(u) => u,
                        Err(_) => continue,
                    };
                    let extracted = extractor::extract(&body, &base, response.content_type.as_deref());

                    let score_inputs = ScoreInputs {
                        url: &entry.url,
                        parent_score: entry.incoming_links.first().map(|(_, s)| *s),
                        text: &extracted.text,
                        incoming: &entry.incoming_links,
                        linking_depth: entry.linking_depth,
                    };
                    let domain_utema = domain_score_utema
                        .entry(domain.clone())
                        .or_insert_with(|| scorer.new_domain_utema());
                    let score = scorer.score(&score_inputs, &config.vocabulary, domain_utema);

                    if score >= acceptance_threshold(entry.linking_depth) {
                        let page = PageRecord {
                            url: entry.url.clone(),
                            domain: domain.clone(),
                            title: extracted.title.clone(),
                            text: Some(extracted.text.clone()),
                            score,
                            linking_depth: entry.linking_depth,
                            domain_linking_depth: entry.domain_linking_depth,
                            parent_url: entry.parent_url.clone(),
                            status_code: response.status,
                            content_type: response.content_type.clone(),
                            last_modified: response.last_modified.clone(),
                            etag: response.etag.clone(),
                            last_fetch: now.to_rfc3339(),
                            discovered_run: run_id,
                        };
                        if let Err(e) = store.upsert_page(&page) {
                            warn!(url = %entry.url, error = %e, "failed to persist page");
                        }

                        if entry.linking_depth < LINK_ADMISSION_DEPTH_HORIZON
                            && entry.domain_linking_depth < LINK_ADMISSION_DEPTH_HORIZON
                        {
                            for link in &extracted.links {
                                if let Err(e) = store.insert_link(&entry.url, link, run_id) {
                                    warn!(error = %e, "failed to record link");
                                }
                            }
                            admit_discovered_links(
                                &config,
                                &store,
                                &mut scheduler,
                                &mut hosts,
                                &http_client,
                                &user_agent,
                                &entry,
                                score,
                                &extracted.links,
                            )
                            .await;
                        }
                    }
                }
                Verdict::FollowRedirect { target } => {
                    let Ok(normalized) = normalize_url(&target) else {
                        continue;
                    };
                    let Some(target_domain) = extract_domain(&normalized) else {
                        continue;
                    };
                    let classification = classify_domain(&target_domain, &config);
                    if classification.is_terminal() {
                        continue;
                    }
                    let robots_allowed = host_allows(
                        &mut hosts,
                        &store,
                        &target_domain,
                        normalized.as_str(),
                        &config,
                        &http_client,
                        &user_agent,
                    )
                    .await;
                    let discovery = Discovery {
                        url: normalized.to_string(),
                        domain: target_domain,
                        parent_url: entry.parent_url.clone(),
                        parent_score: entry.incoming_links.first().map(|(_, s)| *s),
                        parent_linking_depth: entry.linking_depth,
                        parent_domain_linking_depth: entry.domain_linking_depth,
                    };
                    scheduler.add_url(discovery, robots_allowed, now);
                }
                Verdict::Backoff { retry_at, delay_ms } => {
                    scheduler.reschedule(entry, retry_at, delay_ms);
                }
                Verdict::DisallowUrl { reason } => {
                    if let Err(e) = store.add_disallowed_url(&entry.url, reason) {
                        warn!(url = %entry.url, error = %e, "failed to record disallowed url");
                    }
                    scheduler.mark_disallowed_url(&entry.url);
                }
                Verdict::DisallowDomain { reason } => {
                    info!(domain, reason, "banning domain for distress");
                    let data = serde_json::json!({ "reason": reason }).to_string();
                    if let Err(e) = store.add_disallowed_domain(&domain, &data) {
                        warn!(domain, error = %e, "failed to record disallowed domain");
                    }
                    scheduler.mark_disallowed_domain(&domain);
                }
            }
        }

        iterations_since_flush += 1;
        if iterations_since_flush >= FLUSH_EVERY {
            flush_host_state(&mut store, &hosts);
            if let Ok(stats) = store.stats() {
                info!(
                    run_id,
                    pages = stats.total_pages,
                    frontier = scheduler.frontier_len(),
                    domains = stats.unique_domains,
                    "progress"
                );
            }
            iterations_since_flush = 0;
        }
    };

    flush_host_state(&mut store, &hosts);
    snapshot_frontier(&mut store, &scheduler)?;
    store.update_run_status(run_id, status)?;
    if status == RunStatus::Completed {
        store.complete_run(run_id)?;
    }

    if let Err(e) = output::write_shutdown_exports(&store, db_path) {
        warn!(error = %e, "failed to write shutdown CSV exports");
    }
    if let Some(csv_path) = &config.output.csv_path {
        if let Err(e) = output::write_full_pages_export(&store, std::path::Path::new(csv_path)) {
            warn!(error = %e, "failed to write full pages CSV export");
        }
    }

    Ok(CrawlOutcome {
        run_id,
        pages_crawled,
        status,
    })
}

fn stop_requested(stop_rx: &mut Option<watch::Receiver<bool>>) -> bool {
    match stop_rx {
        Some(rx) => *rx.borrow(),
        None => false,
    }
}

fn config_hash_for(config: &Config) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(config.output.database_path.as_bytes());
    hasher.update(config.user_agent.crawler_name.as_bytes());
    for q in &config.quality {
        hasher.update(q.domain.as_bytes());
        for s in &q.seeds {
            hasher.update(s.as_bytes());
        }
    }
    hex::encode(hasher.finalize())
}

fn extract_domain_str(url: &str) -> Option<String> {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_lowercase()))
}

/// Rebuilds the in-memory scheduler from a persisted frontier and the
/// pages table's per-domain counts, per the persistence contract in
/// spec.md §4.7.
fn resume_frontier(
    store: &SqliteStorage,
    scheduler: &mut Scheduler,
) -> Result<(), TueRippleError> {
    let frontier = store.load_frontier()?;
    if frontier.is_empty() {
        return Ok(());
    }
    let mut domain_counts: HashMap<String, u32> = HashMap::new();
    for page in store.all_pages()? {
        *domain_counts.entry(page.domain).or_insert(0) += 1;
    }
    info!(entries = frontier.len(), "resumed frontier from storage");
    scheduler.load_from(frontier, domain_counts);
    Ok(())
}

/// Admits every seed URL across every configured quality domain, each
/// checked against that host's robots policy first.
async fn seed_frontier(
    config: &Config,
    store: &SqliteStorage,
    scheduler: &mut Scheduler,
    hosts: &mut HashMap<String, HostState>,
    http_client: &reqwest::Client,
    user_agent: &str,
) {
    if scheduler.frontier_len() > 0 {
        // Resumed from a non-empty frontier; seeds were already admitted
        // in a prior run.
        return;
    }

    let now = Utc::now();
    for entry in &config.quality {
        for seed in &entry.seeds {
            let Ok(normalized) = normalize_url(seed) else {
                warn!(seed, "skipping malformed seed URL");
                continue;
            };
            let Some(domain) = extract_domain(&normalized) else {
                continue;
            };
            if store.is_crawled(normalized.as_str()).unwrap_or(false) {
                continue;
            }
            let robots_allowed = host_allows(
                hosts,
                store,
                &domain,
                normalized.as_str(),
                config,
                http_client,
                user_agent,
            )
            .await;
            if !robots_allowed {
                debug!(seed, "seed rejected by robots.txt");
                continue;
            }
            let discovery = Discovery {
                url: normalized.to_string(),
                domain,
                parent_url: None,
                parent_score: None,
                parent_linking_depth: 0,
                parent_domain_linking_depth: 0,
            };
            let outcome = scheduler.add_url(discovery, true, now);
            debug!(seed, ?outcome, "seed admission");
        }
    }
}

/// Admits every outbound link on a freshly-accepted page, each gated by
/// the frontier's own admission contract (depth, length, query count,
/// robots, blocked-domain classification).
#[allow(clippy::too_many_arguments)]
async fn admit_discovered_links(
    config: &Config,
    store: &SqliteStorage,
    scheduler: &mut Scheduler,
    hosts: &mut HashMap<String, HostState>,
    http_client: &reqwest::Client,
    user_agent: &str,
    parent: &FrontierRecord,
    parent_score: f64,
    links: &[String],
) {
    let now = Utc::now();
    for link in links {
        let Ok(normalized) = normalize_url(link) else {
            continue;
        };
        let Some(domain) = extract_domain(&normalized) else {
            continue;
        };
        if classify_domain(&domain, config).is_terminal() {
            continue;
        }
        if store.is_crawled(normalized.as_str()).unwrap_or(false) {
            continue;
        }
        let robots_allowed = host_allows(
            hosts,
            store,
            &domain,
            normalized.as_str(),
            config,
            http_client,
            user_agent,
        )
        .await;

        let discovery = Discovery {
            url: normalized.to_string(),
            domain,
            parent_url: Some(parent.url.clone()),
            parent_score: Some(parent_score),
            parent_linking_depth: parent.linking_depth,
            parent_domain_linking_depth: parent.domain_linking_depth,
        };
        scheduler.add_url(discovery, robots_allowed, now);
    }
}

/// Resolves whether `url` is allowed by `domain`'s robots policy, fetching
/// and caching the policy (and folding its `Crawl-delay` into the host's
/// politeness delay) on first contact with that host.
async fn host_allows(
    hosts: &mut HashMap<String, HostState>,
    store: &SqliteStorage,
    domain: &str,
    url: &str,
    config: &Config,
    http_client: &reqwest::Client,
    user_agent: &str,
) -> bool {
    get_or_restore_host(
        hosts,
        store,
        domain,
        config.crawler.domain_delay_ms,
        config.crawler.utema_beta,
    );

    let needs_fetch = hosts
        .get(domain)
        .map(|h| h.robots.as_ref().map_or(true, |r| r.is_stale()))
        .unwrap_or(false);
    if needs_fetch {
        let parsed = robots::fetch_robots(http_client, domain, user_agent).await;
        if let Some(delay_secs) = parsed.crawl_delay(user_agent) {
            let delay_ms = (delay_secs * 1000.0) as u64;
            if let Some(host) = hosts.get_mut(domain) {
                host.delay_ms = host.delay_ms.max(delay_ms);
            }
        }
        if let Some(host) = hosts.get_mut(domain) {
            host.robots = Some(robots::CachedRobots::new(parsed));
        }
    }

    hosts
        .get(domain)
        .and_then(|h| h.robots.as_ref())
        .map(|r| r.is_allowed(url, user_agent))
        .unwrap_or(true)
}

/// Returns the in-memory `HostState` for `domain`, restoring it from the
/// store on first contact with that host in this run instead of starting
/// from `HostState::new` — the other half of [`flush_host_state`]'s
/// persistence contract (spec.md §6, §8 scenario 6: a resumed run picks
/// up the politeness delay and distress average it already earned).
fn get_or_restore_host<'a>(
    hosts: &'a mut HashMap<String, HostState>,
    store: &SqliteStorage,
    domain: &str,
    base_delay_ms: u64,
    utema_beta: f64,
) -> &'a mut HostState {
    if !hosts.contains_key(domain) {
        let restored = restore_host_state(store, domain, base_delay_ms, utema_beta)
            .unwrap_or_else(|| HostState::new(base_delay_ms, utema_beta));
        hosts.insert(domain.to_string(), restored);
    }
    hosts.get_mut(domain).expect("just inserted")
}

/// Reconstructs a `HostState` from whatever `flush_host_state` persisted
/// for `domain`, if anything. Missing or malformed data in either table
/// is treated as "nothing to restore" rather than an error.
fn restore_host_state(
    store: &SqliteStorage,
    domain: &str,
    base_delay_ms: u64,
    utema_beta: f64,
) -> Option<HostState> {
    let delay_ms = store
        .load_domain_delay(domain)
        .ok()
        .flatten()
        .map(|d| d as u64)
        .unwrap_or(base_delay_ms);

    let (data_json, url_data_json) = store.load_error_storage(domain).ok().flatten()?;
    let data: serde_json::Value = serde_json::from_str(&data_json).ok()?;

    let beta = data.get("beta").and_then(|v| v.as_f64()).unwrap_or(utema_beta);
    let s = data.get("s").and_then(|v| v.as_f64()).unwrap_or(0.0);
    let d = data.get("d").and_then(|v| v.as_f64()).unwrap_or(0.0);
    let n = data.get("n").and_then(|v| v.as_u64()).unwrap_or(0);
    let requests_made = data
        .get("requests_made")
        .and_then(|v| v.as_u64())
        .unwrap_or(0) as u32;
    let banned = data.get("banned").and_then(|v| v.as_bool()).unwrap_or(false);
    let ring: VecDeque<(DateTime<Utc>, u16)> = data
        .get("ring")
        .and_then(|v| v.as_array())
        .map(|entries| {
            entries
                .iter()
                .filter_map(|e| {
                    let pair = e.as_array()?;
                    let ts = pair.first()?.as_str()?;
                    let code = pair.get(1)?.as_u64()? as u16;
                    Some((DateTime::parse_from_rfc3339(ts).ok()?.with_timezone(&Utc), code))
                })
                .collect()
        })
        .unwrap_or_default();

    let urls: HashMap<String, UrlErrorState> = serde_json::from_str::<
        HashMap<String, serde_json::Value>,
    >(&url_data_json)
    .unwrap_or_default()
    .into_iter()
    .map(|(url, v)| {
        let counters = v
            .get("counters")
            .and_then(|c| serde_json::from_value(c.clone()).ok())
            .unwrap_or_default();
        let redirect_trail = v
            .get("redirect_trail")
            .and_then(|c| serde_json::from_value(c.clone()).ok())
            .unwrap_or_default();
        (
            url,
            UrlErrorState {
                counters,
                redirect_trail,
            },
        )
    })
    .collect();

    Some(HostState {
        delay_ms,
        last_access: None,
        requests_made,
        error_utema: Utema::from_parts(beta, s, d, n),
        ring,
        urls,
        banned,
        robots: None,
    })
}

/// Persists every host's politeness delay and distress/error state to the
/// store, so a resumed run doesn't start from a clean slate on hosts it
/// already has a read on.
fn flush_host_state(store: &mut SqliteStorage, hosts: &HashMap<String, HostState>) {
    for (domain, host) in hosts {
        if let Err(e) = store.save_domain_delay(domain, host.delay_ms as f64) {
            warn!(domain, error = %e, "failed to persist domain delay");
        }

        let ring: Vec<(String, u16)> = host
            .ring
            .iter()
            .map(|(ts, code)| (ts.to_rfc3339(), *code))
            .collect();
        let data_json = serde_json::json!({
            "beta": host.error_utema.beta(),
            "s": host.error_utema.s(),
            "d": host.error_utema.d(),
            "n": host.error_utema.count(),
            "requests_made": host.requests_made,
            "banned": host.banned,
            "ring": ring,
        })
        .to_string();

        let url_data: HashMap<&str, serde_json::Value> = host
            .urls
            .iter()
            .map(|(url, state)| {
                (
                    url.as_str(),
                    serde_json::json!({
                        "counters": state.counters,
                        "redirect_trail": state.redirect_trail,
                    }),
                )
            })
            .collect();
        let url_data_json = serde_json::to_string(&url_data).unwrap_or_else(|_| "{}".to_string());

        if let Err(e) = store.save_error_storage(domain, &data_json, &url_data_json) {
            warn!(domain, error = %e, "failed to persist error storage");
        }
    }
}

/// Whole-table rewrite of the frontier on graceful shutdown, per the
/// persistence contract in spec.md §4.7.
fn snapshot_frontier(store: &mut SqliteStorage, scheduler: &Scheduler) -> Result<(), TueRippleError> {
    store.clear_frontier()?;
    for entry in scheduler.entries() {
        store.add_to_frontier(&entry)?;
    }
    info!(entries = scheduler.frontier_len(), "frontier snapshotted");
    Ok(())
}
