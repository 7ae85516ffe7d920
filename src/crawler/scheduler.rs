//! Frontier / Scheduler (C7): the crawl's to-do list. Owns admission
//! (what's allowed in), priority ordering, and pairwise-distinct-host
//! batch dispensing; delegates per-host politeness and robots decisions
//! to the caller, which already tracks both in [`crate::state::HostState`].

use crate::crawler::scorer::{matches_skip_list, url_score};
use crate::storage::FrontierRecord;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};

/// Hard ceilings from the admission contract.
const MAX_LINKING_DEPTH: u32 = 8;
const MAX_URL_LENGTH: usize = 2000;
const MAX_QUERY_PARAMS: usize = 10;

/// How many of the highest-priority frontier entries a single
/// `next_batch` call considers before giving up and returning empty.
const MAX_PROBES: usize = 50;

/// Everything needed to admit a newly discovered URL, or to update an
/// already-admitted one re-discovered through a different parent.
pub struct Discovery {
    pub url: String,
    pub domain: String,
    pub parent_url: Option<String>,
    pub parent_score: Option<f64>,
    pub parent_linking_depth: u32,
    pub parent_domain_linking_depth: u32,
}

/// Outcome of [`Scheduler::add_url`].
#[derive(Debug, Clone, PartialEq)]
pub enum AdmitOutcome {
    /// A fresh frontier entry was created.
    Admitted,
    /// The URL was already in the frontier; its depth/incoming-links were
    /// merged against the new parent instead of creating a duplicate.
    Updated,
    /// The URL was not admitted, with a short machine-readable reason.
    Rejected(&'static str),
}

/// In-memory crawl frontier. Persistence (snapshot/reload) is handled by
/// the coordinator through [`Scheduler::load_from`] / [`Scheduler::entries`].
pub struct Scheduler {
    entries: HashMap<String, FrontierRecord>,
    domain_crawl_counts: HashMap<String, u32>,
    crawled: HashSet<String>,
    disallowed_urls: HashSet<String>,
    disallowed_domains: HashSet<String>,
    domain_crawl_ceiling: u32,
    domain_delay_ms: u64,
    priority_domains: Vec<String>,
}

impl Scheduler {
    pub fn new(domain_crawl_ceiling: u32, domain_delay_ms: u64) -> Self {
        Scheduler {
            entries: HashMap::new(),
            domain_crawl_counts: HashMap::new(),
            crawled: HashSet::new(),
            disallowed_urls: HashSet::new(),
            disallowed_domains: HashSet::new(),
            domain_crawl_ceiling,
            domain_delay_ms,
            priority_domains: Vec::new(),
        }
    }

    /// Registers the configured priority-domain patterns (wildcard-capable,
    /// matched the same way as the blacklist/quality lists): a discovered
    /// URL whose host matches one gets a scheduling-priority boost on
    /// admission, on top of whatever [`url_score`] gives it. This is
    /// additive to spec.md §4.5's URL-score formula, not a replacement for
    /// it — it only affects which URL the frontier dispenses first, not the
    /// relevance score a page is ultimately judged and stored on.
    pub fn with_priority_domains(mut self, priority_domains: Vec<String>) -> Self {
        self.priority_domains = priority_domains;
        self
    }

    fn is_priority_domain(&self, domain: &str) -> bool {
        self.priority_domains
            .iter()
            .any(|pattern| crate::url::matches_wildcard(pattern, domain))
    }

    /// Rebuilds the scheduler's in-memory state from a reloaded frontier
    /// and per-domain crawl counts, per the persistence contract (frontier
    /// reloaded verbatim, domain counters rebuilt from the page table).
    ///
    /// The authoritative already-crawled/disallowed decision lives in
    /// storage, not here: the coordinator checks storage before ever
    /// calling [`Scheduler::add_url`], so this scheduler only needs to
    /// track what it disallows or crawls *during this session* (via
    /// [`Scheduler::mark_crawled`] and friends) to avoid re-admitting a URL
    /// it just finished with.
    pub fn load_from(
        &mut self,
        frontier: Vec<FrontierRecord>,
        domain_crawl_counts: impl IntoIterator<Item = (String, u32)>,
    ) {
        self.entries = frontier.into_iter().map(|e| (e.url.clone(), e)).collect();
        self.domain_crawl_counts = domain_crawl_counts.into_iter().collect();
    }

    /// A snapshot of the current frontier, for a whole-table persistence
    /// rewrite on graceful shutdown.
    pub fn entries(&self) -> Vec<FrontierRecord> {
        self.entries.values().cloned().collect()
    }

    pub fn frontier_len(&self) -> usize {
        self.entries.len()
    }

    pub fn mark_crawled(&mut self, url: &str, domain: &str) {
        self.crawled.insert(url.to_string());
        *self.domain_crawl_counts.entry(domain.to_string()).or_insert(0) += 1;
    }

    pub fn mark_disallowed_url(&mut self, url: &str) {
        self.disallowed_urls.insert(url.to_string());
        self.entries.remove(url);
    }

    /// Disallows a whole host and purges every frontier entry on it, per
    /// the classifier's domain-ban action.
    pub fn mark_disallowed_domain(&mut self, domain: &str) {
        self.disallowed_domains.insert(domain.to_string());
        self.entries.retain(|_, entry| entry.domain != domain);
    }

    pub fn domain_crawl_count(&self, domain: &str) -> u32 {
        self.domain_crawl_counts.get(domain).copied().unwrap_or(0)
    }

    /// Attempts to admit `discovery` into the frontier, or merges it into
    /// an existing entry if the URL is already queued. `robots_allowed`
    /// must be resolved by the caller (it requires the host's robots
    /// cache, which may need an async fetch).
    pub fn add_url(
        &mut self,
        discovery: Discovery,
        robots_allowed: bool,
        now: DateTime<Utc>,
    ) -> AdmitOutcome {
        let Discovery {
            url,
            domain,
            parent_url,
            parent_score,
            parent_linking_depth,
            parent_domain_linking_depth,
        } = discovery;

        if self.crawled.contains(&url) {
            return AdmitOutcome::Rejected("already-crawled");
        }
        if self.disallowed_urls.contains(&url) {
            return AdmitOutcome::Rejected("disallowed-url");
        }
        if self.disallowed_domains.contains(&domain) {
            return AdmitOutcome::Rejected("disallowed-domain");
        }

        if let Some(existing) = self.entries.get_mut(&url) {
            merge_rediscovery(
                existing,
                &domain,
                parent_url.as_deref(),
                parent_score,
                parent_linking_depth,
                parent_domain_linking_depth,
            );
            return AdmitOutcome::Updated;
        }

        if self.domain_crawl_count(&domain) >= self.domain_crawl_ceiling {
            return AdmitOutcome::Rejected("domain-ceiling");
        }
        if url.len() > MAX_URL_LENGTH {
            return AdmitOutcome::Rejected("url-too-long");
        }
        if query_param_count(&url) > MAX_QUERY_PARAMS {
            return AdmitOutcome::Rejected("too-many-query-params");
        }
        if matches_skip_list(&url) {
            return AdmitOutcome::Rejected("skip-list");
        }
        if !robots_allowed {
            return AdmitOutcome::Rejected("robots-disallowed");
        }

        let cross_domain_hop = parent_url
            .as_deref()
            .and_then(|p| url::Url::parse(p).ok())
            .and_then(|u| u.host_str().map(|h| h.to_lowercase() != domain))
            .unwrap_or(false) as u32;
        let same_domain_hop = 1 - cross_domain_hop.min(1);

        let linking_depth = parent_url
            .as_ref()
            .map(|_| parent_linking_depth + cross_domain_hop)
            .unwrap_or(0);
        let domain_linking_depth = parent_url
            .as_ref()
            .map(|_| parent_domain_linking_depth + same_domain_hop)
            .unwrap_or(0);

        if linking_depth > MAX_LINKING_DEPTH {
            return AdmitOutcome::Rejected("depth-exceeded");
        }

        let mut priority = url_score(&url, parent_score);
        if self.is_priority_domain(&domain) {
            priority = (priority + 0.1).min(1.0);
        }
        let incoming_links = match (&parent_url, parent_score) {
            (Some(p), Some(s)) => vec![(p.clone(), s)],
            _ => Vec::new(),
        };

        let entry = FrontierRecord {
            url: url.clone(),
            domain,
            priority,
            incoming_links,
            linking_depth,
            domain_linking_depth,
            parent_url,
            scheduled_at: (now + chrono::Duration::milliseconds(self.domain_delay_ms as i64))
                .to_rfc3339(),
            delay_ms: self.domain_delay_ms as f64,
            discovered_at: now.to_rfc3339(),
        };

        self.entries.insert(url, entry);
        AdmitOutcome::Admitted
    }

    /// Dispenses up to `n` URLs with pairwise distinct hosts, considering
    /// only the `MAX_PROBES` highest-priority entries for eligibility.
    /// Dispensed entries are removed from the frontier; the caller is
    /// responsible for re-admitting them (via [`Scheduler::reschedule`])
    /// if the fetch needs to be retried.
    pub fn next_batch(
        &mut self,
        n: usize,
        now: DateTime<Utc>,
        host_ready: impl Fn(&str) -> bool,
    ) -> Vec<FrontierRecord> {
        let mut candidates: Vec<&FrontierRecord> = self.entries.values().collect();
        candidates.sort_by(|a, b| b.priority.partial_cmp(&a.priority).unwrap());
        candidates.truncate(MAX_PROBES);

        let mut chosen_urls = Vec::with_capacity(n);
        let mut chosen_hosts = HashSet::new();

        for entry in candidates {
            if chosen_urls.len() >= n {
                break;
            }
            if chosen_hosts.contains(&entry.domain) {
                continue;
            }
            let scheduled: DateTime<Utc> = entry.scheduled_at.parse().unwrap_or(now);
            if scheduled > now {
                continue;
            }
            if !host_ready(&entry.domain) {
                continue;
            }
            chosen_hosts.insert(entry.domain.clone());
            chosen_urls.push(entry.url.clone());
        }

        chosen_urls
            .into_iter()
            .filter_map(|url| self.entries.remove(&url))
            .collect()
    }

    /// Re-admits a dispensed URL after a recoverable failure, with a new
    /// schedule time and per-URL delay (from the classifier's backoff
    /// verdict), preserving its depth/incoming-link bookkeeping.
    pub fn reschedule(&mut self, mut entry: FrontierRecord, retry_at: DateTime<Utc>, delay_ms: f64) {
        entry.scheduled_at = retry_at.to_rfc3339();
        entry.delay_ms = delay_ms;
        self.entries.insert(entry.url.clone(), entry);
    }
}

fn merge_rediscovery(
    existing: &mut FrontierRecord,
    domain: &str,
    parent_url: Option<&str>,
    parent_score: Option<f64>,
    parent_linking_depth: u32,
    parent_domain_linking_depth: u32,
) {
    let cross_domain_hop = (existing.domain != domain) as u32;
    let same_domain_hop = 1 - cross_domain_hop.min(1);

    existing.linking_depth = existing
        .linking_depth
        .min(parent_linking_depth + cross_domain_hop);
    existing.domain_linking_depth = existing
        .domain_linking_depth
        .min(parent_domain_linking_depth + same_domain_hop);

    if let (Some(p), Some(s)) = (parent_url, parent_score) {
        existing.incoming_links.push((p.to_string(), s));
    }
}

fn query_param_count(url: &str) -> usize {
    url::Url::parse(url)
        .map(|u| u.query_pairs().count())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn discovery(url: &str, domain: &str) -> Discovery {
        Discovery {
            url: url.to_string(),
            domain: domain.to_string(),
            parent_url: None,
            parent_score: None,
            parent_linking_depth: 0,
            parent_domain_linking_depth: 0,
        }
    }

    #[test]
    fn admits_a_seed_url() {
        let mut scheduler = Scheduler::new(100, 1000);
        let outcome = scheduler.add_url(
            discovery("https://example.com/tuebingen", "example.com"),
            true,
            Utc::now(),
        );
        assert_eq!(outcome, AdmitOutcome::Admitted);
        assert_eq!(scheduler.frontier_len(), 1);
    }

    #[test]
    fn rejects_when_robots_disallows() {
        let mut scheduler = Scheduler::new(100, 1000);
        let outcome = scheduler.add_url(
            discovery("https://example.com/private", "example.com"),
            false,
            Utc::now(),
        );
        assert_eq!(outcome, AdmitOutcome::Rejected("robots-disallowed"));
    }

    #[test]
    fn rejects_already_crawled() {
        let mut scheduler = Scheduler::new(100, 1000);
        scheduler.mark_crawled("https://example.com/page", "example.com");
        let outcome = scheduler.add_url(
            discovery("https://example.com/page", "example.com"),
            true,
            Utc::now(),
        );
        assert_eq!(outcome, AdmitOutcome::Rejected("already-crawled"));
    }

    #[test]
    fn rejects_over_domain_ceiling() {
        let mut scheduler = Scheduler::new(1, 1000);
        scheduler.mark_crawled("https://example.com/a", "example.com");
        let outcome = scheduler.add_url(
            discovery("https://example.com/b", "example.com"),
            true,
            Utc::now(),
        );
        assert_eq!(outcome, AdmitOutcome::Rejected("domain-ceiling"));
    }

    #[test]
    fn rejects_skip_list_extension() {
        let mut scheduler = Scheduler::new(100, 1000);
        let outcome = scheduler.add_url(
            discovery("https://example.com/brochure.pdf", "example.com"),
            true,
            Utc::now(),
        );
        assert_eq!(outcome, AdmitOutcome::Rejected("skip-list"));
    }

    #[test]
    fn rejects_too_many_query_params() {
        let mut scheduler = Scheduler::new(100, 1000);
        let query: String = (0..12).map(|i| format!("p{i}=1&")).collect();
        let url = format!("https://example.com/page?{query}");
        let outcome = scheduler.add_url(discovery(&url, "example.com"), true, Utc::now());
        assert_eq!(outcome, AdmitOutcome::Rejected("too-many-query-params"));
    }

    #[test]
    fn priority_domain_boosts_scheduling_priority() {
        let plain = Scheduler::new(100, 1000);
        let boosted =
            Scheduler::new(100, 1000).with_priority_domains(vec!["priority.example".to_string()]);

        let mut plain = plain;
        let mut boosted = boosted;
        plain.add_url(
            discovery("https://priority.example/page", "priority.example"),
            true,
            Utc::now(),
        );
        boosted.add_url(
            discovery("https://priority.example/page", "priority.example"),
            true,
            Utc::now(),
        );

        let plain_priority = plain.entries()[0].priority;
        let boosted_priority = boosted.entries()[0].priority;
        assert!(boosted_priority > plain_priority);
    }

    #[test]
    fn rediscovery_merges_depth_and_incoming() {
        let mut scheduler = Scheduler::new(100, 1000);
        scheduler.add_url(
            discovery("https://example.com/page", "example.com"),
            true,
            Utc::now(),
        );

        let second = Discovery {
            url: "https://example.com/page".to_string(),
            domain: "example.com".to_string(),
            parent_url: Some("https://example.com/other".to_string()),
            parent_score: Some(0.7),
            parent_linking_depth: 0,
            parent_domain_linking_depth: 0,
        };
        let outcome = scheduler.add_url(second, true, Utc::now());
        assert_eq!(outcome, AdmitOutcome::Updated);
        assert_eq!(scheduler.frontier_len(), 1);

        let entries = scheduler.entries();
        let entry = entries
            .iter()
            .find(|e| e.url == "https://example.com/page")
            .unwrap();
        assert_eq!(entry.incoming_links.len(), 1);
    }

    #[test]
    fn next_batch_respects_distinct_hosts() {
        let mut scheduler = Scheduler::new(100, 1000);
        let now = Utc::now();
        scheduler.add_url(discovery("https://a.example/p1", "a.example"), true, now);
        scheduler.add_url(discovery("https://a.example/p2", "a.example"), true, now);
        scheduler.add_url(discovery("https://b.example/p1", "b.example"), true, now);

        // scheduled_at is now + domain_delay, so advance "now" past it.
        let later = now + chrono::Duration::seconds(2);
        let batch = scheduler.next_batch(10, later, |_| true);

        let hosts: HashSet<_> = batch.iter().map(|e| e.domain.clone()).collect();
        assert_eq!(hosts.len(), batch.len());
        assert_eq!(batch.len(), 2);
    }

    #[test]
    fn next_batch_empty_when_nothing_eligible() {
        let mut scheduler = Scheduler::new(100, 1000);
        let now = Utc::now();
        scheduler.add_url(discovery("https://a.example/p1", "a.example"), true, now);
        // Not yet past the scheduled_at delay.
        let batch = scheduler.next_batch(10, now, |_| true);
        assert!(batch.is_empty());
    }

    #[test]
    fn domain_ban_purges_frontier() {
        let mut scheduler = Scheduler::new(100, 1000);
        let now = Utc::now();
        scheduler.add_url(discovery("https://bad.example/p1", "bad.example"), true, now);
        scheduler.add_url(discovery("https://good.example/p1", "good.example"), true, now);
        scheduler.mark_disallowed_domain("bad.example");
        assert_eq!(scheduler.frontier_len(), 1);
    }
}
