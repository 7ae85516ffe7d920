//! Response classifier (C4): turns a fetch outcome into an action
//! (accept / follow redirect / back off / disallow the URL / disallow the
//! whole host), updating the per-host distress UTEMA and per-URL counters
//! and redirect trail along the way.

use crate::state::{HostState, UrlErrorState};
use chrono::{DateTime, Utc};
use rand::Rng;

/// Ceiling a per-URL/per-domain delay can grow to via backoff.
const MAX_BACKOFF_DELAY_SECS: u64 = 3600;

/// What the fetcher actually saw for one URL.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    /// `None` for a connection failure / timeout (no response at all).
    pub status: Option<u16>,
    pub location: Option<String>,
    pub retry_after: Option<String>,
}

/// The classifier's verdict for one fetched URL.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// 2xx: proceed to scoring and extraction.
    Accept,
    /// 3xx with a `Location`: admit the redirect target, using the
    /// same incoming score as the original URL's parent.
    FollowRedirect { target: String },
    /// Recoverable failure: reschedule this URL after `retry_at`.
    Backoff { retry_at: DateTime<Utc>, delay_ms: f64 },
    /// This specific URL is ruled out, but the host is not.
    DisallowUrl { reason: &'static str },
    /// The whole host crossed the distress threshold: purge its frontier
    /// entries too.
    DisallowDomain { reason: &'static str },
}

/// Classifies one fetch outcome for `url` on `host`, mutating `host`'s
/// distress UTEMA/ring and `url_state`'s counters/redirect trail.
///
/// `current_delay_ms` is the URL's current per-URL backoff delay (distinct
/// from the host's baseline politeness delay); the returned `Backoff`
/// variant carries the grown value forward for the scheduler to persist.
///
/// `ban_threshold`/`ban_min_observations` come from
/// `CrawlerConfig::ban_threshold`/`ban_min_observations`. The average
/// compared against `ban_threshold` is [`crate::state::Utema`]'s weighted
/// mean of per-response severity samples, which (unlike the unnormalized
/// S/N recurrence the source formula describes) is bounded to the
/// severity scale itself — samples in this table never exceed 1.0 — so
/// `ban_threshold` is meant to be set within that bounded range, not at
/// the source formula's literal scale.
#[allow(clippy::too_many_arguments)]
pub fn classify(
    host: &mut HostState,
    url_state: &mut UrlErrorState,
    outcome: &FetchOutcome,
    current_delay_ms: f64,
    now: DateTime<Utc>,
    ban_threshold: f64,
    ban_min_observations: u64,
) -> Verdict {
    let status_for_ring = outcome.status.unwrap_or(0);

    match outcome.status {
        None => {
            host.record_outcome(1.0, status_for_ring);
            url_state.record_status(0);
            if let Some(verdict) = check_domain_ban(host, ban_threshold, ban_min_observations) {
                return verdict;
            }
            if url_state.count_for(0) >= 3 {
                DisallowUrl::reason("counter")
            } else {
                backoff(current_delay_ms, now)
            }
        }
        Some(code) if (200..300).contains(&code) => {
            host.record_outcome(0.0, code);
            Verdict::Accept
        }
        Some(code) if (300..400).contains(&code) => {
            host.record_outcome(0.0, code);
            match &outcome.location {
                Some(target) => {
                    if url_state.push_redirect(target) {
                        DisallowUrl::reason("loop")
                    } else {
                        Verdict::FollowRedirect {
                            target: target.clone(),
                        }
                    }
                }
                None => {
                    // A redirect status with no Location header is
                    // functionally a dead end: treat it like a generic
                    // 4xx-style soft failure rather than silently
                    // dropping the URL.
                    url_state.record_status(code);
                    if let Some(verdict) =
                        check_domain_ban(host, ban_threshold, ban_min_observations)
                    {
                        return verdict;
                    }
                    backoff(current_delay_ms, now)
                }
            }
        }
        Some(code) if code == 400 => {
            host.record_outcome(1.0, code);
            url_state.record_status(code);
            if let Some(verdict) = check_domain_ban(host, ban_threshold, ban_min_observations) {
                return verdict;
            }
            if url_state.count_for(code) >= 3 {
                DisallowUrl::reason("counter")
            } else {
                backoff(current_delay_ms, now)
            }
        }
        Some(code) if code == 429 => {
            host.record_outcome(0.5, code);
            url_state.record_status(code);
            if let Some(verdict) = check_domain_ban(host, ban_threshold, ban_min_observations) {
                return verdict;
            }
            if url_state.count_for(code) >= 10 {
                return DisallowUrl::reason("counter");
            }
            match retry_after_delay(outcome.retry_after.as_deref(), now) {
                Some(retry_at) => Verdict::Backoff {
                    retry_at,
                    delay_ms: current_delay_ms,
                },
                None => backoff(current_delay_ms, now),
            }
        }
        Some(code) if (400..500).contains(&code) => {
            host.record_outcome(1.0, code);
            url_state.record_status(code);
            if let Some(verdict) = check_domain_ban(host, ban_threshold, ban_min_observations) {
                return verdict;
            }
            if url_state.count_for(code) >= 2 {
                DisallowUrl::reason("counter")
            } else {
                backoff(current_delay_ms, now)
            }
        }
        Some(code) if matches!(code, 500..=506 | 599) => {
            host.record_outcome(1.0, code);
            url_state.record_status(code);
            if let Some(verdict) = check_domain_ban(host, ban_threshold, ban_min_observations) {
                return verdict;
            }
            if url_state.count_for(code) >= 5 {
                return DisallowUrl::reason("counter");
            }
            if code == 503 {
                if let Some(retry_at) = retry_after_delay(outcome.retry_after.as_deref(), now) {
                    return Verdict::Backoff {
                        retry_at,
                        delay_ms: current_delay_ms,
                    };
                }
            }
            backoff(current_delay_ms, now)
        }
        Some(code) if (507..=509).contains(&code) => {
            host.record_outcome(0.75, code);
            url_state.record_status(code);
            if let Some(verdict) = check_domain_ban(host, ban_threshold, ban_min_observations) {
                return verdict;
            }
            if url_state.count_for(code) >= 3 {
                return DisallowUrl::reason("counter");
            }
            let delay_ms = (MAX_BACKOFF_DELAY_SECS * 1000) as f64;
            Verdict::Backoff {
                retry_at: now + chrono::Duration::seconds(MAX_BACKOFF_DELAY_SECS as i64),
                delay_ms,
            }
        }
        Some(code) => {
            host.record_outcome(0.4, code);
            url_state.record_status(code);
            if let Some(verdict) = check_domain_ban(host, ban_threshold, ban_min_observations) {
                return verdict;
            }
            if url_state.count_for(code) >= 3 {
                DisallowUrl::reason("counter")
            } else {
                backoff(current_delay_ms, now)
            }
        }
    }
}

fn check_domain_ban(
    host: &HostState,
    ban_threshold: f64,
    ban_min_observations: u64,
) -> Option<Verdict> {
    if host.is_banned(ban_threshold, ban_min_observations) {
        Some(Verdict::DisallowDomain { reason: "average" })
    } else {
        None
    }
}

/// Grows `current_delay_ms` by a random factor in `[sqrt(2), 2]`, clamped
/// to the backoff ceiling, and reschedules at `now + new_delay`.
fn backoff(current_delay_ms: f64, now: DateTime<Utc>) -> Verdict {
    let factor = rand::thread_rng().gen_range(std::f64::consts::SQRT_2..=2.0);
    let max_ms = (MAX_BACKOFF_DELAY_SECS * 1000) as f64;
    let new_delay = (current_delay_ms.max(1.0) * factor).min(max_ms);
    Verdict::Backoff {
        retry_at: now + chrono::Duration::milliseconds(new_delay as i64),
        delay_ms: new_delay,
    }
}

/// Parses a `Retry-After` header (seconds, or an HTTP-date) into an
/// absolute retry time. Returns `None` if the header is absent or
/// unparseable, in which case the caller falls back to exponential
/// backoff.
fn retry_after_delay(header: Option<&str>, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let header = header?;
    if let Ok(secs) = header.trim().parse::<i64>() {
        return Some(now + chrono::Duration::seconds(secs.max(0)));
    }
    DateTime::parse_from_rfc2822(header.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Small helper so the match arms above read as `DisallowUrl::reason(...)`
/// rather than repeating the enum path.
struct DisallowUrl;
impl DisallowUrl {
    fn reason(reason: &'static str) -> Verdict {
        Verdict::DisallowUrl { reason }
    }
}
