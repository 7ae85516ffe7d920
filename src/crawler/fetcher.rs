//! HTTP fetcher (C3): fetches a batch of URLs with pairwise distinct hosts
//! concurrently under a shared timeout, surfacing redirects rather than
//! following them so the classifier (C4) can decide what to do with each
//! hop.

use crate::config::UserAgentConfig;
use reqwest::{redirect::Policy, Client};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

/// One fetched response, or the absence of one.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub url: String,
    pub responded: bool,
    pub status: Option<u16>,
    pub content_type: Option<String>,
    pub location: Option<String>,
    pub retry_after: Option<String>,
    pub last_modified: Option<String>,
    pub etag: Option<String>,
    pub body: Option<String>,
}

impl FetchResponse {
    fn no_response(url: &str) -> Self {
        FetchResponse {
            url: url.to_string(),
            responded: false,
            status: None,
            content_type: None,
            location: None,
            retry_after: None,
            last_modified: None,
            etag: None,
            body: None,
        }
    }
}

/// Body patterns that flag a response as a verification challenge rather
/// than real content, combined with one of [`CHALLENGE_STATUSES`].
const CHALLENGE_BODY_PATTERNS: &[&str] = &["cloudflare", "checking your browser", "captcha"];
const CHALLENGE_STATUSES: &[u16] = &[401, 403, 406, 408, 409, 429, 503];

/// Bounded retries for a verification challenge before the host is marked
/// verification-failed for the rest of the run.
const MAX_VERIFICATION_ATTEMPTS: u32 = 3;

/// Alternate User-Agent strings tried, in order, after a verification
/// challenge. The primary named identity is always tried first.
const ALTERNATE_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Safari/605.1.15",
];

/// Builds the fetcher's HTTP client: named User-Agent, manual redirects
/// (the classifier decides what to do with a 3xx), gzip/deflate/brotli
/// decompression, and a shared per-request timeout.
pub fn build_http_client(
    config: &UserAgentConfig,
    timeout_secs: u64,
    proxy: Option<&str>,
) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder()
        .user_agent(default_user_agent(config))
        .timeout(Duration::from_secs(timeout_secs))
        .connect_timeout(Duration::from_secs(timeout_secs.min(10)))
        .redirect(Policy::none())
        .gzip(true)
        .deflate(true)
        .brotli(true);

    if let Some(proxy_url) = proxy {
        builder = builder.proxy(reqwest::Proxy::all(proxy_url)?);
    }

    builder.build()
}

pub fn default_user_agent(config: &UserAgentConfig) -> String {
    format!(
        "{}/{} (+{}; {})",
        config.crawler_name, config.crawler_version, config.contact_url, config.contact_email
    )
}

/// Tracks which hosts have exhausted their verification-challenge retries
/// for the rest of the run, so every later URL on that host short-circuits
/// as `responded=false` without spending a real request.
#[derive(Debug, Default)]
pub struct VerificationState {
    failed_hosts: Mutex<HashMap<String, u32>>,
}

impl VerificationState {
    pub fn new() -> Self {
        Self::default()
    }

    fn is_failed(&self, host: &str) -> bool {
        self.failed_hosts
            .lock()
            .unwrap()
            .get(host)
            .is_some_and(|n| *n >= MAX_VERIFICATION_ATTEMPTS)
    }

    fn record_attempt(&self, host: &str) -> u32 {
        let mut map = self.failed_hosts.lock().unwrap();
        let count = map.entry(host.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    fn clear(&self, host: &str) {
        self.failed_hosts.lock().unwrap().remove(host);
    }
}

/// Fetches a batch of URLs concurrently. Callers are responsible for the
/// pairwise-distinct-host guarantee (the scheduler enforces it); this
/// function does not re-check it.
pub async fn fetch_batch(
    client: &Client,
    urls: &[String],
    verification: &std::sync::Arc<VerificationState>,
) -> Vec<FetchResponse> {
    let mut set = tokio::task::JoinSet::new();
    for (index, url) in urls.iter().cloned().enumerate() {
        let client = client.clone();
        let verification = verification.clone();
        set.spawn(async move { (index, fetch_one(&client, &url, &verification).await) });
    }

    let mut results: Vec<Option<FetchResponse>> = (0..urls.len()).map(|_| None).collect();
    while let Some(joined) = set.join_next().await {
        if let Ok((index, response)) = joined {
            results[index] = Some(response);
        }
    }

    results
        .into_iter()
        .zip(urls)
        .map(|(r, url)| r.unwrap_or_else(|| FetchResponse::no_response(url)))
        .collect()
}

/// Fetches a single URL, handling the decode-then-retry-without-brotli
/// fallback and bounded verification-challenge retries with UA rotation.
pub async fn fetch_one(
    client: &Client,
    url: &str,
    verification: &VerificationState,
) -> FetchResponse {
    let host = url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_default();

    if verification.is_failed(&host) {
        return FetchResponse::no_response(url);
    }

    for attempt in 0..MAX_VERIFICATION_ATTEMPTS {
        let user_agent = if attempt == 0 {
            None
        } else {
            ALTERNATE_USER_AGENTS.get((attempt as usize - 1) % ALTERNATE_USER_AGENTS.len())
        };

        let response = fetch_once(client, url, user_agent).await;

        if !response.responded {
            return response;
        }

        if is_verification_challenge(&response) {
            let attempts = verification.record_attempt(&host);
            if attempts >= MAX_VERIFICATION_ATTEMPTS {
                tracing::warn!(host, "host marked verification-failed");
                return FetchResponse::no_response(url);
            }
            let backoff = Duration::from_millis(500 * 2u64.pow(attempt));
            tokio::time::sleep(backoff).await;
            continue;
        }

        verification.clear(&host);
        return response;
    }

    FetchResponse::no_response(url)
}

fn is_verification_challenge(response: &FetchResponse) -> bool {
    let Some(status) = response.status else {
        return false;
    };
    if !CHALLENGE_STATUSES.contains(&status) {
        return false;
    }
    let Some(body) = &response.body else {
        return true;
    };
    let lower = body.to_lowercase();
    CHALLENGE_BODY_PATTERNS.iter().any(|p| lower.contains(p))
}

/// Performs one GET, shaping headers per the fetcher's request contract
/// and falling back to a brotli-free request if the decoded body doesn't
/// look like text.
async fn fetch_once(client: &Client, url: &str, user_agent: Option<&str>) -> FetchResponse {
    let response = send_request(client, url, user_agent, true).await;

    match response {
        Ok(resp) if !looks_textual(&resp.body) => {
            send_request(client, url, user_agent, false)
                .await
                .unwrap_or(resp)
        }
        Ok(resp) => resp,
        Err(_) => FetchResponse::no_response(url),
    }
}

async fn send_request(
    client: &Client,
    url: &str,
    user_agent: Option<&str>,
    allow_brotli: bool,
) -> Result<FetchResponse, reqwest::Error> {
    let accept_encoding = if allow_brotli {
        "gzip, deflate, br"
    } else {
        "gzip, deflate"
    };

    let mut request = client
        .get(url)
        .header("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8")
        .header("Accept-Language", "en-US,en;q=0.9,de;q=0.5")
        .header("Accept-Encoding", accept_encoding)
        .header("Connection", "keep-alive");

    if let Some(ua) = user_agent {
        request = request.header("User-Agent", ua);
    }

    let response = request.send().await?;

    let status = response.status().as_u16();
    let headers = response.headers().clone();
    let content_type = header_str(&headers, "content-type");
    let location = header_str(&headers, "location");
    let retry_after = header_str(&headers, "retry-after");
    let last_modified = header_str(&headers, "last-modified");
    let etag = header_str(&headers, "etag");

    let body = response.text().await.ok();

    Ok(FetchResponse {
        url: url.to_string(),
        responded: true,
        status: Some(status),
        content_type,
        location,
        retry_after,
        last_modified,
        etag,
        body,
    })
}

fn header_str(headers: &reqwest::header::HeaderMap, name: &str) -> Option<String> {
    headers.get(name)?.to_str().ok().map(str::to_string)
}

/// A cheap plausibility check for "this decoded to text, not garbage":
/// mostly-printable-ASCII-or-whitespace over a sample of the body. Used to
/// catch a brotli response decoded against the wrong dictionary.
fn looks_textual(body: &Option<String>) -> bool {
    let Some(body) = body else {
        return true;
    };
    if body.is_empty() {
        return true;
    }
    let sample: Vec<char> = body.chars().take(512).collect();
    let printable = sample
        .iter()
        .filter(|c| c.is_whitespace() || !c.is_control())
        .count();
    (printable as f64 / sample.len() as f64) > 0.9
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn ua_config() -> UserAgentConfig {
        UserAgentConfig {
            crawler_name: "TueRipple".to_string(),
            crawler_version: "1.0".to_string(),
            contact_url: "https://example.com/about".to_string(),
            contact_email: "admin@example.com".to_string(),
        }
    }

    #[test]
    fn builds_client() {
        let client = build_http_client(&ua_config(), 10, None);
        assert!(client.is_ok());
    }

    #[tokio::test]
    async fn fetches_success_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/page"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>hi</html>"))
            .mount(&server)
            .await;

        let client = build_http_client(&ua_config(), 5, None).unwrap();
        let verification = VerificationState::new();
        let url = format!("{}/page", server.uri());
        let response = fetch_one(&client, &url, &verification).await;

        assert!(response.responded);
        assert_eq!(response.status, Some(200));
        assert_eq!(response.body.as_deref(), Some("<html>hi</html>"));
    }

    #[tokio::test]
    async fn surfaces_redirect_without_following() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/old"))
            .respond_with(
                ResponseTemplate::new(301).insert_header("Location", "/new"),
            )
            .mount(&server)
            .await;

        let client = build_http_client(&ua_config(), 5, None).unwrap();
        let verification = VerificationState::new();
        let url = format!("{}/old", server.uri());
        let response = fetch_one(&client, &url, &verification).await;

        assert_eq!(response.status, Some(301));
        assert_eq!(response.location.as_deref(), Some("/new"));
    }

    #[tokio::test]
    async fn no_response_for_unreachable_host() {
        let client = build_http_client(&ua_config(), 1, None).unwrap();
        let verification = VerificationState::new();
        let response = fetch_one(&client, "http://127.0.0.1:1/", &verification).await;
        assert!(!response.responded);
    }

    #[test]
    fn detects_verification_challenge_body() {
        let response = FetchResponse {
            url: "https://example.com".to_string(),
            responded: true,
            status: Some(403),
            content_type: None,
            location: None,
            retry_after: None,
            last_modified: None,
            etag: None,
            body: Some("Checking your browser before accessing...".to_string()),
        };
        assert!(is_verification_challenge(&response));
    }

    #[test]
    fn non_challenge_status_is_not_a_challenge() {
        let response = FetchResponse {
            url: "https://example.com".to_string(),
            responded: true,
            status: Some(200),
            content_type: None,
            location: None,
            retry_after: None,
            last_modified: None,
            etag: None,
            body: Some("cloudflare mentioned in passing".to_string()),
        };
        assert!(!is_verification_challenge(&response));
    }
}
