//! Robots.txt parser implementation
//!
//! This module provides functionality for parsing robots.txt content using the robotstxt crate.

use robotstxt::DefaultMatcher;

/// Parsed robots.txt data
///
/// This is a wrapper around the robotstxt crate's types, providing a simplified
/// interface for checking if URLs are allowed.
#[derive(Debug, Clone)]
pub struct ParsedRobots {
    /// Raw robots.txt content (empty string means allow all)
    content: String,
    /// Whether to allow all (true = allow all, false = parse content)
    allow_all: bool,
}

impl ParsedRobots {
    /// Creates a new ParsedRobots from raw robots.txt content
    ///
    /// # Arguments
    ///
    /// * `content` - The raw robots.txt file content
    ///
    /// # Returns
    ///
    /// A ParsedRobots instance that can be used to check URL permissions
    pub fn from_content(content: &str) -> Self {
        Self {
            content: content.to_string(),
            allow_all: false,
        }
    }

    /// Creates a permissive ParsedRobots that allows everything
    ///
    /// This is used as the default when robots.txt cannot be fetched or parsed.
    pub fn allow_all() -> Self {
        Self {
            content: String::new(),
            allow_all: true,
        }
    }

    /// Checks if a URL is allowed for the given user agent
    ///
    /// # Arguments
    ///
    /// * `url` - The URL path to check (e.g., "/page.html")
    /// * `user_agent` - The user agent string
    ///
    /// # Returns
    ///
    /// * `true` - If the URL is allowed
    /// * `false` - If the URL is disallowed
    pub fn is_allowed(&self, url: &str, user_agent: &str) -> bool {
        if self.allow_all || self.content.is_empty() {
            // Empty content or explicit allow-all means allow all
            return true;
        }

        // Parse and check on-demand
        let mut matcher = DefaultMatcher::default();
        matcher.one_agent_allowed_by_robots(&self.content, user_agent, url)
    }

    /// Gets the crawl delay for a specific user agent.
    ///
    /// `robotstxt` only exposes allow/deny matching, not `Crawl-delay`, so
    /// this walks the raw text itself: within the first group whose
    /// `User-agent` line matches (case-insensitively, falling back to `*`),
    /// the last `Crawl-delay` value wins. A value that doesn't parse as a
    /// non-negative number is treated as malformed and falls back to the
    /// caller's default rather than panicking or silently using zero.
    pub fn crawl_delay(&self, user_agent: &str) -> Option<f64> {
        if self.allow_all || self.content.is_empty() {
            return None;
        }
        find_crawl_delay(&self.content, user_agent)
    }
}

/// Splits robots.txt content into `User-agent` groups and returns the
/// crawl-delay from the most specific group that applies: an exact
/// (case-insensitive) product-token match if present, otherwise the `*`
/// group.
fn find_crawl_delay(content: &str, user_agent: &str) -> Option<f64> {
    let agent_token = user_agent.split('/').next().unwrap_or(user_agent).trim();

    let mut specific: Option<f64> = None;
    let mut wildcard: Option<f64> = None;
    let mut current_agents: Vec<String> = Vec::new();
    let mut current_delay: Option<f64> = None;

    let flush = |agents: &[String],
                 delay: Option<f64>,
                 specific: &mut Option<f64>,
                 wildcard: &mut Option<f64>| {
        let Some(d) = delay else { return };
        for agent in agents {
            if agent == "*" {
                *wildcard = Some(d);
            } else if agent.eq_ignore_ascii_case(agent_token) {
                *specific = Some(d);
            }
        }
    };

    for raw_line in content.lines() {
        let line = raw_line.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }
        let Some((directive, value)) = line.split_once(':') else {
            continue;
        };
        let directive = directive.trim().to_ascii_lowercase();
        let value = value.trim();

        match directive.as_str() {
            "user-agent" => {
                // A new User-agent line after we've already seen a
                // Crawl-delay starts a fresh group.
                if current_delay.is_some() {
                    flush(&current_agents, current_delay, &mut specific, &mut wildcard);
                    current_agents.clear();
                    current_delay = None;
                }
                current_agents.push(value.to_string());
            }
            "crawl-delay" => {
                current_delay = match value.parse::<f64>() {
                    Ok(v) if v.is_finite() && v >= 0.0 => Some(v),
                    _ => Some(DEFAULT_MALFORMED_DELAY),
                };
            }
            _ => {}
        }
    }
    flush(&current_agents, current_delay, &mut specific, &mut wildcard);

    specific.or(wildcard)
}

/// Used when a `Crawl-delay` value is present but doesn't parse as a
/// non-negative number, rather than treating it as absent.
const DEFAULT_MALFORMED_DELAY: f64 = 1.5;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allow_all() {
        let robots = ParsedRobots::allow_all();
        assert!(robots.is_allowed("/any/path", "TestBot"));
        assert!(robots.is_allowed("/admin", "TestBot"));
    }

    #[test]
    fn test_parse_disallow_all() {
        let content = "User-agent: *\nDisallow: /";
        let robots = ParsedRobots::from_content(content);
        assert!(!robots.is_allowed("/", "TestBot"));
        assert!(!robots.is_allowed("/page", "TestBot"));
    }

    #[test]
    fn test_parse_disallow_specific() {
        let content = "User-agent: *\nDisallow: /admin";
        let robots = ParsedRobots::from_content(content);
        assert!(robots.is_allowed("/", "TestBot"));
        assert!(robots.is_allowed("/page", "TestBot"));
        assert!(!robots.is_allowed("/admin", "TestBot"));
        assert!(!robots.is_allowed("/admin/users", "TestBot"));
    }

    #[test]
    fn test_parse_allow_and_disallow() {
        let content = "User-agent: *\nDisallow: /private\nAllow: /private/public";
        let robots = ParsedRobots::from_content(content);
        assert!(robots.is_allowed("/", "TestBot"));
        assert!(!robots.is_allowed("/private", "TestBot"));
        assert!(robots.is_allowed("/private/public", "TestBot"));
    }

    #[test]
    fn test_parse_specific_user_agent() {
        let content = "User-agent: BadBot\nDisallow: /\n\nUser-agent: *\nAllow: /";
        let robots = ParsedRobots::from_content(content);
        assert!(robots.is_allowed("/page", "GoodBot"));
        assert!(!robots.is_allowed("/page", "BadBot"));
    }

    #[test]
    fn test_invalid_robots_txt() {
        let content = "This is not valid robots.txt {{{";
        let robots = ParsedRobots::from_content(content);
        // Should fall back to allow_all behavior
        assert!(robots.is_allowed("/any/path", "TestBot"));
    }

    #[test]
    fn test_empty_robots_txt() {
        let content = "";
        let robots = ParsedRobots::from_content(content);
        assert!(robots.is_allowed("/any/path", "TestBot"));
    }

    #[test]
    fn test_crawl_delay_wildcard() {
        let content = "User-agent: *\nCrawl-delay: 5\nDisallow: /admin";
        let robots = ParsedRobots::from_content(content);
        assert_eq!(robots.crawl_delay("tue-ripple/1.0"), Some(5.0));
    }

    #[test]
    fn test_crawl_delay_prefers_specific_group() {
        let content = "User-agent: tue-ripple\nCrawl-delay: 2\n\nUser-agent: *\nCrawl-delay: 10";
        let robots = ParsedRobots::from_content(content);
        assert_eq!(robots.crawl_delay("tue-ripple/1.0"), Some(2.0));
        assert_eq!(robots.crawl_delay("OtherBot/1.0"), Some(10.0));
    }

    #[test]
    fn test_crawl_delay_absent() {
        let content = "User-agent: *\nDisallow: /admin";
        let robots = ParsedRobots::from_content(content);
        assert_eq!(robots.crawl_delay("TestBot"), None);
    }

    #[test]
    fn test_crawl_delay_malformed_value_falls_back_to_default() {
        let content = "User-agent: *\nCrawl-delay: not-a-number";
        let robots = ParsedRobots::from_content(content);
        assert_eq!(robots.crawl_delay("TestBot"), Some(1.5));
    }

    #[test]
    fn test_crawl_delay_allow_all_is_none() {
        let robots = ParsedRobots::allow_all();
        assert_eq!(robots.crawl_delay("TestBot"), None);
    }
}
