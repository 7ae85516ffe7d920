//! URL handling: normalization, domain extraction, wildcard matching, and
//! static domain classification.

mod domain;
mod matcher;
mod normalize;

use crate::config::Config;

pub use domain::extract_domain;
pub use matcher::matches_wildcard;
pub use normalize::normalize_url;

/// Static, config-driven domain classification. This is the crawler's
/// pre-filter layer (known-good seeds, known-bad hosts) and is orthogonal
/// to the frontier's dynamically-computed disallow list, which is driven
/// by runtime error/distress statistics rather than a fixed list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DomainClassification {
    /// Quality domain with configured seed URLs — should be fully crawled.
    Quality,
    /// Statically blocked (config blacklist or baked-in excluded list).
    Blacklisted,
    /// Found during the crawl, not otherwise configured.
    Discovered,
}

impl DomainClassification {
    pub fn should_crawl(&self) -> bool {
        matches!(self, Self::Quality | Self::Discovered)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Blacklisted)
    }
}

/// Classifies a domain against the configuration's static lists, in
/// priority order: blacklist/excluded (highest), quality, else discovered.
///
/// # Examples
///
/// ```no_run
/// use tue_ripple::config::Config;
/// use tue_ripple::url::{classify_domain, DomainClassification};
///
/// # fn example(config: &Config) {
/// match classify_domain("example.com", config) {
///     DomainClassification::Quality => println!("will crawl fully"),
///     DomainClassification::Blacklisted => println!("will skip"),
///     DomainClassification::Discovered => println!("new domain found"),
/// }
/// # }
/// ```
pub fn classify_domain(domain: &str, config: &Config) -> DomainClassification {
    for entry in &config.blacklist {
        if matches_wildcard(&entry.domain, domain) {
            return DomainClassification::Blacklisted;
        }
    }

    for excluded in &config.vocabulary.excluded_domains {
        if matches_wildcard(excluded, domain) {
            return DomainClassification::Blacklisted;
        }
    }

    for entry in &config.quality {
        if matches_wildcard(&entry.domain, domain) {
            return DomainClassification::Quality;
        }
    }

    DomainClassification::Discovered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CrawlerConfig, DomainEntry, OutputConfig, QualityEntry, UserAgentConfig};

    fn create_test_config() -> Config {
        Config {
            crawler: CrawlerConfig {
                max_depth: 3,
                max_parallel: 10,
                domain_delay_ms: 1000,
                domain_crawl_ceiling: 500,
                max_pages: 0,
                urls_per_batch: 50,
                request_timeout_secs: 10,
                utema_beta: 0.2,
                scorer_utema_beta: 0.2,
                multiprocessing: false,
                max_workers: 4,
                proxy: None,
                ban_threshold: 0.5,
                ban_min_observations: 3,
            },
            user_agent: UserAgentConfig {
                crawler_name: "TestCrawler".to_string(),
                crawler_version: "1.0".to_string(),
                contact_url: "https://example.com/about".to_string(),
                contact_email: "admin@example.com".to_string(),
            },
            output: OutputConfig {
                database_path: "./test.db".to_string(),
                summary_path: "./summary.md".to_string(),
                csv_path: None,
            },
            quality: vec![QualityEntry {
                domain: "quality.com".to_string(),
                seeds: vec!["https://quality.com/".to_string()],
            }],
            blacklist: vec![DomainEntry {
                domain: "bad.com".to_string(),
            }],
            vocabulary: crate::config::VocabularyConfig {
                city_terms: vec![],
                university_terms: vec![],
                faculty_terms: vec![],
                institute_terms: vec![],
                priority_domains: vec![],
                excluded_domains: vec!["excluded.com".to_string()],
            },
        }
    }

    #[test]
    fn test_classify_quality_domain() {
        let config = create_test_config();
        assert_eq!(
            classify_domain("quality.com", &config),
            DomainClassification::Quality
        );
    }

    #[test]
    fn test_classify_blacklisted_domain() {
        let config = create_test_config();
        assert_eq!(
            classify_domain("bad.com", &config),
            DomainClassification::Blacklisted
        );
    }

    #[test]
    fn test_classify_excluded_domain() {
        let config = create_test_config();
        assert_eq!(
            classify_domain("excluded.com", &config),
            DomainClassification::Blacklisted
        );
    }

    #[test]
    fn test_classify_discovered_domain() {
        let config = create_test_config();
        assert_eq!(
            classify_domain("random.com", &config),
            DomainClassification::Discovered
        );
    }

    #[test]
    fn test_priority_blacklist_over_quality() {
        let mut config = create_test_config();
        config.blacklist.push(DomainEntry {
            domain: "conflict.com".to_string(),
        });
        config.quality.push(QualityEntry {
            domain: "conflict.com".to_string(),
            seeds: vec!["https://conflict.com/".to_string()],
        });

        assert_eq!(
            classify_domain("conflict.com", &config),
            DomainClassification::Blacklisted
        );
    }

    #[test]
    fn test_wildcard_classification() {
        let mut config = create_test_config();
        config.blacklist.push(DomainEntry {
            domain: "*.bad.com".to_string(),
        });

        assert_eq!(
            classify_domain("bad.com", &config),
            DomainClassification::Blacklisted
        );
        assert_eq!(
            classify_domain("sub.bad.com", &config),
            DomainClassification::Blacklisted
        );
        assert_eq!(
            classify_domain("deep.sub.bad.com", &config),
            DomainClassification::Blacklisted
        );
    }

    #[test]
    fn test_should_crawl() {
        assert!(DomainClassification::Quality.should_crawl());
        assert!(DomainClassification::Discovered.should_crawl());
        assert!(!DomainClassification::Blacklisted.should_crawl());
    }

    #[test]
    fn test_is_terminal() {
        assert!(!DomainClassification::Quality.is_terminal());
        assert!(!DomainClassification::Discovered.is_terminal());
        assert!(DomainClassification::Blacklisted.is_terminal());
    }
}
