use serde::Deserialize;

/// Main configuration structure for tue-ripple.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub quality: Vec<QualityEntry>,
    #[serde(default)]
    pub blacklist: Vec<DomainEntry>,
    #[serde(default)]
    pub vocabulary: VocabularyConfig,
}

/// Crawler behavior configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Maximum link-distance from any seed a URL may be admitted at.
    #[serde(rename = "max-depth", default = "default_max_depth")]
    pub max_depth: u32,

    /// Maximum number of fetches in flight at once (worker pool size).
    #[serde(rename = "max-parallel", default = "default_max_parallel")]
    pub max_parallel: u32,

    /// Baseline minimum delay between requests to the same host, in
    /// milliseconds. Raised by robots.txt `Crawl-delay` or backoff when
    /// either is larger.
    #[serde(rename = "domain-delay", default = "default_domain_delay")]
    pub domain_delay_ms: u64,

    /// Safety ceiling on pages crawled from a single host in one run.
    #[serde(rename = "domain-crawl-ceiling", default = "default_domain_ceiling")]
    pub domain_crawl_ceiling: u32,

    /// Overall page budget for the run (0 = unbounded).
    #[serde(rename = "max-pages", default)]
    pub max_pages: u32,

    /// How many frontier entries the scheduler dispenses per batch.
    #[serde(rename = "urls-per-batch", default = "default_urls_per_batch")]
    pub urls_per_batch: u32,

    /// Per-request timeout, in seconds.
    #[serde(rename = "request-timeout", default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// UTEMA smoothing factor (beta) for the domain error-rate ban check.
    #[serde(rename = "utema-beta", default = "default_utema_beta")]
    pub utema_beta: f64,

    /// UTEMA smoothing factor (beta) for the relevance scorer.
    #[serde(rename = "scorer-utema-beta", default = "default_utema_beta")]
    pub scorer_utema_beta: f64,

    /// Run multiple concurrent workers pulling from the same frontier
    /// instead of a single fetch loop.
    #[serde(rename = "multiprocessing", default)]
    pub multiprocessing: bool,

    /// Worker count when `multiprocessing` is enabled.
    #[serde(rename = "max-workers", default = "default_max_workers")]
    pub max_workers: u32,

    /// Optional outbound HTTP/HTTPS proxy.
    #[serde(rename = "proxy", default)]
    pub proxy: Option<String>,

    /// UTEMA average a host's distress samples must exceed, over at least
    /// `ban_min_observations` samples, before the whole domain is banned.
    #[serde(rename = "ban-threshold", default = "default_ban_threshold")]
    pub ban_threshold: f64,

    /// Minimum number of distress samples required before the ban
    /// threshold can fire.
    #[serde(rename = "ban-min-observations", default = "default_ban_min_observations")]
    pub ban_min_observations: u64,
}

fn default_max_depth() -> u32 {
    8
}
fn default_max_parallel() -> u32 {
    10
}
fn default_domain_delay() -> u64 {
    1000
}
fn default_domain_ceiling() -> u32 {
    5000
}
fn default_urls_per_batch() -> u32 {
    50
}
fn default_request_timeout() -> u64 {
    10
}
fn default_utema_beta() -> f64 {
    0.2
}
fn default_max_workers() -> u32 {
    4
}
fn default_ban_threshold() -> f64 {
    0.5
}
fn default_ban_min_observations() -> u64 {
    3
}

/// User agent identification configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    #[serde(rename = "contact-url")]
    pub contact_url: String,

    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

/// Output configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(rename = "database-path")]
    pub database_path: String,

    #[serde(rename = "summary-path")]
    pub summary_path: String,

    /// Optional full `pages` table export path, requested with `--csv`.
    #[serde(rename = "csv-path", default)]
    pub csv_path: Option<String>,
}

/// Quality domain entry with seed URLs.
#[derive(Debug, Clone, Deserialize)]
pub struct QualityEntry {
    pub domain: String,
    pub seeds: Vec<String>,
}

/// Simple domain entry for the blacklist.
#[derive(Debug, Clone, Deserialize)]
pub struct DomainEntry {
    pub domain: String,
}

/// Domain-specific vocabulary used by the relevance scorer and by the
/// frontier's static blocked-host set.
///
/// The term lists mirror the scorer's text-score categories: city-centric,
/// university (`faculty_terms` folds into this category rather than
/// scoring its own tier, since on their own they're generic academic
/// vocabulary with no Tübingen qualifier), and academic-institute terms
/// each contribute independently, capped at one match per category.
#[derive(Debug, Clone, Deserialize)]
pub struct VocabularyConfig {
    #[serde(rename = "city-terms", default = "default_city_terms")]
    pub city_terms: Vec<String>,

    #[serde(rename = "university-terms", default = "default_university_terms")]
    pub university_terms: Vec<String>,

    #[serde(rename = "faculty-terms", default = "default_faculty_terms")]
    pub faculty_terms: Vec<String>,

    #[serde(rename = "institute-terms", default = "default_institute_terms")]
    pub institute_terms: Vec<String>,

    #[serde(rename = "priority-domains", default = "default_priority_domains")]
    pub priority_domains: Vec<String>,

    #[serde(rename = "excluded-domains", default = "default_excluded_domains")]
    pub excluded_domains: Vec<String>,
}

impl Default for VocabularyConfig {
    fn default() -> Self {
        VocabularyConfig {
            city_terms: default_city_terms(),
            university_terms: default_university_terms(),
            faculty_terms: default_faculty_terms(),
            institute_terms: default_institute_terms(),
            priority_domains: default_priority_domains(),
            excluded_domains: default_excluded_domains(),
        }
    }
}

fn default_city_terms() -> Vec<String> {
    [
        "tübingen",
        "tuebingen",
        "uni-tuebingen",
        "neckar",
        "swabia",
        "altstadt",
        "old town",
        "castle",
        "schönbuch",
        "württemberg",
        "baden württemberg",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_university_terms() -> Vec<String> {
    [
        "university",
        "eberhard karls",
        "student",
        "campus",
        "lecture",
        "seminar",
        "enrollment",
        "matriculation",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_faculty_terms() -> Vec<String> {
    [
        "faculty",
        "department",
        "chair of",
        "professor",
        "dean",
        "institute director",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_institute_terms() -> Vec<String> {
    [
        "max planck institute",
        "cyber valley",
        "hertie institute",
        "dai-tuebingen",
        "research campus",
        "academic",
        "research",
        "medieval studies",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_priority_domains() -> Vec<String> {
    [
        "uni-tuebingen.de",
        "tuebingen.de",
        "tuebingen.city",
        "tuebingen.mpg.de",
        "tuebingen.ai",
        "cyber-valley.de",
        "my-stuwe.de",
        "dai-tuebingen.de",
        "tuebingenresearchcampus.com",
        "hih-tuebingen.de",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_excluded_domains() -> Vec<String> {
    [
        "facebook.com",
        "twitter.com",
        "x.com",
        "instagram.com",
        "tiktok.com",
        "youtube.com",
        "linkedin.com",
        "pinterest.com",
        "reddit.com",
        "vk.com",
        "weibo.com",
        "booking.com",
        "tripadvisor.com",
        "expedia.com",
        "airbnb.com",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
