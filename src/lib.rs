//! tue-ripple: a polite, focused web crawler for English-language pages
//! about Tübingen.
//!
//! The crawler walks the web from a seed list, scoring every page it finds
//! for relevance and politeness-limiting every host it talks to, and
//! persists everything it learns (frontier, pages, disallowed hosts/URLs,
//! error history) to a local SQLite database so a run can be paused and
//! resumed.

pub mod config;
pub mod crawler;
pub mod output;
pub mod robots;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Top-level error type for tue-ripple operations.
#[derive(Debug, Error)]
pub enum TueRippleError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("invalid domain pattern: {0}")]
    InvalidPattern(String),
}

/// URL-specific errors.
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("failed to parse URL: {0}")]
    Parse(String),

    #[error("invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("missing domain in URL")]
    MissingDomain,

    #[error("malformed URL: {0}")]
    Malformed(String),
}

pub type Result<T> = std::result::Result<T, TueRippleError>;
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export the commonly used surface.
pub use config::Config;
pub use url::{classify_domain, extract_domain, normalize_url, DomainClassification};
