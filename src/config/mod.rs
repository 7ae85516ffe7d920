//! Configuration for tue-ripple.
//!
//! TOML config file (serde, kebab-case), layered under CLI flags which
//! take precedence. See [`load_config`] and [`overrides::apply_overrides`].
//!
//! # Example
//!
//! ```no_run
//! use tue_ripple::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("config.toml")).unwrap();
//! println!("Crawler will use max depth: {}", config.crawler.max_depth);
//! ```

mod overrides;
mod parser;
mod types;
mod validation;

pub use overrides::{apply_overrides, CliOverrides};
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
pub use types::{
    Config, CrawlerConfig, DomainEntry, OutputConfig, QualityEntry, UserAgentConfig,
    VocabularyConfig,
};
