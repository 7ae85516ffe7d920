use crate::config::types::{Config, QualityEntry};

/// CLI-supplied values that take precedence over the TOML config file,
/// mirroring spec.md's flag surface. `None`/`false` means "use whatever
/// the config file says".
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    pub seeds: Vec<String>,
    pub max_pages: Option<u32>,
    pub delay_ms: Option<u64>,
    pub timeout_secs: Option<u64>,
    pub db_path: Option<String>,
    pub csv_path: Option<String>,
    pub multiprocessing: Option<bool>,
    pub max_workers: Option<u32>,
    pub urls_per_batch: Option<u32>,
    pub domain_delay_ms: Option<u64>,
    pub proxy: Option<String>,
    pub utema_beta: Option<f64>,
}

/// Applies CLI overrides onto a loaded config, in place.
pub fn apply_overrides(config: &mut Config, overrides: &CliOverrides) {
    if !overrides.seeds.is_empty() {
        config.quality.push(QualityEntry {
            domain: "_cli_seeds".to_string(),
            seeds: overrides.seeds.clone(),
        });
    }
    if let Some(v) = overrides.max_pages {
        config.crawler.max_pages = v;
    }
    if let Some(v) = overrides.delay_ms {
        config.crawler.domain_delay_ms = v;
    }
    if let Some(v) = overrides.domain_delay_ms {
        config.crawler.domain_delay_ms = v;
    }
    if let Some(v) = overrides.timeout_secs {
        config.crawler.request_timeout_secs = v;
    }
    if let Some(ref v) = overrides.db_path {
        config.output.database_path = v.clone();
    }
    if let Some(ref v) = overrides.csv_path {
        config.output.csv_path = Some(v.clone());
    }
    if let Some(v) = overrides.multiprocessing {
        config.crawler.multiprocessing = v;
    }
    if let Some(v) = overrides.max_workers {
        config.crawler.max_workers = v;
    }
    if let Some(v) = overrides.urls_per_batch {
        config.crawler.urls_per_batch = v;
    }
    if let Some(ref v) = overrides.proxy {
        config.crawler.proxy = Some(v.clone());
    }
    if let Some(v) = overrides.utema_beta {
        config.crawler.utema_beta = v;
    }
}
