//! Application configuration for arxivdigest.
//!
//! User config lives at `~/.arxivdigest/arxivdigest.toml`.
//! CLI flags override the `CATEGORIES` environment variable, which overrides
//! config file values, which override defaults.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{DigestError, Result};
use crate::priority::{CategoryPriorities, MAX_OVERRIDE, default_overrides};
use crate::types::Category;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "arxivdigest.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".arxivdigest";

/// Environment variable holding a comma-separated category list.
pub const CATEGORIES_ENV: &str = "CATEGORIES";

// ---------------------------------------------------------------------------
// Config structs (matching arxivdigest.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Crawl settings.
    #[serde(default)]
    pub crawl: CrawlSection,

    /// Category rank overrides; lower ranks are emitted first.
    #[serde(default = "default_overrides")]
    pub priorities: BTreeMap<String, u32>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            crawl: CrawlSection::default(),
            priorities: default_overrides(),
        }
    }
}

/// `[crawl]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlSection {
    /// Category codes whose listings are aggregated.
    #[serde(default = "default_categories")]
    pub categories: Vec<String>,

    /// Repository origin; listing pages live under `{base_url}/list/{code}/new`.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Maximum concurrent detail-page fetches.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for CrawlSection {
    fn default() -> Self {
        Self {
            categories: default_categories(),
            base_url: default_base_url(),
            concurrency: default_concurrency(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_categories() -> Vec<String> {
    vec!["cs.CV".into()]
}
fn default_base_url() -> String {
    "https://arxiv.org".into()
}
fn default_concurrency() -> usize {
    4
}
fn default_timeout_secs() -> u64 {
    30
}

impl AppConfig {
    /// Replace the category list with a comma-separated value, if one is given
    /// and it names at least one category.
    pub fn with_categories_override(mut self, value: Option<&str>) -> Self {
        if let Some(raw) = value {
            let categories = parse_category_list(raw);
            if !categories.is_empty() {
                self.crawl.categories = categories;
            }
        }
        self
    }

    /// Apply the `CATEGORIES` environment variable.
    pub fn with_env(self) -> Self {
        let value = std::env::var(CATEGORIES_ENV).ok();
        if value.is_some() {
            tracing::debug!(var = CATEGORIES_ENV, "category list taken from environment");
        }
        self.with_categories_override(value.as_deref())
    }
}

/// Split a comma-separated category list, trimming blanks.
pub fn parse_category_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(String::from)
        .collect()
}

// ---------------------------------------------------------------------------
// Digest config (runtime, merged from config + env + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime configuration consumed by the aggregation pipeline.
#[derive(Debug, Clone)]
pub struct DigestConfig {
    /// Categories in visit order (ascending priority, de-duplicated).
    pub categories: Vec<Category>,
    /// Codes an entry must declare (one of) to be kept.
    pub targets: BTreeSet<String>,
    /// Repository origin.
    pub base_url: Url,
    /// Maximum concurrent detail-page fetches.
    pub concurrency: usize,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl TryFrom<&AppConfig> for DigestConfig {
    type Error = DigestError;

    fn try_from(config: &AppConfig) -> Result<Self> {
        if let Some((code, rank)) = config
            .priorities
            .iter()
            .find(|(_, rank)| **rank > MAX_OVERRIDE)
        {
            return Err(DigestError::config(format!(
                "priorities.{code} = {rank} exceeds the maximum of {MAX_OVERRIDE}"
            )));
        }
        let priorities = CategoryPriorities::new(config.priorities.clone());
        let categories = priorities.order(&config.crawl.categories);
        if categories.is_empty() {
            return Err(DigestError::config("no categories configured"));
        }
        if config.crawl.concurrency == 0 {
            return Err(DigestError::config("crawl.concurrency must be at least 1"));
        }
        if config.crawl.timeout_secs == 0 {
            return Err(DigestError::config("crawl.timeout_secs must be at least 1"));
        }
        let base_url = Url::parse(&config.crawl.base_url).map_err(|e| {
            DigestError::config(format!("invalid base_url '{}': {e}", config.crawl.base_url))
        })?;

        let targets = categories.iter().map(|c| c.code.clone()).collect();

        Ok(Self {
            categories,
            targets,
            base_url,
            concurrency: config.crawl.concurrency,
            timeout_secs: config.crawl.timeout_secs,
        })
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.arxivdigest/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| DigestError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.arxivdigest/arxivdigest.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| DigestError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| DigestError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| DigestError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let content = toml::to_string_pretty(&AppConfig::default())
        .map_err(|e| DigestError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| DigestError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
