//! Service configuration
//!
//! Loaded from a single JSON file. Every field has a default, so an empty
//! object `{}` is a valid configuration:
//!
//! ```json
//! {
//!   "server":  { "host": "0.0.0.0", "port": 9400 },
//!   "engine":  { "driver_page_size": 20, "sub_page_size": 20, "scroll_ttl_secs": 600 },
//!   "backend": { "kind": "elasticsearch", "url": "http://localhost:9200" },
//!   "log_format": "pretty"
//! }
//! ```

mod errors;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::http_server::HttpServerConfig;
use crate::planner::SortSpec;

pub use errors::{ConfigError, ConfigResult};

/// Overlap engine settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Rows per driver page (default: 20)
    #[serde(default = "default_page_size")]
    pub driver_page_size: usize,

    /// Rows per join page (default: 20)
    #[serde(default = "default_page_size")]
    pub sub_page_size: usize,

    /// Scroll context lifetime requested from the backend (default: 600)
    #[serde(default = "default_scroll_ttl_secs")]
    pub scroll_ttl_secs: u64,

    /// Indices searched when a request names none
    #[serde(default = "default_indices")]
    pub default_indices: Vec<String>,

    /// Fields returned when a request names none
    #[serde(default = "default_output")]
    pub default_output: Vec<String>,

    /// Driver sort as `field,direction` (default: "chrom_number,desc")
    #[serde(default = "default_sort")]
    pub default_sort: String,

    /// Path of the nested event sub-documents (default: "events")
    #[serde(default = "default_nested_path")]
    pub nested_path: String,

    /// Maximum join queries in flight per request (default: 8)
    #[serde(default = "default_join_concurrency")]
    pub join_concurrency: usize,
}

fn default_page_size() -> usize {
    20
}

fn default_scroll_ttl_secs() -> u64 {
    600
}

fn default_indices() -> Vec<String> {
    vec!["denormalized_data".to_string()]
}

fn default_output() -> Vec<String> {
    ["start", "end", "chrom_number", "sample_id"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_sort() -> String {
    "chrom_number,desc".to_string()
}

fn default_nested_path() -> String {
    "events".to_string()
}

fn default_join_concurrency() -> usize {
    8
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            driver_page_size: default_page_size(),
            sub_page_size: default_page_size(),
            scroll_ttl_secs: default_scroll_ttl_secs(),
            default_indices: default_indices(),
            default_output: default_output(),
            default_sort: default_sort(),
            nested_path: default_nested_path(),
            join_concurrency: default_join_concurrency(),
        }
    }
}

impl EngineConfig {
    pub fn scroll_ttl(&self) -> Duration {
        Duration::from_secs(self.scroll_ttl_secs)
    }

    /// The configured default sort
    pub fn sort_spec(&self) -> ConfigResult<SortSpec> {
        SortSpec::parse(&self.default_sort).ok_or_else(|| {
            ConfigError::invalid(
                "engine.default_sort",
                format!("expected 'field,asc|desc', got '{}'", self.default_sort),
            )
        })
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.driver_page_size == 0 {
            return Err(ConfigError::invalid("engine.driver_page_size", "must be > 0"));
        }
        if self.sub_page_size == 0 {
            return Err(ConfigError::invalid("engine.sub_page_size", "must be > 0"));
        }
        if self.scroll_ttl_secs == 0 {
            return Err(ConfigError::invalid("engine.scroll_ttl_secs", "must be > 0"));
        }
        if self.join_concurrency == 0 {
            return Err(ConfigError::invalid("engine.join_concurrency", "must be > 0"));
        }
        if self.default_indices.iter().all(|i| i.trim().is_empty()) {
            return Err(ConfigError::invalid(
                "engine.default_indices",
                "at least one index is required",
            ));
        }
        if self.nested_path.trim().is_empty() {
            return Err(ConfigError::invalid("engine.nested_path", "must not be empty"));
        }
        self.sort_spec()?;
        Ok(())
    }
}

/// Which search backend to use
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum BackendConfig {
    /// Elasticsearch cluster reached over HTTP
    Elasticsearch {
        #[serde(default = "default_backend_url")]
        url: String,
        #[serde(default = "default_backend_timeout_secs")]
        timeout_secs: u64,
    },
    /// Documents held in memory, optionally loaded from a fixtures file
    Memory {
        #[serde(default)]
        fixtures: Option<PathBuf>,
    },
}

fn default_backend_url() -> String {
    "http://localhost:9200".to_string()
}

fn default_backend_timeout_secs() -> u64 {
    30
}

impl Default for BackendConfig {
    fn default() -> Self {
        BackendConfig::Elasticsearch {
            url: default_backend_url(),
            timeout_secs: default_backend_timeout_secs(),
        }
    }
}

impl BackendConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        match self {
            BackendConfig::Elasticsearch { url, timeout_secs } => {
                let parsed = reqwest::Url::parse(url)
                    .map_err(|e| ConfigError::invalid("backend.url", e.to_string()))?;
                if !matches!(parsed.scheme(), "http" | "https") {
                    return Err(ConfigError::invalid(
                        "backend.url",
                        format!("unsupported scheme '{}'", parsed.scheme()),
                    ));
                }
                if *timeout_secs == 0 {
                    return Err(ConfigError::invalid("backend.timeout_secs", "must be > 0"));
                }
                Ok(())
            }
            BackendConfig::Memory { .. } => Ok(()),
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Top-level configuration file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default)]
    pub server: HttpServerConfig,

    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub backend: BackendConfig,

    #[serde(default)]
    pub log_format: LogFormat,
}

impl ServiceConfig {
    /// Load and validate a configuration file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_json(&content)
    }

    /// Parse and validate configuration JSON
    pub fn from_json(content: &str) -> ConfigResult<Self> {
        let config: ServiceConfig =
            serde_json::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        self.server.validate()?;
        self.engine.validate()?;
        self.backend.validate()
    }
}
