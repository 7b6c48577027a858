//! Configuration loading and config file resolution
//!
//! Bootstrap configuration is a single TOML file. Every field has a built-in
//! default, so a missing file is never fatal: the loader warns and carries on
//! with defaults. A file that exists but does not parse is a `Config` error.
//!
//! Resolution priority:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (`RTWIN_CONFIG`)
//! 3. Platform config directory (`<config_dir>/researchtwin/config.toml`)
//! 4. Built-in defaults (fallback)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "RTWIN_CONFIG";

const DAY_SECS: u64 = 86_400;

/// Complete bootstrap configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub logging: LoggingConfig,
    pub cache: CacheConfig,
    pub http: HttpConfig,
    pub rate_limits: RateLimitConfig,
    pub resolver: ResolverConfig,
    pub merge: MergeConfig,
    pub scoring: ScoringConfig,
    pub github: GithubConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Cache configuration
///
/// TTLs are per upstream family; institutions move rarely, everything else
/// uses the default.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Directory for the file-backed cache (in-memory cache when unset)
    pub dir: Option<PathBuf>,
    pub default_ttl_secs: u64,
    pub affiliation_ttl_secs: u64,
    pub geocode_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: None,
            default_ttl_secs: DAY_SECS,
            affiliation_ttl_secs: 7 * DAY_SECS,
            geocode_ttl_secs: 30 * DAY_SECS,
        }
    }
}

impl CacheConfig {
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_secs)
    }

    pub fn affiliation_ttl(&self) -> Duration {
        Duration::from_secs(self.affiliation_ttl_secs)
    }

    pub fn geocode_ttl(&self) -> Duration {
        Duration::from_secs(self.geocode_ttl_secs)
    }
}

/// Outbound HTTP configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Per-call timeout applied to every upstream request
    pub timeout_secs: u64,
    /// Fixed delay before the single retry after an HTTP 429
    pub retry_delay_ms: u64,
    /// Bound on one source fetch as seen by the core (may span several requests)
    pub source_deadline_secs: u64,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 15,
            retry_delay_ms: 3_000,
            source_deadline_secs: 60,
            user_agent: get_user_agent(),
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn source_deadline(&self) -> Duration {
        Duration::from_secs(self.source_deadline_secs)
    }
}

/// Minimum inter-request intervals for rate-limited upstreams
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub semantic_scholar_interval_ms: u64,
    /// Nominatim usage policy: at most one request per second
    pub nominatim_interval_ms: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            semantic_scholar_interval_ms: 1_000,
            nominatim_interval_ms: 1_100,
        }
    }
}

/// Identity resolver configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Cap on publication identifiers sampled from the known profile
    pub max_dois: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self { max_dois: 8 }
    }
}

/// Affiliation merge configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    /// Similarity ratio above which two institution names are duplicates
    pub similarity_threshold: f64,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.8,
        }
    }
}

/// Impact scoring configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Median reuse per artifact type (e.g. dataset → 50, code → 10)
    pub field_medians: BTreeMap<String, f64>,
    /// Type whose median is used for unknown types
    pub fallback_type: String,
    /// Only the top-N repositories by stars are scored
    pub max_repositories: usize,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        let mut field_medians = BTreeMap::new();
        field_medians.insert("dataset".to_string(), 50.0);
        field_medians.insert("code".to_string(), 10.0);
        Self {
            field_medians,
            fallback_type: "code".to_string(),
            max_repositories: 10,
        }
    }
}

/// GitHub access configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GithubConfig {
    /// Optional personal access token (raises the anonymous rate limit)
    pub token: Option<String>,
}

impl TomlConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TomlConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file
    ///
    /// A missing file yields defaults with a warning; a malformed one is an error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!(
                "Config file {} not found, using built-in defaults",
                path.display()
            );
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
        let config = Self::from_toml_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Resolve the config file location and load it
    pub fn resolve_and_load(cli_arg: Option<&str>) -> Result<Self> {
        match resolve_config_path(cli_arg, CONFIG_ENV_VAR) {
            Some(path) => Self::load(&path),
            None => {
                info!("No config file found, using built-in defaults");
                Ok(Self::default())
            }
        }
    }

    /// Reject values the core cannot work with
    pub fn validate(&self) -> Result<()> {
        let threshold = self.merge.similarity_threshold;
        if !(threshold > 0.0 && threshold <= 1.0) {
            return Err(Error::Config(format!(
                "merge.similarity_threshold must be in (0, 1], got {}",
                threshold
            )));
        }

        for (field, median) in &self.scoring.field_medians {
            if !(*median > 0.0) {
                return Err(Error::Config(format!(
                    "scoring.field_medians.{} must be positive, got {}",
                    field, median
                )));
            }
        }

        if !self
            .scoring
            .field_medians
            .contains_key(&self.scoring.fallback_type)
        {
            return Err(Error::Config(format!(
                "scoring.fallback_type '{}' has no entry in scoring.field_medians",
                self.scoring.fallback_type
            )));
        }

        if self.http.timeout_secs == 0 || self.http.source_deadline_secs == 0 {
            return Err(Error::Config(
                "http.timeout_secs and http.source_deadline_secs must be non-zero".to_string(),
            ));
        }

        Ok(())
    }
}

/// Config file resolution following the priority order in the module docs
///
/// Returns `None` when no candidate exists, in which case defaults apply.
pub fn resolve_config_path(cli_arg: Option<&str>, env_var_name: &str) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(PathBuf::from(path));
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: Platform config directory
    default_config_path().filter(|p| p.exists())
}

/// Platform-dependent default config file location
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("researchtwin").join("config.toml"))
}

/// Standard User-Agent for outbound HTTP clients
///
/// Nominatim and Semantic Scholar both ask for an identifying agent string.
pub fn get_user_agent() -> String {
    format!(
        "ResearchTwin/{} (https://researchtwin.net)",
        env!("CARGO_PKG_VERSION")
    )
}
