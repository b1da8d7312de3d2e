//! Application configuration for svedb.
//!
//! User config lives at `~/.svedb/svedb.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Result, SvedbError};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "svedb.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".svedb";

// ---------------------------------------------------------------------------
// Config structs (matching svedb.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Upstream endpoints.
    #[serde(default)]
    pub endpoints: EndpointsConfig,

    /// Request pacing and retry policy.
    #[serde(default)]
    pub pacing: PacingConfig,

    /// Extraction and output settings.
    #[serde(default)]
    pub extract: ExtractConfig,

    /// Asset mirroring destination.
    #[serde(default)]
    pub mirror: MirrorConfig,
}

/// `[endpoints]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointsConfig {
    /// Paginated catalog search API.
    #[serde(default = "default_search_url")]
    pub search_url: Url,

    /// Card site serving detail pages, token listings and images.
    #[serde(default = "default_site_url")]
    pub site_url: Url,

    /// Public prefix under which mirrored images are served.
    #[serde(default = "default_asset_base_url")]
    pub asset_base_url: String,
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            search_url: default_search_url(),
            site_url: default_site_url(),
            asset_base_url: default_asset_base_url(),
        }
    }
}

fn default_search_url() -> Url {
    Url::parse("https://decklog-en.bushiroad.com/system/app/api/search/6").expect("valid URL")
}
fn default_site_url() -> Url {
    Url::parse("https://en.shadowverse-evolve.com").expect("valid URL")
}
fn default_asset_base_url() -> String {
    "https://evolvecdb.org/img".into()
}

/// `[pacing]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PacingConfig {
    /// Pause between successive catalog or listing page requests.
    #[serde(default = "default_page_delay")]
    pub page_delay_ms: u64,

    /// First retry delay after a failed request.
    #[serde(default = "default_retry_base")]
    pub retry_base_ms: u64,

    /// Added to the retry delay for every further attempt.
    #[serde(default = "default_retry_step")]
    pub retry_step_ms: u64,

    /// Lower bound of the random pause before each detail page.
    #[serde(default = "default_jitter_min")]
    pub jitter_min_ms: u64,

    /// Upper bound (inclusive) of the random pause before each detail page.
    #[serde(default = "default_jitter_max")]
    pub jitter_max_ms: u64,

    /// Number of token listing pages to walk.
    #[serde(default = "default_token_pages")]
    pub token_pages: u32,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            page_delay_ms: default_page_delay(),
            retry_base_ms: default_retry_base(),
            retry_step_ms: default_retry_step(),
            jitter_min_ms: default_jitter_min(),
            jitter_max_ms: default_jitter_max(),
            token_pages: default_token_pages(),
        }
    }
}

fn default_page_delay() -> u64 {
    250
}
fn default_retry_base() -> u64 {
    2500
}
fn default_retry_step() -> u64 {
    100
}
fn default_jitter_min() -> u64 {
    100
}
fn default_jitter_max() -> u64 {
    200
}
fn default_token_pages() -> u32 {
    12
}

/// How structured fields are located on a detail page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionStrategy {
    /// Fixed document-position lookups on the parsed DOM.
    #[default]
    Structural,
    /// Regular expressions over the raw markup.
    Pattern,
}

impl std::fmt::Display for ExtractionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Structural => f.write_str("structural"),
            Self::Pattern => f.write_str("pattern"),
        }
    }
}

impl std::str::FromStr for ExtractionStrategy {
    type Err = SvedbError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "structural" => Ok(Self::Structural),
            "pattern" => Ok(Self::Pattern),
            other => Err(SvedbError::config(format!(
                "unknown extraction strategy '{other}': expected 'structural' or 'pattern'"
            ))),
        }
    }
}

/// `[extract]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractConfig {
    /// Detail page extraction strategy.
    #[serde(default)]
    pub strategy: ExtractionStrategy,

    /// Path of the JSON document to write.
    #[serde(default = "default_output")]
    pub output: String,

    /// Replaces the built-in segment registry when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segments: Option<Vec<String>>,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            strategy: ExtractionStrategy::default(),
            output: default_output(),
            segments: None,
        }
    }
}

fn default_output() -> String {
    "cards.json".into()
}

/// `[mirror]` section.
///
/// Only the names of the environment variables are stored, never the secrets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MirrorConfig {
    /// Destination bucket.
    #[serde(default = "default_bucket")]
    pub bucket: String,

    /// Region passed to the S3 client.
    #[serde(default = "default_region")]
    pub region: String,

    /// Env var holding the S3-compatible endpoint URL.
    #[serde(default = "default_endpoint_env")]
    pub endpoint_env: String,

    /// Env var holding the access key id.
    #[serde(default = "default_access_key_env")]
    pub access_key_env: String,

    /// Env var holding the secret access key.
    #[serde(default = "default_secret_key_env")]
    pub secret_key_env: String,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            bucket: default_bucket(),
            region: default_region(),
            endpoint_env: default_endpoint_env(),
            access_key_env: default_access_key_env(),
            secret_key_env: default_secret_key_env(),
        }
    }
}

fn default_bucket() -> String {
    "evolvecdb".into()
}
fn default_region() -> String {
    "auto".into()
}
fn default_endpoint_env() -> String {
    "S3_ENDPOINT".into()
}
fn default_access_key_env() -> String {
    "S3_ACCESS".into()
}
fn default_secret_key_env() -> String {
    "S3_SECRET".into()
}

/// Credentials resolved from the environment for the mirror destination.
#[derive(Clone)]
pub struct MirrorCredentials {
    pub endpoint: Option<String>,
    pub access_key: String,
    pub secret_key: String,
}

impl std::fmt::Debug for MirrorCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MirrorCredentials")
            .field("endpoint", &self.endpoint)
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

impl MirrorConfig {
    /// Read credentials from the configured env vars.
    ///
    /// Returns `None` when the secret is unset or empty, which disables mirroring.
    pub fn credentials(&self) -> Option<MirrorCredentials> {
        let secret_key = non_empty_env(&self.secret_key_env)?;
        Some(MirrorCredentials {
            endpoint: non_empty_env(&self.endpoint_env),
            access_key: non_empty_env(&self.access_key_env).unwrap_or_default(),
            secret_key,
        })
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

// ---------------------------------------------------------------------------
// Runtime config (merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Growing delay applied between attempts of a failing request.
///
/// There is no attempt ceiling: callers retry until the upstream answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub base: Duration,
    pub step: Duration,
}

impl RetryPolicy {
    /// Delay before the retry following the `attempt`-th failure (0-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        self.base.saturating_add(self.step.saturating_mul(attempt))
    }
}

/// Runtime crawl configuration, merged from config file + CLI flags.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Catalog search API.
    pub search_url: Url,
    /// Card site root.
    pub site_url: Url,
    /// Public image prefix for exports.
    pub asset_base_url: String,
    /// Pause between successive page requests.
    pub page_delay: Duration,
    /// Retry delay policy.
    pub retry: RetryPolicy,
    /// Inclusive bounds of the per-record pause, in ms.
    pub jitter_ms: (u64, u64),
    /// Number of token listing pages.
    pub token_pages: u32,
    /// Detail page extraction strategy.
    pub strategy: ExtractionStrategy,
}

impl From<&AppConfig> for CrawlConfig {
    fn from(config: &AppConfig) -> Self {
        let pacing = &config.pacing;
        let (lo, hi) = (pacing.jitter_min_ms, pacing.jitter_max_ms);
        Self {
            search_url: config.endpoints.search_url.clone(),
            site_url: config.endpoints.site_url.clone(),
            asset_base_url: config.endpoints.asset_base_url.clone(),
            page_delay: Duration::from_millis(pacing.page_delay_ms),
            retry: RetryPolicy {
                base: Duration::from_millis(pacing.retry_base_ms),
                step: Duration::from_millis(pacing.retry_step_ms),
            },
            jitter_ms: (lo.min(hi), lo.max(hi)),
            token_pages: pacing.token_pages,
            strategy: config.extract.strategy,
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.svedb/`).
pub fn config_dir() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| SvedbError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.svedb/svedb.toml`).
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
    let content = std::fs::read_to_string(path).map_err(|e| SvedbError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| SvedbError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| SvedbError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| SvedbError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| SvedbError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("search_url"));
        assert!(toml_str.contains("S3_SECRET"));
        assert!(toml_str.contains("structural"));
    }

    #[test]
    fn partial_config_keeps_defaults() {
        let toml_str = r#"
[pacing]
page_delay_ms = 10

[extract]
strategy = "pattern"
segments = ["BP01", "BP02"]
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.pacing.page_delay_ms, 10);
        assert_eq!(config.pacing.retry_base_ms, 2500);
        assert_eq!(config.extract.strategy, ExtractionStrategy::Pattern);
        assert_eq!(config.extract.segments.as_deref().map(<[String]>::len), Some(2));
        assert_eq!(config.mirror.bucket, "evolvecdb");
    }

    #[test]
    fn crawl_config_from_app_config() {
        let app = AppConfig::default();
        let crawl = CrawlConfig::from(&app);
        assert_eq!(crawl.page_delay, Duration::from_millis(250));
        assert_eq!(crawl.retry.base, Duration::from_millis(2500));
        assert_eq!(crawl.jitter_ms, (100, 200));
        assert_eq!(crawl.token_pages, 12);
    }

    #[test]
    fn retry_delay_grows_with_each_attempt() {
        let retry = RetryPolicy {
            base: Duration::from_millis(2500),
            step: Duration::from_millis(100),
        };
        assert_eq!(retry.delay(0), Duration::from_millis(2500));
        assert_eq!(retry.delay(1), Duration::from_millis(2600));
        assert_eq!(retry.delay(10), Duration::from_millis(3500));
    }

    #[test]
    fn strategy_parses_case_insensitively() {
        assert_eq!(
            "Pattern".parse::<ExtractionStrategy>().unwrap(),
            ExtractionStrategy::Pattern
        );
        assert!("xpath".parse::<ExtractionStrategy>().is_err());
    }

    #[test]
    fn missing_secret_disables_mirroring() {
        let mut mirror = MirrorConfig::default();
        // Unique env var names to avoid interfering with other tests
        mirror.secret_key_env = "SVEDB_TEST_NONEXISTENT_SECRET_12345".into();
        assert!(mirror.credentials().is_none());
    }
}
