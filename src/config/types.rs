use crate::model::Urgency;
use serde::Deserialize;

/// Main configuration structure for Auto-Alert
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub engine: EngineConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub target: TargetConfig,
    #[serde(default)]
    pub proxies: ProxyConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub tier: Vec<TierConfig>,
}

impl Config {
    /// Looks up a tier by name
    pub fn tier(&self, name: &str) -> Option<&TierConfig> {
        self.tier.iter().find(|tier| tier.name == name)
    }
}

/// Fetch and scheduling limits
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct EngineConfig {
    /// Number of pooled browsing contexts
    pub max_concurrent: usize,

    /// Minimum time between two dispatches from any context (milliseconds)
    pub request_delay: u64,

    /// Per-request timeout (milliseconds)
    pub timeout_ms: u64,

    /// Total attempts per page before the fetch fails
    pub max_retries: u32,

    /// Base of the exponential backoff (milliseconds)
    pub base_delay: u64,

    /// Maximum number of result pages fetched per cycle
    #[serde(default = "default_page_cap")]
    pub page_cap: u32,

    /// Maximum number of cycles running at once across all tiers
    #[serde(default = "default_max_concurrent_cycles")]
    pub max_concurrent_cycles: usize,
}

fn default_page_cap() -> u32 {
    10
}

fn default_max_concurrent_cycles() -> usize {
    4
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct UserAgentConfig {
    pub crawler_name: String,
    pub crawler_version: String,

    /// URL with information about the monitor
    pub contact_url: String,

    /// Email address for operator contact
    pub contact_email: String,
}

/// The classifieds catalog being monitored
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TargetConfig {
    /// Search endpoint that query parameters are appended to
    pub base_url: String,

    /// Consult robots.txt before the first request of each cycle
    #[serde(default = "default_true")]
    pub respect_robots: bool,

    /// Body fragments that identify an anti-bot interstitial
    #[serde(default)]
    pub block_markers: Vec<String>,

    #[serde(default)]
    pub selectors: SelectorConfig,
}

fn default_true() -> bool {
    true
}

/// CSS selectors for the result page
///
/// Every field has a built-in default, so a config only needs to list the
/// ones a site gets wrong.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct SelectorConfig {
    /// One element per result card
    pub item: String,
    pub title: String,
    pub price: String,
    /// Detail link, read from `href`
    pub link: String,
    pub specs: String,
    pub seller: String,
    /// Images, read from `src` or `data-src`
    pub image: String,
    pub feature: String,
    /// Page links; the largest number in their text is the page count
    pub pagination: String,
    /// Attribute on the item element holding the source listing ID
    pub source_id_attribute: String,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            item: "article.result-item, [data-listing-id]".to_string(),
            title: ".result-title, h2".to_string(),
            price: ".result-price, [data-testid='price-label']".to_string(),
            link: "a.result-link, a[href]".to_string(),
            specs: ".result-specs, .vehicle-data".to_string(),
            seller: ".result-seller, .seller-info".to_string(),
            image: "img".to_string(),
            feature: ".result-feature".to_string(),
            pagination: ".pagination a, .pagination li".to_string(),
            source_id_attribute: "data-listing-id".to_string(),
        }
    }
}

/// Outbound proxy identities
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProxyConfig {
    /// Proxy URLs; empty means direct connections
    #[serde(default)]
    pub identities: Vec<String>,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

/// What a tier does when its cron expression fires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TierKind {
    /// Runs one monitoring cycle per due search in the tier
    #[default]
    Monitor,
    /// Prunes stale vehicles and old cycle records
    Cleanup,
}

/// A named schedule tier
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TierConfig {
    pub name: String,

    /// Six-field cron expression (seconds first)
    pub cron: String,

    #[serde(default)]
    pub kind: TierKind,

    /// Notification urgency for matches found by this tier
    pub urgency: Option<String>,

    /// Cleanup tiers: drop vehicles and cycles older than this
    #[serde(default = "default_retain_days")]
    pub retain_days: u32,
}

fn default_retain_days() -> u32 {
    30
}

impl TierConfig {
    /// Resolved urgency; validation rejects unknown names, so this falls back
    /// to [`Urgency::Normal`] only when none is configured
    pub fn urgency(&self) -> Urgency {
        self.urgency
            .as_deref()
            .and_then(Urgency::parse)
            .unwrap_or_default()
    }
}
