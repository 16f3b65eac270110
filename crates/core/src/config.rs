use serde::Deserialize;

/// Root application configuration. Loaded from environment variables
/// with the prefix `ADGENIUS__`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub redis: RedisConfig,
    #[serde(default)]
    pub tenancy: TenancyConfig,
    #[serde(default)]
    pub billing: BillingConfig,
    #[serde(default)]
    pub analytics: AnalyticsConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_http_port")]
    pub http_port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

/// Shared cache tier. When disabled, only the in-process cache is used.
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_redis_urls")]
    pub urls: Vec<String>,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TenancyConfig {
    #[serde(default = "default_metadata_cache_ttl_secs")]
    pub metadata_cache_ttl_secs: u64,
    #[serde(default = "default_handle_cache_max_entries")]
    pub handle_cache_max_entries: usize,
    #[serde(default = "default_control_plane_name")]
    pub control_plane_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BillingConfig {
    #[serde(default = "default_tax_rate")]
    pub tax_rate: f64,
    #[serde(default = "default_days_until_due")]
    pub default_days_until_due: u32,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default = "default_plan")]
    pub default_plan: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalyticsConfig {
    #[serde(default = "default_analytics_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    #[serde(default = "default_high_ctr_threshold")]
    pub high_ctr_threshold: f64,
    #[serde(default = "default_medium_ctr_threshold")]
    pub medium_ctr_threshold: f64,
    #[serde(default = "default_low_ctr_recommendation_threshold")]
    pub low_ctr_recommendation_threshold: f64,
    #[serde(default = "default_high_cpa_threshold")]
    pub high_cpa_threshold: f64,
    #[serde(default = "default_low_roas_threshold")]
    pub low_roas_threshold: f64,
    #[serde(default = "default_top_creatives")]
    pub default_top_creatives: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "default_generation_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_sweeper_interval_secs")]
    pub sweeper_interval_secs: u64,
    #[serde(default = "default_orphan_after_secs")]
    pub orphan_after_secs: u64,
    #[serde(default = "default_text_max_length")]
    pub text_max_length: usize,
}

// Default functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_http_port() -> u16 {
    8080
}
fn default_metrics_port() -> u16 {
    9091
}
fn default_redis_urls() -> Vec<String> {
    vec!["redis://localhost:6379".to_string()]
}
fn default_connect_timeout_ms() -> u64 {
    5000
}
fn default_metadata_cache_ttl_secs() -> u64 {
    900
}
fn default_handle_cache_max_entries() -> usize {
    1024
}
fn default_control_plane_name() -> String {
    "adgenius_public".to_string()
}
fn default_tax_rate() -> f64 {
    0.10
}
fn default_days_until_due() -> u32 {
    30
}
fn default_currency() -> String {
    "USD".to_string()
}
fn default_plan() -> String {
    "starter".to_string()
}
fn default_analytics_cache_ttl_secs() -> u64 {
    3600
}
fn default_high_ctr_threshold() -> f64 {
    2.0
}
fn default_medium_ctr_threshold() -> f64 {
    1.0
}
fn default_low_ctr_recommendation_threshold() -> f64 {
    1.0
}
fn default_high_cpa_threshold() -> f64 {
    50.0
}
fn default_low_roas_threshold() -> f64 {
    2.0
}
fn default_top_creatives() -> usize {
    10
}
fn default_generation_timeout_secs() -> u64 {
    120
}
fn default_sweeper_interval_secs() -> u64 {
    60
}
fn default_orphan_after_secs() -> u64 {
    900
}
fn default_text_max_length() -> usize {
    280
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            http_port: default_http_port(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            port: default_metrics_port(),
        }
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            urls: default_redis_urls(),
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }
}

impl Default for TenancyConfig {
    fn default() -> Self {
        Self {
            metadata_cache_ttl_secs: default_metadata_cache_ttl_secs(),
            handle_cache_max_entries: default_handle_cache_max_entries(),
            control_plane_name: default_control_plane_name(),
        }
    }
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            tax_rate: default_tax_rate(),
            default_days_until_due: default_days_until_due(),
            currency: default_currency(),
            default_plan: default_plan(),
        }
    }
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: default_analytics_cache_ttl_secs(),
            high_ctr_threshold: default_high_ctr_threshold(),
            medium_ctr_threshold: default_medium_ctr_threshold(),
            low_ctr_recommendation_threshold: default_low_ctr_recommendation_threshold(),
            high_cpa_threshold: default_high_cpa_threshold(),
            low_roas_threshold: default_low_roas_threshold(),
            default_top_creatives: default_top_creatives(),
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_generation_timeout_secs(),
            sweeper_interval_secs: default_sweeper_interval_secs(),
            orphan_after_secs: default_orphan_after_secs(),
            text_max_length: default_text_max_length(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder().add_source(
            config::Environment::with_prefix("ADGENIUS")
                .separator("__")
                .try_parsing(true)
                .list_separator(","),
        );

        let config = builder.build()?;
        let loaded: Self = config.try_deserialize()?;
        tracing::debug!(
            redis_enabled = loaded.redis.enabled,
            control_plane = %loaded.tenancy.control_plane_name,
            "Configuration loaded"
        );
        Ok(loaded)
    }
}
