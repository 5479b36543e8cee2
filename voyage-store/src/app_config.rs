use serde::Deserialize;
use std::env;
use std::time::Duration;

use voyage_core::CallPolicy;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub redis: Option<RedisConfig>,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub ranking: RankingConfig,
    #[serde(default)]
    pub enrichment: EnrichmentConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub itinerary: ItineraryConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: default_port() }
    }
}

fn default_port() -> u16 { 8000 }

#[derive(Debug, Deserialize, Clone)]
pub struct RedisConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub serpapi_key: String,
    #[serde(default = "default_serpapi_url")]
    pub serpapi_base_url: String,
    #[serde(default)]
    pub gemini_key: String,
    #[serde(default = "default_gemini_model")]
    pub gemini_model: String,
    #[serde(default = "default_gemini_url")]
    pub gemini_base_url: String,
    #[serde(default = "default_geocoding_url")]
    pub geocoding_base_url: String,
    #[serde(default = "default_forecast_url")]
    pub forecast_base_url: String,
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            serpapi_key: String::new(),
            serpapi_base_url: default_serpapi_url(),
            gemini_key: String::new(),
            gemini_model: default_gemini_model(),
            gemini_base_url: default_gemini_url(),
            geocoding_base_url: default_geocoding_url(),
            forecast_base_url: default_forecast_url(),
            http_timeout_secs: default_http_timeout_secs(),
        }
    }
}

fn default_serpapi_url() -> String { "https://serpapi.com/search.json".to_string() }
fn default_gemini_model() -> String { "gemini-1.5-flash".to_string() }
fn default_gemini_url() -> String { "https://generativelanguage.googleapis.com/v1beta".to_string() }
fn default_geocoding_url() -> String { "https://geocoding-api.open-meteo.com/v1/search".to_string() }
fn default_forecast_url() -> String { "https://api.open-meteo.com/v1/forecast".to_string() }
fn default_http_timeout_secs() -> u64 { 30 }

/// Bounds applied to every external call made by the pipeline
#[derive(Debug, Deserialize, Clone)]
pub struct PipelineConfig {
    #[serde(default = "default_call_timeout_ms")]
    pub call_timeout_ms: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
    /// Currency assumed for bare numeric prices
    #[serde(default = "default_currency")]
    pub default_currency: String,
}

impl PipelineConfig {
    pub fn call_policy(&self) -> CallPolicy {
        CallPolicy::new(
            Duration::from_millis(self.call_timeout_ms),
            self.max_retries,
            Duration::from_millis(self.retry_backoff_ms),
        )
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            call_timeout_ms: default_call_timeout_ms(),
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
            default_currency: default_currency(),
        }
    }
}

fn default_call_timeout_ms() -> u64 { 30_000 }
fn default_max_retries() -> u32 { 1 }
fn default_retry_backoff_ms() -> u64 { 250 }
fn default_currency() -> String { "USD".to_string() }

#[derive(Debug, Deserialize, Clone)]
pub struct RankingConfig {
    #[serde(default = "default_shortlist_size")]
    pub shortlist_size: usize,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self { shortlist_size: default_shortlist_size() }
    }
}

fn default_shortlist_size() -> usize { 5 }

#[derive(Debug, Deserialize, Clone)]
pub struct EnrichmentConfig {
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,
    #[serde(default = "default_enrichment_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            max_in_flight: default_max_in_flight(),
            timeout_ms: default_enrichment_timeout_ms(),
        }
    }
}

fn default_max_in_flight() -> usize { 5 }
fn default_enrichment_timeout_ms() -> u64 { 5_000 }

#[derive(Debug, Deserialize, Clone)]
pub struct GenerationConfig {
    #[serde(default = "default_max_recommendation_chars")]
    pub max_recommendation_chars: usize,
    #[serde(default = "default_max_day_chars")]
    pub max_day_chars: usize,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_recommendation_chars: default_max_recommendation_chars(),
            max_day_chars: default_max_day_chars(),
        }
    }
}

fn default_max_recommendation_chars() -> usize { 4_000 }
fn default_max_day_chars() -> usize { 6_000 }

/// Whether the check-out date gets its own itinerary day
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutDay {
    #[default]
    Exclusive,
    Inclusive,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ItineraryConfig {
    #[serde(default)]
    pub checkout_day: CheckoutDay,
    #[serde(default = "default_max_days")]
    pub max_days: u32,
    /// Normalized Levenshtein similarity at which two activities count as the same
    #[serde(default = "default_duplicate_similarity")]
    pub duplicate_similarity: f64,
}

impl Default for ItineraryConfig {
    fn default() -> Self {
        Self {
            checkout_day: CheckoutDay::default(),
            max_days: default_max_days(),
            duplicate_similarity: default_duplicate_similarity(),
        }
    }
}

fn default_max_days() -> u32 { 30 }
fn default_duplicate_similarity() -> f64 { 0.9 }

#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    #[serde(default = "default_search_ttl")]
    pub search_ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { search_ttl_seconds: default_search_ttl() }
    }
}

fn default_search_ttl() -> u64 { 300 }

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            // Per-environment overrides, optional
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Local secrets; not checked in
            .add_source(config::File::with_name("config/local").required(false))
            // Eg. `VOYAGE__PROVIDERS__SERPAPI_KEY=...`
            .add_source(config::Environment::with_prefix("VOYAGE").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
