use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::search::SearchQuery;

/// Failure of an external collaborator call
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProviderError {
    #[error("Provider unavailable: {0}")]
    Unavailable(String),
    #[error("Provider call timed out after {0}ms")]
    Timeout(u64),
    #[error("Provider quota exceeded: {0}")]
    QuotaExceeded(String),
    #[error("Invalid provider response: {0}")]
    InvalidResponse(String),
}

impl ProviderError {
    /// Whether a single retry has any chance of succeeding
    pub fn is_retryable(&self) -> bool {
        !matches!(self, ProviderError::QuotaExceeded(_))
    }
}

/// Auxiliary signals for one (location, date) pair
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextFields {
    /// Probability of precipitation, 0.0-1.0
    pub precipitation_probability: Option<f64>,
    pub temperature_max_c: Option<f64>,
    pub temperature_min_c: Option<f64>,
    /// Human-readable condition summary ("Clear sky", "Thunderstorm")
    pub conditions: Option<String>,
}

/// Single-turn prompt; the pipeline owns its construction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prompt {
    pub role: String,
    pub instructions: String,
    pub context: String,
    /// Upper bound hint passed to the model, not a guarantee
    pub max_output_chars: usize,
}

#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Run a flight or hotel search and return the raw offer records
    async fn search(&self, query: &SearchQuery) -> Result<Vec<Value>, ProviderError>;
}

#[async_trait]
pub trait ContextProvider: Send + Sync {
    /// Weather context for a location on a date; `Unavailable` when unknown
    async fn get_context(&self, location: &str, date: NaiveDate) -> Result<ContextFields, ProviderError>;
}

#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Stateless, single-turn text generation
    async fn generate(&self, prompt: &Prompt) -> Result<String, ProviderError>;
}
