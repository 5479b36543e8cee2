//! HTTP clients for the external collaborators.

pub mod serpapi;
pub mod gemini;
pub mod open_meteo;

use reqwest::{Client, Response, StatusCode};
use std::sync::Arc;
use std::time::Duration;

use voyage_core::{ProviderError, SearchProvider};
use voyage_planner::Providers;
use voyage_store::app_config::Config;
use voyage_store::{CachedSearchProvider, RedisClient};

pub use gemini::GeminiGenerator;
pub use open_meteo::OpenMeteoContext;
pub use serpapi::SerpApiSearch;

pub fn http_client(timeout: Duration) -> reqwest::Result<Client> {
    Client::builder()
        .user_agent(concat!("voyage/", env!("CARGO_PKG_VERSION")))
        .timeout(timeout)
        .build()
}

fn transport_error(service: &str, err: reqwest::Error, timeout: Duration) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout(timeout.as_millis() as u64)
    } else {
        ProviderError::Unavailable(format!("{}: {}", service, err))
    }
}

/// Map non-success statuses onto the provider error taxonomy
async fn check_status(service: &str, response: Response) -> Result<Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let mut preview = body.trim().to_string();
    if preview.len() > 200 {
        let cut = (0..=200).rev().find(|i| preview.is_char_boundary(*i)).unwrap_or(0);
        preview.truncate(cut);
    }

    Err(match status {
        StatusCode::TOO_MANY_REQUESTS => ProviderError::QuotaExceeded(format!("{}: {}", service, preview)),
        s if s.is_client_error() => ProviderError::InvalidResponse(format!("{} HTTP {}: {}", service, s, preview)),
        s => ProviderError::Unavailable(format!("{} HTTP {}: {}", service, s, preview)),
    })
}

/// Wire the configured HTTP providers, with the redis search cache when available
pub fn build_providers(config: &Config, redis: Option<Arc<RedisClient>>) -> reqwest::Result<Providers> {
    let timeout = Duration::from_secs(config.providers.http_timeout_secs);
    let client = http_client(timeout)?;

    let serpapi: Arc<dyn SearchProvider> = Arc::new(SerpApiSearch::new(client.clone(), &config.providers, timeout));
    let search: Arc<dyn SearchProvider> = match redis {
        Some(redis) => Arc::new(CachedSearchProvider::new(serpapi, redis, config.cache.search_ttl_seconds)),
        None => serpapi,
    };

    Ok(Providers {
        search,
        context: Arc::new(OpenMeteoContext::new(client.clone(), &config.providers, timeout)),
        generator: Arc::new(GeminiGenerator::new(client, &config.providers, timeout)),
    })
}
