use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use voyage_api::{app, providers::build_providers, state::AppState};
use voyage_planner::TravelPlanner;
use voyage_store::RedisClient;

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "voyage_api=debug,voyage_planner=info,voyage_offer=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = voyage_store::app_config::Config::load().expect("Failed to load config");
    tracing::info!("Starting Voyage API on port {}", config.server.port);

    // Redis is optional; it backs the search cache and the rate limiter
    let redis = match &config.redis {
        Some(redis_config) => {
            let client = RedisClient::new(&redis_config.url).await.expect("Invalid Redis URL");
            Some(Arc::new(client))
        }
        None => {
            tracing::warn!("No Redis configured; search cache and rate limiting disabled");
            None
        }
    };

    if config.providers.serpapi_key.is_empty() {
        tracing::warn!("SerpAPI key missing; searches will fail");
    }
    if config.providers.gemini_key.is_empty() {
        tracing::warn!("Gemini key missing; recommendations and itineraries use templates");
    }

    let providers = build_providers(&config, redis.clone()).expect("Failed to build HTTP client");
    let planner = Arc::new(TravelPlanner::new(&config, providers));

    let app = app(AppState { planner, redis });

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.expect("Failed to bind");
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .await
        .expect("Server error");
}
