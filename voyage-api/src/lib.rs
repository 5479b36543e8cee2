use axum::{
    extract::State,
    http::{Method, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde_json::json;
use std::net::SocketAddr;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod error;
pub mod itineraries;
pub mod providers;
pub mod recommendations;
pub mod state;

pub use state::AppState;

/// Requests allowed per client IP per window
const RATE_LIMIT: i64 = 100;
const RATE_WINDOW_SECONDS: i64 = 60;

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([axum::http::header::CONTENT_TYPE, axum::http::header::USER_AGENT]);

    let router = Router::new()
        .route("/health", get(health))
        .merge(recommendations::routes())
        .merge(itineraries::routes())
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let router = if state.redis.is_some() {
        router.layer(axum::middleware::from_fn_with_state(state.clone(), rate_limit_middleware))
    } else {
        router
    };

    router.with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn rate_limit_middleware(
    State(state): State<AppState>,
    axum::extract::ConnectInfo(addr): axum::extract::ConnectInfo<SocketAddr>,
    req: axum::extract::Request,
    next: axum::middleware::Next,
) -> Result<impl IntoResponse, impl IntoResponse> {
    let Some(redis) = state.redis.as_ref() else {
        return Ok(next.run(req).await);
    };
    let key = format!("ratelimit:{}", addr.ip());

    match redis.check_rate_limit(&key, RATE_LIMIT, RATE_WINDOW_SECONDS).await {
        Ok(true) => Ok(next.run(req).await),
        Ok(false) => Err((StatusCode::TOO_MANY_REQUESTS, "Rate limit exceeded")),
        Err(e) => {
            // Fail open
            tracing::warn!("Rate limit check failed: {}", e);
            Ok(next.run(req).await)
        }
    }
}
