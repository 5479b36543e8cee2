use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use voyage_core::{FlightSearchCriteria, HotelSearchCriteria, Warning};
use voyage_offer::{PreferenceProfile, Shortlist};
use voyage_planner::{RecommendationResult, RecommendationSource};

use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/flights/recommendations", post(recommend_flights))
        .route("/v1/hotels/recommendations", post(recommend_hotels))
}

#[derive(Debug, Deserialize)]
pub struct FlightRecommendationRequest {
    #[serde(flatten)]
    pub criteria: FlightSearchCriteria,
    #[serde(default)]
    pub profile: Option<PreferenceProfile>,
}

#[derive(Debug, Deserialize)]
pub struct HotelRecommendationRequest {
    #[serde(flatten)]
    pub criteria: HotelSearchCriteria,
    #[serde(default)]
    pub profile: Option<PreferenceProfile>,
}

/// A warning with its human-readable message alongside the structured fields
#[derive(Debug, Serialize)]
pub struct WarningView {
    #[serde(flatten)]
    pub warning: Warning,
    pub message: String,
}

impl From<Warning> for WarningView {
    fn from(warning: Warning) -> Self {
        Self { message: warning.message(), warning }
    }
}

#[derive(Debug, Serialize)]
pub struct RecommendationResponse {
    pub request_id: Uuid,
    pub shortlist: Shortlist,
    pub recommendation: String,
    pub recommendation_source: RecommendationSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dropped_offers: Option<usize>,
    pub warnings: Vec<WarningView>,
}

impl From<RecommendationResult> for RecommendationResponse {
    fn from(result: RecommendationResult) -> Self {
        Self {
            request_id: result.request_id,
            shortlist: result.shortlist,
            recommendation: result.recommendation_text,
            recommendation_source: result.recommendation_source,
            dropped_offers: (result.dropped_offers > 0).then_some(result.dropped_offers),
            warnings: result.warnings.into_iter().map(WarningView::from).collect(),
        }
    }
}

/// POST /v1/flights/recommendations
async fn recommend_flights(
    State(state): State<AppState>,
    Json(req): Json<FlightRecommendationRequest>,
) -> Result<Json<RecommendationResponse>, AppError> {
    let result = state.planner.recommend_flights(req.criteria, req.profile).await?;
    Ok(Json(result.into()))
}

/// POST /v1/hotels/recommendations
async fn recommend_hotels(
    State(state): State<AppState>,
    Json(req): Json<HotelRecommendationRequest>,
) -> Result<Json<RecommendationResponse>, AppError> {
    let result = state.planner.recommend_hotels(req.criteria, req.profile).await?;
    Ok(Json(result.into()))
}
