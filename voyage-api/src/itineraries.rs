use axum::{extract::State, routing::post, Json, Router};
use serde::Serialize;
use uuid::Uuid;

use voyage_core::ItineraryRequest;
use voyage_planner::Itinerary;

use crate::error::AppError;
use crate::recommendations::WarningView;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/itineraries", post(compose_itinerary))
}

#[derive(Debug, Serialize)]
pub struct ItineraryResponse {
    pub request_id: Uuid,
    pub itinerary: Itinerary,
    pub warnings: Vec<WarningView>,
}

/// POST /v1/itineraries
async fn compose_itinerary(
    State(state): State<AppState>,
    Json(req): Json<ItineraryRequest>,
) -> Result<Json<ItineraryResponse>, AppError> {
    let result = state.planner.compose_itinerary(req).await?;
    Ok(Json(ItineraryResponse {
        request_id: result.request_id,
        itinerary: result.itinerary,
        warnings: result.warnings.into_iter().map(WarningView::from).collect(),
    }))
}
