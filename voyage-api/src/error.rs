use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use voyage_core::CoreError;

#[derive(Debug)]
pub enum AppError {
    ValidationError(String),
    NotFoundError(String),
    UpstreamError(String),
    Anyhow(anyhow::Error),
}

impl AppError {
    fn from_core(err: &CoreError) -> Self {
        match err {
            CoreError::InvalidRequest(msg) => AppError::ValidationError(msg.clone()),
            CoreError::EmptyResult { .. } => AppError::NotFoundError(err.to_string()),
            CoreError::SearchUnavailable(_) => AppError::UpstreamError(err.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Pipeline errors arrive through `?` as anyhow; recover their status
        let this = match self {
            AppError::Anyhow(err) => match err.downcast_ref::<CoreError>() {
                Some(core) => AppError::from_core(core),
                None => AppError::Anyhow(err),
            },
            other => other,
        };

        let (status, error_message) = match this {
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFoundError(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::UpstreamError(msg) => {
                tracing::warn!("Upstream failure: {}", msg);
                (StatusCode::BAD_GATEWAY, msg)
            }
            AppError::Anyhow(err) => {
                tracing::error!("Internal Server Error: {}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string())
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self::Anyhow(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use voyage_core::{OfferKind, ProviderError};

    #[test]
    fn test_core_errors_map_to_status_codes() {
        let cases = [
            (CoreError::InvalidRequest("bad weight".to_string()), StatusCode::BAD_REQUEST),
            (CoreError::EmptyResult { kind: OfferKind::Hotel, dropped: 3 }, StatusCode::NOT_FOUND),
            (CoreError::SearchUnavailable(ProviderError::Timeout(30_000)), StatusCode::BAD_GATEWAY),
        ];
        for (err, status) in cases {
            assert_eq!(AppError::from(err).into_response().status(), status);
        }
        assert_eq!(
            AppError::from(anyhow::anyhow!("boom")).into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
