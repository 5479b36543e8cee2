pub mod search;
pub mod provider;
pub mod warning;
pub mod resilience;
pub mod mock;

pub use provider::{ContextFields, ContextProvider, Prompt, ProviderError, SearchProvider, TextGenerator};
pub use resilience::CallPolicy;
pub use search::{CabinClass, FlightSearchCriteria, HotelSearchCriteria, ItineraryRequest, OfferKind, RoomType, SearchQuery};
pub use warning::Warning;

/// Failures the pipeline reports to its caller instead of absorbing.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("No {kind} offers available ({dropped} dropped during normalization)")]
    EmptyResult { kind: OfferKind, dropped: usize },
    #[error("Search provider unavailable: {0}")]
    SearchUnavailable(#[from] ProviderError),
}

pub type CoreResult<T> = Result<T, CoreError>;
