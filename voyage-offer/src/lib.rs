pub mod models;
pub mod currency;
pub mod normalizer;
pub mod enricher;
pub mod scoring;
pub mod ranker;

pub use models::{Criterion, Enrichment, FlightOffer, HotelOffer, Money, Offer, ScoredOffer};
pub use normalizer::{NormalizationError, NormalizedBatch, OfferNormalizer};
pub use enricher::{ContextEnricher, EnrichmentReport};
pub use scoring::{PreferenceProfile, ScoringContext, ScoringEngine};
pub use ranker::{OfferRanker, Shortlist};
