pub mod prompt;
pub mod recommendation;
pub mod itinerary;
pub mod orchestrator;

pub use itinerary::{Activity, ActivityCategory, DaySource, Itinerary, ItineraryComposer, ItineraryDay, TimeOfDay};
pub use recommendation::{Recommendation, RecommendationSource, RecommendationSynthesizer};
pub use orchestrator::{ItineraryResult, Providers, RecommendationResult, TravelPlanner};
