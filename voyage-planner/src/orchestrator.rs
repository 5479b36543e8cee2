use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use voyage_core::{
    CallPolicy, ContextProvider, CoreError, CoreResult, FlightSearchCriteria, HotelSearchCriteria, ItineraryRequest,
    OfferKind, SearchProvider, SearchQuery, TextGenerator, Warning,
};
use voyage_offer::{
    ContextEnricher, NormalizedBatch, OfferNormalizer, OfferRanker, PreferenceProfile, ScoringContext, ScoringEngine,
    Shortlist,
};
use voyage_store::app_config::Config;

use crate::itinerary::{Itinerary, ItineraryComposer};
use crate::prompt::{describe_flight_search, describe_hotel_search};
use crate::recommendation::{RecommendationSource, RecommendationSynthesizer};

/// External collaborators the planner is built from
#[derive(Clone)]
pub struct Providers {
    pub search: Arc<dyn SearchProvider>,
    pub context: Arc<dyn ContextProvider>,
    pub generator: Arc<dyn TextGenerator>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecommendationResult {
    pub request_id: Uuid,
    pub shortlist: Shortlist,
    pub recommendation_text: String,
    pub recommendation_source: RecommendationSource,
    /// Records dropped during normalization
    pub dropped_offers: usize,
    pub warnings: Vec<Warning>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ItineraryResult {
    pub request_id: Uuid,
    pub itinerary: Itinerary,
    pub warnings: Vec<Warning>,
}

/// Runs the recommendation and itinerary flows.
///
/// Holds no per-request state, so one instance is shared behind an `Arc`.
pub struct TravelPlanner {
    search: Arc<dyn SearchProvider>,
    search_policy: CallPolicy,
    normalizer: OfferNormalizer,
    enricher: ContextEnricher,
    scoring: ScoringEngine,
    ranker: OfferRanker,
    synthesizer: RecommendationSynthesizer,
    composer: ItineraryComposer,
}

impl TravelPlanner {
    pub fn new(config: &Config, providers: Providers) -> Self {
        let policy = config.pipeline.call_policy();
        let enrichment_policy = policy.with_timeout(Duration::from_millis(config.enrichment.timeout_ms));

        Self {
            search: providers.search,
            search_policy: policy,
            normalizer: OfferNormalizer::new(config.pipeline.default_currency.clone()),
            enricher: ContextEnricher::new(providers.context, enrichment_policy, config.enrichment.max_in_flight),
            scoring: ScoringEngine::new(),
            ranker: OfferRanker::from_config(&config.ranking),
            synthesizer: RecommendationSynthesizer::new(
                providers.generator.clone(),
                policy,
                config.generation.max_recommendation_chars,
            ),
            composer: ItineraryComposer::new(
                providers.generator,
                policy,
                config.itinerary.clone(),
                config.generation.max_day_chars,
            ),
        }
    }

    pub async fn recommend_flights(
        &self,
        criteria: FlightSearchCriteria,
        profile: Option<PreferenceProfile>,
    ) -> CoreResult<RecommendationResult> {
        let request_id = Uuid::new_v4();
        let span = info_span!("recommend_flights", %request_id, origin = %criteria.origin, destination = %criteria.destination);

        async move {
            validate_flight_criteria(&criteria)?;
            let profile = resolve_profile(profile)?;

            let records = self.search(SearchQuery::Flights(criteria.clone())).await?;
            let batch = self.normalizer.normalize_flights(&records, &criteria);

            self.recommend(
                request_id,
                OfferKind::Flight,
                batch,
                &profile,
                ScoringContext::for_flights(&criteria),
                &describe_flight_search(&criteria),
            )
            .await
        }
        .instrument(span)
        .await
    }

    pub async fn recommend_hotels(
        &self,
        criteria: HotelSearchCriteria,
        profile: Option<PreferenceProfile>,
    ) -> CoreResult<RecommendationResult> {
        let request_id = Uuid::new_v4();
        let span = info_span!("recommend_hotels", %request_id, location = %criteria.location);

        async move {
            validate_hotel_criteria(&criteria)?;
            let profile = resolve_profile(profile)?;

            let records = self.search(SearchQuery::Hotels(criteria.clone())).await?;
            let batch = self.normalizer.normalize_hotels(&records, &criteria);

            self.recommend(
                request_id,
                OfferKind::Hotel,
                batch,
                &profile,
                ScoringContext::for_hotels(&criteria),
                &describe_hotel_search(&criteria),
            )
            .await
        }
        .instrument(span)
        .await
    }

    pub async fn compose_itinerary(&self, request: ItineraryRequest) -> CoreResult<ItineraryResult> {
        let request_id = Uuid::new_v4();
        let span = info_span!("compose_itinerary", %request_id, destination = %request.destination);

        async move {
            let (itinerary, warnings) = self.composer.compose(&request).await?;
            Ok::<_, CoreError>(ItineraryResult { request_id, itinerary, warnings })
        }
        .instrument(span)
        .await
    }

    async fn search(&self, query: SearchQuery) -> CoreResult<Vec<serde_json::Value>> {
        let kind = query.kind();
        let records = self
            .search_policy
            .call("offer search", || self.search.search(&query))
            .await?;

        if records.is_empty() {
            return Err(CoreError::EmptyResult { kind, dropped: 0 });
        }
        info!("Search returned {} raw {} records", records.len(), kind);
        Ok(records)
    }

    async fn recommend(
        &self,
        request_id: Uuid,
        kind: OfferKind,
        batch: NormalizedBatch,
        profile: &PreferenceProfile,
        context: ScoringContext,
        search_summary: &str,
    ) -> CoreResult<RecommendationResult> {
        let mut warnings = Vec::new();
        let dropped_offers = batch.dropped.len();
        warnings.extend(batch.dropped_warning());

        // 1. Normalize
        let mut offers = batch.offers;
        if offers.is_empty() {
            return Err(CoreError::EmptyResult { kind, dropped: dropped_offers });
        }
        info!("Normalized {} {} offers ({} dropped)", offers.len(), kind, dropped_offers);

        // 2. Enrich
        let report = self.enricher.enrich(&mut offers).await;
        warnings.extend(report.warning());

        // 3. Score and rank
        let scored = self.scoring.score_batch(offers, profile, &context);
        let shortlist = self.ranker.rank(scored);

        // 4. Explain
        let (recommendation, warning) = self.synthesizer.synthesize(kind, search_summary, profile, &shortlist).await;
        warnings.extend(warning);

        info!("Recommended {} {} offers with {} warnings", shortlist.len(), kind, warnings.len());

        Ok(RecommendationResult {
            request_id,
            shortlist,
            recommendation_text: recommendation.text,
            recommendation_source: recommendation.source,
            dropped_offers,
            warnings,
        })
    }
}

fn resolve_profile(profile: Option<PreferenceProfile>) -> CoreResult<PreferenceProfile> {
    let profile = profile.unwrap_or_default();
    profile.validate()?;
    Ok(profile)
}

fn validate_flight_criteria(criteria: &FlightSearchCriteria) -> CoreResult<()> {
    if criteria.origin.trim().is_empty() || criteria.destination.trim().is_empty() {
        return Err(CoreError::InvalidRequest("origin and destination are required".to_string()));
    }
    if criteria.passengers == 0 {
        return Err(CoreError::InvalidRequest("at least one passenger is required".to_string()));
    }
    if let Some(return_date) = criteria.return_date {
        if return_date < criteria.departure_date {
            return Err(CoreError::InvalidRequest(format!(
                "return date {} is before departure {}",
                return_date, criteria.departure_date
            )));
        }
    }
    Ok(())
}

fn validate_hotel_criteria(criteria: &HotelSearchCriteria) -> CoreResult<()> {
    if criteria.location.trim().is_empty() {
        return Err(CoreError::InvalidRequest("location is required".to_string()));
    }
    if criteria.guests == 0 {
        return Err(CoreError::InvalidRequest("at least one guest is required".to_string()));
    }
    if criteria.check_out <= criteria.check_in {
        return Err(CoreError::InvalidRequest(format!(
            "check-out {} must be after check-in {}",
            criteria.check_out, criteria.check_in
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::{json, Value};
    use voyage_core::mock::{MockContextProvider, MockSearchProvider, MockTextGenerator};
    use voyage_core::{CabinClass, ContextFields, ProviderError, RoomType};
    use voyage_offer::Offer;

    fn test_config() -> Config {
        let mut config = Config::default();
        config.pipeline.retry_backoff_ms = 0;
        config.pipeline.call_timeout_ms = 1_000;
        config
    }

    fn flight_criteria() -> FlightSearchCriteria {
        FlightSearchCriteria {
            origin: "JFK".to_string(),
            destination: "LAX".to_string(),
            departure_date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            return_date: None,
            passengers: 1,
            cabin_class: CabinClass::Economy,
            preferences: vec![],
        }
    }

    fn hotel_criteria() -> HotelSearchCriteria {
        HotelSearchCriteria {
            location: "Paris".to_string(),
            check_in: NaiveDate::from_ymd_opt(2025, 5, 1).unwrap(),
            check_out: NaiveDate::from_ymd_opt(2025, 5, 4).unwrap(),
            guests: 2,
            room_type: RoomType::Standard,
            amenities: vec!["wifi".to_string()],
            preferences: vec![],
        }
    }

    fn flight_record(airline: &str, price: u32) -> Value {
        json!({
            "airline": airline,
            "price": price,
            "duration": 360,
            "stops": 0,
            "departure": "2025-03-01 08:00",
            "arrival": "2025-03-01 11:00"
        })
    }

    fn build_planner(search: MockSearchProvider, context: MockContextProvider, generator: MockTextGenerator) -> TravelPlanner {
        TravelPlanner::new(
            &test_config(),
            Providers {
                search: Arc::new(search),
                context: Arc::new(context),
                generator: Arc::new(generator),
            },
        )
    }

    fn sunny() -> ContextFields {
        ContextFields { precipitation_probability: Some(0.05), conditions: Some("Clear sky".to_string()), ..ContextFields::default() }
    }

    #[tokio::test]
    async fn test_price_only_profile_orders_by_price() {
        let search = MockSearchProvider::new(vec![
            flight_record("Delta", 100),
            flight_record("United", 200),
            flight_record("JetBlue", 150),
        ]);
        let planner = build_planner(search, MockContextProvider::new(sunny()), MockTextGenerator::scripted(vec![Ok("Fly Delta.".to_string())]));

        let result = planner.recommend_flights(flight_criteria(), Some(PreferenceProfile::price_only())).await.unwrap();

        let carriers: Vec<&str> = result
            .shortlist
            .iter()
            .map(|s| match s.offer() {
                Offer::Flight(f) => f.carrier.as_str(),
                Offer::Hotel(h) => h.name.as_str(),
            })
            .collect();
        assert_eq!(carriers, vec!["Delta", "JetBlue", "United"]);
        assert_eq!(result.recommendation_text, "Fly Delta.");
        assert_eq!(result.recommendation_source, RecommendationSource::Generated);
        assert!(result.warnings.is_empty());
        assert!(result.shortlist.iter().all(|s| s.offer().enrichment().is_some()));
    }

    #[tokio::test]
    async fn test_degraded_collaborators_produce_warnings_not_errors() {
        let search = MockSearchProvider::new(vec![
            flight_record("Delta", 100),
            json!({"airline": "Ghost"}),
            flight_record("United", 200),
        ]);
        let planner = build_planner(search, MockContextProvider::unavailable(), MockTextGenerator::failing());

        let result = planner.recommend_flights(flight_criteria(), None).await.unwrap();

        assert_eq!(result.shortlist.len(), 2);
        assert_eq!(result.dropped_offers, 1);
        assert_eq!(result.recommendation_source, RecommendationSource::Template);
        assert!(result.recommendation_text.starts_with("Top pick: Delta"));
        let kinds: Vec<&str> = result
            .warnings
            .iter()
            .map(|w| match w {
                Warning::OffersDropped { .. } => "dropped",
                Warning::EnrichmentUnavailable { .. } => "enrichment",
                Warning::GenerationFailure { .. } => "generation",
                _ => "other",
            })
            .collect();
        assert_eq!(kinds, vec!["dropped", "enrichment", "generation"]);
    }

    #[tokio::test]
    async fn test_empty_batches_are_reported() {
        let planner = build_planner(MockSearchProvider::new(vec![]), MockContextProvider::new(sunny()), MockTextGenerator::failing());
        assert!(matches!(
            planner.recommend_flights(flight_criteria(), None).await,
            Err(CoreError::EmptyResult { kind: OfferKind::Flight, dropped: 0 })
        ));

        let search = MockSearchProvider::new(vec![json!({"name": "No price"}), json!("garbage")]);
        let planner = build_planner(search, MockContextProvider::new(sunny()), MockTextGenerator::failing());
        assert!(matches!(
            planner.recommend_hotels(hotel_criteria(), None).await,
            Err(CoreError::EmptyResult { kind: OfferKind::Hotel, dropped: 2 })
        ));
    }

    #[tokio::test]
    async fn test_search_failure_is_retried_once_then_surfaced() {
        let search = Arc::new(MockSearchProvider::failing(ProviderError::Timeout(1000)));
        let planner = TravelPlanner::new(
            &test_config(),
            Providers {
                search: search.clone(),
                context: Arc::new(MockContextProvider::new(sunny())),
                generator: Arc::new(MockTextGenerator::failing()),
            },
        );

        let result = planner.recommend_flights(flight_criteria(), None).await;
        assert!(matches!(result, Err(CoreError::SearchUnavailable(ProviderError::Timeout(_)))));
        assert_eq!(search.calls(), 2);
    }

    #[tokio::test]
    async fn test_invalid_requests_never_reach_the_provider() {
        let search = Arc::new(MockSearchProvider::new(vec![flight_record("Delta", 100)]));
        let planner = TravelPlanner::new(
            &test_config(),
            Providers {
                search: search.clone(),
                context: Arc::new(MockContextProvider::new(sunny())),
                generator: Arc::new(MockTextGenerator::failing()),
            },
        );

        let bad_profile = PreferenceProfile { stops: -0.1, ..PreferenceProfile::default() };
        assert!(matches!(
            planner.recommend_flights(flight_criteria(), Some(bad_profile)).await,
            Err(CoreError::InvalidRequest(_))
        ));

        let mut criteria = hotel_criteria();
        criteria.check_out = criteria.check_in;
        assert!(matches!(planner.recommend_hotels(criteria, None).await, Err(CoreError::InvalidRequest(_))));
        assert_eq!(search.calls(), 0);
    }

    #[tokio::test]
    async fn test_hotel_without_rating_still_ranks() {
        let search = MockSearchProvider::new(vec![
            json!({"name": "Le Marais Inn", "rate_per_night": {"lowest": "$180"}, "overall_rating": 4.5,
                   "amenities": ["Free Wi-Fi", "wifi"], "location": "Paris, France"}),
            json!({"name": "Gare du Nord Rooms", "price": 120, "amenities": ["wifi"], "location": "Paris"}),
        ]);
        let planner = build_planner(search, MockContextProvider::new(sunny()), MockTextGenerator::failing());

        let result = planner.recommend_hotels(hotel_criteria(), None).await.unwrap();
        assert_eq!(result.shortlist.len(), 2);
        let unrated = result
            .shortlist
            .iter()
            .find(|s| matches!(s.offer(), Offer::Hotel(h) if h.rating.is_none()))
            .unwrap();
        assert_eq!(unrated.sub_scores()[&voyage_offer::Criterion::Rating], 0.5);
    }

    #[tokio::test]
    async fn test_itinerary_with_offline_generator() {
        let planner = build_planner(MockSearchProvider::new(vec![]), MockContextProvider::new(sunny()), MockTextGenerator::failing());
        let request = ItineraryRequest {
            destination: "Rome".to_string(),
            check_in: NaiveDate::from_ymd_opt(2025, 9, 1).unwrap(),
            check_out: NaiveDate::from_ymd_opt(2025, 9, 4).unwrap(),
            flight_summary: String::new(),
            hotel_summary: String::new(),
            activity_preferences: vec![],
        };

        let result = planner.compose_itinerary(request).await.unwrap();
        assert_eq!(result.itinerary.days.len(), 3);
        assert_eq!(result.warnings.len(), 4);
    }
}
