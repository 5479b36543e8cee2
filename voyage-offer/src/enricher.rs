use chrono::NaiveDate;
use futures_util::stream::{self, StreamExt};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{info, warn};

use voyage_core::{CallPolicy, ContextFields, ContextProvider, Warning};

use crate::models::{Enrichment, Offer};

/// Condition keywords that rule out a good travel window
const SEVERE_CONDITIONS: &[&str] = &["storm", "thunder", "snow", "blizzard", "hurricane", "typhoon"];

/// Amenity tags that only pay off in fair weather
const OUTDOOR_AMENITIES: &[&str] = &["pool", "beach", "garden", "terrace", "patio", "rooftop", "outdoor"];

pub struct EnrichmentReport {
    pub lookups: usize,
    pub failed_lookups: usize,
}

impl EnrichmentReport {
    pub fn warning(&self) -> Option<Warning> {
        (self.failed_lookups > 0).then(|| Warning::EnrichmentUnavailable {
            failed_lookups: self.failed_lookups,
            total_lookups: self.lookups,
        })
    }
}

/// Attaches weather-derived signals to a batch of offers.
///
/// Each distinct (location, date) pair is looked up once per batch; lookups
/// run concurrently up to `max_in_flight`. Failures leave offers unenriched.
pub struct ContextEnricher {
    provider: Arc<dyn ContextProvider>,
    policy: CallPolicy,
    max_in_flight: usize,
}

impl ContextEnricher {
    pub fn new(provider: Arc<dyn ContextProvider>, policy: CallPolicy, max_in_flight: usize) -> Self {
        Self { provider, policy, max_in_flight: max_in_flight.max(1) }
    }

    pub async fn enrich(&self, offers: &mut [Offer]) -> EnrichmentReport {
        // Sorted so lookups are issued in a reproducible order
        let keys: BTreeSet<(String, NaiveDate)> = offers.iter().map(Offer::context_key).collect();

        let results: HashMap<(String, NaiveDate), Option<ContextFields>> = stream::iter(keys)
            .map(|key| async move {
                let (location, date) = &key;
                let result = self
                    .policy
                    .call("context lookup", || self.provider.get_context(location, *date))
                    .await;
                let fields = match result {
                    Ok(fields) => Some(fields),
                    Err(e) => {
                        warn!("Context unavailable for {} on {}: {}", location, date, e);
                        None
                    }
                };
                (key, fields)
            })
            .buffer_unordered(self.max_in_flight)
            .collect()
            .await;

        let failed_lookups = results.values().filter(|fields| fields.is_none()).count();

        for offer in offers.iter_mut() {
            if let Some(Some(fields)) = results.get(&offer.context_key()) {
                let enrichment = annotate(offer, fields);
                offer.set_enrichment(enrichment);
            }
        }

        info!("Enriched {} offers from {} context lookups ({} failed)", offers.len(), results.len(), failed_lookups);

        EnrichmentReport { lookups: results.len(), failed_lookups }
    }
}

fn fair_weather(fields: &ContextFields) -> Option<bool> {
    let severe = fields
        .conditions
        .as_deref()
        .map(|c| {
            let c = c.to_lowercase();
            SEVERE_CONDITIONS.iter().any(|keyword| c.contains(keyword))
        });
    match (fields.precipitation_probability, severe) {
        (None, None) => None,
        (precipitation, severe) => Some(precipitation.map_or(true, |p| p < 0.5) && !severe.unwrap_or(false)),
    }
}

fn annotate(offer: &Offer, fields: &ContextFields) -> Enrichment {
    let fair = fair_weather(fields);
    match offer {
        Offer::Flight(_) => Enrichment {
            weather: Some(fields.clone()),
            good_travel_window: fair,
            outdoor_suitability: None,
        },
        Offer::Hotel(hotel) => {
            let outdoor = hotel
                .amenities
                .iter()
                .any(|tag| OUTDOOR_AMENITIES.iter().any(|o| tag.contains(o)));
            Enrichment {
                weather: Some(fields.clone()),
                good_travel_window: None,
                outdoor_suitability: fair.map(|fair| fair && outdoor),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FlightOffer, HotelOffer, Money};
    use chrono::NaiveDateTime;
    use serde_json::Map;
    use std::collections::BTreeSet;
    use voyage_core::mock::MockContextProvider;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;
    use voyage_core::{CabinClass, ProviderError, RoomType};

    fn flight(id: &str, destination: &str, day: u32) -> Offer {
        let departure = NaiveDateTime::parse_from_str(&format!("2025-03-{:02} 08:00", day), "%Y-%m-%d %H:%M").unwrap();
        Offer::Flight(FlightOffer {
            id: id.to_string(),
            price: Money::new(10000, "USD"),
            carrier: "Delta".to_string(),
            origin: "JFK".to_string(),
            destination: destination.to_string(),
            departure,
            arrival: departure + chrono::Duration::hours(6),
            stops: 0,
            duration_minutes: 360,
            cabin_class: CabinClass::Economy,
            provider_fields: Map::new(),
            enrichment: None,
        })
    }

    fn hotel(amenities: &[&str]) -> Offer {
        Offer::Hotel(HotelOffer {
            id: "HT-1".to_string(),
            price: Money::new(20000, "USD"),
            name: "Seaside".to_string(),
            location: "Nice".to_string(),
            check_in: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            check_out: NaiveDate::from_ymd_opt(2025, 6, 3).unwrap(),
            rating: Some(4.2),
            amenities: amenities.iter().map(|a| a.to_string()).collect::<BTreeSet<_>>(),
            room_type: RoomType::Standard,
            provider_fields: Map::new(),
            enrichment: None,
        })
    }

    fn sunny() -> ContextFields {
        ContextFields {
            precipitation_probability: Some(0.1),
            temperature_max_c: Some(24.0),
            temperature_min_c: Some(15.0),
            conditions: Some("Clear sky".to_string()),
        }
    }

    #[tokio::test]
    async fn test_one_lookup_per_distinct_key() {
        let provider = Arc::new(MockContextProvider::new(sunny()));
        let enricher = ContextEnricher::new(provider.clone(), CallPolicy::default(), 5);

        let mut offers = vec![flight("a", "LAX", 1), flight("b", "LAX", 1), flight("c", "LAX", 2), flight("d", "SFO", 1)];
        let report = enricher.enrich(&mut offers).await;

        assert_eq!(provider.calls(), 3);
        assert_eq!(report.lookups, 3);
        assert!(report.warning().is_none());
        for offer in &offers {
            assert_eq!(offer.enrichment().and_then(|e| e.good_travel_window), Some(true));
        }
    }

    #[tokio::test]
    async fn test_provider_failure_is_non_fatal() {
        let provider = Arc::new(MockContextProvider::unavailable());
        let policy = CallPolicy::new(std::time::Duration::from_secs(1), 0, std::time::Duration::ZERO);
        let enricher = ContextEnricher::new(provider, policy, 2);

        let mut offers = vec![flight("a", "LAX", 1), flight("b", "SFO", 1)];
        let report = enricher.enrich(&mut offers).await;

        assert!(offers.iter().all(|o| o.enrichment().is_none()));
        assert_eq!(
            report.warning(),
            Some(Warning::EnrichmentUnavailable { failed_lookups: 2, total_lookups: 2 })
        );
    }

    #[tokio::test]
    async fn test_hotel_outdoor_suitability() {
        let provider = Arc::new(MockContextProvider::new(sunny()));
        let enricher = ContextEnricher::new(provider, CallPolicy::default(), 5);

        let mut offers = vec![hotel(&["outdoor pool", "wi-fi"])];
        enricher.enrich(&mut offers).await;
        assert_eq!(offers[0].enrichment().and_then(|e| e.outdoor_suitability), Some(true));

        let mut offers = vec![hotel(&["wi-fi"])];
        enricher.enrich(&mut offers).await;
        assert_eq!(offers[0].enrichment().and_then(|e| e.outdoor_suitability), Some(false));
    }

    /// Sleeps per lookup and records how many lookups overlap
    #[derive(Default)]
    struct SlowContext {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        fetched: Mutex<Vec<String>>,
    }

    #[async_trait::async_trait]
    impl ContextProvider for SlowContext {
        async fn get_context(&self, location: &str, _date: NaiveDate) -> Result<ContextFields, ProviderError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            self.fetched.lock().unwrap().push(location.to_string());
            tokio::time::sleep(Duration::from_millis(200)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(sunny())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_lookups_respect_in_flight_cap() {
        let provider = Arc::new(SlowContext::default());
        let enricher = ContextEnricher::new(provider.clone(), CallPolicy::default(), 5);

        let destinations: Vec<String> = (0..12).map(|i| format!("CITY{:02}", i)).collect();
        let mut offers: Vec<Offer> = destinations
            .iter()
            .flat_map(|d| [flight(&format!("{}-a", d), d, 1), flight(&format!("{}-b", d), d, 1)])
            .collect();
        let report = enricher.enrich(&mut offers).await;

        assert_eq!(report.lookups, 12);
        assert!(provider.peak.load(Ordering::SeqCst) <= 5);
        assert!(provider.peak.load(Ordering::SeqCst) > 1);

        let mut fetched = provider.fetched.lock().unwrap().clone();
        fetched.sort();
        assert_eq!(fetched, destinations);
        assert!(offers.iter().all(|o| o.enrichment().is_some()));
    }

    #[test]
    fn test_storms_close_the_travel_window() {
        let stormy = ContextFields {
            precipitation_probability: Some(0.2),
            conditions: Some("Thunderstorm with hail".to_string()),
            ..ContextFields::default()
        };
        assert_eq!(fair_weather(&stormy), Some(false));
        assert_eq!(fair_weather(&ContextFields::default()), None);
        assert_eq!(fair_weather(&ContextFields { precipitation_probability: Some(0.7), ..ContextFields::default() }), Some(false));
    }
}
