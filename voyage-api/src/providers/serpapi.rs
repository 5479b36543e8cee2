use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use voyage_core::{FlightSearchCriteria, HotelSearchCriteria, ProviderError, SearchProvider, SearchQuery};
use voyage_offer::normalizer::unwrap_envelope;
use voyage_store::app_config::ProvidersConfig;

const SERVICE: &str = "SerpAPI";

/// Google Flights and Google Hotels through SerpAPI
pub struct SerpApiSearch {
    client: Client,
    base_url: String,
    api_key: String,
    timeout: Duration,
}

impl SerpApiSearch {
    pub fn new(client: Client, config: &ProvidersConfig, timeout: Duration) -> Self {
        Self {
            client,
            base_url: config.serpapi_base_url.clone(),
            api_key: config.serpapi_key.clone(),
            timeout,
        }
    }

    fn flight_params(&self, criteria: &FlightSearchCriteria) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("engine", "google_flights".to_string()),
            ("hl", "en".to_string()),
            ("gl", "us".to_string()),
            ("currency", "USD".to_string()),
            ("departure_id", criteria.origin.trim().to_uppercase()),
            ("arrival_id", criteria.destination.trim().to_uppercase()),
            ("outbound_date", criteria.departure_date.to_string()),
            ("travel_class", criteria.cabin_class.provider_code().to_string()),
            ("adults", criteria.passengers.to_string()),
        ];
        match criteria.return_date {
            Some(date) => {
                params.push(("type", "1".to_string()));
                params.push(("return_date", date.to_string()));
            }
            None => params.push(("type", "2".to_string())),
        }
        params
    }

    fn hotel_params(&self, criteria: &HotelSearchCriteria) -> Vec<(&'static str, String)> {
        vec![
            ("engine", "google_hotels".to_string()),
            ("hl", "en".to_string()),
            ("gl", "us".to_string()),
            ("currency", "USD".to_string()),
            ("q", criteria.location.trim().to_string()),
            ("check_in_date", criteria.check_in.to_string()),
            ("check_out_date", criteria.check_out.to_string()),
            ("adults", criteria.guests.to_string()),
            // Highest rating first, 4.0 and up
            ("sort_by", "3".to_string()),
            ("rating", "8".to_string()),
        ]
    }
}

#[async_trait]
impl SearchProvider for SerpApiSearch {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<Value>, ProviderError> {
        if self.api_key.is_empty() {
            return Err(ProviderError::Unavailable("SerpAPI key not configured".to_string()));
        }

        let params = match query {
            SearchQuery::Flights(criteria) => self.flight_params(criteria),
            SearchQuery::Hotels(criteria) => self.hotel_params(criteria),
        };
        debug!("SerpAPI {} search: {:?}", query.kind(), params);

        let response = self
            .client
            .get(&self.base_url)
            .query(&params)
            .query(&[("api_key", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| super::transport_error(SERVICE, e, self.timeout))?;

        let body: Value = super::check_status(SERVICE, response)
            .await?
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("{}: {}", SERVICE, e)))?;

        if let Some(error) = body.get("error").and_then(Value::as_str) {
            // SerpAPI reports "no results" as an error string
            if error.to_lowercase().contains("hasn't returned any results") {
                return Ok(Vec::new());
            }
            return Err(ProviderError::InvalidResponse(format!("{}: {}", SERVICE, error)));
        }

        let records = unwrap_envelope(&body, query.kind());
        debug!("SerpAPI returned {} {} records", records.len(), query.kind());
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use voyage_core::CabinClass;

    fn search() -> SerpApiSearch {
        SerpApiSearch::new(Client::new(), &ProvidersConfig::default(), Duration::from_secs(5))
    }

    #[test]
    fn test_round_trip_flight_params() {
        let criteria = FlightSearchCriteria {
            origin: " jfk".to_string(),
            destination: "cdg".to_string(),
            departure_date: NaiveDate::from_ymd_opt(2025, 7, 1).unwrap(),
            return_date: Some(NaiveDate::from_ymd_opt(2025, 7, 9).unwrap()),
            passengers: 2,
            cabin_class: CabinClass::Business,
            preferences: vec![],
        };
        let params = search().flight_params(&criteria);
        let get = |key: &str| params.iter().find(|(k, _)| *k == key).map(|(_, v)| v.as_str());

        assert_eq!(get("departure_id"), Some("JFK"));
        assert_eq!(get("arrival_id"), Some("CDG"));
        assert_eq!(get("travel_class"), Some("3"));
        assert_eq!(get("type"), Some("1"));
        assert_eq!(get("return_date"), Some("2025-07-09"));
        assert_eq!(get("currency"), Some("USD"));
    }

    #[tokio::test]
    async fn test_missing_key_is_unavailable() {
        let query = SearchQuery::Hotels(HotelSearchCriteria {
            location: "Oslo".to_string(),
            check_in: NaiveDate::from_ymd_opt(2025, 1, 3).unwrap(),
            check_out: NaiveDate::from_ymd_opt(2025, 1, 5).unwrap(),
            guests: 1,
            room_type: Default::default(),
            amenities: vec![],
            preferences: vec![],
        });
        assert!(matches!(search().search(&query).await, Err(ProviderError::Unavailable(_))));
    }
}
