use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use voyage_core::{ContextFields, ContextProvider, ProviderError};
use voyage_store::app_config::ProvidersConfig;

const SERVICE: &str = "Open-Meteo";

#[derive(Deserialize)]
struct GeocodingResponse {
    #[serde(default)]
    results: Vec<Place>,
}

#[derive(Deserialize)]
struct Place {
    latitude: f64,
    longitude: f64,
}

#[derive(Deserialize)]
struct ForecastResponse {
    daily: Daily,
}

#[derive(Deserialize)]
struct Daily {
    #[serde(default)]
    temperature_2m_max: Vec<Option<f64>>,
    #[serde(default)]
    temperature_2m_min: Vec<Option<f64>>,
    #[serde(default)]
    precipitation_probability_max: Vec<Option<f64>>,
    #[serde(default)]
    weathercode: Vec<Option<u32>>,
}

/// WMO weather interpretation codes
fn describe_weather_code(code: u32) -> &'static str {
    match code {
        0 => "Clear sky",
        1..=3 => "Partly cloudy",
        45 | 48 => "Fog",
        51..=57 => "Drizzle",
        61..=67 => "Rain",
        71..=77 => "Snow",
        80..=82 => "Rain showers",
        85 | 86 => "Snow showers",
        95..=99 => "Thunderstorm",
        _ => "Unknown",
    }
}

/// Cities served by common airport codes; flight offers carry IATA codes
const AIRPORT_CITIES: &[(&str, &str)] = &[
    ("AMS", "Amsterdam"), ("ATL", "Atlanta"), ("BCN", "Barcelona"), ("BKK", "Bangkok"),
    ("BOS", "Boston"), ("CDG", "Paris"), ("DEN", "Denver"), ("DFW", "Dallas"),
    ("DXB", "Dubai"), ("EWR", "Newark"), ("FCO", "Rome"), ("FRA", "Frankfurt"),
    ("HKG", "Hong Kong"), ("HND", "Tokyo"), ("IAD", "Washington"), ("IST", "Istanbul"),
    ("JFK", "New York"), ("KIX", "Osaka"), ("LAS", "Las Vegas"), ("LAX", "Los Angeles"),
    ("LGA", "New York"), ("LHR", "London"), ("LGW", "London"), ("LIS", "Lisbon"),
    ("MAD", "Madrid"), ("MEX", "Mexico City"), ("MIA", "Miami"), ("MUC", "Munich"),
    ("NRT", "Tokyo"), ("ORD", "Chicago"), ("ORY", "Paris"), ("PEK", "Beijing"),
    ("SEA", "Seattle"), ("SFO", "San Francisco"), ("SIN", "Singapore"), ("SYD", "Sydney"),
    ("YUL", "Montreal"), ("YVR", "Vancouver"), ("YYZ", "Toronto"), ("ZRH", "Zurich"),
];

/// Place name to geocode: known airport codes become their city, "Paris, France" becomes "Paris"
fn place_name(location: &str) -> &str {
    let name = location.split(',').next().unwrap_or(location).trim();
    if name.len() == 3 && name.chars().all(|c| c.is_ascii_alphabetic()) {
        if let Some((_, city)) = AIRPORT_CITIES.iter().find(|(code, _)| code.eq_ignore_ascii_case(name)) {
            return *city;
        }
    }
    name
}

/// Daily forecast for a place name, geocoded on each lookup
pub struct OpenMeteoContext {
    client: Client,
    geocoding_url: String,
    forecast_url: String,
    timeout: Duration,
}

impl OpenMeteoContext {
    pub fn new(client: Client, config: &ProvidersConfig, timeout: Duration) -> Self {
        Self {
            client,
            geocoding_url: config.geocoding_base_url.clone(),
            forecast_url: config.forecast_base_url.clone(),
            timeout,
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str, query: &[(&str, String)]) -> Result<T, ProviderError> {
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| super::transport_error(SERVICE, e, self.timeout))?;

        super::check_status(SERVICE, response)
            .await?
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("{}: {}", SERVICE, e)))
    }

    async fn geocode(&self, location: &str) -> Result<Place, ProviderError> {
        let name = place_name(location);
        let query = [("name", name.to_string()), ("count", "1".to_string()), ("language", "en".to_string())];
        let response: GeocodingResponse = self.get_json(&self.geocoding_url, &query).await?;

        response
            .results
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::Unavailable(format!("{}: unknown location '{}'", SERVICE, name)))
    }
}

fn first<T: Copy>(values: &[Option<T>]) -> Option<T> {
    values.first().copied().flatten()
}

fn context_from_daily(daily: &Daily) -> ContextFields {
    ContextFields {
        precipitation_probability: first(&daily.precipitation_probability_max).map(|p| (p / 100.0).clamp(0.0, 1.0)),
        temperature_max_c: first(&daily.temperature_2m_max),
        temperature_min_c: first(&daily.temperature_2m_min),
        conditions: first(&daily.weathercode).map(|code| describe_weather_code(code).to_string()),
    }
}

#[async_trait]
impl ContextProvider for OpenMeteoContext {
    async fn get_context(&self, location: &str, date: NaiveDate) -> Result<ContextFields, ProviderError> {
        let place = self.geocode(location).await?;

        let query = [
            ("latitude", place.latitude.to_string()),
            ("longitude", place.longitude.to_string()),
            ("daily", "temperature_2m_max,temperature_2m_min,precipitation_probability_max,weathercode".to_string()),
            ("timezone", "auto".to_string()),
            ("start_date", date.to_string()),
            ("end_date", date.to_string()),
        ];
        let forecast: ForecastResponse = self.get_json(&self.forecast_url, &query).await?;

        let context = context_from_daily(&forecast.daily);
        debug!("Forecast for {} on {}: {:?}", location, date, context);
        Ok(context)
    }
}
