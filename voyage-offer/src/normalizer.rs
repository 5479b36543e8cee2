use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::collections::{BTreeSet, HashSet};
use tracing::debug;

use voyage_core::{CabinClass, FlightSearchCriteria, HotelSearchCriteria, OfferKind, RoomType, Warning};

use crate::currency::{money_from_number, parse_price};
use crate::models::{FlightOffer, HotelOffer, Money, Offer};

/// Why a raw record could not become an offer
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NormalizationError {
    #[error("record is not an object")]
    NotAnObject,
    #[error("missing required field '{0}'")]
    MissingField(&'static str),
    #[error("invalid value for '{field}': {value}")]
    InvalidField { field: &'static str, value: String },
    #[error("unknown currency symbol '{0}'")]
    UnknownCurrency(String),
    #[error("malformed duration '{0}'")]
    MalformedDuration(String),
    #[error("duplicate offer {0}")]
    DuplicateOffer(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct DroppedOffer {
    /// Position of the record in the provider batch
    pub index: usize,
    pub error: NormalizationError,
}

/// Result of normalizing one provider batch; nothing is discarded silently
#[derive(Debug, Clone, Default)]
pub struct NormalizedBatch {
    pub offers: Vec<Offer>,
    pub dropped: Vec<DroppedOffer>,
}

impl NormalizedBatch {
    pub fn input_len(&self) -> usize {
        self.offers.len() + self.dropped.len()
    }

    pub fn dropped_warning(&self) -> Option<Warning> {
        if self.dropped.is_empty() {
            return None;
        }
        Some(Warning::OffersDropped {
            count: self.dropped.len(),
            reasons: self
                .dropped
                .iter()
                .map(|d| format!("record {}: {}", d.index, d.error))
                .collect(),
        })
    }
}

/// Converts loosely structured provider records into typed offers
pub struct OfferNormalizer {
    default_currency: String,
}

impl OfferNormalizer {
    pub fn new(default_currency: impl Into<String>) -> Self {
        Self { default_currency: default_currency.into() }
    }

    pub fn normalize_flights(&self, records: &[Value], criteria: &FlightSearchCriteria) -> NormalizedBatch {
        self.collect(records, |record| self.normalize_flight(record, criteria).map(Offer::Flight))
    }

    pub fn normalize_hotels(&self, records: &[Value], criteria: &HotelSearchCriteria) -> NormalizedBatch {
        self.collect(records, |record| self.normalize_hotel(record, criteria).map(Offer::Hotel))
    }

    /// Provider order is preserved so downstream tie-breaks stay reproducible
    fn collect<F>(&self, records: &[Value], normalize: F) -> NormalizedBatch
    where
        F: Fn(&Value) -> Result<Offer, NormalizationError>,
    {
        let mut batch = NormalizedBatch::default();
        let mut seen = HashSet::new();

        for (index, record) in records.iter().enumerate() {
            let result = normalize(record).and_then(|offer| {
                if seen.insert(offer.id().to_string()) {
                    Ok(offer)
                } else {
                    Err(NormalizationError::DuplicateOffer(offer.id().to_string()))
                }
            });

            match result {
                Ok(offer) => batch.offers.push(offer),
                Err(error) => {
                    debug!("Dropping record {}: {}", index, error);
                    batch.dropped.push(DroppedOffer { index, error });
                }
            }
        }

        batch
    }

    pub fn normalize_flight(&self, record: &Value, criteria: &FlightSearchCriteria) -> Result<FlightOffer, NormalizationError> {
        let obj = record.as_object().ok_or(NormalizationError::NotAnObject)?;

        // Itineraries with connections list each leg under `flights`
        let legs = obj.get("flights").and_then(Value::as_array).filter(|legs| !legs.is_empty());
        let first_leg = legs.and_then(|l| l.first()).and_then(Value::as_object);
        let last_leg = legs.and_then(|l| l.last()).and_then(Value::as_object);

        let carrier = first_present(obj, &["airline", "carrier"])
            .and_then(as_text)
            .or_else(|| {
                obj.get("airlines")
                    .and_then(|a| a.get(0))
                    .and_then(|a| a.get("name").or(Some(a)))
                    .and_then(as_text)
            })
            .or_else(|| first_leg.and_then(|l| first_present(l, &["airline"])).and_then(as_text))
            .ok_or(NormalizationError::MissingField("carrier"))?;

        let price = first_present(obj, &["price", "total_price"])
            .ok_or(NormalizationError::MissingField("price"))
            .and_then(|v| self.parse_price_value(v))?;

        let duration_minutes = match first_present(obj, &["duration", "flight_duration", "total_duration"]) {
            Some(v) => parse_duration_value(v)?,
            None => legs
                .map(|legs| {
                    legs.iter()
                        .map(|leg| leg.get("duration").map(parse_duration_value).unwrap_or(Ok(0)))
                        .sum::<Result<u32, _>>()
                })
                .transpose()?
                .filter(|minutes| *minutes > 0)
                .ok_or(NormalizationError::MissingField("duration"))?,
        };

        let departure = airport_time(obj, "departure_airport", "departure")
            .or_else(|| first_leg.and_then(|l| airport_time(l, "departure_airport", "departure")))
            .ok_or(NormalizationError::MissingField("departure"))
            .and_then(|raw| parse_timestamp(&raw, "departure"))?;

        let arrival = airport_time(obj, "arrival_airport", "arrival")
            .or_else(|| last_leg.and_then(|l| airport_time(l, "arrival_airport", "arrival")))
            .ok_or(NormalizationError::MissingField("arrival"))
            .and_then(|raw| parse_timestamp(&raw, "arrival"))?;

        let stops = match first_present(obj, &["stops", "number_of_stops"]) {
            Some(v) => parse_stops(v)?,
            None => obj
                .get("layovers")
                .and_then(Value::as_array)
                .map(|l| l.len() as u32)
                .or_else(|| legs.map(|l| l.len() as u32 - 1))
                .ok_or(NormalizationError::MissingField("stops"))?,
        };

        let origin = airport_code(obj, "departure_airport")
            .or_else(|| first_leg.and_then(|l| airport_code(l, "departure_airport")))
            .or_else(|| first_present(obj, &["origin"]).and_then(as_text))
            .unwrap_or_else(|| criteria.origin.trim().to_uppercase());

        let destination = airport_code(obj, "arrival_airport")
            .or_else(|| last_leg.and_then(|l| airport_code(l, "arrival_airport")))
            .or_else(|| first_present(obj, &["destination"]).and_then(as_text))
            .unwrap_or_else(|| criteria.destination.trim().to_uppercase());

        let cabin_class = match first_present(obj, &["travel_class", "cabin_class"])
            .or_else(|| first_leg.and_then(|l| first_present(l, &["travel_class"])))
            .and_then(as_text)
        {
            Some(raw) => raw
                .parse::<CabinClass>()
                .map_err(|_| NormalizationError::InvalidField { field: "cabin_class", value: raw })?,
            None => criteria.cabin_class,
        };

        let id = stable_id(
            "FL",
            &[
                &carrier,
                &origin,
                &destination,
                &departure.to_string(),
                &arrival.to_string(),
                &cabin_class.to_string(),
                &price.amount_minor.to_string(),
                &price.currency,
            ],
        );

        let provider_fields = display_fields(
            obj,
            &["airline", "carrier", "airlines", "price", "total_price", "duration", "flight_duration", "total_duration", "stops", "number_of_stops", "travel_class", "cabin_class"],
        );

        Ok(FlightOffer {
            id,
            price,
            carrier,
            origin,
            destination,
            departure,
            arrival,
            stops,
            duration_minutes,
            cabin_class,
            provider_fields,
            enrichment: None,
        })
    }

    pub fn normalize_hotel(&self, record: &Value, criteria: &HotelSearchCriteria) -> Result<HotelOffer, NormalizationError> {
        let obj = record.as_object().ok_or(NormalizationError::NotAnObject)?;

        let name = first_present(obj, &["title", "name"])
            .and_then(as_text)
            .ok_or(NormalizationError::MissingField("name"))?;

        let price = obj
            .get("rate_per_night")
            .and_then(|rate| rate.get("lowest").or_else(|| rate.get("extracted_lowest")))
            .filter(|v| is_present(v))
            .or_else(|| first_present(obj, &["price", "total_price", "rate"]))
            .ok_or(NormalizationError::MissingField("price"))
            .and_then(|v| self.parse_price_value(v))?;

        let rating = first_present(obj, &["overall_rating", "rating"]).and_then(|value| {
            let rating = parse_rating(value);
            if rating.is_none() {
                debug!("Ignoring unusable rating {} for hotel '{}'", display_value(value), name);
            }
            rating
        });

        let amenities: BTreeSet<String> = first_present(obj, &["amenities", "features"])
            .map(amenity_tags)
            .unwrap_or_default();

        let location = first_present(obj, &["address", "location"])
            .and_then(|v| match v {
                Value::Object(o) => first_present(o, &["address", "city"]).and_then(as_text),
                other => as_text(other),
            })
            .unwrap_or_else(|| criteria.location.trim().to_string());

        let check_in = match first_present(obj, &["check_in", "check_in_date"]).and_then(as_text) {
            Some(raw) => parse_date(&raw, "check_in")?,
            None => criteria.check_in,
        };
        let check_out = match first_present(obj, &["check_out", "check_out_date"]).and_then(as_text) {
            Some(raw) => parse_date(&raw, "check_out")?,
            None => criteria.check_out,
        };
        if check_out <= check_in {
            return Err(NormalizationError::InvalidField { field: "check_out", value: check_out.to_string() });
        }

        let room_type = match first_present(obj, &["room_type"]).and_then(as_text) {
            Some(raw) => raw
                .parse::<RoomType>()
                .map_err(|_| NormalizationError::InvalidField { field: "room_type", value: raw })?,
            None => criteria.room_type,
        };

        let id = stable_id(
            "HT",
            &[
                &name,
                &location,
                &check_in.to_string(),
                &check_out.to_string(),
                &room_type.to_string(),
                &price.amount_minor.to_string(),
                &price.currency,
            ],
        );

        let provider_fields = display_fields(
            obj,
            &["title", "name", "rate_per_night", "price", "total_price", "rate", "overall_rating", "rating", "amenities", "features", "address", "location", "room_type"],
        );

        Ok(HotelOffer {
            id,
            price,
            name,
            location,
            check_in,
            check_out,
            rating,
            amenities,
            room_type,
            provider_fields,
            enrichment: None,
        })
    }

    fn parse_price_value(&self, value: &Value) -> Result<Money, NormalizationError> {
        match value {
            Value::Number(n) => money_from_number(n.as_f64().unwrap_or(f64::NAN), &self.default_currency),
            Value::String(s) => parse_price(s, &self.default_currency),
            Value::Object(o) => {
                let amount = first_present(o, &["total", "price", "amount", "extracted_price"])
                    .ok_or(NormalizationError::MissingField("price"))?;
                let money = self.parse_price_value(amount)?;
                // An explicit currency code beats the default for bare amounts
                match (amount, o.get("currency").and_then(Value::as_str)) {
                    (Value::Number(_), Some(code)) => {
                        let code = crate::currency::resolve_currency(code)
                            .ok_or_else(|| NormalizationError::UnknownCurrency(code.to_string()))?;
                        Ok(Money::new(money.amount_minor, code))
                    }
                    _ => Ok(money),
                }
            }
            other => Err(NormalizationError::InvalidField { field: "price", value: other.to_string() }),
        }
    }
}

/// Unwrap a provider response envelope into its offer records
pub fn unwrap_envelope(response: &Value, kind: OfferKind) -> Vec<Value> {
    if let Value::Array(records) = response {
        return records.clone();
    }

    let take = |key: &str| response.get(key).and_then(Value::as_array).cloned().unwrap_or_default();

    match kind {
        OfferKind::Flight => {
            let mut records = take("best_flights");
            records.extend(take("other_flights"));
            if records.is_empty() {
                records = ["flights", "results"].iter().map(|k| take(k)).find(|r| !r.is_empty()).unwrap_or_default();
            }
            records
        }
        OfferKind::Hotel => ["properties", "hotels", "results", "data"]
            .iter()
            .map(|k| take(k))
            .find(|r| !r.is_empty())
            .unwrap_or_default(),
    }
}

/// Parse `"2h 15m"`, `"1 hr 5 min"`, `"135 min"`, `"PT2H15M"` or a bare minute count
pub fn parse_duration_minutes(raw: &str) -> Option<u32> {
    let text = raw.trim().to_ascii_lowercase();
    let text = text.strip_prefix("pt").unwrap_or(&text);

    if let Ok(minutes) = text.parse::<u32>() {
        return Some(minutes);
    }

    let mut total: u32 = 0;
    let mut number = String::new();
    let mut unit = String::new();
    let mut matched = false;

    let mut flush = |number: &mut String, unit: &mut String| -> Option<()> {
        if number.is_empty() && unit.is_empty() {
            return Some(());
        }
        let value: u32 = number.parse().ok()?;
        let factor = match unit.as_str() {
            "h" | "hr" | "hrs" | "hour" | "hours" => 60,
            "m" | "min" | "mins" | "minute" | "minutes" => 1,
            _ => return None,
        };
        total = total.checked_add(value.checked_mul(factor)?)?;
        matched = true;
        number.clear();
        unit.clear();
        Some(())
    };

    for c in text.chars() {
        if c.is_ascii_digit() {
            if !unit.is_empty() {
                flush(&mut number, &mut unit)?;
            }
            number.push(c);
        } else if c.is_ascii_alphabetic() {
            if number.is_empty() {
                return None;
            }
            unit.push(c);
        } else if c.is_whitespace() || c == ',' {
            continue;
        } else {
            return None;
        }
    }
    flush(&mut number, &mut unit)?;

    if matched { Some(total) } else { None }
}

fn parse_duration_value(value: &Value) -> Result<u32, NormalizationError> {
    let minutes = match value {
        Value::Number(n) => n.as_u64().and_then(|m| u32::try_from(m).ok()),
        Value::String(s) => parse_duration_minutes(s),
        _ => None,
    };
    match minutes {
        Some(m) if m > 0 => Ok(m),
        _ => Err(NormalizationError::MalformedDuration(display_value(value))),
    }
}

fn parse_stops(value: &Value) -> Result<u32, NormalizationError> {
    let invalid = || NormalizationError::InvalidField { field: "stops", value: display_value(value) };
    match value {
        Value::Number(n) => n.as_u64().and_then(|s| u32::try_from(s).ok()).ok_or_else(invalid),
        Value::String(s) => {
            let lower = s.trim().to_ascii_lowercase();
            if matches!(lower.as_str(), "direct" | "nonstop" | "non-stop" | "none") {
                return Ok(0);
            }
            lower
                .split_whitespace()
                .next()
                .and_then(|n| n.parse().ok())
                .ok_or_else(invalid)
        }
        _ => Err(invalid()),
    }
}

/// Ratings outside 0-5 or unparseable are treated as absent
fn parse_rating(value: &Value) -> Option<f64> {
    let rating = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    rating.filter(|r| (0.0..=5.0).contains(r))
}

fn amenity_tags(value: &Value) -> BTreeSet<String> {
    let raw: Vec<String> = match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::Object(o) => o.get("name").and_then(as_text),
                other => as_text(other),
            })
            .collect(),
        other => as_text(other).into_iter().collect(),
    };
    raw.into_iter()
        .map(|tag| tag.trim().to_lowercase())
        .filter(|tag| !tag.is_empty())
        .collect()
}

fn parse_timestamp(raw: &str, field: &'static str) -> Result<NaiveDateTime, NormalizationError> {
    const FORMATS: &[&str] = &["%Y-%m-%d %H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S"];
    let raw = raw.trim();
    FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.naive_local()))
        .ok_or_else(|| NormalizationError::InvalidField { field, value: raw.to_string() })
}

fn parse_date(raw: &str, field: &'static str) -> Result<NaiveDate, NormalizationError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| NormalizationError::InvalidField { field, value: raw.to_string() })
}

/// `"time"` of a nested airport object, or a flat timestamp string
fn airport_time(obj: &Map<String, Value>, airport_key: &str, flat_key: &str) -> Option<String> {
    match obj.get(airport_key) {
        Some(Value::Object(airport)) => first_present(airport, &["time", "datetime"]).and_then(as_text),
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => match obj.get(flat_key) {
            Some(Value::Object(o)) => first_present(o, &["time", "datetime"]).and_then(as_text),
            Some(other) => as_text(other),
            None => None,
        },
    }
}

fn airport_code(obj: &Map<String, Value>, airport_key: &str) -> Option<String> {
    obj.get(airport_key)
        .and_then(Value::as_object)
        .and_then(|airport| first_present(airport, &["id", "code"]))
        .and_then(as_text)
        .map(|code| code.to_uppercase())
}

fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        Value::Array(a) => !a.is_empty(),
        _ => true,
    }
}

/// First alias whose value is non-null and non-empty
fn first_present<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().filter_map(|k| obj.get(*k)).find(|v| is_present(v))
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn display_fields(obj: &Map<String, Value>, consumed: &[&str]) -> Map<String, Value> {
    obj.iter()
        .filter(|(k, _)| !consumed.contains(&k.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

fn stable_id(prefix: &str, parts: &[&str]) -> String {
    let digest = Sha256::digest(parts.join("|").as_bytes());
    let hex = format!("{:x}", digest);
    format!("{}-{}", prefix, &hex[..16])
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn flight_criteria() -> FlightSearchCriteria {
        FlightSearchCriteria {
            origin: "jfk".to_string(),
            destination: "lax".to_string(),
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
            amenities: vec![],
            preferences: vec![],
        }
    }

    fn serp_flight(price: i64) -> Value {
        json!({
            "flights": [
                {
                    "airline": "Delta",
                    "departure_airport": {"id": "JFK", "time": "2025-03-01 08:00"},
                    "arrival_airport": {"id": "ATL", "time": "2025-03-01 10:30"},
                    "duration": 150,
                    "travel_class": "Economy"
                },
                {
                    "airline": "Delta",
                    "departure_airport": {"id": "ATL", "time": "2025-03-01 11:30"},
                    "arrival_airport": {"id": "LAX", "time": "2025-03-01 13:20"},
                    "duration": 290,
                    "travel_class": "Economy"
                }
            ],
            "layovers": [{"id": "ATL", "duration": 60}],
            "total_duration": 500,
            "price": price,
            "airline_logo": "https://example.com/dl.png"
        })
    }

    #[test]
    fn test_serpapi_flight_with_legs() {
        let normalizer = OfferNormalizer::new("USD");
        let flight = normalizer.normalize_flight(&serp_flight(420), &flight_criteria()).unwrap();

        assert_eq!(flight.carrier, "Delta");
        assert_eq!(flight.origin, "JFK");
        assert_eq!(flight.destination, "LAX");
        assert_eq!(flight.stops, 1);
        assert_eq!(flight.duration_minutes, 500);
        assert_eq!(flight.price, Money::new(42000, "USD"));
        assert_eq!(flight.departure.format("%H:%M").to_string(), "08:00");
        assert_eq!(flight.arrival.format("%H:%M").to_string(), "13:20");
        assert!(flight.id.starts_with("FL-"));
        assert!(flight.provider_fields.contains_key("airline_logo"));
        assert!(!flight.provider_fields.contains_key("price"));
    }

    #[test]
    fn test_flat_flight_with_string_fields() {
        let normalizer = OfferNormalizer::new("USD");
        let record = json!({
            "airline": "JetBlue",
            "price": "€189.99",
            "duration": "5h 45m",
            "stops": "Direct",
            "departure": "2025-03-01T07:15:00",
            "arrival": "2025-03-01T10:00:00",
            "cabin_class": "business"
        });
        let flight = normalizer.normalize_flight(&record, &flight_criteria()).unwrap();

        assert_eq!(flight.duration_minutes, 345);
        assert_eq!(flight.stops, 0);
        assert_eq!(flight.price, Money::new(18999, "EUR"));
        assert_eq!(flight.cabin_class, CabinClass::Business);
        // Codes fall back to the request
        assert_eq!(flight.origin, "JFK");
        assert_eq!(flight.destination, "LAX");
    }

    #[test]
    fn test_missing_and_malformed_fields_are_named() {
        let normalizer = OfferNormalizer::new("USD");
        let criteria = flight_criteria();

        let no_price = json!({"airline": "Delta", "duration": 90, "stops": 0,
            "departure": "2025-03-01 08:00", "arrival": "2025-03-01 09:30"});
        assert_eq!(
            normalizer.normalize_flight(&no_price, &criteria),
            Err(NormalizationError::MissingField("price"))
        );

        let bad_duration = json!({"airline": "Delta", "price": 100, "duration": "soon", "stops": 0,
            "departure": "2025-03-01 08:00", "arrival": "2025-03-01 09:30"});
        assert_eq!(
            normalizer.normalize_flight(&bad_duration, &criteria),
            Err(NormalizationError::MalformedDuration("soon".to_string()))
        );

        let bad_currency = json!({"airline": "Delta", "price": "₿1", "duration": 90, "stops": 0,
            "departure": "2025-03-01 08:00", "arrival": "2025-03-01 09:30"});
        assert_eq!(
            normalizer.normalize_flight(&bad_currency, &criteria),
            Err(NormalizationError::UnknownCurrency("₿".to_string()))
        );
    }

    #[test]
    fn test_hotel_aliases_and_absent_rating() {
        let normalizer = OfferNormalizer::new("USD");
        let record = json!({
            "name": "Hotel Lumiere",
            "rate_per_night": {"lowest": "$145", "extracted_lowest": 145},
            "amenities": ["Free Wi-Fi", {"name": "Pool"}, "  "],
            "address": {"city": "Paris, France"},
            "link": "https://example.com/lumiere"
        });
        let hotel = normalizer.normalize_hotel(&record, &hotel_criteria()).unwrap();

        assert_eq!(hotel.name, "Hotel Lumiere");
        assert_eq!(hotel.price, Money::new(14500, "USD"));
        assert_eq!(hotel.rating, None);
        assert_eq!(hotel.location, "Paris, France");
        assert!(hotel.amenities.contains("pool"));
        assert!(hotel.amenities.contains("free wi-fi"));
        assert_eq!(hotel.amenities.len(), 2);
        assert_eq!(hotel.check_in, hotel_criteria().check_in);
        assert_eq!(hotel.provider_fields.get("link"), Some(&json!("https://example.com/lumiere")));
    }

    #[test]
    fn test_hotel_unusable_rating_is_treated_as_absent() {
        let normalizer = OfferNormalizer::new("USD");
        for rating in [json!(8.7), json!("n/a"), json!(-1)] {
            let record = json!({"title": "Big Hotel", "price": 90, "overall_rating": rating});
            let hotel = normalizer.normalize_hotel(&record, &hotel_criteria()).unwrap();
            assert_eq!(hotel.rating, None);
        }

        let record = json!({"title": "Big Hotel", "price": 90, "rating": "4.5"});
        assert_eq!(normalizer.normalize_hotel(&record, &hotel_criteria()).unwrap().rating, Some(4.5));
    }

    #[test]
    fn test_hotel_keeps_every_amenity_tag() {
        let normalizer = OfferNormalizer::new("USD");
        let mut amenities: Vec<Value> = (0..11).map(|i| json!(format!("tag{}", i))).collect();
        amenities.push(json!(" "));
        amenities.push(json!("Pool"));
        let record = json!({"title": "Big Hotel", "price": 90, "amenities": amenities});
        let hotel = normalizer.normalize_hotel(&record, &hotel_criteria()).unwrap();

        assert_eq!(hotel.amenities.len(), 12);
        assert!(hotel.amenities.contains("pool"));
        assert!(!hotel.amenities.contains(""));
    }

    #[test]
    fn test_duplicates_are_dropped_and_counted() {
        let normalizer = OfferNormalizer::new("USD");
        let records = vec![serp_flight(420), serp_flight(420), serp_flight(380), json!("garbage")];
        let batch = normalizer.normalize_flights(&records, &flight_criteria());

        assert_eq!(batch.offers.len(), 2);
        assert_eq!(batch.dropped.len(), 2);
        assert!(matches!(batch.dropped[0].error, NormalizationError::DuplicateOffer(_)));
        assert_eq!(batch.dropped[1].error, NormalizationError::NotAnObject);
        // Provider order survives
        assert_eq!(batch.offers[0].price().amount_minor, 42000);

        match batch.dropped_warning() {
            Some(Warning::OffersDropped { count, reasons }) => {
                assert_eq!(count, 2);
                assert!(reasons[1].starts_with("record 3"));
            }
            other => panic!("unexpected warning: {:?}", other),
        }
    }

    #[test]
    fn test_envelope_unwrapping() {
        let response = json!({"best_flights": [{"a": 1}], "other_flights": [{"b": 2}, {"c": 3}]});
        assert_eq!(unwrap_envelope(&response, OfferKind::Flight).len(), 3);

        let response = json!({"properties": [], "hotels": [{"name": "x"}]});
        assert_eq!(unwrap_envelope(&response, OfferKind::Hotel).len(), 1);

        assert!(unwrap_envelope(&json!({"error": "nope"}), OfferKind::Hotel).is_empty());
    }

    #[test]
    fn test_duration_formats() {
        assert_eq!(parse_duration_minutes("2h 15m"), Some(135));
        assert_eq!(parse_duration_minutes("2h15m"), Some(135));
        assert_eq!(parse_duration_minutes("1 hr 5 min"), Some(65));
        assert_eq!(parse_duration_minutes("45 min"), Some(45));
        assert_eq!(parse_duration_minutes("PT3H"), Some(180));
        assert_eq!(parse_duration_minutes("90"), Some(90));
        assert_eq!(parse_duration_minutes("2 days"), None);
        assert_eq!(parse_duration_minutes("h 15"), None);
        assert_eq!(parse_duration_minutes(""), None);
    }

    fn arbitrary_record() -> impl Strategy<Value = Value> {
        prop_oneof![
            (1i64..5000).prop_map(serp_flight),
            Just(json!({"airline": "Delta"})),
            Just(json!(42)),
            Just(json!({"airline": "Delta", "price": "?", "duration": 60, "stops": 0,
                "departure": "2025-03-01 08:00", "arrival": "2025-03-01 09:00"})),
        ]
    }

    proptest! {
        #[test]
        fn prop_dropped_plus_returned_equals_input(records in proptest::collection::vec(arbitrary_record(), 0..20)) {
            let batch = OfferNormalizer::new("USD").normalize_flights(&records, &flight_criteria());
            prop_assert_eq!(batch.offers.len() + batch.dropped.len(), records.len());
            prop_assert_eq!(batch.input_len(), records.len());
        }
    }
}
