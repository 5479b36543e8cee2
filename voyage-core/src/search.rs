use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OfferKind {
    Flight,
    Hotel,
}

impl fmt::Display for OfferKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OfferKind::Flight => write!(f, "flight"),
            OfferKind::Hotel => write!(f, "hotel"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CabinClass {
    #[default]
    Economy,
    Premium,
    Business,
    First,
}

impl CabinClass {
    /// SerpAPI `travel_class` parameter value
    pub fn provider_code(&self) -> u8 {
        match self {
            CabinClass::Economy => 1,
            CabinClass::Premium => 2,
            CabinClass::Business => 3,
            CabinClass::First => 4,
        }
    }
}

impl FromStr for CabinClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', '_'], " ");
        match normalized.as_str() {
            "economy" | "coach" | "basic economy" | "1" => Ok(CabinClass::Economy),
            "premium" | "premium economy" | "2" => Ok(CabinClass::Premium),
            "business" | "3" => Ok(CabinClass::Business),
            "first" | "first class" | "4" => Ok(CabinClass::First),
            other => Err(format!("unknown cabin class '{}'", other)),
        }
    }
}

impl fmt::Display for CabinClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CabinClass::Economy => "economy",
            CabinClass::Premium => "premium",
            CabinClass::Business => "business",
            CabinClass::First => "first",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RoomType {
    #[default]
    Standard,
    Deluxe,
    Suite,
}

impl FromStr for RoomType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standard" => Ok(RoomType::Standard),
            "deluxe" => Ok(RoomType::Deluxe),
            "suite" => Ok(RoomType::Suite),
            other => Err(format!("unknown room type '{}'", other)),
        }
    }
}

impl fmt::Display for RoomType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RoomType::Standard => "standard",
            RoomType::Deluxe => "deluxe",
            RoomType::Suite => "suite",
        };
        write!(f, "{}", s)
    }
}

fn default_party_size() -> u32 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlightSearchCriteria {
    pub origin: String,
    pub destination: String,
    pub departure_date: NaiveDate,
    #[serde(default)]
    pub return_date: Option<NaiveDate>,
    #[serde(default = "default_party_size")]
    pub passengers: u32,
    #[serde(default)]
    pub cabin_class: CabinClass,
    /// Free-form traveler hints ("Direct flights only", "Morning departure")
    #[serde(default)]
    pub preferences: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HotelSearchCriteria {
    pub location: String,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    #[serde(default = "default_party_size")]
    pub guests: u32,
    #[serde(default)]
    pub room_type: RoomType,
    /// Amenity tags the traveler wants; scored by overlap
    #[serde(default)]
    pub amenities: Vec<String>,
    #[serde(default)]
    pub preferences: Vec<String>,
}

/// Query handed to the search provider
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SearchQuery {
    Flights(FlightSearchCriteria),
    Hotels(HotelSearchCriteria),
}

impl SearchQuery {
    pub fn kind(&self) -> OfferKind {
        match self {
            SearchQuery::Flights(_) => OfferKind::Flight,
            SearchQuery::Hotels(_) => OfferKind::Hotel,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItineraryRequest {
    pub destination: String,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    /// Free-text summary of the selected flight, not re-validated
    #[serde(default)]
    pub flight_summary: String,
    /// Free-text summary of the selected hotel, not re-validated
    #[serde(default)]
    pub hotel_summary: String,
    #[serde(default)]
    pub activity_preferences: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flight_criteria_deserialization_defaults() {
        let json = r#"
            {
                "origin": "JFK",
                "destination": "LAX",
                "departure_date": "2024-12-25"
            }
        "#;
        let criteria: FlightSearchCriteria = serde_json::from_str(json).expect("Failed to deserialize");
        assert_eq!(criteria.origin, "JFK");
        assert_eq!(criteria.departure_date, NaiveDate::from_ymd_opt(2024, 12, 25).unwrap());
        assert_eq!(criteria.passengers, 1);
        assert_eq!(criteria.cabin_class, CabinClass::Economy);
        assert!(criteria.return_date.is_none());
    }

    #[test]
    fn test_cabin_class_parsing() {
        assert_eq!("Premium Economy".parse::<CabinClass>(), Ok(CabinClass::Premium));
        assert_eq!("first_class".parse::<CabinClass>(), Ok(CabinClass::First));
        assert_eq!("3".parse::<CabinClass>(), Ok(CabinClass::Business));
        assert!("steerage".parse::<CabinClass>().is_err());
    }

    #[test]
    fn test_search_query_is_tagged() {
        let query = SearchQuery::Hotels(HotelSearchCriteria {
            location: "Paris".to_string(),
            check_in: NaiveDate::from_ymd_opt(2025, 5, 1).unwrap(),
            check_out: NaiveDate::from_ymd_opt(2025, 5, 4).unwrap(),
            guests: 2,
            room_type: RoomType::Suite,
            amenities: vec![],
            preferences: vec![],
        });
        let value = serde_json::to_value(&query).unwrap();
        assert_eq!(value["kind"], "hotels");
        assert_eq!(value["room_type"], "suite");
        assert_eq!(query.kind(), OfferKind::Hotel);
    }
}
