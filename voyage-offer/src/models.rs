use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use voyage_core::{CabinClass, ContextFields, OfferKind, RoomType};

/// Price in minor units (cents) with an ISO-4217 currency code
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Money {
    pub amount_minor: i64,
    pub currency: String,
}

impl Money {
    pub fn new(amount_minor: i64, currency: impl Into<String>) -> Self {
        Self { amount_minor, currency: currency.into() }
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}.{:02}", self.currency, self.amount_minor / 100, self.amount_minor % 100)
    }
}

/// Weather-derived annotations attached by the enricher
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Enrichment {
    pub weather: Option<ContextFields>,
    /// Flights: fair weather expected at the destination on arrival day
    pub good_travel_window: Option<bool>,
    /// Hotels: fair weather and at least one outdoor amenity
    pub outdoor_suitability: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightOffer {
    pub id: String,
    pub price: Money,
    pub carrier: String,
    pub origin: String,
    pub destination: String,
    pub departure: NaiveDateTime,
    pub arrival: NaiveDateTime,
    pub stops: u32,
    pub duration_minutes: u32,
    pub cabin_class: CabinClass,
    /// Raw attributes kept for display (logo, booking link, ...)
    pub provider_fields: Map<String, Value>,
    pub enrichment: Option<Enrichment>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HotelOffer {
    pub id: String,
    /// Nightly rate
    pub price: Money,
    pub name: String,
    pub location: String,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    /// 0.0-5.0 when the provider reports one
    pub rating: Option<f64>,
    pub amenities: BTreeSet<String>,
    pub room_type: RoomType,
    pub provider_fields: Map<String, Value>,
    pub enrichment: Option<Enrichment>,
}

/// A single priced travel option
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Offer {
    Flight(FlightOffer),
    Hotel(HotelOffer),
}

impl Offer {
    pub fn id(&self) -> &str {
        match self {
            Offer::Flight(f) => &f.id,
            Offer::Hotel(h) => &h.id,
        }
    }

    pub fn price(&self) -> &Money {
        match self {
            Offer::Flight(f) => &f.price,
            Offer::Hotel(h) => &h.price,
        }
    }

    pub fn kind(&self) -> OfferKind {
        match self {
            Offer::Flight(_) => OfferKind::Flight,
            Offer::Hotel(_) => OfferKind::Hotel,
        }
    }

    pub fn enrichment(&self) -> Option<&Enrichment> {
        match self {
            Offer::Flight(f) => f.enrichment.as_ref(),
            Offer::Hotel(h) => h.enrichment.as_ref(),
        }
    }

    pub fn set_enrichment(&mut self, enrichment: Enrichment) {
        match self {
            Offer::Flight(f) => f.enrichment = Some(enrichment),
            Offer::Hotel(h) => h.enrichment = Some(enrichment),
        }
    }

    /// Location and date whose weather matters for this offer
    pub fn context_key(&self) -> (String, NaiveDate) {
        match self {
            Offer::Flight(f) => (f.destination.clone(), f.departure.date()),
            Offer::Hotel(h) => (h.location.clone(), h.check_in),
        }
    }

    /// One-line description used in prompts and fallback text
    pub fn label(&self) -> String {
        match self {
            Offer::Flight(f) => {
                let stops = match f.stops {
                    0 => "nonstop".to_string(),
                    1 => "1 stop".to_string(),
                    n => format!("{} stops", n),
                };
                format!(
                    "{} {}→{} departing {} ({}h {:02}m, {}, {})",
                    f.carrier,
                    f.origin,
                    f.destination,
                    f.departure.format("%Y-%m-%d %H:%M"),
                    f.duration_minutes / 60,
                    f.duration_minutes % 60,
                    stops,
                    f.cabin_class
                )
            }
            Offer::Hotel(h) => match h.rating {
                Some(rating) => format!("{}, {} (rated {:.1}, {} room)", h.name, h.location, rating, h.room_type),
                None => format!("{}, {} (unrated, {} room)", h.name, h.location, h.room_type),
            },
        }
    }
}

/// Scoring criteria; flights use the first four, hotels price and the last three
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Criterion {
    Price,
    Duration,
    Stops,
    CabinClass,
    Rating,
    Amenities,
    Location,
}

impl Criterion {
    pub fn for_kind(kind: OfferKind) -> &'static [Criterion] {
        match kind {
            OfferKind::Flight => &[Criterion::Price, Criterion::Duration, Criterion::Stops, Criterion::CabinClass],
            OfferKind::Hotel => &[Criterion::Price, Criterion::Rating, Criterion::Amenities, Criterion::Location],
        }
    }
}

/// An offer with its final score and per-criterion contributions.
///
/// Immutable once built; contributions sum to `score`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredOffer {
    offer: Offer,
    score: f64,
    sub_scores: BTreeMap<Criterion, f64>,
    component_scores: BTreeMap<Criterion, f64>,
}

impl ScoredOffer {
    pub(crate) fn new(
        offer: Offer,
        score: f64,
        sub_scores: BTreeMap<Criterion, f64>,
        component_scores: BTreeMap<Criterion, f64>,
    ) -> Self {
        Self { offer, score, sub_scores, component_scores }
    }

    pub fn offer(&self) -> &Offer {
        &self.offer
    }

    pub fn score(&self) -> f64 {
        self.score
    }

    /// Normalized sub-score per criterion, before weighting
    pub fn sub_scores(&self) -> &BTreeMap<Criterion, f64> {
        &self.sub_scores
    }

    /// Weighted contribution per criterion
    pub fn component_scores(&self) -> &BTreeMap<Criterion, f64> {
        &self.component_scores
    }
}
