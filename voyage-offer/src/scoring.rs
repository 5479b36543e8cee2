use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use voyage_core::{CabinClass, CoreError, FlightSearchCriteria, HotelSearchCriteria, OfferKind};

use crate::models::{Criterion, Offer, ScoredOffer};

/// Sub-score for a hotel that reports no rating
pub const NEUTRAL_RATING_SCORE: f64 = 0.5;

/// Sub-score for a hotel whose location does not match the request exactly
pub const PARTIAL_LOCATION_SCORE: f64 = 0.5;

/// Traveler weights per criterion, each in [0, 1].
///
/// Weights need not sum to 1; the engine divides by their sum. The default
/// weighs every criterion equally.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreferenceProfile {
    pub price: f64,
    pub duration: f64,
    pub stops: f64,
    pub cabin_class: f64,
    pub rating: f64,
    pub amenities: f64,
    pub location: f64,
}

impl Default for PreferenceProfile {
    fn default() -> Self {
        Self {
            price: 1.0,
            duration: 1.0,
            stops: 1.0,
            cabin_class: 1.0,
            rating: 1.0,
            amenities: 1.0,
            location: 1.0,
        }
    }
}

impl PreferenceProfile {
    /// Every weight zero except price
    pub fn price_only() -> Self {
        Self {
            price: 1.0,
            duration: 0.0,
            stops: 0.0,
            cabin_class: 0.0,
            rating: 0.0,
            amenities: 0.0,
            location: 0.0,
        }
    }

    pub fn weight(&self, criterion: Criterion) -> f64 {
        match criterion {
            Criterion::Price => self.price,
            Criterion::Duration => self.duration,
            Criterion::Stops => self.stops,
            Criterion::CabinClass => self.cabin_class,
            Criterion::Rating => self.rating,
            Criterion::Amenities => self.amenities,
            Criterion::Location => self.location,
        }
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        let all = [
            Criterion::Price,
            Criterion::Duration,
            Criterion::Stops,
            Criterion::CabinClass,
            Criterion::Rating,
            Criterion::Amenities,
            Criterion::Location,
        ];
        for criterion in all {
            let w = self.weight(criterion);
            if !w.is_finite() || !(0.0..=1.0).contains(&w) {
                return Err(CoreError::InvalidRequest(format!(
                    "weight for {:?} must be within [0, 1], got {}",
                    criterion, w
                )));
            }
        }
        Ok(())
    }

    /// Weights that apply to `kind`; all-zero falls back to equal weighting
    pub fn weights_for(&self, kind: OfferKind) -> Vec<(Criterion, f64)> {
        let criteria = Criterion::for_kind(kind);
        let weights: Vec<(Criterion, f64)> = criteria.iter().map(|c| (*c, self.weight(*c))).collect();
        if weights.iter().map(|(_, w)| w).sum::<f64>() > 0.0 {
            weights
        } else {
            criteria.iter().map(|c| (*c, 1.0)).collect()
        }
    }
}

/// What the traveler asked for, for the match-based criteria
#[derive(Debug, Clone, Default)]
pub struct ScoringContext {
    pub requested_cabin: Option<CabinClass>,
    pub requested_amenities: BTreeSet<String>,
    pub requested_location: Option<String>,
}

impl ScoringContext {
    pub fn for_flights(criteria: &FlightSearchCriteria) -> Self {
        Self {
            requested_cabin: Some(criteria.cabin_class),
            ..Self::default()
        }
    }

    pub fn for_hotels(criteria: &HotelSearchCriteria) -> Self {
        Self {
            requested_cabin: None,
            requested_amenities: criteria
                .amenities
                .iter()
                .map(|a| a.trim().to_lowercase())
                .filter(|a| !a.is_empty())
                .collect(),
            requested_location: Some(criteria.location.clone()),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Direction {
    LowerIsBetter,
    HigherIsBetter,
}

/// Min and max of one criterion across the current batch
#[derive(Debug, Clone, Copy)]
struct Range {
    min: f64,
    max: f64,
}

impl Range {
    fn of(values: impl Iterator<Item = f64>) -> Option<Self> {
        values.fold(None, |range, v| match range {
            None => Some(Range { min: v, max: v }),
            Some(r) => Some(Range { min: r.min.min(v), max: r.max.max(v) }),
        })
    }

    /// Degenerate ranges (every value equal) score 1 for all
    fn normalize(&self, value: f64, direction: Direction) -> f64 {
        let span = self.max - self.min;
        if span <= f64::EPSILON {
            return 1.0;
        }
        let position = ((value - self.min) / span).clamp(0.0, 1.0);
        match direction {
            Direction::LowerIsBetter => 1.0 - position,
            Direction::HigherIsBetter => position,
        }
    }
}

fn raw_value(offer: &Offer, criterion: Criterion) -> Option<f64> {
    match (criterion, offer) {
        (Criterion::Price, o) => Some(o.price().amount_minor as f64),
        (Criterion::Duration, Offer::Flight(f)) => Some(f.duration_minutes as f64),
        (Criterion::Stops, Offer::Flight(f)) => Some(f.stops as f64),
        (Criterion::Rating, Offer::Hotel(h)) => h.rating,
        _ => None,
    }
}

/// Jaccard similarity; with nothing requested every hotel matches fully
pub fn jaccard(requested: &BTreeSet<String>, offered: &BTreeSet<String>) -> f64 {
    if requested.is_empty() {
        return 1.0;
    }
    let intersection = requested.intersection(offered).count() as f64;
    let union = requested.union(offered).count() as f64;
    intersection / union
}

/// Exact match of the whole location or any comma-separated component
pub fn location_match(requested: Option<&str>, location: &str) -> f64 {
    let Some(requested) = requested.map(|r| r.trim().to_lowercase()).filter(|r| !r.is_empty()) else {
        return 1.0;
    };
    let location = location.trim().to_lowercase();
    if location == requested || location.split(',').any(|part| part.trim() == requested) {
        1.0
    } else {
        PARTIAL_LOCATION_SCORE
    }
}

/// Multi-criteria scoring with per-batch min-max normalization
#[derive(Debug, Clone, Default)]
pub struct ScoringEngine;

impl ScoringEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn score_batch(&self, offers: Vec<Offer>, profile: &PreferenceProfile, context: &ScoringContext) -> Vec<ScoredOffer> {
        let ranges: BTreeMap<Criterion, Range> = [Criterion::Price, Criterion::Duration, Criterion::Stops, Criterion::Rating]
            .into_iter()
            .filter_map(|c| Range::of(offers.iter().filter_map(|o| raw_value(o, c))).map(|r| (c, r)))
            .collect();

        offers
            .into_iter()
            .map(|offer| {
                let weights = profile.weights_for(offer.kind());
                let total_weight: f64 = weights.iter().map(|(_, w)| w).sum();

                let sub_scores: BTreeMap<Criterion, f64> = weights
                    .iter()
                    .map(|(criterion, _)| (*criterion, self.sub_score(&offer, *criterion, &ranges, context)))
                    .collect();

                let component_scores: BTreeMap<Criterion, f64> = weights
                    .iter()
                    .map(|(criterion, w)| (*criterion, w * sub_scores[criterion] / total_weight))
                    .collect();

                let score = component_scores.values().sum::<f64>().clamp(0.0, 1.0);
                ScoredOffer::new(offer, score, sub_scores, component_scores)
            })
            .collect()
    }

    fn sub_score(&self, offer: &Offer, criterion: Criterion, ranges: &BTreeMap<Criterion, Range>, context: &ScoringContext) -> f64 {
        let normalized = |direction| {
            match (raw_value(offer, criterion), ranges.get(&criterion)) {
                (Some(value), Some(range)) => Some(range.normalize(value, direction)),
                _ => None,
            }
        };

        match (criterion, offer) {
            (Criterion::Price, _) | (Criterion::Duration, _) | (Criterion::Stops, _) => {
                normalized(Direction::LowerIsBetter).unwrap_or(0.0)
            }
            (Criterion::Rating, _) => normalized(Direction::HigherIsBetter).unwrap_or(NEUTRAL_RATING_SCORE),
            (Criterion::CabinClass, Offer::Flight(f)) => match context.requested_cabin {
                Some(requested) if requested != f.cabin_class => 0.0,
                _ => 1.0,
            },
            (Criterion::Amenities, Offer::Hotel(h)) => jaccard(&context.requested_amenities, &h.amenities),
            (Criterion::Location, Offer::Hotel(h)) => location_match(context.requested_location.as_deref(), &h.location),
            _ => 0.0,
        }
    }
}
